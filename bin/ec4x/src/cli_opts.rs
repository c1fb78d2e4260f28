// Copyright 2024-2026 EC4X contributors.
// This file is part of ec4x.

// ec4x is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// ec4x is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with ec4x.  If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ec4x", about = "Moderator CLI for the EC4X daemon", version)]
pub struct CliOpts {
	/// Path to the daemon TOML config.
	#[arg(short, long, global = true)]
	pub config: Option<PathBuf>,

	/// Data directory override (default: ./data).
	#[arg(short, long, global = true)]
	pub data_dir: Option<PathBuf>,

	/// Repeat for more verbosity (-v debug, -vv trace).
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create a game from a scenario file and publish its definition.
	New {
		/// Path to the scenario TOML.
		scenario: PathBuf,
	},
	/// Open a game for command submission.
	Start { game: String },
	/// Halt resolution for a game.
	Pause { game: String },
	/// Resume a paused game.
	Resume { game: String },
	/// Archive a game directory and publish status `cancelled`.
	Cancel { game: String },
	/// Remove a game directory and publish status `removed`.
	Delete { game: String },
	/// List the games under management.
	List,
	/// Show turn, phase and table counts for a game.
	Stats { game: String },
	/// Run the daemon loop until interrupted.
	Run,
}

impl CliOpts {
	pub fn log_level(&self) -> log::LevelFilter {
		match self.verbose {
			0 => log::LevelFilter::Info,
			1 => log::LevelFilter::Debug,
			_ => log::LevelFilter::Trace,
		}
	}
}
