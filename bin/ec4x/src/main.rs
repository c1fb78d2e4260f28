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

mod cli_opts;
mod config;
mod scenario;

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use anyhow::Result;
use clap::Parser;

use ec4x_core::types::GamePhase;
use ec4x_daemon::{database::queries, games, logger, setup, Database, DaemonConfig, System};

use crate::cli_opts::{CliOpts, Command};

const EXIT_OK: i32 = 0;
const EXIT_VALIDATION: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;
const EXIT_TRANSPORT: i32 = 4;

fn main() {
	let cli = CliOpts::parse();
	let config = match config::resolve(&cli) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("{:#}", err);
			std::process::exit(EXIT_VALIDATION);
		}
	};
	if let Err(err) = logger::init(cli.log_level(), log::LevelFilter::Debug, Some(&config.data_dir)) {
		eprintln!("could not initialize logging: {}", err);
	}

	let code = match run(cli, config) {
		Ok(code) => code,
		Err(err) => {
			log::error!("{:#}", err);
			EXIT_TRANSPORT
		}
	};
	std::process::exit(code);
}

fn run(cli: CliOpts, config: DaemonConfig) -> Result<i32> {
	match cli.command {
		Command::New { scenario: path } => {
			// full validation happens before any side effect; every
			// collected problem prints on rejection
			let (name, store) = match scenario::load(&path) {
				Ok(loaded) => loaded,
				Err(err) => {
					eprintln!("{}", err);
					return Ok(EXIT_VALIDATION);
				}
			};
			let slug = smol::block_on(setup::create_game(&config, &name, &store))?;
			println!("created game '{}' at {}", slug, config.game_dir(&slug).display());
			Ok(EXIT_OK)
		}
		Command::Start { game } => flip_phase(&config, &game, GamePhase::Active, "started"),
		Command::Pause { game } => flip_phase(&config, &game, GamePhase::Paused, "paused"),
		Command::Resume { game } => flip_phase(&config, &game, GamePhase::Active, "resumed"),
		Command::Cancel { game } => {
			if !config.game_dir(&game).exists() {
				eprintln!("no such game '{}'", game);
				return Ok(EXIT_NOT_FOUND);
			}
			match smol::block_on(setup::cancel_game(&config, &game)) {
				Ok(()) => {
					println!("game '{}' archived", game);
					Ok(EXIT_OK)
				}
				Err(err) => {
					eprintln!("cancel failed after archiving step: {}", err);
					Ok(EXIT_TRANSPORT)
				}
			}
		}
		Command::Delete { game } => {
			if !config.game_dir(&game).exists() {
				eprintln!("no such game '{}'", game);
				return Ok(EXIT_NOT_FOUND);
			}
			smol::block_on(setup::delete_game(&config, &game))?;
			println!("game '{}' removed", game);
			Ok(EXIT_OK)
		}
		Command::List => {
			let slugs = games::discover(&config)?;
			if slugs.is_empty() {
				println!("no games under {}", config.games_dir().display());
			}
			for slug in slugs {
				println!("{}", slug);
			}
			Ok(EXIT_OK)
		}
		Command::Stats { game } => {
			if !config.db_path(&game).exists() {
				eprintln!("no such game '{}'", game);
				return Ok(EXIT_NOT_FOUND);
			}
			let stats = smol::block_on(async {
				let db = Database::open(&config.db_path(&game)).await?;
				let mut conn = db.conn().await?;
				queries::stats(&mut conn).await
			})?;
			println!("game:      {}", game);
			println!("turn:      {}", stats.turn);
			println!("phase:     {}", stats.phase.as_str());
			println!("events:    {}", stats.event_count);
			println!("commands:  {}", stats.command_count);
			println!("snapshots: {}", stats.snapshot_count);
			Ok(EXIT_OK)
		}
		Command::Run => {
			let system = System::start(config);
			let running = Arc::new(AtomicBool::new(true));
			let r = running.clone();
			ctrlc::set_handler(move || {
				r.store(false, Ordering::SeqCst);
			})
			.expect("error setting ctrl-c handler");
			while running.load(Ordering::SeqCst) {
				std::thread::sleep(std::time::Duration::from_millis(200));
			}
			println!("\nshutting down ...");
			system.shutdown()?;
			Ok(EXIT_OK)
		}
	}
}

fn flip_phase(config: &DaemonConfig, game: &str, phase: GamePhase, verb: &str) -> Result<i32> {
	if !config.db_path(game).exists() {
		eprintln!("no such game '{}'", game);
		return Ok(EXIT_NOT_FOUND);
	}
	smol::block_on(setup::set_game_phase(config, game, phase))?;
	println!("game '{}' {}", game, verb);
	Ok(EXIT_OK)
}
