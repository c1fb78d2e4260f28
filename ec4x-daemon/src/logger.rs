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

//! logging

use std::{io, path::Path};

use fern::colors::{Color, ColoredLevelConfig};

/// Dispatch colored logs to stdout and, when a data directory is given,
/// a plain file under it.
pub fn init(std: log::LevelFilter, file: log::LevelFilter, data_dir: Option<&Path>) -> io::Result<()> {
	let colors = ColoredLevelConfig::new()
		.info(Color::Green)
		.warn(Color::Yellow)
		.error(Color::Red)
		.debug(Color::Blue)
		.trace(Color::Magenta);

	let stdout_dispatcher = fern::Dispatch::new()
		.level(std)
		.level_for("sqlx", log::LevelFilter::Error)
		.format(move |out, message, record| {
			out.finish(format_args!(
				"{} {} {}",
				chrono::Local::now().format("[%H:%M:%S]"),
				colors.color(record.level()),
				message,
			))
		})
		.chain(io::stdout());

	let mut root = fern::Dispatch::new().chain(stdout_dispatcher);

	if let Some(dir) = data_dir {
		std::fs::create_dir_all(dir)?;
		let log_path = dir.join("ec4x-daemon.log");
		let file_dispatcher = fern::Dispatch::new()
			.level(file)
			.level_for("sqlx", log::LevelFilter::Warn)
			.format(move |out, message, record| {
				out.finish(format_args!(
					"{} [{}][{}] {}",
					chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
					record.target(),
					record.level(),
					message,
				))
			})
			.chain(fern::log_file(log_path)?);
		root = root.chain(file_dispatcher);
	}

	root.apply().map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;
	Ok(())
}
