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

//! Persistent state layout: `data/games/<slug>/ec4x.db`, archives under
//! `data/archive/<slug>/`. Nothing else on disk belongs to the daemon.

use std::{fs, path::Path};

use crate::{config::DaemonConfig, error::Result};

pub const DB_FILE: &str = "ec4x.db";

/// A human-readable directory identifier unique within `data/games`.
/// Lowercased, non-alphanumerics folded to single dashes.
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	let mut dash = true;
	for c in name.chars() {
		if c.is_ascii_alphanumeric() {
			slug.push(c.to_ascii_lowercase());
			dash = false;
		} else if !dash {
			slug.push('-');
			dash = true;
		}
	}
	while slug.ends_with('-') {
		slug.pop();
	}
	if slug.is_empty() {
		slug.push_str("game");
	}
	slug
}

/// Directories under `data/games` that carry a database file.
pub fn discover(config: &DaemonConfig) -> Result<Vec<String>> {
	let games_dir = config.games_dir();
	if !games_dir.exists() {
		return Ok(Vec::new());
	}
	let mut slugs = Vec::new();
	for entry in fs::read_dir(&games_dir)? {
		let entry = entry?;
		if !entry.file_type()?.is_dir() {
			continue;
		}
		if entry.path().join(DB_FILE).exists() {
			if let Some(slug) = entry.file_name().to_str() {
				slugs.push(slug.to_string());
			}
		}
	}
	slugs.sort();
	Ok(slugs)
}

/// Create the directory skeleton for a new game.
pub fn create_dirs(config: &DaemonConfig, slug: &str) -> Result<()> {
	let dir = config.game_dir(slug);
	fs::create_dir_all(dir.join("inbox"))?;
	fs::create_dir_all(dir.join("outbox"))?;
	fs::create_dir_all(dir.join("outbox").join("pending"))?;
	Ok(())
}

/// Move a game under `data/archive/`. The caller publishes the status
/// event only after this returns.
pub fn archive(config: &DaemonConfig, slug: &str) -> Result<()> {
	let src = config.game_dir(slug);
	let archive_root = config.archive_dir();
	fs::create_dir_all(&archive_root)?;
	let dst = unique_destination(&archive_root, slug);
	fs::rename(&src, &dst)?;
	Ok(())
}

/// Remove a game directory outright. The caller publishes the status
/// event only after this returns.
pub fn delete(config: &DaemonConfig, slug: &str) -> Result<()> {
	let dir = config.game_dir(slug);
	fs::remove_dir_all(&dir)?;
	Ok(())
}

fn unique_destination(root: &Path, slug: &str) -> std::path::PathBuf {
	let mut candidate = root.join(slug);
	let mut n = 1;
	while candidate.exists() {
		candidate = root.join(format!("{}-{}", slug, n));
		n += 1;
	}
	candidate
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn slugs_are_filesystem_friendly() {
		assert_eq!(slugify("The Padishah  Emperor's War!"), "the-padishah-emperor-s-war");
		assert_eq!(slugify("---"), "game");
		assert_eq!(slugify("Game 42"), "game-42");
	}

	#[test]
	fn discover_ignores_directories_without_a_database() {
		let tmp = tempfile::tempdir().unwrap();
		let config = DaemonConfig::with_data_dir(tmp.path());
		create_dirs(&config, "alpha").unwrap();
		create_dirs(&config, "beta").unwrap();
		fs::write(config.db_path("beta"), b"stub").unwrap();

		assert_eq!(discover(&config).unwrap(), vec!["beta".to_string()]);
	}

	#[test]
	fn archive_moves_the_directory() {
		let tmp = tempfile::tempdir().unwrap();
		let config = DaemonConfig::with_data_dir(tmp.path());
		create_dirs(&config, "alpha").unwrap();
		fs::write(config.db_path("alpha"), b"stub").unwrap();

		archive(&config, "alpha").unwrap();
		assert!(!config.game_dir("alpha").exists());
		assert!(config.archive_dir().join("alpha").join(DB_FILE).exists());
	}
}
