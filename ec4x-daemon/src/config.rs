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

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Daemon tuning knobs, deserialized from the moderator's TOML config.
#[derive(Clone, Debug, Deserialize)]
pub struct DaemonConfig {
	/// Root of the persistent layout: `data/games/<slug>/ec4x.db`.
	#[serde(default = "default_data_dir")]
	pub data_dir: PathBuf,
	/// Upper bound on turn resolutions running at once across games.
	#[serde(default = "default_max_concurrent_resolutions")]
	pub max_concurrent_resolutions: usize,
	/// Hard wall-clock ceiling for one resolution, in seconds.
	#[serde(default = "default_resolution_timeout_secs")]
	pub resolution_timeout_secs: u64,
	/// Period of the discovery/deadline scan, in seconds.
	#[serde(default = "default_scan_interval_secs")]
	pub scan_interval_secs: u64,
	/// Publish retries before a delta is parked on disk.
	#[serde(default = "default_retry_budget")]
	pub retry_budget: u32,
	/// Base delay of the exponential publish backoff, in milliseconds.
	#[serde(default = "default_retry_base_ms")]
	pub retry_base_ms: u64,
	/// Relay per-event ceiling; larger payloads are chunked.
	#[serde(default = "default_relay_size_ceiling")]
	pub relay_size_ceiling: usize,
	/// Consecutive failed resolutions before a game is paused.
	#[serde(default = "default_failure_limit")]
	pub failure_limit: u32,
}

impl Default for DaemonConfig {
	fn default() -> Self {
		Self {
			data_dir: default_data_dir(),
			max_concurrent_resolutions: default_max_concurrent_resolutions(),
			resolution_timeout_secs: default_resolution_timeout_secs(),
			scan_interval_secs: default_scan_interval_secs(),
			retry_budget: default_retry_budget(),
			retry_base_ms: default_retry_base_ms(),
			relay_size_ceiling: default_relay_size_ceiling(),
			failure_limit: default_failure_limit(),
		}
	}
}

impl DaemonConfig {
	pub fn games_dir(&self) -> PathBuf {
		self.data_dir.join("games")
	}

	pub fn archive_dir(&self) -> PathBuf {
		self.data_dir.join("archive")
	}

	pub fn game_dir(&self, slug: &str) -> PathBuf {
		self.games_dir().join(slug)
	}

	pub fn db_path(&self, slug: &str) -> PathBuf {
		self.game_dir(slug).join(crate::games::DB_FILE)
	}

	pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
		Self { data_dir: data_dir.into(), ..Self::default() }
	}
}

fn default_data_dir() -> PathBuf {
	Path::new("data").to_path_buf()
}

fn default_max_concurrent_resolutions() -> usize {
	num_cpus::get().saturating_sub(1).max(1)
}

const fn default_resolution_timeout_secs() -> u64 {
	120
}

const fn default_scan_interval_secs() -> u64 {
	5
}

const fn default_retry_budget() -> u32 {
	5
}

const fn default_retry_base_ms() -> u64 {
	250
}

const fn default_relay_size_ceiling() -> usize {
	60 * 1024
}

const fn default_failure_limit() -> u32 {
	3
}
