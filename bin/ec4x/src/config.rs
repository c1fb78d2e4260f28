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

use std::path::Path;

use anyhow::{Context as _, Result};

use ec4x_daemon::DaemonConfig;

use crate::cli_opts::CliOpts;

/// Resolve the daemon configuration: TOML file if given, defaults
/// otherwise, with the CLI data-dir override applied last.
pub fn resolve(cli: &CliOpts) -> Result<DaemonConfig> {
	let mut config = match &cli.config {
		Some(path) => parse_file(path)?,
		None => DaemonConfig::default(),
	};
	if let Some(data_dir) = &cli.data_dir {
		config.data_dir = data_dir.clone();
	}
	Ok(config)
}

fn parse_file(path: &Path) -> Result<DaemonConfig> {
	let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	let config = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
	Ok(config)
}
