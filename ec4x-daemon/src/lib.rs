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

//! The EC4X daemon: discovers games on disk, ingests signed command
//! packets through an abstract transport, resolves turns atomically in
//! the core engine, and publishes encrypted fog-of-war deltas.

#![forbid(unsafe_code)]

pub mod actors;
pub mod config;
pub mod database;
pub mod error;
pub mod games;
pub mod logger;
pub mod setup;
pub mod transport;

pub use self::{
	actors::System,
	config::DaemonConfig,
	database::Database,
	error::{DaemonError, Result},
};

#[cfg(test)]
pub(crate) use test::initialize;

#[cfg(test)]
mod test {
	use std::sync::Once;

	static INIT: Once = Once::new();

	/// Guard to call at the top of tests that want log output.
	pub fn initialize() {
		INIT.call_once(|| {
			let _ = pretty_env_logger::try_init();
		});
	}
}
