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

//! Core turn-resolution engine for EC4X: the entity store, the rules
//! bundle, the four-phase turn pipeline, fog-of-war projection, and the
//! wire codec. Everything here is synchronous and deterministic; the
//! daemon crate owns all I/O.

#![forbid(unsafe_code)]

pub mod codec;
pub mod command;
pub mod entities;
pub mod error;
pub mod events;
pub mod fog;
pub mod rng;
pub mod rules;
pub mod store;
pub mod systems;
pub mod types;

pub use self::{
	command::CommandPacket,
	error::{CodecError, CoreError, Result, StoreError},
	events::{Event, StampedEvent},
	fog::{PlayerState, PlayerStateDelta},
	rules::Rules,
	store::GameStore,
	systems::{TurnEngine, TurnOutcome},
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
