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

//! The abstract transport boundary. The daemon consumes this interface
//! and never touches a network directly; packets and payloads stay
//! opaque byte sequences to the core.

pub mod local;
pub mod relay;

use async_trait::async_trait;
use futures::stream::BoxStream;

use ec4x_core::types::{GameId, HouseId, Turn};

use crate::error::Result;

/// One verified, decrypted command submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
	/// Transport-level id used for deduplication.
	pub event_id: String,
	pub game: GameId,
	pub house: HouseId,
	pub turn: Turn,
	/// Plaintext packet bytes; the daemon decodes, the transport never
	/// looks inside.
	pub packet_blob: Vec<u8>,
}

#[async_trait]
pub trait Transport: Send + Sync {
	/// Player side: hand a packet to the daemon.
	async fn submit_command(&self, game: GameId, house: HouseId, packet: Vec<u8>) -> Result<()>;

	/// Daemon side: drain verified submissions.
	fn collect_commands(&self, game: GameId) -> BoxStream<'_, Result<CommandEnvelope>>;

	/// Push one house's encrypted delta after a committed turn.
	async fn publish_delta(&self, game: GameId, recipient: HouseId, payload: Vec<u8>) -> Result<()>;

	/// Push a public (unencrypted) game summary or status event.
	async fn publish_summary(&self, game: GameId, payload: Vec<u8>) -> Result<()>;
}
