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

use std::io;

use thiserror::Error;

use ec4x_core::types::GameId;

pub type Result<T, E = DaemonError> = std::result::Result<T, E>;

/// Daemon error enum. Auth failures stay server-side; they are logged
/// and dropped, never surfaced to players.
#[derive(Debug, Error)]
pub enum DaemonError {
	#[error(transparent)]
	Io(#[from] io::Error),

	#[error(transparent)]
	Core(#[from] ec4x_core::CoreError),

	#[error("sqlx error: {0}")]
	Sql(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),

	#[error("binary encoding: {0}")]
	Encode(#[from] bincode::Error),
	#[error("json encoding: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unknown game {0}")]
	UnknownGame(GameId),
	#[error("game {0} is not accepting commands")]
	NotAccepting(GameId),
	#[error("duplicate transport event {0}")]
	DuplicateEvent(String),
	#[error("signature rejected for event {0}")]
	BadSignature(String),
	#[error("malformed transport event: {0}")]
	MalformedEvent(String),
	#[error("turn resolution timed out after {0}s")]
	ResolutionTimeout(u64),
	#[error("transport failure: {0}")]
	Transport(String),

	// actor and channel plumbing
	#[error("trying to send to a disconnected actor")]
	Disconnected,
	#[error("sending on a disconnected channel")]
	Channel,
}

impl From<xtra::Disconnected> for DaemonError {
	fn from(_: xtra::Disconnected) -> Self {
		Self::Disconnected
	}
}

impl<T> From<flume::SendError<T>> for DaemonError {
	fn from(_: flume::SendError<T>) -> Self {
		Self::Channel
	}
}
