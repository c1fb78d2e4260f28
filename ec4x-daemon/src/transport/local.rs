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

//! Direct local transport: a filesystem inbox/outbox next to the game
//! database. Hot-seat play and tests; no signatures, no encryption.

use std::{
	fs,
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use ec4x_core::types::{GameId, HouseId, Turn};

use super::{CommandEnvelope, Transport};
use crate::error::{DaemonError, Result};

/// What a submitted packet file carries.
#[derive(Debug, Serialize, Deserialize)]
struct InboxFile {
	game: GameId,
	house: u32,
	turn: Turn,
	packet_blob: Vec<u8>,
}

pub struct LocalTransport {
	game_dir: PathBuf,
}

impl LocalTransport {
	pub fn new(game_dir: impl Into<PathBuf>) -> Self {
		Self { game_dir: game_dir.into() }
	}

	fn inbox(&self) -> PathBuf {
		self.game_dir.join("inbox")
	}

	fn outbox(&self) -> PathBuf {
		self.game_dir.join("outbox")
	}

	fn drain_inbox(&self, game: GameId) -> Result<Vec<CommandEnvelope>> {
		let inbox = self.inbox();
		if !inbox.exists() {
			return Ok(Vec::new());
		}
		let mut paths: Vec<PathBuf> = fs::read_dir(&inbox)?
			.filter_map(|e| e.ok())
			.map(|e| e.path())
			.filter(|p| p.extension().map(|ext| ext == "pkt").unwrap_or(false))
			.collect();
		paths.sort();

		let mut envelopes = Vec::new();
		for path in paths {
			match read_packet_file(&path, game) {
				Ok(envelope) => {
					envelopes.push(envelope);
					fs::remove_file(&path)?;
				}
				Err(err) => {
					// a malformed file is dropped with a logged reason,
					// never retried forever
					log::warn!("dropping malformed inbox file {:?}: {}", path, err);
					fs::remove_file(&path)?;
				}
			}
		}
		Ok(envelopes)
	}
}

fn read_packet_file(path: &Path, game: GameId) -> Result<CommandEnvelope> {
	let bytes = fs::read(path)?;
	let file: InboxFile =
		bincode::deserialize(&bytes).map_err(|e| DaemonError::MalformedEvent(e.to_string()))?;
	if file.game != game {
		return Err(DaemonError::MalformedEvent(format!("packet for game {} in game {}'s inbox", file.game, game)));
	}
	let event_id = path
		.file_name()
		.and_then(|n| n.to_str())
		.map(|n| n.to_string())
		.unwrap_or_else(|| "unnamed".to_string());
	Ok(CommandEnvelope {
		event_id,
		game: file.game,
		house: HouseId(file.house),
		turn: file.turn,
		packet_blob: file.packet_blob,
	})
}

#[async_trait]
impl Transport for LocalTransport {
	async fn submit_command(&self, game: GameId, house: HouseId, packet: Vec<u8>) -> Result<()> {
		let inbox = self.inbox();
		fs::create_dir_all(&inbox)?;
		let file = InboxFile { game, house: house.0, turn: 0, packet_blob: packet };
		// the turn inside the packet is authoritative; the filename only
		// needs uniqueness per (house, submission)
		let mut n = 0;
		let path = loop {
			let candidate = inbox.join(format!("house{}-{:04}.pkt", house.0, n));
			if !candidate.exists() {
				break candidate;
			}
			n += 1;
		};
		fs::write(path, bincode::serialize(&file)?)?;
		Ok(())
	}

	fn collect_commands(&self, game: GameId) -> BoxStream<'_, Result<CommandEnvelope>> {
		match self.drain_inbox(game) {
			Ok(envelopes) => stream::iter(envelopes.into_iter().map(Ok)).boxed(),
			Err(err) => stream::iter(vec![Err(err)]).boxed(),
		}
	}

	async fn publish_delta(&self, _game: GameId, recipient: HouseId, payload: Vec<u8>) -> Result<()> {
		let outbox = self.outbox();
		fs::create_dir_all(&outbox)?;
		let path = outbox.join(format!("delta-house{}.pkt", recipient.0));
		fs::write(path, payload)?;
		Ok(())
	}

	async fn publish_summary(&self, _game: GameId, payload: Vec<u8>) -> Result<()> {
		let outbox = self.outbox();
		fs::create_dir_all(&outbox)?;
		fs::write(outbox.join("summary.json"), payload)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use smol::block_on;

	#[test]
	fn submit_then_collect_roundtrip() {
		block_on(async {
			let tmp = tempfile::tempdir().unwrap();
			let transport = LocalTransport::new(tmp.path());

			transport.submit_command(9, HouseId(2), vec![1, 2, 3]).await.unwrap();
			transport.submit_command(9, HouseId(3), vec![4, 5]).await.unwrap();

			let collected: Vec<_> = transport
				.collect_commands(9)
				.filter_map(|r| async move { r.ok() })
				.collect()
				.await;
			assert_eq!(collected.len(), 2);
			assert_eq!(collected[0].house, HouseId(2));
			assert_eq!(collected[0].packet_blob, vec![1, 2, 3]);

			// the inbox drained; a second collect yields nothing
			let again: Vec<_> = transport.collect_commands(9).collect().await;
			assert!(again.is_empty());
		});
	}

	#[test]
	fn malformed_files_are_dropped_not_looped() {
		block_on(async {
			let tmp = tempfile::tempdir().unwrap();
			let transport = LocalTransport::new(tmp.path());
			fs::create_dir_all(tmp.path().join("inbox")).unwrap();
			fs::write(tmp.path().join("inbox").join("junk.pkt"), b"not bincode").unwrap();

			let collected: Vec<_> = transport.collect_commands(9).collect().await;
			assert!(collected.is_empty());
			assert!(!tmp.path().join("inbox").join("junk.pkt").exists());
		});
	}
}
