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

//! Relay transport: signed events over an abstract pub/sub client.
//! Every inbound event is signature-checked against the submitting
//! house's key, deduplicated by event id, and decrypted with the
//! daemon's per-house payload key. Outbound payloads above the relay
//! ceiling travel as numbered fragments.

use std::{collections::BTreeMap, fs, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use ec4x_core::{
	codec::{self, Fragment, PayloadKey, Reassembler},
	types::{GameId, HouseId, Turn},
};

use super::{CommandEnvelope, Transport};
use crate::{
	database::{queries, Database},
	error::{DaemonError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayEventKind {
	/// Public game definition, published at creation.
	GameDefinition,
	/// A player claiming a house slot.
	SlotClaim,
	/// Encrypted command packet, player to daemon.
	CommandIn,
	/// Encrypted per-house delta, daemon to player.
	DeltaOut,
	/// Encrypted full state for an initial join.
	FullState,
	/// Encrypted player-to-daemon message.
	DirectMessage,
	/// Public join error.
	JoinError,
	/// Public turn summary or status change.
	Summary,
}

/// One signed event on the relay. Encrypted events carry a recipient
/// tag so relays can route without inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
	pub id: String,
	pub kind: RelayEventKind,
	pub game: GameId,
	pub turn: Turn,
	/// Author's ed25519 verification key, raw bytes.
	pub author: [u8; 32],
	pub recipient: Option<String>,
	/// Armored payload (or a JSON fragment record when chunked).
	pub payload: String,
	#[serde(with = "serde_sig")]
	pub signature: [u8; 64],
}

mod serde_sig {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(sig: &[u8; 64], ser: S) -> Result<S::Ok, S::Error> {
		ser.serialize_str(&hex::encode(sig))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 64], D::Error> {
		let text = String::deserialize(de)?;
		let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
		bytes.try_into().map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
	}
}

impl RelayEvent {
	/// Canonical bytes covered by the signature.
	pub fn signing_bytes(&self) -> Vec<u8> {
		let mut hasher = Sha3_256::new();
		hasher.update(b"ec4x.relay.event.v1");
		hasher.update(self.id.as_bytes());
		hasher.update(self.game.to_le_bytes());
		hasher.update(self.turn.to_le_bytes());
		hasher.update([kind_tag(self.kind)]);
		hasher.update(self.payload.as_bytes());
		hasher.finalize().to_vec()
	}
}

fn kind_tag(kind: RelayEventKind) -> u8 {
	match kind {
		RelayEventKind::GameDefinition => 0,
		RelayEventKind::SlotClaim => 1,
		RelayEventKind::CommandIn => 2,
		RelayEventKind::DeltaOut => 3,
		RelayEventKind::FullState => 4,
		RelayEventKind::DirectMessage => 5,
		RelayEventKind::JoinError => 6,
		RelayEventKind::Summary => 7,
	}
}

/// The pub/sub system underneath: fetch new events addressed to the
/// daemon, publish events signed by the daemon.
#[async_trait]
pub trait RelayClient: Send + Sync {
	async fn fetch(&self, game: GameId) -> Result<Vec<RelayEvent>>;
	async fn publish(&self, event: RelayEvent) -> Result<()>;
}

#[async_trait]
impl<T: RelayClient> RelayClient for Arc<T> {
	async fn fetch(&self, game: GameId) -> Result<Vec<RelayEvent>> {
		T::fetch(self, game).await
	}

	async fn publish(&self, event: RelayEvent) -> Result<()> {
		T::publish(self, event).await
	}
}

/// Per-house credentials the daemon needs: a verification key for
/// signatures and a symmetric payload key.
#[derive(Clone)]
pub struct HouseKeys {
	pub verifying: [u8; 32],
	pub payload: PayloadKey,
}

pub struct RelayTransport<C: RelayClient> {
	client: C,
	db: Database,
	houses: BTreeMap<HouseId, HouseKeys>,
	/// Daemon signing identity, used for outbound events.
	identity: ed25519_dalek::SigningKey,
	/// Undeliverable payloads parked here, retried on reload.
	pending_dir: PathBuf,
	ceiling: usize,
	retry_budget: u32,
	retry_base: Duration,
	call_timeout: Duration,
	reassembler: Mutex<Reassembler>,
	counter: Mutex<u64>,
}

impl<C: RelayClient> RelayTransport<C> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		client: C,
		db: Database,
		houses: BTreeMap<HouseId, HouseKeys>,
		identity: ed25519_dalek::SigningKey,
		pending_dir: PathBuf,
		ceiling: usize,
		retry_budget: u32,
		retry_base: Duration,
	) -> Self {
		Self {
			client,
			db,
			houses,
			identity,
			pending_dir,
			ceiling,
			retry_budget,
			retry_base,
			call_timeout: Duration::from_secs(30),
			reassembler: Mutex::new(Reassembler::new()),
			counter: Mutex::new(0),
		}
	}

	fn verify(&self, event: &RelayEvent) -> Result<HouseId> {
		let (house, keys) = self
			.houses
			.iter()
			.find(|(_, k)| k.verifying == event.author)
			.ok_or_else(|| DaemonError::BadSignature(event.id.clone()))?;
		let key = VerifyingKey::from_bytes(&keys.verifying)
			.map_err(|_| DaemonError::BadSignature(event.id.clone()))?;
		let signature = Signature::from_bytes(&event.signature);
		key.verify(&event.signing_bytes(), &signature)
			.map_err(|_| DaemonError::BadSignature(event.id.clone()))?;
		Ok(*house)
	}

	/// Verify, deduplicate, reassemble and decrypt one inbound event.
	/// `Ok(None)` means legitimately skipped (duplicate, or a fragment
	/// that did not complete a payload yet).
	async fn ingest(&self, game: GameId, event: RelayEvent) -> Result<Option<CommandEnvelope>> {
		if event.game != game {
			return Err(DaemonError::MalformedEvent(format!(
				"event {} for game {} arrived on game {}'s feed",
				event.id, event.game, game
			)));
		}
		if event.kind != RelayEventKind::CommandIn {
			return Ok(None);
		}
		let house = self.verify(&event)?;

		{
			let mut conn = self.db.conn().await?;
			let row = queries::game_row(&mut conn).await?;
			if event.turn != row.current_turn() {
				return Err(DaemonError::MalformedEvent(format!(
					"event {} targets turn {} but the game is at {}",
					event.id,
					event.turn,
					row.current_turn()
				)));
			}
			if !queries::insert_inbound(&mut conn, game, event.turn, "command", &event.id, "in").await? {
				return Err(DaemonError::DuplicateEvent(event.id));
			}
		}

		// chunked payloads arrive as JSON fragment records
		let armored = if let Ok(fragment) = serde_json::from_str::<Fragment>(&event.payload) {
			match self.reassembler.lock().feed(fragment)? {
				Some(whole) => whole,
				None => return Ok(None),
			}
		} else {
			event.payload.clone()
		};
		let keys = self.houses.get(&house).expect("verified above");
		let packet_blob: Vec<u8> = codec::decode(&armored, &keys.payload)?;
		Ok(Some(CommandEnvelope { event_id: event.id, game, house, turn: event.turn, packet_blob }))
	}

	fn next_event_id(&self, prefix: &str) -> String {
		let mut counter = self.counter.lock();
		*counter += 1;
		format!("{}-{}-{}", prefix, self.identity.verifying_key().to_bytes()[0], counter)
	}

	fn signed(
		&self,
		kind: RelayEventKind,
		game: GameId,
		turn: Turn,
		recipient: Option<String>,
		payload: String,
	) -> RelayEvent {
		use ed25519_dalek::Signer;
		let mut event = RelayEvent {
			id: self.next_event_id("ec4x"),
			kind,
			game,
			turn,
			author: self.identity.verifying_key().to_bytes(),
			recipient,
			payload,
			signature: [0u8; 64],
		};
		let signature = self.identity.sign(&event.signing_bytes());
		event.signature = signature.to_bytes();
		event
	}

	/// Publish with exponential backoff; exhausting the budget parks
	/// the event on disk for the next reload.
	async fn publish_with_retry(&self, event: RelayEvent) -> Result<()> {
		let mut delay = self.retry_base;
		for attempt in 0..=self.retry_budget {
			let send = self.client.publish(event.clone());
			let timeout = async {
				smol::Timer::after(self.call_timeout).await;
				Err(DaemonError::Transport("publish timed out".into()))
			};
			match smol::future::or(send, timeout).await {
				Ok(()) => return Ok(()),
				Err(err) if attempt == self.retry_budget => {
					log::warn!("publish of {} failed after {} attempts: {}", event.id, attempt + 1, err);
					self.park(&event)?;
					return Err(err);
				}
				Err(err) => {
					log::debug!("publish of {} failed (attempt {}): {}; backing off", event.id, attempt + 1, err);
					smol::Timer::after(delay).await;
					delay *= 2;
				}
			}
		}
		unreachable!("loop returns on success or final failure");
	}

	fn park(&self, event: &RelayEvent) -> Result<()> {
		fs::create_dir_all(&self.pending_dir)?;
		let path = self.pending_dir.join(format!("{}.json", event.id));
		fs::write(path, serde_json::to_vec(event)?)?;
		Ok(())
	}

	/// Re-publish everything parked by earlier failures.
	pub async fn retry_pending(&self) -> Result<usize> {
		if !self.pending_dir.exists() {
			return Ok(0);
		}
		let mut retried = 0;
		let mut paths: Vec<PathBuf> = fs::read_dir(&self.pending_dir)?
			.filter_map(|e| e.ok())
			.map(|e| e.path())
			.collect();
		paths.sort();
		for path in paths {
			let bytes = fs::read(&path)?;
			let event: RelayEvent = serde_json::from_slice(&bytes)?;
			if self.client.publish(event).await.is_ok() {
				fs::remove_file(&path)?;
				retried += 1;
			}
		}
		Ok(retried)
	}

	async fn publish_payload(
		&self,
		kind: RelayEventKind,
		game: GameId,
		turn: Turn,
		recipient: Option<String>,
		armored: String,
	) -> Result<()> {
		if armored.len() <= self.ceiling {
			return self.publish_with_retry(self.signed(kind, game, turn, recipient, armored)).await;
		}
		for fragment in codec::chunk(&armored, self.ceiling) {
			let payload = serde_json::to_string(&fragment)?;
			self.publish_with_retry(self.signed(kind, game, turn, recipient.clone(), payload)).await?;
		}
		Ok(())
	}
}

#[async_trait]
impl<C: RelayClient> Transport for RelayTransport<C> {
	async fn submit_command(&self, _game: GameId, _house: HouseId, _packet: Vec<u8>) -> Result<()> {
		// the daemon is never the submitting side on a relay; players
		// run their own client
		Err(DaemonError::Transport("relay submission happens in the player client".into()))
	}

	fn collect_commands(&self, game: GameId) -> BoxStream<'_, Result<CommandEnvelope>> {
		stream::once(async move {
			let events = self.client.fetch(game).await.map_err(|err| {
				log::warn!("relay fetch for game {} failed: {}", game, err);
				err
			})?;
			let mut envelopes = Vec::new();
			for event in events {
				let id = event.id.clone();
				match self.ingest(game, event).await {
					Ok(Some(envelope)) => envelopes.push(Ok(envelope)),
					Ok(None) => {}
					Err(DaemonError::DuplicateEvent(_)) => {
						log::debug!("duplicate relay event {} dropped", id);
					}
					Err(err) => {
						// auth failures are logged and dropped; nothing
						// reaches the player-visible stream
						log::warn!("rejecting relay event {}: {}", id, err);
					}
				}
			}
			Ok(stream::iter(envelopes))
		})
		.filter_map(|r: Result<_>| async move { r.ok() })
		.flatten()
		.boxed()
	}

	async fn publish_delta(&self, game: GameId, recipient: HouseId, payload: Vec<u8>) -> Result<()> {
		let armored = String::from_utf8(payload)
			.map_err(|_| DaemonError::Transport("delta payload must be armored text".into()))?;
		let turn = {
			let mut conn = self.db.conn().await?;
			queries::game_row(&mut conn).await?.current_turn()
		};
		self.publish_payload(
			RelayEventKind::DeltaOut,
			game,
			turn,
			Some(format!("house-{}", recipient.0)),
			armored,
		)
		.await
	}

	async fn publish_summary(&self, game: GameId, payload: Vec<u8>) -> Result<()> {
		let armored = String::from_utf8(payload)
			.map_err(|_| DaemonError::Transport("summary payload must be text".into()))?;
		let turn = {
			let mut conn = self.db.conn().await?;
			queries::game_row(&mut conn).await?.current_turn()
		};
		self.publish_payload(RelayEventKind::Summary, game, turn, None, armored).await
	}
}
