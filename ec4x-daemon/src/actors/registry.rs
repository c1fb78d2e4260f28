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

//! The per-game state machine. One actor owns the map of live games;
//! every message handler either updates that state or spawns an effect
//! task that reports back with another message. Turn resolution for a
//! given game is strictly serial; the `resolving` flag prevents
//! re-entry, and cross-game parallelism is bounded by configuration.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use xtra::prelude::*;

use ec4x_core::{
	codec::PayloadKey,
	command::CommandPacket,
	store::GameStore,
	types::{GameId, GamePhase, HouseId},
	Rules,
};

use super::{
	resolver, CommandReceived, DeltasPublished, Die, Drain, GameDiscovered, IsIdle, ResolveTurn, Tick,
	TransportError, TurnResolved,
};
use crate::{
	config::DaemonConfig,
	database::{queries, Database},
	error::Result,
	games,
	transport::{local::LocalTransport, CommandEnvelope, Transport},
};

struct GameHandle {
	slug: String,
	db: Database,
	transport: Arc<dyn Transport>,
	rules: Rules,
	living: Vec<HouseId>,
	payload_keys: BTreeMap<HouseId, PayloadKey>,
	deadline: Option<DateTime<Utc>>,
	resolving: bool,
	failures: u32,
	paused: bool,
}

pub struct GameRegistry {
	config: DaemonConfig,
	games: BTreeMap<GameId, GameHandle>,
	draining: bool,
}

impl GameRegistry {
	pub fn new(config: DaemonConfig) -> Self {
		Self { config, games: BTreeMap::new(), draining: false }
	}

	fn in_flight(&self) -> usize {
		self.games.values().filter(|g| g.resolving).count()
	}

	async fn discover_new_games(&mut self, ctx: &mut Context<Self>) {
		let slugs = match games::discover(&self.config) {
			Ok(slugs) => slugs,
			Err(err) => {
				log::error!("discovery scan failed: {}", err);
				return;
			}
		};
		for slug in slugs {
			if self.games.values().any(|g| g.slug == slug) {
				continue;
			}
			if let Some(address) = ctx.address().ok() {
				let _ = address.do_send(GameDiscovered(slug));
			}
		}
	}

	async fn open_game(&mut self, slug: &str) -> Result<()> {
		let db = Database::open(&self.config.db_path(slug)).await?;
		let (game_id, deadline, living, state_phase) = {
			let mut conn = db.conn().await?;
			let row = queries::game_row(&mut conn).await?;
			let store = GameStore::from_snapshot(&row.state_blob)?;
			let deadline = row.deadline.as_deref().and_then(parse_deadline);
			(row.id as GameId, deadline, store.living_houses(), row.game_phase())
		};
		// the payload keys here are derived from the game identity; a
		// production deployment injects real per-house keys from the
		// credential store
		let payload_keys = living
			.iter()
			.map(|house| (*house, PayloadKey::derive(slug.as_bytes(), &house.0.to_le_bytes())))
			.collect();
		let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(self.config.game_dir(slug)));
		self.games.insert(
			game_id,
			GameHandle {
				slug: slug.to_string(),
				db,
				transport,
				rules: Rules::default(),
				living,
				payload_keys,
				deadline,
				resolving: false,
				failures: 0,
				paused: state_phase == GamePhase::Paused,
			},
		);
		log::info!("game '{}' ({}) under management", slug, game_id);
		Ok(())
	}

	/// Drain a game's transport and route each packet through
	/// `CommandReceived`.
	async fn drain_transport(&mut self, game_id: GameId, ctx: &mut Context<Self>) {
		let Some(handle) = self.games.get(&game_id) else { return };
		if handle.paused {
			return;
		}
		let transport = Arc::clone(&handle.transport);
		let envelopes: Vec<CommandEnvelope> = transport
			.collect_commands(game_id)
			.filter_map(|r| async move {
				match r {
					Ok(envelope) => Some(envelope),
					Err(err) => {
						log::warn!("game {}: transport error while collecting: {}", game_id, err);
						None
					}
				}
			})
			.collect()
			.await;
		let Some(address) = ctx.address().ok() else { return };
		for envelope in envelopes {
			let _ = address.do_send(CommandReceived(game_id, envelope));
		}
	}

	/// Store one verified packet, deduplicated, superseding any earlier
	/// submission for the same `(house, turn)`.
	async fn ingest_command(&mut self, game_id: GameId, envelope: CommandEnvelope) -> Result<()> {
		let Some(handle) = self.games.get(&game_id) else {
			return Err(crate::error::DaemonError::UnknownGame(game_id));
		};
		let packet: CommandPacket = bincode::deserialize(&envelope.packet_blob)?;
		if packet.game != game_id || packet.house != envelope.house {
			log::warn!("game {}: packet/envelope mismatch from {}, dropped", game_id, envelope.house);
			return Ok(());
		}
		if !handle.living.contains(&packet.house) {
			log::warn!("game {}: packet from non-playing house {}, dropped", game_id, packet.house);
			return Ok(());
		}
		let mut conn = handle.db.conn().await?;
		let row = queries::game_row(&mut conn).await?;
		if packet.turn != row.current_turn() {
			log::debug!(
				"game {}: packet from {} for turn {} dropped (current {})",
				game_id,
				packet.house,
				packet.turn,
				row.current_turn()
			);
			return Ok(());
		}
		// transport-level ids already passed their own dedup where the
		// transport has one; this guards replays across restarts
		let dedup_id = format!("packet:{}", envelope.event_id);
		if !queries::insert_inbound(&mut conn, game_id, packet.turn, "command", &dedup_id, "in").await? {
			log::debug!("game {}: duplicate packet {} ignored", game_id, dedup_id);
			return Ok(());
		}
		queries::upsert_command(&mut conn, game_id, packet.house, packet.turn, &envelope.packet_blob).await?;
		log::info!("game {}: stored packet from {} for turn {}", game_id, packet.house, packet.turn);
		Ok(())
	}

	/// All living houses in, or deadline elapsed?
	async fn ready_to_resolve(&self, game_id: GameId) -> Result<bool> {
		let Some(handle) = self.games.get(&game_id) else { return Ok(false) };
		if handle.paused || handle.resolving || handle.living.is_empty() {
			return Ok(false);
		}
		let mut conn = handle.db.conn().await?;
		let row = queries::game_row(&mut conn).await?;
		if row.game_phase() != GamePhase::Active {
			return Ok(false);
		}
		let submitted = queries::submitted_houses(&mut conn, game_id, row.current_turn()).await?;
		let all_in = handle.living.iter().all(|h| submitted.contains(h));
		if all_in {
			return Ok(true);
		}
		if let Some(deadline) = handle.deadline {
			if Utc::now() >= deadline && !submitted.is_empty() {
				return Ok(true);
			}
		}
		Ok(false)
	}

	fn spawn_resolution(&mut self, game_id: GameId, ctx: &mut Context<Self>) {
		let Some(handle) = self.games.get_mut(&game_id) else { return };
		handle.resolving = true;
		let db = handle.db.clone();
		let rules = handle.rules.clone();
		let timeout = self.config.resolution_timeout_secs;
		let Some(address) = ctx.address().ok() else { return };
		smol::spawn(async move {
			let result = resolver::resolve_and_commit(db, rules, game_id, timeout).await;
			let _ = address.do_send(TurnResolved(game_id, result));
		})
		.detach();
	}

	fn spawn_publication(&mut self, game_id: GameId, resolved: resolver::ResolvedTurn, ctx: &mut Context<Self>) {
		let Some(handle) = self.games.get(&game_id) else { return };
		let db = handle.db.clone();
		let transport = Arc::clone(&handle.transport);
		let keys = handle.payload_keys.clone();
		let Some(address) = ctx.address().ok() else { return };
		smol::spawn(async move {
			match resolver::publish_deltas(db, transport, keys, game_id, &resolved).await {
				Ok(()) => {
					let _ = address.do_send(DeltasPublished(game_id));
				}
				Err(err) => {
					let _ = address.do_send(TransportError(game_id, err.to_string()));
				}
			}
		})
		.detach();
	}

	async fn pause_game(&mut self, game_id: GameId) {
		let Some(handle) = self.games.get_mut(&game_id) else { return };
		handle.paused = true;
		match handle.db.conn().await {
			Ok(mut conn) => {
				if let Err(err) = queries::set_phase(&mut conn, game_id, GamePhase::Paused).await {
					log::error!("game {}: failed to persist pause: {}", game_id, err);
				}
			}
			Err(err) => log::error!("game {}: no connection to persist pause: {}", game_id, err),
		}
		// moderator alert: this line is what operators grep for
		log::error!("game {} PAUSED after {} consecutive failed resolutions", game_id, handle.failures);
	}

	/// Refresh the living-house set and re-arm the deadline after a
	/// committed turn.
	fn after_commit(&mut self, game_id: GameId, resolved: &resolver::ResolvedTurn) {
		let Some(handle) = self.games.get_mut(&game_id) else { return };
		handle.failures = 0;
		handle.living = resolved.player_states.iter().map(|s| s.house).collect();
		if let Some(deadline) = handle.deadline {
			let interval = deadline.signed_duration_since(Utc::now());
			// re-arm one scan past now if the old deadline already passed
			handle.deadline = if interval.num_seconds() <= 0 {
				Some(Utc::now() + chrono::Duration::hours(24))
			} else {
				Some(deadline)
			};
		}
		if resolved.phase == GamePhase::Finished {
			log::info!("game {} finished; no further resolutions", game_id);
			handle.paused = true;
		}
	}
}

impl Actor for GameRegistry {}

#[async_trait::async_trait]
impl Handler<Tick> for GameRegistry {
	async fn handle(&mut self, _: Tick, ctx: &mut Context<Self>) {
		self.discover_new_games(ctx).await;
		let ids: Vec<GameId> = self.games.keys().copied().collect();
		for game_id in ids {
			self.drain_transport(game_id, ctx).await;
		}
		if self.draining {
			return;
		}
		let ids: Vec<GameId> = self.games.keys().copied().collect();
		for game_id in ids {
			if self.in_flight() >= self.config.max_concurrent_resolutions {
				break;
			}
			match self.ready_to_resolve(game_id).await {
				Ok(true) => {
					if let Some(address) = ctx.address().ok() {
						let _ = address.do_send(ResolveTurn(game_id));
					}
				}
				Ok(false) => {}
				Err(err) => log::error!("game {}: readiness check failed: {}", game_id, err),
			}
		}
	}
}

#[async_trait::async_trait]
impl Handler<GameDiscovered> for GameRegistry {
	async fn handle(&mut self, GameDiscovered(slug): GameDiscovered, _: &mut Context<Self>) {
		if let Err(err) = self.open_game(&slug).await {
			log::error!("failed to open discovered game '{}': {}", slug, err);
		}
	}
}

#[async_trait::async_trait]
impl Handler<CommandReceived> for GameRegistry {
	async fn handle(&mut self, CommandReceived(game_id, envelope): CommandReceived, _: &mut Context<Self>) {
		if let Err(err) = self.ingest_command(game_id, envelope).await {
			log::warn!("game {}: packet ingestion failed: {}", game_id, err);
		}
	}
}

#[async_trait::async_trait]
impl Handler<ResolveTurn> for GameRegistry {
	async fn handle(&mut self, ResolveTurn(game_id): ResolveTurn, ctx: &mut Context<Self>) {
		if self.draining {
			log::info!("game {}: resolution refused, daemon is draining", game_id);
			return;
		}
		let already = self.games.get(&game_id).map(|g| g.resolving || g.paused).unwrap_or(true);
		if already || self.in_flight() >= self.config.max_concurrent_resolutions {
			return;
		}
		self.spawn_resolution(game_id, ctx);
	}
}

#[async_trait::async_trait]
impl Handler<TurnResolved> for GameRegistry {
	async fn handle(&mut self, TurnResolved(game_id, result): TurnResolved, ctx: &mut Context<Self>) {
		if let Some(handle) = self.games.get_mut(&game_id) {
			handle.resolving = false;
		}
		match result {
			Ok(resolved) => {
				self.after_commit(game_id, &resolved);
				// deltas go out only now, after the commit
				self.spawn_publication(game_id, resolved, ctx);
			}
			Err(err) => {
				let invariant = matches!(
					&err,
					crate::error::DaemonError::Core(ec4x_core::CoreError::Invariant { .. })
				);
				let failures = {
					let Some(handle) = self.games.get_mut(&game_id) else { return };
					handle.failures += 1;
					handle.failures
				};
				log::error!("game {}: resolution failed ({} consecutive): {}", game_id, failures, err);
				// a broken invariant pauses at once; ordinary failures get
				// the full retry allowance
				if invariant || failures >= self.config.failure_limit {
					self.pause_game(game_id).await;
				}
			}
		}
	}
}

#[async_trait::async_trait]
impl Handler<DeltasPublished> for GameRegistry {
	async fn handle(&mut self, DeltasPublished(game_id): DeltasPublished, _: &mut Context<Self>) {
		log::info!("game {}: deltas published", game_id);
	}
}

#[async_trait::async_trait]
impl Handler<TransportError> for GameRegistry {
	async fn handle(&mut self, TransportError(game_id, reason): TransportError, _: &mut Context<Self>) {
		// payloads are parked on disk by the transport; the daemon keeps
		// working and a reload retries them
		log::warn!("game {}: transport failure: {}", game_id, reason);
	}
}

#[async_trait::async_trait]
impl Handler<Drain> for GameRegistry {
	async fn handle(&mut self, _: Drain, _: &mut Context<Self>) {
		self.draining = true;
	}
}

#[async_trait::async_trait]
impl Handler<IsIdle> for GameRegistry {
	async fn handle(&mut self, _: IsIdle, _: &mut Context<Self>) -> bool {
		self.in_flight() == 0
	}
}

#[async_trait::async_trait]
impl Handler<Die> for GameRegistry {
	async fn handle(&mut self, _: Die, ctx: &mut Context<Self>) {
		ctx.stop();
	}
}

fn parse_deadline(text: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.with_timezone(&Utc))
}
