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

//! One turn resolution, end to end: load the snapshot, run the engine
//! on a blocking worker under the wall-clock ceiling, commit the
//! transaction, and afterwards diff and publish the per-house deltas.
//! The engine itself never suspends; everything async lives here.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use rand::rngs::OsRng;

use ec4x_core::{
	codec::{self, PayloadKey},
	command::CommandPacket,
	fog::{self, PlayerState},
	store::GameStore,
	types::{GameId, GamePhase, HouseId, Turn},
	Rules, TurnEngine,
};

use crate::{
	database::{queries, Database, TurnCommit},
	error::{DaemonError, Result},
	transport::Transport,
};

/// What a successful resolution hands back to the registry. The commit
/// has already happened by the time this exists.
pub struct ResolvedTurn {
	pub resolved_turn: Turn,
	pub phase: GamePhase,
	pub player_states: Vec<PlayerState>,
}

/// Load, resolve under the timeout, and commit. Any failure before the
/// commit leaves the previous snapshot authoritative.
pub async fn resolve_and_commit(
	db: Database,
	rules: Rules,
	game_id: GameId,
	timeout_secs: u64,
) -> Result<ResolvedTurn> {
	let (row, packet_rows) = {
		let mut conn = db.conn().await?;
		let row = queries::game_row(&mut conn).await?;
		let packets = queries::pending_packets(&mut conn, game_id, row.current_turn()).await?;
		(row, packets)
	};
	if row.game_phase() != GamePhase::Active {
		return Err(DaemonError::NotAccepting(game_id));
	}
	let resolved_turn = row.current_turn();
	let store = GameStore::from_snapshot(&row.state_blob)?;

	let mut packets: Vec<CommandPacket> = Vec::with_capacity(packet_rows.len());
	for packet_row in &packet_rows {
		match bincode::deserialize::<CommandPacket>(&packet_row.packet_blob) {
			Ok(packet) if packet.turn == resolved_turn => packets.push(packet),
			Ok(packet) => {
				log::warn!(
					"game {}: dropping stale packet from {} (turn {} != {})",
					game_id,
					packet.house,
					packet.turn,
					resolved_turn
				);
			}
			Err(err) => {
				log::warn!("game {}: undecodable packet from house {}: {}", game_id, packet_row.house, err);
			}
		}
	}

	// CPU-bound and synchronous: run it on a blocking worker, bounded
	// by the wall clock
	let work = smol::unblock(move || TurnEngine::new(&rules).resolve(store, &packets));
	let timeout = async {
		smol::Timer::after(Duration::from_secs(timeout_secs)).await;
		Err(DaemonError::ResolutionTimeout(timeout_secs))
	};
	let outcome = smol::future::or(async { work.await.map_err(DaemonError::from) }, timeout).await?;

	let mut snapshots = Vec::with_capacity(outcome.player_states.len());
	for state in &outcome.player_states {
		snapshots.push((state.house, bincode::serialize(state)?));
	}
	db.commit_turn(TurnCommit {
		game_id,
		resolved_turn,
		next_turn: outcome.store.turn,
		phase: outcome.store.phase,
		state_blob: outcome.store.snapshot()?,
		events: &outcome.events,
		snapshots,
	})
	.await?;

	log::info!(
		"game {}: turn {} committed ({} events, {} snapshots)",
		game_id,
		resolved_turn,
		outcome.events.len(),
		outcome.player_states.len()
	);
	Ok(ResolvedTurn { resolved_turn, phase: outcome.store.phase, player_states: outcome.player_states })
}

/// After the commit: diff each house's snapshot against its previous
/// one, seal, and hand to the transport. Publication order across
/// recipients is unspecified; here it is house order.
pub async fn publish_deltas(
	db: Database,
	transport: Arc<dyn Transport>,
	keys: BTreeMap<HouseId, PayloadKey>,
	game_id: GameId,
	resolved: &ResolvedTurn,
) -> Result<()> {
	for state in &resolved.player_states {
		let prev = {
			let mut conn = db.conn().await?;
			match queries::latest_snapshot_before(&mut conn, game_id, state.house, resolved.resolved_turn.saturating_sub(1)).await? {
				Some((_, blob)) => Some(bincode::deserialize::<PlayerState>(&blob)?),
				None => None,
			}
		};
		let delta = fog::diff(prev.as_ref(), state);
		let Some(key) = keys.get(&state.house) else {
			log::warn!("game {}: no payload key for {}, delta withheld", game_id, state.house);
			continue;
		};
		let armored = codec::encode(&delta, key, &mut OsRng)?;
		transport.publish_delta(game_id, state.house, armored.into_bytes()).await?;
	}

	let summary = serde_json::json!({
		"game": game_id,
		"turn": resolved.resolved_turn,
		"phase": resolved.phase.as_str(),
	});
	transport.publish_summary(game_id, serde_json::to_vec(&summary)?).await?;
	Ok(())
}
