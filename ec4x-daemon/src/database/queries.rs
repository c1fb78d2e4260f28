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

//! Common SQL queries on a game database abstracted into rust functions.

use ec4x_core::types::{GameId, GamePhase, HouseId, Turn};

use super::{
	models::{CommandRow, EventRow, GameRow},
	DbConn,
};
use crate::error::Result;

/// The one row of the `games` table.
pub async fn game_row(conn: &mut DbConn) -> Result<GameRow> {
	sqlx::query_as::<_, GameRow>("SELECT * FROM games LIMIT 1")
		.fetch_one(&mut **conn)
		.await
		.map_err(Into::into)
}

pub async fn set_phase(conn: &mut DbConn, game: GameId, phase: GamePhase) -> Result<()> {
	sqlx::query("UPDATE games SET phase = ?1, updated_at = datetime('now') WHERE id = ?2")
		.bind(phase.as_str())
		.bind(game as i64)
		.execute(&mut **conn)
		.await?;
	Ok(())
}

pub async fn set_deadline(conn: &mut DbConn, game: GameId, deadline: Option<&str>) -> Result<()> {
	sqlx::query("UPDATE games SET deadline = ?1, updated_at = datetime('now') WHERE id = ?2")
		.bind(deadline)
		.bind(game as i64)
		.execute(&mut **conn)
		.await?;
	Ok(())
}

/// Store (or supersede) a house's packet for a turn. A replay of the
/// same `(game, house, turn)` triple replaces the previous packet until
/// the turn is resolved; afterwards it is dropped. Returns whether the
/// row changed.
pub async fn upsert_command(
	conn: &mut DbConn,
	game: GameId,
	house: HouseId,
	turn: Turn,
	packet: &[u8],
) -> Result<bool> {
	let done = sqlx::query(
		r#"
        INSERT INTO commands (game_id, house, turn, packet_blob)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (game_id, house, turn) DO UPDATE SET
            packet_blob = excluded.packet_blob,
            submitted_at = datetime('now')
        WHERE commands.processed = 0
    "#,
	)
	.bind(game as i64)
	.bind(i64::from(house.0))
	.bind(i64::from(turn))
	.bind(packet)
	.execute(&mut **conn)
	.await?;
	Ok(done.rows_affected() > 0)
}

/// Unprocessed packets for one turn, in house order.
pub async fn pending_packets(conn: &mut DbConn, game: GameId, turn: Turn) -> Result<Vec<CommandRow>> {
	sqlx::query_as::<_, CommandRow>(
		"SELECT * FROM commands WHERE game_id = ?1 AND turn = ?2 AND processed = 0 ORDER BY house",
	)
	.bind(game as i64)
	.bind(i64::from(turn))
	.fetch_all(&mut **conn)
	.await
	.map_err(Into::into)
}

/// Houses that have an unprocessed packet in for the turn.
pub async fn submitted_houses(conn: &mut DbConn, game: GameId, turn: Turn) -> Result<Vec<HouseId>> {
	#[derive(sqlx::FromRow)]
	struct Row {
		house: i64,
	}
	let rows = sqlx::query_as::<_, Row>(
		"SELECT house FROM commands WHERE game_id = ?1 AND turn = ?2 AND processed = 0 ORDER BY house",
	)
	.bind(game as i64)
	.bind(i64::from(turn))
	.fetch_all(&mut **conn)
	.await?;
	Ok(rows.into_iter().map(|r| HouseId(r.house.max(0) as u32)).collect())
}

/// Record a transport event id; false means it was already seen and the
/// event must be dropped.
pub async fn insert_inbound(
	conn: &mut DbConn,
	game: GameId,
	turn: Turn,
	kind: &str,
	event_id: &str,
	direction: &str,
) -> Result<bool> {
	let done = sqlx::query(
		r#"
        INSERT OR IGNORE INTO inbound_event_log (game_id, turn, kind, event_id, direction)
        VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
	)
	.bind(game as i64)
	.bind(i64::from(turn))
	.bind(kind)
	.bind(event_id)
	.bind(direction)
	.execute(&mut **conn)
	.await?;
	Ok(done.rows_affected() > 0)
}

/// A house's fog-of-war snapshot at an exact turn.
pub async fn snapshot_at(conn: &mut DbConn, game: GameId, house: HouseId, turn: Turn) -> Result<Option<Vec<u8>>> {
	#[derive(sqlx::FromRow)]
	struct Row {
		state_blob: Vec<u8>,
	}
	let row = sqlx::query_as::<_, Row>(
		"SELECT state_blob FROM player_state_snapshots WHERE game_id = ?1 AND house = ?2 AND turn = ?3",
	)
	.bind(game as i64)
	.bind(i64::from(house.0))
	.bind(i64::from(turn))
	.fetch_optional(&mut **conn)
	.await?;
	Ok(row.map(|r| r.state_blob))
}

/// The most recent snapshot for a house at or before `turn`.
pub async fn latest_snapshot_before(
	conn: &mut DbConn,
	game: GameId,
	house: HouseId,
	turn: Turn,
) -> Result<Option<(Turn, Vec<u8>)>> {
	#[derive(sqlx::FromRow)]
	struct Row {
		turn: i64,
		state_blob: Vec<u8>,
	}
	let row = sqlx::query_as::<_, Row>(
		r#"
        SELECT turn, state_blob FROM player_state_snapshots
        WHERE game_id = ?1 AND house = ?2 AND turn <= ?3
        ORDER BY turn DESC LIMIT 1
    "#,
	)
	.bind(game as i64)
	.bind(i64::from(house.0))
	.bind(i64::from(turn))
	.fetch_optional(&mut **conn)
	.await?;
	Ok(row.map(|r| (r.turn.max(0) as Turn, r.state_blob)))
}

pub async fn events_for_turn(conn: &mut DbConn, game: GameId, turn: Turn) -> Result<Vec<EventRow>> {
	sqlx::query_as::<_, EventRow>(
		"SELECT * FROM game_events WHERE game_id = ?1 AND turn = ?2 ORDER BY id",
	)
	.bind(game as i64)
	.bind(i64::from(turn))
	.fetch_all(&mut **conn)
	.await
	.map_err(Into::into)
}

/// Aggregate counts for the moderator's `stats` subcommand.
pub struct GameStats {
	pub turn: Turn,
	pub phase: GamePhase,
	pub event_count: i64,
	pub command_count: i64,
	pub snapshot_count: i64,
}

pub async fn stats(conn: &mut DbConn) -> Result<GameStats> {
	#[derive(sqlx::FromRow)]
	struct Count {
		n: i64,
	}
	let row = game_row(conn).await?;
	let events = sqlx::query_as::<_, Count>("SELECT COUNT(*) AS n FROM game_events")
		.fetch_one(&mut **conn)
		.await?;
	let commands = sqlx::query_as::<_, Count>("SELECT COUNT(*) AS n FROM commands")
		.fetch_one(&mut **conn)
		.await?;
	let snapshots = sqlx::query_as::<_, Count>("SELECT COUNT(*) AS n FROM player_state_snapshots")
		.fetch_one(&mut **conn)
		.await?;
	Ok(GameStats {
		turn: row.current_turn(),
		phase: row.game_phase(),
		event_count: events.n,
		command_count: commands.n,
		snapshot_count: snapshots.n,
	})
}
