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

//! IO for the per-game SQLite database. A turn commits in exactly one
//! transaction: snapshot blob, events, per-house snapshots, processed
//! flags, all or nothing.

pub mod models;
pub mod queries;

use std::path::Path;

use sqlx::{
	pool::PoolConnection,
	sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

use ec4x_core::{
	events::Event,
	types::{GameId, GamePhase, HouseId, Turn},
};

use crate::error::Result;

/// Run all the migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
	sqlx::migrate!("./migrations").run(pool).await?;
	Ok(())
}

#[derive(Clone)]
pub struct Database {
	/// single-writer pool onto one game's database file
	pool: SqlitePool,
}

pub type DbConn = PoolConnection<Sqlite>;
pub type DbReturn = Result<u64>;

impl Database {
	/// Open (creating if missing) and migrate a game database.
	pub async fn open(path: &Path) -> Result<Self> {
		let options = SqliteConnectOptions::new()
			.filename(path)
			.create_if_missing(true)
			.journal_mode(SqliteJournalMode::Wal);
		let pool = SqlitePoolOptions::new().max_connections(4).connect_with(options).await?;
		migrate(&pool).await?;
		Ok(Self { pool })
	}

	pub async fn conn(&self) -> Result<DbConn> {
		self.pool.acquire().await.map_err(Into::into)
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub async fn insert(&self, data: impl Insert) -> DbReturn {
		let mut conn = self.conn().await?;
		data.insert(&mut conn).await
	}

	/// Write one resolved turn atomically. Failure at any point rolls
	/// the whole transaction back, leaving the previous snapshot
	/// authoritative.
	pub async fn commit_turn(&self, commit: TurnCommit<'_>) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
            UPDATE games SET state_blob = ?1, turn = ?2, phase = ?3, updated_at = datetime('now')
            WHERE id = ?4
        "#,
		)
		.bind(commit.state_blob.as_slice())
		.bind(i64::from(commit.next_turn))
		.bind(commit.phase.as_str())
		.bind(commit.game_id as i64)
		.execute(&mut tx)
		.await?;

		for event in commit.events {
			sqlx::query(
				r#"
                INSERT INTO game_events (game_id, turn, kind, house, fleet, system, description, data_blob)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
			)
			.bind(commit.game_id as i64)
			.bind(i64::from(commit.resolved_turn))
			.bind(event.kind_str())
			.bind(event.house().map(|h| i64::from(h.0)))
			.bind(event.fleet().map(|f| i64::from(f.0)))
			.bind(event.system().map(|s| i64::from(s.0)))
			.bind(event.description())
			.bind(serde_json::to_vec(&event.data())?)
			.execute(&mut tx)
			.await?;
		}

		for (house, blob) in &commit.snapshots {
			sqlx::query(
				r#"
                INSERT INTO player_state_snapshots (game_id, house, turn, state_blob)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (game_id, house, turn) DO UPDATE SET state_blob = excluded.state_blob
            "#,
			)
			.bind(commit.game_id as i64)
			.bind(i64::from(house.0))
			.bind(i64::from(commit.resolved_turn))
			.bind(blob.as_slice())
			.execute(&mut tx)
			.await?;
		}

		sqlx::query("UPDATE commands SET processed = 1 WHERE game_id = ?1 AND turn = ?2")
			.bind(commit.game_id as i64)
			.bind(i64::from(commit.resolved_turn))
			.execute(&mut tx)
			.await?;

		tx.commit().await?;
		Ok(())
	}
}

/// Everything one resolved turn writes.
pub struct TurnCommit<'a> {
	pub game_id: GameId,
	/// The turn that was just resolved; events and snapshots key on it.
	pub resolved_turn: Turn,
	/// The counter value after resolution, stored in `games.turn`.
	pub next_turn: Turn,
	pub phase: GamePhase,
	pub state_blob: Vec<u8>,
	pub events: &'a [Event],
	pub snapshots: Vec<(HouseId, Vec<u8>)>,
}

#[async_trait::async_trait]
pub trait Insert: Send + Sized {
	async fn insert(self, conn: &mut DbConn) -> DbReturn;
}

/// The single `games` row written at creation time. The phase mirrors
/// the store being persisted.
#[derive(Debug, Clone)]
pub struct NewGame {
	pub id: GameId,
	pub name: String,
	pub slug: String,
	pub phase: GamePhase,
	pub state_blob: Vec<u8>,
	pub transport_config: serde_json::Value,
}

#[async_trait::async_trait]
impl Insert for NewGame {
	async fn insert(self, conn: &mut DbConn) -> DbReturn {
		log::debug!("creating games row for '{}'", self.slug);
		sqlx::query(
			r#"
            INSERT INTO games (id, name, slug, turn, phase, state_blob, transport_config)
            VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6)
        "#,
		)
		.bind(self.id as i64)
		.bind(&self.name)
		.bind(&self.slug)
		.bind(self.phase.as_str())
		.bind(self.state_blob.as_slice())
		.bind(self.transport_config.to_string())
		.execute(&mut **conn)
		.await
		.map(|d| d.rows_affected())
		.map_err(Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ec4x_core::{entities::House, store::GameStore};
	use smol::block_on;

	async fn fresh_db() -> (tempfile::TempDir, Database) {
		crate::initialize();
		let tmp = tempfile::tempdir().unwrap();
		let db = Database::open(&tmp.path().join("ec4x.db")).await.unwrap();
		(tmp, db)
	}

	fn sample_store() -> GameStore {
		let mut store = GameStore::new(7);
		store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		store.reindex();
		store
	}

	#[test]
	fn create_and_reload_game_row() {
		block_on(async {
			let (_tmp, db) = fresh_db().await;
			let store = sample_store();
			db.insert(NewGame {
				id: 7,
				name: "Test Game".into(),
				slug: "test-game".into(),
				phase: GamePhase::Setup,
				state_blob: store.snapshot().unwrap(),
				transport_config: serde_json::json!({"kind": "local"}),
			})
			.await
			.unwrap();

			let mut conn = db.conn().await.unwrap();
			let row = queries::game_row(&mut conn).await.unwrap();
			assert_eq!(row.slug, "test-game");
			assert_eq!(row.turn, 1);
			let restored = GameStore::from_snapshot(&row.state_blob).unwrap();
			assert_eq!(restored, store);
		});
	}

	#[test]
	fn commit_turn_is_atomic_and_flips_processed() {
		block_on(async {
			let (_tmp, db) = fresh_db().await;
			let store = sample_store();
			db.insert(NewGame {
				id: 7,
				name: "Test Game".into(),
				slug: "test-game".into(),
				phase: GamePhase::Setup,
				state_blob: store.snapshot().unwrap(),
				transport_config: serde_json::json!({}),
			})
			.await
			.unwrap();

			let mut conn = db.conn().await.unwrap();
			assert!(queries::upsert_command(&mut conn, 7, ec4x_core::types::HouseId(1), 1, b"packet").await.unwrap());

			let events =
				vec![Event::PrestigeAwarded { house: ec4x_core::types::HouseId(1), amount: 2 }];
			db.commit_turn(TurnCommit {
				game_id: 7,
				resolved_turn: 1,
				next_turn: 2,
				phase: GamePhase::Active,
				state_blob: store.snapshot().unwrap(),
				events: &events,
				snapshots: vec![(ec4x_core::types::HouseId(1), vec![1, 2, 3])],
			})
			.await
			.unwrap();

			let row = queries::game_row(&mut conn).await.unwrap();
			assert_eq!(row.turn, 2);
			assert_eq!(queries::pending_packets(&mut conn, 7, 1).await.unwrap().len(), 0);
			let snap = queries::snapshot_at(&mut conn, 7, ec4x_core::types::HouseId(1), 1).await.unwrap();
			assert_eq!(snap.unwrap(), vec![1, 2, 3]);
			let stored = queries::events_for_turn(&mut conn, 7, 1).await.unwrap();
			assert_eq!(stored.len(), 1);
			assert_eq!(stored[0].kind, "prestige_awarded");
		});
	}

	#[test]
	fn replayed_packet_supersedes_until_processed() {
		block_on(async {
			let (_tmp, db) = fresh_db().await;
			let mut conn = db.conn().await.unwrap();
			let house = ec4x_core::types::HouseId(2);
			assert!(queries::upsert_command(&mut conn, 7, house, 3, b"first").await.unwrap());
			assert!(queries::upsert_command(&mut conn, 7, house, 3, b"second").await.unwrap());

			let pending = queries::pending_packets(&mut conn, 7, 3).await.unwrap();
			assert_eq!(pending.len(), 1);
			assert_eq!(pending[0].packet_blob, b"second");
		});
	}

	#[test]
	fn inbound_event_log_deduplicates() {
		block_on(async {
			let (_tmp, db) = fresh_db().await;
			let mut conn = db.conn().await.unwrap();
			assert!(queries::insert_inbound(&mut conn, 7, 1, "command", "ev-1", "in").await.unwrap());
			assert!(!queries::insert_inbound(&mut conn, 7, 1, "command", "ev-1", "in").await.unwrap());
			assert!(queries::insert_inbound(&mut conn, 7, 1, "command", "ev-2", "in").await.unwrap());
		});
	}
}
