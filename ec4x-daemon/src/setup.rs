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

//! Game creation and moderator-side lifecycle operations. Status events
//! are published only after the corresponding filesystem operation has
//! succeeded.

use ec4x_core::{store::GameStore, types::GamePhase};

use crate::{
	config::DaemonConfig,
	database::{queries, Database, NewGame},
	error::Result,
	games,
	transport::{local::LocalTransport, Transport},
};

/// Create the directory, database and public definition for a new game.
/// Returns the slug of the created directory.
pub async fn create_game(config: &DaemonConfig, name: &str, store: &GameStore) -> Result<String> {
	let slug = games::slugify(name);
	games::create_dirs(config, &slug)?;
	let db = Database::open(&config.db_path(&slug)).await?;
	db.insert(NewGame {
		id: store.game_id,
		name: name.to_string(),
		slug: slug.clone(),
		phase: store.phase,
		state_blob: store.snapshot()?,
		transport_config: serde_json::json!({ "kind": "local" }),
	})
	.await?;

	// public definition event, emitted once the game exists on disk
	let transport = LocalTransport::new(config.game_dir(&slug));
	let definition = serde_json::json!({
		"event": "game_definition",
		"game": store.game_id,
		"name": name,
		"slug": slug,
		"houses": store.houses.len(),
		"systems": store.systems.len(),
	});
	transport.publish_summary(store.game_id, serde_json::to_vec(&definition)?).await?;
	Ok(slug)
}

/// Flip a game's phase in its database.
pub async fn set_game_phase(config: &DaemonConfig, slug: &str, phase: GamePhase) -> Result<()> {
	let db = Database::open(&config.db_path(slug)).await?;
	let mut conn = db.conn().await?;
	let row = queries::game_row(&mut conn).await?;
	queries::set_phase(&mut conn, row.id as u64, phase).await?;
	Ok(())
}

/// Archive a game directory, then publish the `cancelled` status.
pub async fn cancel_game(config: &DaemonConfig, slug: &str) -> Result<()> {
	games::archive(config, slug)?;
	// the directory has moved; the status event goes out afterwards,
	// from the archived location
	let archived = config.archive_dir().join(slug);
	let transport = LocalTransport::new(&archived);
	let status = serde_json::json!({ "event": "status", "slug": slug, "status": "cancelled" });
	transport.publish_summary(0, serde_json::to_vec(&status)?).await?;
	Ok(())
}

/// Delete a game directory outright, then publish the `removed` status
/// to the daemon log (there is no directory left to write to).
pub async fn delete_game(config: &DaemonConfig, slug: &str) -> Result<()> {
	games::delete(config, slug)?;
	log::info!("game '{}' removed; status event: removed", slug);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ec4x_core::entities::House;
	use smol::block_on;

	fn sample_store() -> GameStore {
		let mut store = GameStore::new(42);
		store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		store.houses.insert_with(|id| House::new(id, "Harkonnen", vec![]));
		store.reindex();
		store
	}

	#[test]
	fn create_then_cancel_archives_the_directory() {
		block_on(async {
			let tmp = tempfile::tempdir().unwrap();
			let config = DaemonConfig::with_data_dir(tmp.path());
			let store = sample_store();

			let slug = create_game(&config, "The Long War", &store).await.unwrap();
			assert_eq!(slug, "the-long-war");
			assert!(config.db_path(&slug).exists());
			// definition event was published after creation
			assert!(config.game_dir(&slug).join("outbox").join("summary.json").exists());

			cancel_game(&config, &slug).await.unwrap();
			assert!(!config.game_dir(&slug).exists());
			assert!(config.archive_dir().join(&slug).join(games::DB_FILE).exists());
		});
	}

	#[test]
	fn delete_removes_everything() {
		block_on(async {
			let tmp = tempfile::tempdir().unwrap();
			let config = DaemonConfig::with_data_dir(tmp.path());
			let slug = create_game(&config, "Doomed", &sample_store()).await.unwrap();
			delete_game(&config, &slug).await.unwrap();
			assert!(!config.game_dir(&slug).exists());
		});
	}
}
