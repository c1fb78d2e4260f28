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

//! Daemon pipeline tests: packet in, turn committed, delta out; plus
//! the relay transport's verification and dedup behavior.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use ed25519_dalek::{Signer, SigningKey};
use futures::StreamExt;
use parking_lot::Mutex;
use smol::block_on;

use ec4x_core::{
	codec::{self, PayloadKey},
	command::{Command, CommandPacket, FleetOrder},
	entities::{House, Lane, StarSystem},
	fog::PlayerStateDelta,
	store::GameStore,
	types::*,
};
use ec4x_daemon::{
	actors::resolver,
	config::DaemonConfig,
	database::{queries, Database},
	setup,
	transport::{
		local::LocalTransport,
		relay::{HouseKeys, RelayClient, RelayEvent, RelayEventKind, RelayTransport},
		Transport,
	},
};

/// A two-house world with a lane between their home systems.
fn sample_store() -> (GameStore, HouseId, HouseId, FleetId, SystemId) {
	let mut store = GameStore::new(42);
	store.phase = GamePhase::Active;
	let a = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
	let b = store.houses.insert_with(|id| House::new(id, "Harkonnen", vec![]));
	let home_a = store.systems.insert_with(|id| StarSystem {
		id,
		name: "Caladan".into(),
		coords: (0, 0),
		planet_class: PlanetClass::Terran,
		resource_rating: ResourceRating::Average,
	});
	let home_b = store.systems.insert_with(|id| StarSystem {
		id,
		name: "Giedi Prime".into(),
		coords: (3, 0),
		planet_class: PlanetClass::Hostile,
		resource_rating: ResourceRating::Rich,
	});
	store.lanes.insert_with(|id| Lane { id, endpoints: (home_a, home_b), class: LaneClass::Minor });
	store.reindex();
	store.found_colony(home_a, a, 60, 1).unwrap();
	store.found_colony(home_b, b, 60, 1).unwrap();
	let fleet = store.create_fleet(a, home_a).unwrap();
	store.commission_squadron(fleet, ShipClass::Destroyer, 2, 1).unwrap();
	store.reindex();
	(store, a, b, fleet, home_b)
}

#[test]
fn packet_to_committed_turn_to_delta() {
	block_on(async {
		let tmp = tempfile::tempdir().unwrap();
		let config = DaemonConfig::with_data_dir(tmp.path());
		let (store, a, b, fleet, target) = sample_store();
		let slug = setup::create_game(&config, "Pipeline", &store).await.unwrap();
		let db = Database::open(&config.db_path(&slug)).await.unwrap();

		// a player submits a move order through the local transport
		let mut packet = CommandPacket::empty(42, 1, a);
		packet.fleet_orders.push(FleetOrder { fleet, command: Command::Move { to: target } });
		let transport = LocalTransport::new(config.game_dir(&slug));
		transport.submit_command(42, a, bincode::serialize(&packet).unwrap()).await.unwrap();

		// the daemon drains the inbox into the commands table
		let envelopes: Vec<_> = transport
			.collect_commands(42)
			.filter_map(|r| async move { r.ok() })
			.collect()
			.await;
		assert_eq!(envelopes.len(), 1);
		{
			let mut conn = db.conn().await.unwrap();
			queries::upsert_command(&mut conn, 42, a, 1, &envelopes[0].packet_blob).await.unwrap();
			queries::upsert_command(&mut conn, 42, b, 1, &bincode::serialize(&CommandPacket::empty(42, 1, b)).unwrap())
				.await
				.unwrap();
		}

		// resolve and commit turn 1
		let resolved =
			resolver::resolve_and_commit(db.clone(), ec4x_core::Rules::default(), 42, 30).await.unwrap();
		assert_eq!(resolved.resolved_turn, 1);
		assert_eq!(resolved.player_states.len(), 2);

		{
			let mut conn = db.conn().await.unwrap();
			let row = queries::game_row(&mut conn).await.unwrap();
			assert_eq!(row.current_turn(), 2, "the committed counter advanced");
			assert!(queries::pending_packets(&mut conn, 42, 1).await.unwrap().is_empty());
			let events = queries::events_for_turn(&mut conn, 42, 1).await.unwrap();
			assert!(events.iter().any(|e| e.kind == "fleet_arrived"));
		}

		// publish: one sealed delta per house lands in the outbox
		let keys: BTreeMap<HouseId, PayloadKey> = [a, b]
			.into_iter()
			.map(|h| (h, PayloadKey::derive(slug.as_bytes(), &h.0.to_le_bytes())))
			.collect();
		let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(config.game_dir(&slug)));
		resolver::publish_deltas(db.clone(), transport, keys.clone(), 42, &resolved).await.unwrap();

		let armored =
			std::fs::read_to_string(config.game_dir(&slug).join("outbox").join(format!("delta-house{}.pkt", a.0)))
				.unwrap();
		let delta: PlayerStateDelta = codec::decode(&armored, &keys[&a]).unwrap();
		assert_eq!(delta.turn, 1);
		assert_eq!(delta.house, a);
		// an initial delta carries the whole observable world
		assert!(!delta.fleets.added.is_empty());
		assert!(!delta.systems.added.is_empty());
	});
}

// ---- relay transport ---------------------------------------------------

#[derive(Default)]
struct MockRelay {
	inbound: Mutex<Vec<RelayEvent>>,
	published: Mutex<Vec<RelayEvent>>,
	fail_publishes: Mutex<u32>,
}

#[async_trait::async_trait]
impl RelayClient for MockRelay {
	async fn fetch(&self, _game: GameId) -> ec4x_daemon::Result<Vec<RelayEvent>> {
		Ok(self.inbound.lock().clone())
	}

	async fn publish(&self, event: RelayEvent) -> ec4x_daemon::Result<()> {
		let mut failures = self.fail_publishes.lock();
		if *failures > 0 {
			*failures -= 1;
			return Err(ec4x_daemon::DaemonError::Transport("relay unreachable".into()));
		}
		self.published.lock().push(event);
		Ok(())
	}
}

fn relay_fixture(
	tmp: &tempfile::TempDir,
	db: Database,
	signer: &SigningKey,
	house: HouseId,
	payload_key: PayloadKey,
) -> (Arc<MockRelay>, RelayTransport<Arc<MockRelay>>) {
	let client = Arc::new(MockRelay::default());
	let houses: BTreeMap<HouseId, HouseKeys> =
		[(house, HouseKeys { verifying: signer.verifying_key().to_bytes(), payload: payload_key })]
			.into_iter()
			.collect();
	let identity = SigningKey::from_bytes(&[7u8; 32]);
	let transport = RelayTransport::new(
		Arc::clone(&client),
		db,
		houses,
		identity,
		tmp.path().join("pending"),
		4096,
		1,
		Duration::from_millis(1),
	);
	(client, transport)
}

fn signed_command_event(
	signer: &SigningKey,
	id: &str,
	game: GameId,
	turn: Turn,
	payload: String,
) -> RelayEvent {
	let mut event = RelayEvent {
		id: id.to_string(),
		kind: RelayEventKind::CommandIn,
		game,
		turn,
		author: signer.verifying_key().to_bytes(),
		recipient: None,
		payload,
		signature: [0u8; 64],
	};
	event.signature = signer.sign(&event.signing_bytes()).to_bytes();
	event
}

async fn relay_db(tmp: &tempfile::TempDir, game: GameId) -> Database {
	let db = Database::open(&tmp.path().join("ec4x.db")).await.unwrap();
	let store = GameStore::new(game);
	db.insert(ec4x_daemon::database::NewGame {
		id: game,
		name: "Relay".into(),
		slug: "relay".into(),
		phase: GamePhase::Active,
		state_blob: store.snapshot().unwrap(),
		transport_config: serde_json::json!({}),
	})
	.await
	.unwrap();
	db
}

#[test]
fn relay_verifies_dedups_and_decrypts() {
	block_on(async {
		let tmp = tempfile::tempdir().unwrap();
		let game: GameId = 9;
		let db = relay_db(&tmp, game).await;
		let signer = SigningKey::from_bytes(&[3u8; 32]);
		let house = HouseId(1);
		let payload_key = PayloadKey::from_bytes([9u8; 32]);
		let (client, transport) = relay_fixture(&tmp, db, &signer, house, payload_key.clone());

		let packet_bytes: Vec<u8> = bincode::serialize(&CommandPacket::empty(game, 1, house)).unwrap();
		let armored =
			codec::encode(&packet_bytes, &payload_key, &mut ec4x_core::rng::phase_rng(9, 1, TurnPhase::Command))
				.unwrap();
		let good = signed_command_event(&signer, "ev-1", game, 1, armored.clone());

		// a forged copy under a different key must be dropped
		let forger = SigningKey::from_bytes(&[4u8; 32]);
		let forged = signed_command_event(&forger, "ev-2", game, 1, armored.clone());
		// a stale-turn event must be rejected
		let stale = signed_command_event(&signer, "ev-3", game, 7, armored.clone());

		client.inbound.lock().extend([good.clone(), forged, stale, good.clone()]);

		let collected: Vec<_> = transport
			.collect_commands(game)
			.filter_map(|r| async move { r.ok() })
			.collect()
			.await;
		// one envelope: verified once, duplicate dropped by the event log
		assert_eq!(collected.len(), 1);
		assert_eq!(collected[0].house, house);
		assert_eq!(collected[0].packet_blob, packet_bytes);
	});
}

#[test]
fn relay_publish_retries_then_parks() {
	block_on(async {
		let tmp = tempfile::tempdir().unwrap();
		let game: GameId = 9;
		let db = relay_db(&tmp, game).await;
		let signer = SigningKey::from_bytes(&[3u8; 32]);
		let house = HouseId(1);
		let (client, transport) = relay_fixture(&tmp, db, &signer, house, PayloadKey::from_bytes([9u8; 32]));

		// more failures than the retry budget: the payload parks on disk
		*client.fail_publishes.lock() = 10;
		let err = transport.publish_summary(game, b"{}".to_vec()).await;
		assert!(err.is_err());
		let parked: Vec<_> = std::fs::read_dir(tmp.path().join("pending")).unwrap().collect();
		assert_eq!(parked.len(), 1);

		// the relay comes back; reload retries the parked event
		*client.fail_publishes.lock() = 0;
		let retried = transport.retry_pending().await.unwrap();
		assert_eq!(retried, 1);
		assert_eq!(client.published.lock().len(), 1);
	});
}

#[test]
fn relay_chunks_oversized_payloads() {
	block_on(async {
		let tmp = tempfile::tempdir().unwrap();
		let game: GameId = 9;
		let db = relay_db(&tmp, game).await;
		let signer = SigningKey::from_bytes(&[3u8; 32]);
		let house = HouseId(1);
		let client = Arc::new(MockRelay::default());
		let houses: BTreeMap<HouseId, HouseKeys> = [(
			house,
			HouseKeys { verifying: signer.verifying_key().to_bytes(), payload: PayloadKey::from_bytes([9u8; 32]) },
		)]
		.into_iter()
		.collect();
		let transport = RelayTransport::new(
			Arc::clone(&client),
			db,
			houses,
			SigningKey::from_bytes(&[7u8; 32]),
			tmp.path().join("pending"),
			// a tiny ceiling forces fragmentation
			128,
			1,
			Duration::from_millis(1),
		);

		let payload = "x".repeat(1000).into_bytes();
		transport.publish_summary(game, payload).await.unwrap();
		let published = client.published.lock();
		assert!(published.len() > 1, "payload was fragmented");
	});
}
