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

//! End-to-end turn scenarios, exercising the whole pipeline across
//! multiple resolved turns.

use ec4x_core::{
	codec,
	command::{Command, CommandPacket, FleetOrder, StandingOrder},
	entities::{Cargo, Facility, House, Lane, StarSystem},
	events::Event,
	fog,
	rng::phase_rng,
	store::GameStore,
	types::*,
	Rules, TurnEngine,
};

struct World {
	store: GameStore,
	rules: Rules,
	events: Vec<Event>,
}

impl World {
	fn new(rules: Rules) -> Self {
		let mut store = GameStore::new(1);
		store.phase = GamePhase::Active;
		Self { store, rules, events: Vec::new() }
	}

	fn add_house(&mut self, name: &str) -> HouseId {
		self.store.houses.insert_with(|id| House::new(id, name, vec![]))
	}

	fn add_system(&mut self, name: &str, class: PlanetClass, rating: ResourceRating) -> SystemId {
		self.store.systems.insert_with(|id| StarSystem {
			id,
			name: name.into(),
			coords: (id.0 as i32, 0),
			planet_class: class,
			resource_rating: rating,
		})
	}

	fn link(&mut self, a: SystemId, b: SystemId, class: LaneClass) {
		self.store.lanes.insert_with(|id| Lane { id, endpoints: (a, b), class });
		self.store.reindex();
	}

	fn hostile(&mut self, a: HouseId, b: HouseId) {
		self.store.houses.get_mut(a).unwrap().relations.insert(b, DiplomaticState::Hostile);
		self.store.houses.get_mut(b).unwrap().relations.insert(a, DiplomaticState::Hostile);
	}

	fn combat_fleet(&mut self, owner: HouseId, at: SystemId, class: ShipClass, count: u32) -> FleetId {
		let fleet = self.store.create_fleet(owner, at).unwrap();
		self.store.commission_squadron(fleet, class, count, 1).unwrap();
		fleet
	}

	fn expansion_fleet(&mut self, owner: HouseId, at: SystemId) -> FleetId {
		let fleet = self.combat_fleet(owner, at, ShipClass::Destroyer, 2);
		let etac = self.store.attach_auxiliary(fleet, ShipClass::Etac, 1).unwrap();
		self.store.ships.get_mut(etac).unwrap().cargo = Some(Cargo::Colonists(50));
		self.store.reindex();
		fleet
	}

	fn resolve(&mut self, packets: &[CommandPacket]) {
		let engine = TurnEngine::new(&self.rules);
		let outcome = engine.resolve(self.store.clone(), packets).expect("turn resolves");
		self.store = outcome.store;
		self.events.extend(outcome.events);
	}

	fn order(&self, house: HouseId, fleet: FleetId, command: Command) -> CommandPacket {
		let mut packet = CommandPacket::empty(self.store.game_id, self.store.turn, house);
		packet.fleet_orders.push(FleetOrder { fleet, command });
		packet
	}

	fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
		self.events.iter().filter(|e| pred(e)).count()
	}
}

/// Scenario: colonize an empty system, then suffer a blockade.
#[test]
fn colonize_then_blockade() {
	let mut world = World::new(Rules::default());
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	world.hostile(a, b);
	let home_a = world.add_system("Caladan", PlanetClass::Terran, ResourceRating::Average);
	let s = world.add_system("Arrakis", PlanetClass::Arid, ResourceRating::VeryRich);
	let home_b = world.add_system("Giedi Prime", PlanetClass::Hostile, ResourceRating::Rich);
	world.link(home_a, s, LaneClass::Minor);
	world.link(home_b, s, LaneClass::Minor);
	world.store.found_colony(home_a, a, 100, 1).unwrap();
	world.store.found_colony(home_b, b, 100, 1).unwrap();
	let settlers = world.expansion_fleet(a, home_a);
	let raiders = world.combat_fleet(b, home_b, ShipClass::Cruiser, 3);

	// turn 1: the expansion fleet ships out and arrives
	let packet = world.order(a, settlers, Command::Colonize { system: s });
	world.resolve(&[packet]);
	assert_eq!(world.count(|e| matches!(e, Event::FleetArrived { fleet, .. } if *fleet == settlers)), 1);

	// turn 2, Conflict step 5: colony founded, ETAC consumed, 3 IU
	world.resolve(&[]);
	let colony = world.store.indices().colony_at(s).expect("colony exists");
	assert_eq!(world.store.colonies.get(colony).unwrap().industrial_units, 3);
	assert_eq!(world.store.colonies.get(colony).unwrap().owner, a);
	assert!(
		!world.store.ships.values().any(|ship| ship.class == ShipClass::Etac),
		"the ETAC was consumed"
	);

	// turn 3: the blockade fleet moves in; the settlers head home
	let blockade = world.order(b, raiders, Command::Blockade { colony_system: s });
	let withdraw = world.order(a, settlers, Command::Move { to: home_a });
	world.resolve(&[blockade, withdraw]);

	// turn 4, Conflict step 3 and Income step 4
	world.resolve(&[]);
	assert_eq!(
		world.count(|e| matches!(e, Event::BlockadeEstablished { colony: c, .. } if *c == colony)),
		1,
		"blockade established exactly once"
	);
	assert!(world.store.colonies.get(colony).unwrap().blockaded);
}

/// Scenario: ten capital squadrons against a capacity of eight.
#[test]
fn capital_capacity_breach() {
	let mut world = World::new(Rules::default());
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	let home = world.add_system("Caladan", PlanetClass::Terran, ResourceRating::Average);
	let far = world.add_system("Giedi Prime", PlanetClass::Hostile, ResourceRating::Rich);
	world.store.reindex();
	world.store.found_colony(far, b, 50, 1).unwrap();
	world.store.found_colony(home, a, 350, 1).unwrap();
	let fleet = world.store.create_fleet(a, home).unwrap();
	for _ in 0..10 {
		world.store.commission_squadron(fleet, ShipClass::Battleship, 1, 1).unwrap();
	}
	world.store.reindex();

	world.resolve(&[]);
	assert_eq!(world.count(|e| matches!(e, Event::CapitalShipSeized { .. })), 2);
	let remaining = world
		.store
		.squadrons
		.values()
		.filter(|sq| sq.owner == a)
		.count();
	assert_eq!(remaining, 8);
	// the seizure refunds half the battleship's production cost, twice
	let refund: i64 = world
		.events
		.iter()
		.filter_map(|e| match e {
			Event::CapitalShipSeized { refund, .. } => Some(*refund),
			_ => None,
		})
		.sum();
	let cost = i64::from(world.rules.ship(ShipClass::Battleship).build_cost);
	assert_eq!(refund, 2 * (cost / 2));
}

/// Scenario: a lone scout walks into a system watched by a far better
/// sensor net. First detection runs before mission registration.
#[test]
fn spy_first_turn_detection() {
	let mut rules = Rules::default();
	// pin the detection table so the outcome is not at the mercy of a
	// particular seed
	rules.combat.detection_percent = [100; 11];
	let mut world = World::new(rules);
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	world.hostile(a, b);
	let home_a = world.add_system("Caladan", PlanetClass::Terran, ResourceRating::Average);
	let lair = world.add_system("Giedi Prime", PlanetClass::Hostile, ResourceRating::Rich);
	world.link(home_a, lair, LaneClass::Minor);
	world.store.found_colony(home_a, a, 50, 1).unwrap();
	let colony_b = world.store.found_colony(lair, b, 80, 1).unwrap();
	world.store.facilities.insert_with(|id| Facility {
		id,
		owner: b,
		colony: colony_b,
		kind: FacilityKind::Starbase,
		state: CombatState::Undamaged,
	});
	world.store.houses.get_mut(b).unwrap().tech.fields.insert(TechField::Electronics, 5);
	world.store.reindex();
	let scouts = world.combat_fleet(a, home_a, ShipClass::Scout, 1);

	let packet = world.order(a, scouts, Command::SpyPlanet { system: lair });
	world.resolve(&[packet]); // travel and arrival
	world.resolve(&[]); // conflict: detection before registration

	assert_eq!(world.count(|e| matches!(e, Event::ScoutDetected { fleet, .. } if *fleet == scouts)), 1);
	assert!(!world.store.fleets.contains(scouts), "the scout died on arrival");
	assert!(world.store.spy_missions.is_empty(), "no mission was registered");
	let intel = &world.store.houses.get(a).unwrap().intel;
	assert!(
		!intel.systems.contains_key(&lair),
		"no intelligence entry for the target appears in the attacker's database"
	);
}

/// Scenario: two expansion fleets, equal escorts, same empty system,
/// same turn. The lower fleet id wins; the loser's ETAC burns too.
#[test]
fn simultaneous_colonization_tie_break() {
	let mut world = World::new(Rules::default());
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	// neutral parties race without shooting
	let home_a = world.add_system("Caladan", PlanetClass::Terran, ResourceRating::Average);
	let s = world.add_system("Arrakis", PlanetClass::Arid, ResourceRating::VeryRich);
	let home_b = world.add_system("Giedi Prime", PlanetClass::Hostile, ResourceRating::Rich);
	world.link(home_a, s, LaneClass::Minor);
	world.link(home_b, s, LaneClass::Minor);
	world.store.found_colony(home_a, a, 60, 1).unwrap();
	world.store.found_colony(home_b, b, 60, 1).unwrap();
	let first = world.expansion_fleet(a, home_a);
	let second = world.expansion_fleet(b, home_b);
	assert!(first < second);

	let race_a = world.order(a, first, Command::Colonize { system: s });
	let race_b = world.order(b, second, Command::Colonize { system: s });
	world.resolve(&[race_a, race_b]); // both arrive
	world.resolve(&[]); // conflict: the tie breaks

	let colony = world.store.indices().colony_at(s).expect("someone planted a flag");
	assert_eq!(world.store.colonies.get(colony).unwrap().owner, a, "lower fleet id wins the tie");
	assert_eq!(
		world.count(|e| matches!(e, Event::ColonizationContested { winner, .. } if *winner == a)),
		1
	);
	assert!(
		!world.store.ships.values().any(|ship| ship.class == ShipClass::Etac),
		"the loser's ETAC was consumed without effect"
	);
}

/// Scenario: a crippled cruiser limps home under an AutoRepair standing
/// order and comes out whole.
#[test]
fn crippled_repair_path() {
	let mut world = World::new(Rules::default());
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	let home = world.add_system("Caladan", PlanetClass::Terran, ResourceRating::Average);
	let frontier = world.add_system("Arrakis", PlanetClass::Arid, ResourceRating::Average);
	let elsewhere = world.add_system("Giedi Prime", PlanetClass::Hostile, ResourceRating::Rich);
	world.link(home, frontier, LaneClass::Minor);
	world.store.found_colony(elsewhere, b, 50, 1).unwrap();
	let colony = world.store.found_colony(home, a, 200, 1).unwrap();
	world.store.facilities.insert_with(|id| Facility {
		id,
		owner: a,
		colony,
		kind: FacilityKind::Shipyard,
		state: CombatState::Undamaged,
	});
	world.store.colonies.get_mut(colony).unwrap().stockpile = 500;
	world.store.reindex();
	let fleet = world.combat_fleet(a, frontier, ShipClass::Cruiser, 1);
	let cruiser = world.store.squadrons.values().find(|sq| sq.fleet == fleet).unwrap().members[0];
	world.store.ships.get_mut(cruiser).unwrap().state = CombatState::Crippled;
	world.store.fleets.get_mut(fleet).unwrap().standing = Some(StandingOrder::AutoRepair);
	world.store.reindex();

	// turn 1, Production step 1: the standing order generates a Move to
	// the nearest friendly shipyard; one minor hop gets it home
	world.resolve(&[]);
	assert_eq!(world.store.fleets.get(fleet).unwrap().location, home);
	assert_eq!(world.count(|e| matches!(e, Event::FleetArrived { fleet: f, .. } if *f == fleet)), 1);

	// turn 2, Command step 3: the repair queues; Production: it finishes
	world.resolve(&[]);
	assert_eq!(world.count(|e| matches!(e, Event::RepairCompleted { .. })), 1);
	assert_eq!(world.store.ships.get(cruiser).unwrap().state, CombatState::Undamaged);
}

/// Scenario: a quiet backwater produces an (almost) empty delta whose
/// encoded form stays tiny.
#[test]
fn delta_minimality() {
	let mut world = World::new(Rules::default());
	let a = world.add_house("Atreides");
	let b = world.add_house("Harkonnen");
	// zero-output colonies so not a single coin moves
	let home_a = world.add_system("Hole", PlanetClass::Barren, ResourceRating::VeryPoor);
	let home_b = world.add_system("Void", PlanetClass::Barren, ResourceRating::VeryPoor);
	world.store.reindex();
	world.store.found_colony(home_a, a, 1, 1).unwrap();
	world.store.found_colony(home_b, b, 1, 1).unwrap();
	world.store.reindex();

	let engine = TurnEngine::new(&world.rules);
	let first = engine.resolve(world.store.clone(), &[]).unwrap();
	let prev = first.player_states.iter().find(|s| s.house == a).unwrap().clone();
	let second = engine.resolve(first.store, &[]).unwrap();
	let next = second.player_states.iter().find(|s| s.house == a).unwrap();

	let delta = fog::diff(Some(&prev), next);
	assert!(delta.colonies.is_empty());
	assert!(delta.fleets.is_empty());
	assert!(delta.ships.is_empty());
	assert!(delta.intel.is_empty());
	assert!(delta.houses.is_none());
	assert!(delta.act.is_none());

	let key = codec::PayloadKey::derive(b"secret", b"house-a");
	let mut rng = phase_rng(1, next.turn, TurnPhase::Production);
	let encoded = codec::encode(&delta, &key, &mut rng).unwrap();
	assert!(encoded.len() < 2048, "near-empty delta must stay under the floor, got {}", encoded.len());
}
