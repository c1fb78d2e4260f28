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

//! Fog-of-war projection and deltas. `project` is pure and idempotent:
//! the same store and house always yield the same `PlayerState`.
//! Snapshots persist per `(game, house, turn)` so a delta is just the
//! diff of two adjacent snapshots and can be recomputed from history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	entities::{
		BuildProject, Colony, Facility, Fleet, GroundUnit, House, Lane, Ship, Squadron, StarSystem, SystemIntel,
	},
	rules::Rules,
	store::GameStore,
	types::{
		Act, ColonyId, DiplomaticState, FacilityId, FleetId, GameId, GroundUnitId, HouseId, LaneId, ProjectId,
		ShipId, SquadronId, SystemId, Turn,
	},
};

/// What every house knows about every other house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicHouse {
	pub id: HouseId,
	pub name: String,
	pub prestige: i64,
	pub colony_count: u32,
	pub eliminated: bool,
	pub relations: BTreeMap<HouseId, DiplomaticState>,
}

/// One house's view of the world at one turn boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
	pub game_id: GameId,
	pub turn: Turn,
	pub house: HouseId,
	pub config_hash: String,
	pub act: Act,
	pub houses: Vec<PublicHouse>,
	/// The viewer's own house record, in full. Absent once eliminated.
	pub own: Option<House>,
	// public map topology
	pub systems: BTreeMap<SystemId, StarSystem>,
	pub lanes: BTreeMap<LaneId, Lane>,
	// owned entities, in full
	pub colonies: BTreeMap<ColonyId, Colony>,
	pub fleets: BTreeMap<FleetId, Fleet>,
	pub squadrons: BTreeMap<SquadronId, Squadron>,
	pub ships: BTreeMap<ShipId, Ship>,
	pub ground_units: BTreeMap<GroundUnitId, GroundUnit>,
	pub facilities: BTreeMap<FacilityId, Facility>,
	pub projects: BTreeMap<ProjectId, BuildProject>,
	/// Quality-tagged rows about everyone else.
	pub intel: BTreeMap<SystemId, SystemIntel>,
}

/// Project the authoritative store into one house's view: own entities
/// in full, public data for all houses, and intelligence rows for the
/// rest. An eliminated house sees only the public layer, with no intel
/// newer than its elimination turn.
pub fn project(store: &GameStore, rules: &Rules, house: HouseId, turn: Turn) -> PlayerState {
	let viewer = store.houses.get(house);
	let eliminated = viewer.map(|h| h.eliminated).unwrap_or(true);
	let elimination_turn = viewer.and_then(|h| h.eliminated_turn);

	let houses = store
		.houses
		.iter()
		.map(|(id, h)| PublicHouse {
			id,
			name: h.name.clone(),
			prestige: h.prestige,
			colony_count: store.indices().colonies_of(id).len() as u32,
			eliminated: h.eliminated,
			relations: h.relations.clone(),
		})
		.collect();

	let mut state = PlayerState {
		game_id: store.game_id,
		turn,
		house,
		config_hash: rules.config_hash(),
		act: store.act,
		houses,
		own: None,
		systems: store.systems.iter().map(|(id, s)| (id, s.clone())).collect(),
		lanes: store.lanes.iter().map(|(id, l)| (id, *l)).collect(),
		colonies: BTreeMap::new(),
		fleets: BTreeMap::new(),
		squadrons: BTreeMap::new(),
		ships: BTreeMap::new(),
		ground_units: BTreeMap::new(),
		facilities: BTreeMap::new(),
		projects: BTreeMap::new(),
		intel: BTreeMap::new(),
	};
	if eliminated {
		if let Some(h) = viewer {
			state.intel = h
				.intel
				.systems
				.iter()
				.filter(|(_, row)| elimination_turn.map(|t| row.observed <= t).unwrap_or(false))
				.map(|(id, row)| (*id, row.clone()))
				.collect();
		}
		return state;
	}
	let viewer = viewer.expect("non-eliminated house exists");
	state.own = Some(viewer.clone());

	state.colonies = store.colonies.iter().filter(|(_, c)| c.owner == house).map(|(id, c)| (id, c.clone())).collect();
	state.fleets = store.fleets.iter().filter(|(_, f)| f.owner == house).map(|(id, f)| (id, f.clone())).collect();
	state.squadrons =
		store.squadrons.iter().filter(|(_, s)| s.owner == house).map(|(id, s)| (id, s.clone())).collect();
	state.ships = store.ships.iter().filter(|(_, s)| s.owner == house).map(|(id, s)| (id, s.clone())).collect();
	state.ground_units =
		store.ground_units.iter().filter(|(_, g)| g.owner == house).map(|(id, g)| (id, g.clone())).collect();
	state.facilities =
		store.facilities.iter().filter(|(_, f)| f.owner == house).map(|(id, f)| (id, f.clone())).collect();
	state.projects = store
		.projects
		.iter()
		.filter(|(_, p)| {
			store.colonies.get(p.colony).map(|c| c.owner == house).unwrap_or(false)
		})
		.map(|(id, p)| (id, p.clone()))
		.collect();
	state.intel = viewer.intel.systems.iter().map(|(id, row)| (*id, row.clone())).collect();
	state
}

/// Added/updated/removed triple for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDelta<I, T> {
	pub added: Vec<T>,
	pub updated: Vec<T>,
	pub removed: Vec<I>,
}

impl<I, T> Default for EntityDelta<I, T> {
	fn default() -> Self {
		Self { added: Vec::new(), updated: Vec::new(), removed: Vec::new() }
	}
}

impl<I, T> EntityDelta<I, T> {
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
	}
}

fn diff_map<I: Copy + Ord, T: Clone + PartialEq>(prev: &BTreeMap<I, T>, next: &BTreeMap<I, T>) -> EntityDelta<I, T> {
	let mut delta = EntityDelta::default();
	for (id, item) in next {
		match prev.get(id) {
			None => delta.added.push(item.clone()),
			Some(old) if old != item => delta.updated.push(item.clone()),
			Some(_) => {}
		}
	}
	for id in prev.keys() {
		if !next.contains_key(id) {
			delta.removed.push(*id);
		}
	}
	delta
}

fn apply_map<I: Copy + Ord, T: Clone>(
	map: &mut BTreeMap<I, T>,
	delta: &EntityDelta<I, T>,
	key: impl Fn(&T) -> I,
) {
	for id in &delta.removed {
		map.remove(id);
	}
	for item in delta.added.iter().chain(delta.updated.iter()) {
		map.insert(key(item), item.clone());
	}
}

/// The versioned record published to one house after each turn. A
/// client must reject it when `config_hash` does not match the rules
/// bundle it has accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateDelta {
	pub version: u16,
	pub game_id: GameId,
	pub turn: Turn,
	pub house: HouseId,
	pub config_hash: String,
	/// Act progression, flagged only when it changed.
	pub act: Option<Act>,
	pub houses: Option<Vec<PublicHouse>>,
	pub own: Option<House>,
	pub systems: EntityDelta<SystemId, StarSystem>,
	pub lanes: EntityDelta<LaneId, Lane>,
	pub colonies: EntityDelta<ColonyId, Colony>,
	pub fleets: EntityDelta<FleetId, Fleet>,
	pub squadrons: EntityDelta<SquadronId, Squadron>,
	pub ships: EntityDelta<ShipId, Ship>,
	pub ground_units: EntityDelta<GroundUnitId, GroundUnit>,
	pub facilities: EntityDelta<FacilityId, Facility>,
	pub projects: EntityDelta<ProjectId, BuildProject>,
	pub intel: EntityDelta<SystemId, SystemIntel>,
}

pub const DELTA_VERSION: u16 = 1;

impl PlayerStateDelta {
	/// True when nothing but the headers would be transmitted.
	pub fn is_empty(&self) -> bool {
		self.act.is_none()
			&& self.houses.is_none()
			&& self.own.is_none()
			&& self.systems.is_empty()
			&& self.lanes.is_empty()
			&& self.colonies.is_empty()
			&& self.fleets.is_empty()
			&& self.squadrons.is_empty()
			&& self.ships.is_empty()
			&& self.ground_units.is_empty()
			&& self.facilities.is_empty()
			&& self.projects.is_empty()
			&& self.intel.is_empty()
	}
}

/// Diff two adjacent snapshots of the same house. With no previous
/// snapshot (initial join), everything present is emitted as added.
pub fn diff(prev: Option<&PlayerState>, next: &PlayerState) -> PlayerStateDelta {
	let empty;
	let baseline = match prev {
		Some(p) => p,
		None => {
			empty = PlayerState {
				game_id: next.game_id,
				turn: 0,
				house: next.house,
				config_hash: String::new(),
				act: Act::Early,
				houses: Vec::new(),
				own: None,
				systems: BTreeMap::new(),
				lanes: BTreeMap::new(),
				colonies: BTreeMap::new(),
				fleets: BTreeMap::new(),
				squadrons: BTreeMap::new(),
				ships: BTreeMap::new(),
				ground_units: BTreeMap::new(),
				facilities: BTreeMap::new(),
				projects: BTreeMap::new(),
				intel: BTreeMap::new(),
			};
			&empty
		}
	};
	PlayerStateDelta {
		version: DELTA_VERSION,
		game_id: next.game_id,
		turn: next.turn,
		house: next.house,
		config_hash: next.config_hash.clone(),
		act: (baseline.act != next.act || prev.is_none()).then_some(next.act),
		houses: (baseline.houses != next.houses).then(|| next.houses.clone()),
		own: (baseline.own != next.own).then(|| next.own.clone()).flatten(),
		systems: diff_map(&baseline.systems, &next.systems),
		lanes: diff_map(&baseline.lanes, &next.lanes),
		colonies: diff_map(&baseline.colonies, &next.colonies),
		fleets: diff_map(&baseline.fleets, &next.fleets),
		squadrons: diff_map(&baseline.squadrons, &next.squadrons),
		ships: diff_map(&baseline.ships, &next.ships),
		ground_units: diff_map(&baseline.ground_units, &next.ground_units),
		facilities: diff_map(&baseline.facilities, &next.facilities),
		projects: diff_map(&baseline.projects, &next.projects),
		intel: diff_map(&baseline.intel, &next.intel),
	}
}

/// Apply a delta to a snapshot; `apply(a, diff(a, b)) == b` for
/// snapshots of the same house.
pub fn apply(base: &PlayerState, delta: &PlayerStateDelta) -> PlayerState {
	let mut next = base.clone();
	next.turn = delta.turn;
	next.config_hash = delta.config_hash.clone();
	if let Some(act) = delta.act {
		next.act = act;
	}
	if let Some(houses) = &delta.houses {
		next.houses = houses.clone();
	}
	if let Some(own) = &delta.own {
		next.own = Some(own.clone());
	}
	apply_map(&mut next.systems, &delta.systems, |s| s.id);
	apply_map(&mut next.lanes, &delta.lanes, |l| l.id);
	apply_map(&mut next.colonies, &delta.colonies, |c| c.id);
	apply_map(&mut next.fleets, &delta.fleets, |f| f.id);
	apply_map(&mut next.squadrons, &delta.squadrons, |s| s.id);
	apply_map(&mut next.ships, &delta.ships, |s| s.id);
	apply_map(&mut next.ground_units, &delta.ground_units, |g| g.id);
	apply_map(&mut next.facilities, &delta.facilities, |f| f.id);
	apply_map(&mut next.projects, &delta.projects, |p| p.id);
	apply_map(&mut next.intel, &delta.intel, |i| i.system);
	next
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{entities::House as HouseEntity, types::ShipClass};

	fn world() -> (GameStore, Rules, HouseId, HouseId) {
		let mut store = GameStore::new(21);
		let a = store.houses.insert_with(|id| HouseEntity::new(id, "Atreides", vec![]));
		let b = store.houses.insert_with(|id| HouseEntity::new(id, "Harkonnen", vec![]));
		let home = store.systems.insert_with(|id| StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: crate::types::PlanetClass::Terran,
			resource_rating: crate::types::ResourceRating::Average,
		});
		let away = store.systems.insert_with(|id| StarSystem {
			id,
			name: "Giedi Prime".into(),
			coords: (4, 0),
			planet_class: crate::types::PlanetClass::Hostile,
			resource_rating: crate::types::ResourceRating::Rich,
		});
		store.reindex();
		store.found_colony(home, a, 40, 1).unwrap();
		store.found_colony(away, b, 35, 1).unwrap();
		let fleet = store.create_fleet(b, away).unwrap();
		store.commission_squadron(fleet, ShipClass::Cruiser, 2, 1).unwrap();
		store.reindex();
		(store, Rules::default(), a, b)
	}

	#[test]
	fn projection_hides_foreign_entities() {
		let (store, rules, a, b) = world();
		let view = project(&store, &rules, a, 1);
		assert_eq!(view.colonies.len(), 1);
		assert!(view.fleets.is_empty(), "B's fleet must not leak to A");
		assert!(view.houses.iter().any(|h| h.id == b), "public data covers everyone");
		assert!(view.own.is_some());
	}

	#[test]
	fn eliminated_house_projects_nothing_owned() {
		let (mut store, rules, a, _) = world();
		{
			let house = store.houses.get_mut(a).unwrap();
			house.eliminated = true;
			house.eliminated_turn = Some(3);
		}
		let view = project(&store, &rules, a, 5);
		assert!(view.own.is_none());
		assert!(view.colonies.is_empty());
		assert!(view.fleets.is_empty());
		assert!(view.intel.values().all(|row| row.observed <= 3));
	}

	#[test]
	fn diff_of_identical_snapshots_is_empty() {
		let (store, rules, a, _) = world();
		let s = project(&store, &rules, a, 1);
		let delta = diff(Some(&s), &s);
		assert!(delta.is_empty());
	}

	#[test]
	fn diff_without_baseline_emits_everything_as_added() {
		let (store, rules, a, _) = world();
		let s = project(&store, &rules, a, 1);
		let delta = diff(None, &s);
		assert_eq!(delta.colonies.added.len(), s.colonies.len());
		assert_eq!(delta.systems.added.len(), s.systems.len());
		assert!(delta.act.is_some());
		assert!(delta.own.is_some());
	}

	#[test]
	fn apply_after_diff_reproduces_the_target() {
		let (mut store, rules, a, _) = world();
		let before = project(&store, &rules, a, 1);

		// the world moves on
		for (_, colony) in store.colonies.iter_mut() {
			colony.industrial_units += 5;
		}
		let fleet = store.create_fleet(a, before.colonies.values().next().unwrap().system).unwrap();
		store.commission_squadron(fleet, ShipClass::Scout, 1, 1).unwrap();
		store.reindex();
		let after = project(&store, &rules, a, 2);

		let delta = diff(Some(&before), &after);
		let rebuilt = apply(&before, &delta);
		assert_eq!(rebuilt, after);
	}
}
