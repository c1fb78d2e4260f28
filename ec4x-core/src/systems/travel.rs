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

//! Jump-lane travel. Lane topology is public map data; what fog governs
//! is target selection, which happens in the standing-order layer.

use std::collections::{BTreeMap, VecDeque};

use crate::types::{FleetId, LaneClass, ShipClass, SystemId};

use super::Phase;

/// Crippled or auxiliary ships bar a fleet from restricted lanes.
pub(crate) fn barred_from_restricted(phase: &Phase<'_>, fleet_id: FleetId) -> bool {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return true };
	if !fleet.auxiliaries.is_empty() {
		return true;
	}
	fleet
		.squadrons
		.iter()
		.filter_map(|sq| phase.store.squadrons.get(*sq))
		.flat_map(|sq| sq.members.iter())
		.filter_map(|s| phase.store.ships.get(*s))
		.any(|s| s.state.is_crippled() || s.class.is_auxiliary())
}

/// Shortest lane path from `from` to `to`, lane classes included.
/// Breadth-first over the public lane graph; restricted lanes are
/// dropped for barred fleets.
pub(crate) fn shortest_path(
	phase: &Phase<'_>,
	from: SystemId,
	to: SystemId,
	avoid_restricted: bool,
) -> Option<Vec<(SystemId, LaneClass)>> {
	if from == to {
		return Some(Vec::new());
	}
	let mut prev: BTreeMap<SystemId, (SystemId, LaneClass)> = BTreeMap::new();
	let mut queue = VecDeque::from([from]);
	while let Some(here) = queue.pop_front() {
		// lane ids ascending keeps exploration deterministic
		for lane_id in phase.store.indices().lanes_of(here) {
			let Some(lane) = phase.store.lanes.get(*lane_id) else { continue };
			if avoid_restricted && lane.class == LaneClass::Restricted {
				continue;
			}
			let Some(next) = lane.other_end(here) else { continue };
			if next == from || prev.contains_key(&next) {
				continue;
			}
			prev.insert(next, (here, lane.class));
			if next == to {
				let mut path = Vec::new();
				let mut cursor = to;
				while cursor != from {
					let (back, class) = prev[&cursor];
					path.push((cursor, class));
					cursor = back;
				}
				path.reverse();
				return Some(path);
			}
			queue.push_back(next);
		}
	}
	None
}

fn owns_system(phase: &Phase<'_>, house: crate::types::HouseId, system: SystemId) -> bool {
	phase
		.store
		.indices()
		.colony_at(system)
		.and_then(|c| phase.store.colonies.get(c))
		.map(|c| c.owner == house)
		.unwrap_or(false)
}

/// Advance a fleet one turn toward `dest`. Major lanes allow a second
/// hop only when every system on the double-hop path belongs to the
/// owner. Returns the new location, or `None` when no lane path exists.
pub(crate) fn advance(phase: &mut Phase<'_>, fleet_id: FleetId, dest: SystemId) -> Option<SystemId> {
	let (from, owner) = {
		let fleet = phase.store.fleets.get(fleet_id)?;
		(fleet.location, fleet.owner)
	};
	if from == dest {
		return Some(from);
	}
	let avoid_restricted = barred_from_restricted(phase, fleet_id);
	let path = shortest_path(phase, from, dest, avoid_restricted)?;
	let (first_hop, first_class) = *path.first()?;

	let mut arrive_at = first_hop;
	if let Some((second_hop, second_class)) = path.get(1).copied() {
		let double_hop = first_class == LaneClass::Major
			&& second_class == LaneClass::Major
			&& owns_system(phase, owner, from)
			&& owns_system(phase, owner, first_hop)
			&& owns_system(phase, owner, second_hop);
		if double_hop {
			arrive_at = second_hop;
		}
	}
	phase.store.fleets.get_mut(fleet_id).expect("checked above").location = arrive_at;
	phase.store.reindex();
	Some(arrive_at)
}

/// Nearest system satisfying `pred`, by lane distance from `from`.
/// Deterministic: distance first, then system id.
pub(crate) fn nearest_matching(
	phase: &Phase<'_>,
	from: SystemId,
	avoid_restricted: bool,
	pred: impl Fn(SystemId) -> bool,
) -> Option<SystemId> {
	if pred(from) {
		return Some(from);
	}
	let mut seen = std::collections::BTreeSet::from([from]);
	let mut frontier = vec![from];
	while !frontier.is_empty() {
		let mut next_frontier: Vec<SystemId> = Vec::new();
		for here in &frontier {
			for lane_id in phase.store.indices().lanes_of(*here) {
				let Some(lane) = phase.store.lanes.get(*lane_id) else { continue };
				if avoid_restricted && lane.class == LaneClass::Restricted {
					continue;
				}
				if let Some(next) = lane.other_end(*here) {
					if seen.insert(next) {
						next_frontier.push(next);
					}
				}
			}
		}
		next_frontier.sort();
		if let Some(found) = next_frontier.iter().copied().find(|s| pred(*s)) {
			return Some(found);
		}
		frontier = next_frontier;
	}
	None
}

/// True when the fleet can still pretend to be a merchant: used by the
/// scout-on-scout sweep to find pure scout formations.
pub(crate) fn is_pure_scout_fleet(phase: &Phase<'_>, fleet_id: FleetId) -> bool {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return false };
	let mut any = false;
	for sq in fleet.squadrons.iter().filter_map(|sq| phase.store.squadrons.get(*sq)) {
		for ship in sq.members.iter().filter_map(|s| phase.store.ships.get(*s)) {
			if ship.class != ShipClass::Scout {
				return false;
			}
			any = true;
		}
	}
	any && fleet.auxiliaries.is_empty()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		entities::{House, Lane, StarSystem},
		rng::phase_rng,
		rules::Rules,
		store::GameStore,
		types::{HouseId, PlanetClass, ResourceRating, TurnPhase},
	};

	fn chain(classes: &[LaneClass]) -> (GameStore, HouseId, Vec<SystemId>) {
		let mut store = GameStore::new(4);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let mut systems = Vec::new();
		for i in 0..=classes.len() {
			systems.push(store.systems.insert_with(|id| StarSystem {
				id,
				name: format!("S{}", i),
				coords: (i as i32, 0),
				planet_class: PlanetClass::Terran,
				resource_rating: ResourceRating::Average,
			}));
		}
		for (i, class) in classes.iter().enumerate() {
			store.lanes.insert_with(|id| Lane { id, endpoints: (systems[i], systems[i + 1]), class: *class });
		}
		store.reindex();
		(store, house, systems)
	}

	#[test]
	fn single_hop_on_minor_lanes() {
		let (mut store, house, systems) = chain(&[LaneClass::Minor, LaneClass::Minor]);
		let fleet = store.create_fleet(house, systems[0]).unwrap();
		store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		let rules = Rules::default();
		let mut events = Vec::new();
		let mut rng = phase_rng(4, 1, TurnPhase::Production);
		let mut phase = Phase { store: &mut store, rules: &rules, events: &mut events, rng: &mut rng, turn: 1 };

		let at = advance(&mut phase, fleet, systems[2]).unwrap();
		assert_eq!(at, systems[1]);
	}

	#[test]
	fn double_hop_needs_owned_major_corridor() {
		let (mut store, house, systems) = chain(&[LaneClass::Major, LaneClass::Major]);
		let fleet = store.create_fleet(house, systems[0]).unwrap();
		store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		let rules = Rules::default();

		// corridor not owned: one hop only
		{
			let mut events = Vec::new();
			let mut rng = phase_rng(4, 1, TurnPhase::Production);
			let mut phase =
				Phase { store: &mut store, rules: &rules, events: &mut events, rng: &mut rng, turn: 1 };
			assert_eq!(advance(&mut phase, fleet, systems[2]).unwrap(), systems[1]);
		}

		// own every system on the path: two hops
		let (mut store, house, systems) = chain(&[LaneClass::Major, LaneClass::Major]);
		for sys in &systems {
			store.found_colony(*sys, house, 10, 1).unwrap();
		}
		let fleet = store.create_fleet(house, systems[0]).unwrap();
		store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		let mut events = Vec::new();
		let mut rng = phase_rng(4, 1, TurnPhase::Production);
		let mut phase = Phase { store: &mut store, rules: &rules, events: &mut events, rng: &mut rng, turn: 1 };
		assert_eq!(advance(&mut phase, fleet, systems[2]).unwrap(), systems[2]);
	}

	#[test]
	fn crippled_fleet_routes_around_restricted_lanes() {
		// direct route restricted, long way around via minor lanes
		let (mut store, house, systems) = chain(&[LaneClass::Restricted]);
		let detour_a = store.systems.insert_with(|id| StarSystem {
			id,
			name: "Detour".into(),
			coords: (0, 1),
			planet_class: PlanetClass::Barren,
			resource_rating: ResourceRating::Poor,
		});
		store.lanes.insert_with(|id| Lane { id, endpoints: (systems[0], detour_a), class: LaneClass::Minor });
		store.lanes.insert_with(|id| Lane { id, endpoints: (detour_a, systems[1]), class: LaneClass::Minor });
		store.reindex();
		let fleet = store.create_fleet(house, systems[0]).unwrap();
		let sq = store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		let ship = store.squadrons.get(sq).unwrap().members[0];
		store.ships.get_mut(ship).unwrap().state = crate::types::CombatState::Crippled;
		store.reindex();
		let rules = Rules::default();
		let mut events = Vec::new();
		let mut rng = phase_rng(4, 1, TurnPhase::Production);
		let mut phase = Phase { store: &mut store, rules: &rules, events: &mut events, rng: &mut rng, turn: 1 };

		assert_eq!(advance(&mut phase, fleet, systems[1]).unwrap(), detour_a);
	}
}
