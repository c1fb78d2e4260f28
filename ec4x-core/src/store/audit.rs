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

//! Post-phase invariant audit. A failure here aborts the whole turn:
//! the working store is discarded and the game pauses.

use std::collections::BTreeMap;

use crate::{
	entities::GroundLocation,
	types::{ShipId, SquadronId},
};

use super::{GameStore, Indices};

impl GameStore {
	/// Check every structural invariant. Returns the full list of
	/// violations so the moderator alert names them all at once.
	pub fn audit(&self) -> Result<(), Vec<String>> {
		let mut violations = Vec::new();

		// every squadron belongs to exactly one fleet, which lists it
		let mut squadron_homes: BTreeMap<SquadronId, u32> = BTreeMap::new();
		for (fleet_id, fleet) in self.fleets.iter() {
			for sq_id in &fleet.squadrons {
				*squadron_homes.entry(*sq_id).or_default() += 1;
				match self.squadrons.get(*sq_id) {
					None => violations.push(format!("{} lists missing {}", fleet_id, sq_id)),
					Some(sq) if sq.fleet != fleet_id => {
						violations.push(format!("{} disagrees with {} about its fleet", sq_id, fleet_id))
					}
					Some(_) => {}
				}
			}
			if fleet.squadrons.is_empty() {
				violations.push(format!("{} has no squadrons and was not destroyed", fleet_id));
			}
		}
		for (sq_id, _) in self.squadrons.iter() {
			match squadron_homes.get(&sq_id) {
				Some(1) => {}
				Some(n) => violations.push(format!("{} is listed by {} fleets", sq_id, n)),
				None => violations.push(format!("{} belongs to no fleet", sq_id)),
			}
		}

		// every ship sits in exactly one squadron or one auxiliary list
		let mut ship_homes: BTreeMap<ShipId, u32> = BTreeMap::new();
		for (_, sq) in self.squadrons.iter() {
			if !sq.members.contains(&sq.flagship) {
				violations.push(format!("{} flagship is not a member", sq.id));
			}
			if sq.members.is_empty() {
				violations.push(format!("{} is empty and was not destroyed", sq.id));
			}
			for ship in &sq.members {
				*ship_homes.entry(*ship).or_default() += 1;
				if !self.ships.contains(*ship) {
					violations.push(format!("{} lists missing {}", sq.id, ship));
				}
			}
		}
		for (fleet_id, fleet) in self.fleets.iter() {
			for aux in &fleet.auxiliaries {
				*ship_homes.entry(*aux).or_default() += 1;
				if !self.ships.contains(*aux) {
					violations.push(format!("{} lists missing auxiliary {}", fleet_id, aux));
				}
			}
		}
		for (ship_id, _) in self.ships.iter() {
			match ship_homes.get(&ship_id) {
				Some(1) => {}
				Some(n) => violations.push(format!("{} has {} berths", ship_id, n)),
				None => violations.push(format!("{} is unberthed", ship_id)),
			}
		}

		// ground units: colony and transport agree with the unit
		for (unit_id, unit) in self.ground_units.iter() {
			match unit.location {
				GroundLocation::Colony(colony) => match self.colonies.get(colony) {
					None => violations.push(format!("{} stands on missing {}", unit_id, colony)),
					Some(c) if !c.ground_units.contains(&unit_id) => {
						violations.push(format!("{} not listed by {}", unit_id, colony))
					}
					Some(_) => {}
				},
				GroundLocation::Transport(ship) => match self.ships.get(ship) {
					None => violations.push(format!("{} embarked on missing {}", unit_id, ship)),
					Some(s) => match &s.cargo {
						Some(crate::entities::Cargo::Marines(units)) if units.contains(&unit_id) => {}
						_ => violations.push(format!("{} not in cargo of {}", unit_id, ship)),
					},
				},
			}
		}
		for (colony_id, colony) in self.colonies.iter() {
			for unit in &colony.ground_units {
				if !self.ground_units.contains(*unit) {
					violations.push(format!("{} lists missing {}", colony_id, unit));
				}
			}
			if let Some(garrison) = colony.garrison {
				match self.fleets.get(garrison) {
					None => violations.push(format!("{} garrison {} missing", colony_id, garrison)),
					Some(f) if f.location != colony.system => {
						violations.push(format!("{} garrison {} is not at {}", colony_id, garrison, colony.system))
					}
					Some(f) if f.home_colony != Some(colony_id) => {
						violations.push(format!("{} garrison {} does not point home", colony_id, garrison))
					}
					Some(_) => {}
				}
			}
			for project in &colony.build_queue {
				match self.projects.get(*project) {
					None => violations.push(format!("{} queues missing {}", colony_id, project)),
					Some(p) if p.colony != colony_id => {
						violations.push(format!("{} queues {} owned by {}", colony_id, project, p.colony))
					}
					Some(_) => {}
				}
			}
		}

		// eliminated houses keep the flag's consequences
		for (house_id, house) in self.houses.iter() {
			if house.eliminated && house.eliminated_turn.is_none() {
				violations.push(format!("{} eliminated without a turn stamp", house_id));
			}
		}

		// indices are a function of entity contents
		if *self.indices() != Indices::build(self) {
			violations.push("indices diverge from a fresh rebuild".to_string());
		}

		if violations.is_empty() {
			Ok(())
		} else {
			Err(violations)
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::{
		entities::House,
		store::GameStore,
		types::{PlanetClass, ResourceRating, ShipClass},
	};

	#[test]
	fn clean_store_passes_audit() {
		let mut store = GameStore::new(1);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let system = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Arrakis".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Arid,
			resource_rating: ResourceRating::Rich,
		});
		store.reindex();
		let fleet = store.create_fleet(house, system).unwrap();
		store.commission_squadron(fleet, ShipClass::Cruiser, 2, 1).unwrap();
		assert!(store.audit().is_ok());
	}

	#[test]
	fn empty_fleet_fails_audit() {
		let mut store = GameStore::new(1);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let system = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Arrakis".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Arid,
			resource_rating: ResourceRating::Rich,
		});
		store.reindex();
		store.create_fleet(house, system).unwrap();
		let violations = store.audit().unwrap_err();
		assert!(violations.iter().any(|v| v.contains("no squadrons")));
	}
}
