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

//! Derived secondary maps. Always a pure function of entity contents;
//! rebuilding from scratch must reproduce them exactly (audited).

use std::collections::BTreeMap;

use crate::{
	entities::GroundLocation,
	types::{ColonyId, FacilityId, FleetId, GroundUnitId, HouseId, LaneId, MissionId, ShipId, SquadronId, SystemId},
};

use super::GameStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indices {
	pub fleets_by_location: BTreeMap<SystemId, Vec<FleetId>>,
	pub colonies_by_owner: BTreeMap<HouseId, Vec<ColonyId>>,
	pub colony_by_system: BTreeMap<SystemId, ColonyId>,
	pub squadrons_by_fleet: BTreeMap<FleetId, Vec<SquadronId>>,
	pub ships_by_fleet: BTreeMap<FleetId, Vec<ShipId>>,
	pub fleet_of_ship: BTreeMap<ShipId, FleetId>,
	pub facilities_by_colony: BTreeMap<ColonyId, Vec<FacilityId>>,
	pub ground_units_by_colony: BTreeMap<ColonyId, Vec<GroundUnitId>>,
	pub missions_by_system: BTreeMap<SystemId, Vec<MissionId>>,
	pub lanes_by_system: BTreeMap<SystemId, Vec<LaneId>>,
}

impl Indices {
	pub fn build(store: &GameStore) -> Self {
		let mut idx = Indices::default();

		for (id, fleet) in store.fleets.iter() {
			idx.fleets_by_location.entry(fleet.location).or_default().push(id);
			let squadrons = idx.squadrons_by_fleet.entry(id).or_default();
			let ships = idx.ships_by_fleet.entry(id).or_default();
			for sq_id in &fleet.squadrons {
				squadrons.push(*sq_id);
				if let Some(sq) = store.squadrons.get(*sq_id) {
					for ship in &sq.members {
						ships.push(*ship);
						idx.fleet_of_ship.insert(*ship, id);
					}
				}
			}
			for aux in &fleet.auxiliaries {
				ships.push(*aux);
				idx.fleet_of_ship.insert(*aux, id);
			}
		}

		for (id, colony) in store.colonies.iter() {
			idx.colonies_by_owner.entry(colony.owner).or_default().push(id);
			idx.colony_by_system.insert(colony.system, id);
		}

		for (id, facility) in store.facilities.iter() {
			idx.facilities_by_colony.entry(facility.colony).or_default().push(id);
		}

		for (id, unit) in store.ground_units.iter() {
			if let GroundLocation::Colony(colony) = unit.location {
				idx.ground_units_by_colony.entry(colony).or_default().push(id);
			}
		}

		for (id, mission) in store.spy_missions.iter() {
			idx.missions_by_system.entry(mission.target).or_default().push(id);
		}

		for (id, lane) in store.lanes.iter() {
			idx.lanes_by_system.entry(lane.endpoints.0).or_default().push(id);
			idx.lanes_by_system.entry(lane.endpoints.1).or_default().push(id);
		}

		idx
	}

	pub fn fleets_at(&self, system: SystemId) -> &[FleetId] {
		self.fleets_by_location.get(&system).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn colonies_of(&self, house: HouseId) -> &[ColonyId] {
		self.colonies_by_owner.get(&house).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn colony_at(&self, system: SystemId) -> Option<ColonyId> {
		self.colony_by_system.get(&system).copied()
	}

	pub fn ships_of_fleet(&self, fleet: FleetId) -> &[ShipId] {
		self.ships_by_fleet.get(&fleet).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn facilities_at(&self, colony: ColonyId) -> &[FacilityId] {
		self.facilities_by_colony.get(&colony).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn ground_units_at(&self, colony: ColonyId) -> &[GroundUnitId] {
		self.ground_units_by_colony.get(&colony).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn missions_at(&self, system: SystemId) -> &[MissionId] {
		self.missions_by_system.get(&system).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn lanes_of(&self, system: SystemId) -> &[LaneId] {
		self.lanes_by_system.get(&system).map(Vec::as_slice).unwrap_or(&[])
	}
}
