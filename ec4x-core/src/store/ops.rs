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

//! High-level store operations. These are the only mutation chokepoints;
//! each one validates against the current state, applies its effects,
//! and rebuilds the indices, so an operation either succeeds with every
//! invariant intact or returns an error having changed nothing.

use std::collections::VecDeque;

use crate::{
	entities::{
		BuildProject, BuildTarget, Cargo, Colony, Fleet, GroundLocation, GroundUnit, Ship, SpyMission, SpyMissionKind,
		Squadron,
	},
	error::StoreError,
	types::{
		ColonyId, FacilityId, FleetId, GroundUnitId, GroundUnitType, HouseId, MissionId, ProjectId, ShipClass, ShipId,
		SquadronId, SquadronType, SystemId, Turn,
	},
};

use super::GameStore;

type Result<T, E = StoreError> = std::result::Result<T, E>;

impl GameStore {
	/// Create an empty fleet. Callers must give it a squadron in the
	/// same turn step or destroy it again; the audit enforces this.
	pub fn create_fleet(&mut self, owner: HouseId, location: SystemId) -> Result<FleetId> {
		if !self.houses.contains(owner) {
			return Err(StoreError::NoSuchHouse(owner));
		}
		if !self.systems.contains(location) {
			return Err(StoreError::NoSuchSystem(location));
		}
		let id = self.fleets.insert_with(|id| Fleet::new(id, owner, location));
		self.reindex();
		Ok(id)
	}

	/// Fold `src` into `dst`: squadrons and auxiliaries move over, `src`
	/// is removed. Both fleets must share owner and location.
	pub fn merge_fleets(&mut self, dst: FleetId, src: FleetId) -> Result<()> {
		if dst == src {
			return Ok(());
		}
		{
			let d = self.fleet(dst)?;
			let s = self.fleet(src)?;
			if d.owner != s.owner {
				return Err(StoreError::OwnerMismatch(dst, src));
			}
			if d.location != s.location {
				return Err(StoreError::NotColocated(dst, src));
			}
		}
		let removed = self.fleets.remove(src).expect("checked above");
		for sq_id in &removed.squadrons {
			if let Some(sq) = self.squadrons.get_mut(*sq_id) {
				sq.fleet = dst;
			}
		}
		let dst_fleet = self.fleets.get_mut(dst).expect("checked above");
		dst_fleet.squadrons.extend(removed.squadrons);
		dst_fleet.auxiliaries.extend(removed.auxiliaries);
		self.reindex();
		Ok(())
	}

	/// Detach the named squadrons and auxiliaries of `src` into a new
	/// fleet at the same location.
	pub fn split_fleet(&mut self, src: FleetId, squadrons: &[SquadronId], auxiliaries: &[ShipId]) -> Result<FleetId> {
		let (owner, location) = {
			let f = self.fleet(src)?;
			for sq in squadrons {
				if !f.squadrons.contains(sq) {
					return Err(StoreError::NoSuchSquadron(*sq));
				}
			}
			for aux in auxiliaries {
				if !f.auxiliaries.contains(aux) {
					return Err(StoreError::NoSuchShip(*aux));
				}
			}
			if squadrons.len() == f.squadrons.len() {
				// splitting everything out would leave src empty
				return Err(StoreError::FlagshipRequired(f.squadrons[0]));
			}
			(f.owner, f.location)
		};
		if squadrons.is_empty() {
			return Err(StoreError::NoSuchFleet(src));
		}
		let new_id = self.fleets.insert_with(|id| Fleet::new(id, owner, location));
		{
			let f = self.fleets.get_mut(src).expect("checked above");
			f.squadrons.retain(|sq| !squadrons.contains(sq));
			f.auxiliaries.retain(|aux| !auxiliaries.contains(aux));
		}
		{
			let f = self.fleets.get_mut(new_id).expect("just created");
			f.squadrons.extend_from_slice(squadrons);
			f.auxiliaries.extend_from_slice(auxiliaries);
		}
		for sq in squadrons {
			self.squadrons.get_mut(*sq).expect("membership checked").fleet = new_id;
		}
		self.reindex();
		Ok(new_id)
	}

	/// Remove a fleet and everything aboard: squadrons, ships,
	/// auxiliaries, embarked ground units.
	pub fn destroy_fleet(&mut self, id: FleetId) -> Result<()> {
		let fleet = self.fleets.remove(id).ok_or(StoreError::NoSuchFleet(id))?;
		for sq_id in fleet.squadrons {
			if let Some(sq) = self.squadrons.remove(sq_id) {
				for ship in sq.members {
					self.remove_ship_and_cargo(ship);
				}
			}
		}
		for aux in fleet.auxiliaries {
			self.remove_ship_and_cargo(aux);
		}
		if let Some(colony_id) = fleet.home_colony {
			if let Some(colony) = self.colonies.get_mut(colony_id) {
				colony.garrison = None;
			}
		}
		self.reindex();
		Ok(())
	}

	/// Build `count` new ships of `class` and group them into a fresh
	/// squadron of `fleet`. The first hull is the flagship.
	pub fn commission_squadron(
		&mut self,
		fleet: FleetId,
		class: ShipClass,
		count: u32,
		tech_at_build: u8,
	) -> Result<SquadronId> {
		let owner = self.fleet(fleet)?.owner;
		let count = count.max(1);
		let mut members = Vec::with_capacity(count as usize);
		for _ in 0..count {
			members.push(self.ships.insert_with(|id| Ship::new(id, owner, class, tech_at_build)));
		}
		let kind = match class {
			ShipClass::Etac => SquadronType::Expansion,
			c if c.is_auxiliary() => SquadronType::Auxiliary,
			_ => SquadronType::Combat,
		};
		let flagship = members[0];
		let sq_id = self.squadrons.insert_with(|id| Squadron { id, owner, flagship, members, kind, fleet });
		self.fleets.get_mut(fleet).expect("checked above").squadrons.push(sq_id);
		self.reindex();
		Ok(sq_id)
	}

	/// Build one auxiliary hull and attach it to a fleet outside any
	/// squadron.
	pub fn attach_auxiliary(&mut self, fleet: FleetId, class: ShipClass, tech_at_build: u8) -> Result<ShipId> {
		let owner = self.fleet(fleet)?.owner;
		let ship = self.ships.insert_with(|id| Ship::new(id, owner, class, tech_at_build));
		self.fleets.get_mut(fleet).expect("checked above").auxiliaries.push(ship);
		self.reindex();
		Ok(ship)
	}

	/// Destroy one ship. The squadron loses the member (promoting a new
	/// flagship if needed), an emptied squadron is removed, and a fleet
	/// left without squadrons is destroyed in the same step.
	pub fn destroy_ship(&mut self, id: ShipId) -> Result<()> {
		if !self.ships.contains(id) {
			return Err(StoreError::NoSuchShip(id));
		}
		let fleet_id = self.indices.fleet_of_ship.get(&id).copied();
		self.remove_ship_and_cargo(id);

		let Some(fleet_id) = fleet_id else {
			self.reindex();
			return Ok(());
		};
		let fleet = self.fleets.get_mut(fleet_id).expect("index pointed here");
		fleet.auxiliaries.retain(|s| *s != id);
		let squadron_ids = fleet.squadrons.clone();

		let mut emptied = Vec::new();
		for sq_id in squadron_ids {
			let Some(sq) = self.squadrons.get_mut(sq_id) else { continue };
			if !sq.members.contains(&id) {
				continue;
			}
			sq.members.retain(|s| *s != id);
			if sq.members.is_empty() {
				emptied.push(sq_id);
			} else if sq.flagship == id {
				sq.flagship = sq.members[0];
			}
		}
		for sq_id in emptied {
			self.squadrons.remove(sq_id);
			self.fleets.get_mut(fleet_id).expect("still present").squadrons.retain(|s| *s != sq_id);
		}
		if self.fleets.get(fleet_id).map(|f| f.squadrons.is_empty()).unwrap_or(false) {
			self.destroy_fleet(fleet_id)?;
		}
		self.reindex();
		Ok(())
	}

	/// Destroy a whole squadron and its ships, cascading to the fleet if
	/// it was the last one.
	pub fn destroy_squadron(&mut self, id: SquadronId) -> Result<()> {
		let sq = self.squadrons.remove(id).ok_or(StoreError::NoSuchSquadron(id))?;
		for ship in sq.members {
			self.remove_ship_and_cargo(ship);
		}
		let emptied = match self.fleets.get_mut(sq.fleet) {
			Some(fleet) => {
				fleet.squadrons.retain(|s| *s != id);
				fleet.squadrons.is_empty()
			}
			None => false,
		};
		if emptied {
			self.destroy_fleet(sq.fleet)?;
		}
		self.reindex();
		Ok(())
	}

	/// Found a colony at an empty system. The caller has already
	/// consumed the ETAC.
	pub fn found_colony(&mut self, system: SystemId, owner: HouseId, starting_iu: u32, turn: Turn) -> Result<ColonyId> {
		if !self.systems.contains(system) {
			return Err(StoreError::NoSuchSystem(system));
		}
		if !self.houses.contains(owner) {
			return Err(StoreError::NoSuchHouse(owner));
		}
		if self.indices.colony_at(system).is_some() {
			return Err(StoreError::SystemOccupied(system));
		}
		let id = self.colonies.insert_with(|id| Colony::new(id, system, owner, starting_iu, turn));
		self.reindex();
		Ok(id)
	}

	/// Change colony ownership after a successful invasion or blitz.
	/// Old-owner garrison, ground units, and build queue are destroyed;
	/// facilities change hands; industrial units shrink to
	/// `iu_survival_percent`.
	pub fn transfer_colony(&mut self, colony_id: ColonyId, new_owner: HouseId, iu_survival_percent: u32) -> Result<()> {
		if !self.houses.contains(new_owner) {
			return Err(StoreError::NoSuchHouse(new_owner));
		}
		let (garrison, old_queue) = {
			let colony = self.colonies.get_mut(colony_id).ok_or(StoreError::NoSuchColony(colony_id))?;
			let garrison = colony.garrison.take();
			let queue: Vec<ProjectId> = colony.build_queue.drain(..).collect();
			colony.owner = new_owner;
			colony.industrial_units = colony.industrial_units * iu_survival_percent / 100;
			colony.blockaded = false;
			colony.fighter_overage_turns = 0;
			(garrison, queue)
		};
		if let Some(garrison) = garrison {
			self.destroy_fleet(garrison)?;
		}
		for project in old_queue {
			self.projects.remove(project);
		}
		// defenders not belonging to the new owner fall with the colony;
		// attacker landings stay put
		let colony = self.colonies.get(colony_id).expect("checked above");
		let doomed: Vec<GroundUnitId> = colony
			.ground_units
			.iter()
			.copied()
			.filter(|u| self.ground_units.get(*u).map(|g| g.owner != new_owner).unwrap_or(false))
			.collect();
		for unit in doomed {
			self.ground_units.remove(unit);
			if let Some(c) = self.colonies.get_mut(colony_id) {
				c.ground_units.remove(&unit);
			}
		}
		for (_, facility) in self.facilities.iter_mut() {
			if facility.colony == colony_id {
				facility.owner = new_owner;
			}
		}
		self.reindex();
		Ok(())
	}

	/// Remove a bombed-out colony. Facilities, ground units, garrison
	/// and queue go with it.
	pub fn destroy_colony(&mut self, colony_id: ColonyId) -> Result<()> {
		let colony = self.colonies.remove(colony_id).ok_or(StoreError::NoSuchColony(colony_id))?;
		if let Some(garrison) = colony.garrison {
			self.destroy_fleet(garrison)?;
		}
		for unit in colony.ground_units {
			self.ground_units.remove(unit);
		}
		for project in colony.build_queue {
			self.projects.remove(project);
		}
		let doomed: Vec<FacilityId> =
			self.facilities.iter().filter(|(_, f)| f.colony == colony_id).map(|(id, _)| id).collect();
		for facility in doomed {
			self.facilities.remove(facility);
		}
		self.reindex();
		Ok(())
	}

	pub fn destroy_facility(&mut self, id: FacilityId) -> Result<()> {
		self.facilities.remove(id).ok_or(StoreError::NoSuchFacility(id))?;
		self.reindex();
		Ok(())
	}

	/// Commission a fresh ground unit directly onto a colony.
	pub fn raise_ground_unit(&mut self, colony_id: ColonyId, kind: GroundUnitType) -> Result<GroundUnitId> {
		let owner = self.colony(colony_id)?.owner;
		let id = self
			.ground_units
			.insert_with(|id| GroundUnit::new(id, owner, kind, GroundLocation::Colony(colony_id)));
		self.colonies.get_mut(colony_id).expect("checked above").ground_units.insert(id);
		self.reindex();
		Ok(id)
	}

	pub fn destroy_ground_unit(&mut self, id: GroundUnitId) -> Result<()> {
		let unit = self.ground_units.remove(id).ok_or(StoreError::NoSuchGroundUnit(id))?;
		match unit.location {
			GroundLocation::Colony(colony) => {
				if let Some(c) = self.colonies.get_mut(colony) {
					c.ground_units.remove(&id);
				}
			}
			GroundLocation::Transport(ship) => {
				if let Some(s) = self.ships.get_mut(ship) {
					if let Some(Cargo::Marines(units)) = &mut s.cargo {
						units.retain(|u| *u != id);
					}
				}
			}
		}
		self.reindex();
		Ok(())
	}

	/// Embark a colony-based ground unit onto a troop transport at the
	/// same system.
	pub fn load_ground_unit(&mut self, unit_id: GroundUnitId, transport: ShipId, capacity: u32) -> Result<()> {
		let colony_id = match self.ground_units.get(unit_id) {
			Some(unit) => match unit.location {
				GroundLocation::Colony(c) => c,
				GroundLocation::Transport(_) => return Err(StoreError::NoSuchGroundUnit(unit_id)),
			},
			None => return Err(StoreError::NoSuchGroundUnit(unit_id)),
		};
		{
			let ship = self.ship(transport)?;
			if ship.class != ShipClass::TroopTransport {
				return Err(StoreError::NotATransport(transport));
			}
			match &ship.cargo {
				Some(Cargo::Marines(units)) if units.len() as u32 >= capacity => {
					return Err(StoreError::CargoFull(transport))
				}
				Some(Cargo::Marines(_)) | None => {}
				Some(_) => return Err(StoreError::CargoFull(transport)),
			}
		}
		if let Some(c) = self.colonies.get_mut(colony_id) {
			c.ground_units.remove(&unit_id);
		}
		let ship = self.ships.get_mut(transport).expect("checked above");
		match &mut ship.cargo {
			Some(Cargo::Marines(units)) => units.push(unit_id),
			slot @ None => *slot = Some(Cargo::Marines(vec![unit_id])),
			_ => unreachable!("validated above"),
		}
		self.ground_units.get_mut(unit_id).expect("checked above").location = GroundLocation::Transport(transport);
		self.reindex();
		Ok(())
	}

	/// Disembark a transported unit onto a colony.
	pub fn land_ground_unit(&mut self, unit_id: GroundUnitId, colony_id: ColonyId) -> Result<()> {
		if !self.colonies.contains(colony_id) {
			return Err(StoreError::NoSuchColony(colony_id));
		}
		let transport = match self.ground_units.get(unit_id) {
			Some(unit) => match unit.location {
				GroundLocation::Transport(s) => s,
				GroundLocation::Colony(_) => return Err(StoreError::NoSuchGroundUnit(unit_id)),
			},
			None => return Err(StoreError::NoSuchGroundUnit(unit_id)),
		};
		if let Some(ship) = self.ships.get_mut(transport) {
			if let Some(Cargo::Marines(units)) = &mut ship.cargo {
				units.retain(|u| *u != unit_id);
				if units.is_empty() {
					ship.cargo = None;
				}
			}
		}
		self.ground_units.get_mut(unit_id).expect("checked above").location = GroundLocation::Colony(colony_id);
		self.colonies.get_mut(colony_id).expect("checked above").ground_units.insert(unit_id);
		self.reindex();
		Ok(())
	}

	/// Append a construction order to a colony's queue.
	pub fn enqueue_build(&mut self, colony_id: ColonyId, target: BuildTarget, cost: u32, priority: u8) -> Result<ProjectId> {
		if !self.colonies.contains(colony_id) {
			return Err(StoreError::NoSuchColony(colony_id));
		}
		let id = self
			.projects
			.insert_with(|id| BuildProject { id, colony: colony_id, target, progress: 0, cost, priority });
		let mut queue: Vec<ProjectId> = {
			let colony = self.colonies.get_mut(colony_id).expect("checked above");
			colony.build_queue.push_back(id);
			colony.build_queue.drain(..).collect()
		};
		queue.sort_by_key(|p| (self.projects.get(*p).map(|pr| pr.priority).unwrap_or(u8::MAX), p.0));
		self.colonies.get_mut(colony_id).expect("checked above").build_queue = VecDeque::from(queue);
		self.reindex();
		Ok(id)
	}

	/// Drop a project from the store and its colony queue. Idempotent on
	/// the queue side.
	pub fn remove_project(&mut self, project_id: ProjectId) {
		if let Some(project) = self.projects.remove(project_id) {
			if let Some(colony) = self.colonies.get_mut(project.colony) {
				colony.build_queue.retain(|p| *p != project_id);
			}
		}
		self.reindex();
	}

	pub fn register_spy_mission(
		&mut self,
		fleet: FleetId,
		kind: SpyMissionKind,
		target: SystemId,
		started: Turn,
		scout_count: u32,
	) -> Result<MissionId> {
		let owner = self.fleet(fleet)?.owner;
		if !self.systems.contains(target) {
			return Err(StoreError::NoSuchSystem(target));
		}
		let id = self
			.spy_missions
			.insert_with(|id| SpyMission { id, fleet, owner, kind, target, started, scout_count });
		self.reindex();
		Ok(id)
	}

	pub fn remove_spy_mission(&mut self, id: MissionId) {
		self.spy_missions.remove(id);
		self.reindex();
	}

	/// Internal: drop a ship and any ground units embarked on it. Does
	/// not touch squadron or fleet membership; callers do.
	fn remove_ship_and_cargo(&mut self, id: ShipId) {
		if let Some(ship) = self.ships.remove(id) {
			if let Some(Cargo::Marines(units)) = ship.cargo {
				for unit in units {
					self.ground_units.remove(unit);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entities::House;
	use crate::types::{PlanetClass, ResourceRating};

	fn fixture() -> (GameStore, HouseId, SystemId) {
		let mut store = GameStore::new(1);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let system = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Arrakis".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		store.reindex();
		(store, house, system)
	}

	#[test]
	fn destroying_last_ship_cascades_to_fleet() {
		let (mut store, house, system) = fixture();
		let fleet = store.create_fleet(house, system).unwrap();
		let sq = store.commission_squadron(fleet, ShipClass::Cruiser, 1, 1).unwrap();
		let ship = store.squadrons.get(sq).unwrap().members[0];

		store.destroy_ship(ship).unwrap();
		assert!(!store.ships.contains(ship));
		assert!(!store.squadrons.contains(sq));
		assert!(!store.fleets.contains(fleet));
	}

	#[test]
	fn flagship_loss_promotes_next_member() {
		let (mut store, house, system) = fixture();
		let fleet = store.create_fleet(house, system).unwrap();
		let sq = store.commission_squadron(fleet, ShipClass::Destroyer, 3, 1).unwrap();
		let flagship = store.squadrons.get(sq).unwrap().flagship;

		store.destroy_ship(flagship).unwrap();
		let sq = store.squadrons.get(sq).unwrap();
		assert_eq!(sq.members.len(), 2);
		assert!(sq.members.contains(&sq.flagship));
	}

	#[test]
	fn merge_requires_colocation() {
		let (mut store, house, system) = fixture();
		let other = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Caladan".into(),
			coords: (1, 0),
			planet_class: PlanetClass::Eden,
			resource_rating: ResourceRating::Rich,
		});
		let a = store.create_fleet(house, system).unwrap();
		let b = store.create_fleet(house, other).unwrap();
		store.commission_squadron(a, ShipClass::Frigate, 1, 1).unwrap();
		store.commission_squadron(b, ShipClass::Frigate, 1, 1).unwrap();

		assert_eq!(store.merge_fleets(a, b), Err(StoreError::NotColocated(a, b)));
		// failed op left everything in place
		assert!(store.fleets.contains(a) && store.fleets.contains(b));
	}

	#[test]
	fn found_colony_rejects_occupied_system() {
		let (mut store, house, system) = fixture();
		store.found_colony(system, house, 3, 1).unwrap();
		assert_eq!(store.found_colony(system, house, 3, 1), Err(StoreError::SystemOccupied(system)));
	}

	#[test]
	fn transfer_colony_halves_industry_and_flips_facilities() {
		let (mut store, house, system) = fixture();
		let enemy = store.houses.insert_with(|id| House::new(id, "Harkonnen", vec![]));
		let colony = store.found_colony(system, house, 40, 1).unwrap();
		let facility = store.facilities.insert_with(|id| crate::entities::Facility {
			id,
			owner: house,
			colony,
			kind: crate::types::FacilityKind::Spaceport,
			state: crate::types::CombatState::Undamaged,
		});
		store.reindex();

		store.transfer_colony(colony, enemy, 50).unwrap();
		let c = store.colonies.get(colony).unwrap();
		assert_eq!(c.owner, enemy);
		assert_eq!(c.industrial_units, 20);
		assert_eq!(store.facilities.get(facility).unwrap().owner, enemy);
	}

	#[test]
	fn ground_unit_load_and_land_roundtrip() {
		let (mut store, house, system) = fixture();
		let colony = store.found_colony(system, house, 10, 1).unwrap();
		let unit = store.raise_ground_unit(colony, GroundUnitType::Marine).unwrap();
		let fleet = store.create_fleet(house, system).unwrap();
		store.commission_squadron(fleet, ShipClass::Frigate, 1, 1).unwrap();
		let transport = store.attach_auxiliary(fleet, ShipClass::TroopTransport, 1).unwrap();

		store.load_ground_unit(unit, transport, 6).unwrap();
		assert!(store.ground_units.get(unit).unwrap().is_embarked());
		assert!(!store.colonies.get(colony).unwrap().ground_units.contains(&unit));

		store.land_ground_unit(unit, colony).unwrap();
		assert!(!store.ground_units.get(unit).unwrap().is_embarked());
		assert!(store.ships.get(transport).unwrap().cargo.is_none());
	}

	#[test]
	fn build_queue_orders_by_priority_then_id() {
		let (mut store, house, system) = fixture();
		let colony = store.found_colony(system, house, 10, 1).unwrap();
		let low = store.enqueue_build(colony, BuildTarget::Ship(ShipClass::Scout), 15, 5).unwrap();
		let high = store.enqueue_build(colony, BuildTarget::Ship(ShipClass::Cruiser), 80, 0).unwrap();

		let queue: Vec<ProjectId> = store.colonies.get(colony).unwrap().build_queue.iter().copied().collect();
		assert_eq!(queue, vec![high, low]);
	}
}
