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

//! The process-owned entity store. One typed manager per entity kind,
//! keyed by a stable monotonic id. All mutation flows through the
//! high-level operations in `ops`, which leave every invariant intact
//! or change nothing at all.

mod audit;
mod indices;
mod ops;

pub use self::indices::Indices;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	entities::{
		BuildProject, Colony, EspionageEffect, Facility, Fleet, GroundUnit, GuildMission, House, Lane, Ship,
		SpyMission, Squadron, StarSystem,
	},
	types::{
		Act, ColonyId, FacilityId, FleetId, GameId, GamePhase, GroundUnitId, HouseId, LaneId, MissionId, ProjectId,
		ShipClass, ShipId, SquadronId, SystemId, Turn,
	},
};

/// Generic keyed container for one entity kind. Ids are assigned from a
/// counter that never reuses a value, even across remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manager<I: Ord, T> {
	next_id: u32,
	items: BTreeMap<I, T>,
}

impl<I: Ord, T> Default for Manager<I, T> {
	fn default() -> Self {
		Self { next_id: 1, items: BTreeMap::new() }
	}
}

impl<I, T> Manager<I, T>
where
	I: Copy + Ord + From<u32> + Into<u32>,
{
	/// Insert a new entity built from its freshly assigned id.
	pub fn insert_with(&mut self, build: impl FnOnce(I) -> T) -> I {
		let id = I::from(self.next_id);
		self.next_id += 1;
		self.items.insert(id, build(id));
		id
	}

	pub fn get(&self, id: I) -> Option<&T> {
		self.items.get(&id)
	}

	/// Direct mutable access. Setup code and tests may poke fields, but
	/// structural changes (membership, ownership webs) must go through
	/// the high-level ops, which also keep the indices honest.
	pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
		self.items.get_mut(&id)
	}

	/// Replace an existing entity wholesale. Absent ids are an error,
	/// not an upsert.
	pub fn update(&mut self, id: I, entity: T) -> Result<(), I> {
		match self.items.get_mut(&id) {
			Some(slot) => {
				*slot = entity;
				Ok(())
			}
			None => Err(id),
		}
	}

	/// Remove; idempotent.
	pub fn remove(&mut self, id: I) -> Option<T> {
		self.items.remove(&id)
	}

	pub fn contains(&self, id: I) -> bool {
		self.items.contains_key(&id)
	}

	pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
		self.items.iter().map(|(id, item)| (*id, item))
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
		self.items.iter_mut().map(|(id, item)| (*id, item))
	}

	pub fn values(&self) -> impl Iterator<Item = &T> {
		self.items.values()
	}

	pub fn ids(&self) -> Vec<I> {
		self.items.keys().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

/// A ship finished in Production, parked until the next Command phase so
/// it only commissions if its docks survive the intervening Conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingShip {
	pub colony: ColonyId,
	pub owner: HouseId,
	pub class: ShipClass,
	pub tech_at_build: u8,
	pub completed: Turn,
}

/// The authoritative world state of one game. Owns every entity;
/// everything else borrows for at most one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStore {
	pub game_id: GameId,
	pub turn: Turn,
	pub phase: GamePhase,
	pub act: Act,
	pub houses: Manager<HouseId, House>,
	pub systems: Manager<SystemId, StarSystem>,
	pub lanes: Manager<LaneId, Lane>,
	pub colonies: Manager<ColonyId, Colony>,
	pub fleets: Manager<FleetId, Fleet>,
	pub squadrons: Manager<SquadronId, Squadron>,
	pub ships: Manager<ShipId, Ship>,
	pub ground_units: Manager<GroundUnitId, GroundUnit>,
	pub facilities: Manager<FacilityId, Facility>,
	pub projects: Manager<ProjectId, BuildProject>,
	pub spy_missions: Manager<MissionId, SpyMission>,
	/// Ongoing espionage effects, walked at Income step 1.
	pub effects: Vec<EspionageEffect>,
	/// Queued Space Guild intents, resolved in the next Conflict phase.
	pub guild_missions: Vec<GuildMission>,
	/// Ships completed in Production, commissioned at Command step 2.
	pub pending_ships: Vec<PendingShip>,
	#[serde(skip)]
	indices: Indices,
}

impl GameStore {
	pub fn new(game_id: GameId) -> Self {
		Self {
			game_id,
			turn: 1,
			phase: GamePhase::Setup,
			act: Act::default(),
			houses: Manager::default(),
			systems: Manager::default(),
			lanes: Manager::default(),
			colonies: Manager::default(),
			fleets: Manager::default(),
			squadrons: Manager::default(),
			ships: Manager::default(),
			ground_units: Manager::default(),
			facilities: Manager::default(),
			projects: Manager::default(),
			spy_missions: Manager::default(),
			effects: Vec::new(),
			guild_missions: Vec::new(),
			pending_ships: Vec::new(),
			indices: Indices::default(),
		}
	}

	pub fn indices(&self) -> &Indices {
		&self.indices
	}

	/// Rebuild the derived maps from entity contents. Called by every
	/// high-level op and after deserialization; the indices are never
	/// authoritative.
	pub fn reindex(&mut self) {
		self.indices = Indices::build(self);
	}

	/// Restore transient state after loading a snapshot blob.
	pub fn after_load(&mut self) {
		self.reindex();
	}

	/// Decode a snapshot blob produced by `snapshot`.
	pub fn from_snapshot(bytes: &[u8]) -> crate::error::Result<Self> {
		let mut store: GameStore = bincode::deserialize(bytes).map_err(crate::error::CodecError::Encode)?;
		store.after_load();
		Ok(store)
	}

	/// The whole store as one opaque binary blob.
	pub fn snapshot(&self) -> crate::error::Result<Vec<u8>> {
		bincode::serialize(self).map_err(|e| crate::error::CodecError::Encode(e).into())
	}

	pub fn house(&self, id: HouseId) -> Result<&House, crate::error::StoreError> {
		self.houses.get(id).ok_or(crate::error::StoreError::NoSuchHouse(id))
	}

	pub fn fleet(&self, id: FleetId) -> Result<&Fleet, crate::error::StoreError> {
		self.fleets.get(id).ok_or(crate::error::StoreError::NoSuchFleet(id))
	}

	pub fn colony(&self, id: ColonyId) -> Result<&Colony, crate::error::StoreError> {
		self.colonies.get(id).ok_or(crate::error::StoreError::NoSuchColony(id))
	}

	pub fn ship(&self, id: ShipId) -> Result<&Ship, crate::error::StoreError> {
		self.ships.get(id).ok_or(crate::error::StoreError::NoSuchShip(id))
	}

	/// Non-eliminated houses, in id order.
	pub fn living_houses(&self) -> Vec<HouseId> {
		self.houses.iter().filter(|(_, h)| !h.eliminated).map(|(id, _)| id).collect()
	}

	/// Sum of industrial units across a house's colonies, after the
	/// blockade penalty for the current Income phase. This is the
	/// `Total_House_IU` every capacity formula reads.
	pub fn total_house_iu(&self, house: HouseId, blockade_penalty_percent: u32) -> u32 {
		self.colonies
			.values()
			.filter(|c| c.owner == house)
			.map(|c| {
				if c.blockaded {
					c.industrial_units * (100 - blockade_penalty_percent) / 100
				} else {
					c.industrial_units
				}
			})
			.sum()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn manager_ids_are_monotonic_and_never_reused() {
		let mut mgr: Manager<FleetId, Fleet> = Manager::default();
		let a = mgr.insert_with(|id| Fleet::new(id, HouseId(1), SystemId(1)));
		let b = mgr.insert_with(|id| Fleet::new(id, HouseId(1), SystemId(1)));
		assert!(a < b);
		mgr.remove(b);
		let c = mgr.insert_with(|id| Fleet::new(id, HouseId(1), SystemId(1)));
		assert!(c > b);
	}

	#[test]
	fn update_fails_on_absent_id() {
		let mut mgr: Manager<FleetId, Fleet> = Manager::default();
		let ghost = Fleet::new(FleetId(9), HouseId(1), SystemId(1));
		assert!(mgr.update(FleetId(9), ghost).is_err());
	}

	#[test]
	fn remove_is_idempotent() {
		let mut mgr: Manager<FleetId, Fleet> = Manager::default();
		let id = mgr.insert_with(|id| Fleet::new(id, HouseId(1), SystemId(1)));
		assert!(mgr.remove(id).is_some());
		assert!(mgr.remove(id).is_none());
	}

	#[test]
	fn snapshot_roundtrip_preserves_the_store() {
		let mut store = GameStore::new(7);
		store.houses.insert_with(|id| House::new(id, "Atreides", vec![1, 2, 3]));
		store.systems.insert_with(|id| StarSystem {
			id,
			name: "Arrakis".into(),
			coords: (0, 0),
			planet_class: crate::types::PlanetClass::Arid,
			resource_rating: crate::types::ResourceRating::VeryRich,
		});
		store.reindex();

		let blob = store.snapshot().unwrap();
		let restored = GameStore::from_snapshot(&blob).unwrap();
		assert_eq!(store, restored);
	}
}
