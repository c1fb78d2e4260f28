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

use serde::{Deserialize, Serialize};

use crate::{
	command::{Command, StandingOrder},
	types::{
		ColonyId, CombatState, FleetId, FleetStatus, GroundUnitId, HouseId, MissionState, ShipClass, ShipId,
		SquadronId, SquadronType, SystemId, Turn,
	},
};

/// The single occupied active-command slot of a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCommand {
	pub command: Command,
	pub issued: Turn,
}

/// A fleet: squadrons plus directly-attached auxiliary ships, at one
/// location, with at most one active and one standing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
	pub id: FleetId,
	pub owner: HouseId,
	pub location: SystemId,
	pub status: FleetStatus,
	/// Rules-of-engagement, 0 (retreat at first scratch) to 10 (fight to
	/// the end).
	pub roe: u8,
	pub squadrons: Vec<SquadronId>,
	/// Auxiliary ships (ETACs, transports, tankers) attached outside any
	/// squadron.
	pub auxiliaries: Vec<ShipId>,
	pub active: Option<ActiveCommand>,
	pub standing: Option<StandingOrder>,
	pub mission_state: MissionState,
	pub mission_started: Option<Turn>,
	/// Set for colony garrison fleets; garrisons never travel.
	pub home_colony: Option<ColonyId>,
}

impl Fleet {
	pub fn new(id: FleetId, owner: HouseId, location: SystemId) -> Self {
		Self {
			id,
			owner,
			location,
			status: FleetStatus::Active,
			roe: 5,
			squadrons: Vec::new(),
			auxiliaries: Vec::new(),
			active: None,
			standing: None,
			mission_state: MissionState::Idle,
			mission_started: None,
			home_colony: None,
		}
	}

	pub fn is_garrison(&self) -> bool {
		self.home_colony.is_some()
	}

	pub fn clear_mission(&mut self) {
		self.active = None;
		self.mission_state = MissionState::Idle;
		self.mission_started = None;
	}
}

/// Combat grouping of ships under one flagship. The flagship is always a
/// member; an empty squadron must be destroyed in the same step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squadron {
	pub id: SquadronId,
	pub owner: HouseId,
	pub flagship: ShipId,
	pub members: Vec<ShipId>,
	pub kind: SquadronType,
	pub fleet: FleetId,
}

/// Contents of a ship's single cargo slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cargo {
	Colonists(u32),
	Marines(Vec<GroundUnitId>),
	Supplies(u32),
}

/// One hull. `tech_at_build` freezes the weapons level a ship was laid
/// down with; refits are a shipyard repair project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
	pub id: ShipId,
	pub owner: HouseId,
	pub class: ShipClass,
	pub tech_at_build: u8,
	pub state: CombatState,
	pub cargo: Option<Cargo>,
}

impl Ship {
	pub fn new(id: ShipId, owner: HouseId, class: ShipClass, tech_at_build: u8) -> Self {
		Self { id, owner, class, tech_at_build, state: CombatState::Undamaged, cargo: None }
	}
}
