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

//! Identifier newtypes and the small enums shared by every subsystem.
//! Entities reference each other exclusively through these ids; nothing
//! in the engine holds a live reference to another entity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one game. Assigned at creation time by the
/// moderator CLI and embedded in every packet and seed derivation.
pub type GameId = u64;

/// Monotonic turn counter. Turn 0 is setup; the first resolved turn is 1.
pub type Turn = u32;

macro_rules! entity_id {
	($(#[$doc:meta])* $name:ident) => {
		$(#[$doc])*
		#[derive(
			Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
		)]
		pub struct $name(pub u32);

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}#{}", stringify!($name), self.0)
			}
		}

		impl From<u32> for $name {
			fn from(raw: u32) -> Self {
				Self(raw)
			}
		}

		impl From<$name> for u32 {
			fn from(id: $name) -> u32 {
				id.0
			}
		}
	};
}

entity_id!(HouseId);
entity_id!(SystemId);
entity_id!(LaneId);
entity_id!(ColonyId);
entity_id!(FleetId);
entity_id!(SquadronId);
entity_id!(ShipId);
entity_id!(GroundUnitId);
entity_id!(FacilityId);
entity_id!(ProjectId);
entity_id!(MissionId);

/// Lifecycle of a whole game as stored in the `games` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
	/// Created but not yet opened for command submission.
	Setup,
	/// Accepting commands and resolving turns.
	Active,
	/// Halted by the moderator or by an invariant violation.
	Paused,
	/// A victory condition fired; no further resolution.
	Finished,
}

impl GamePhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			GamePhase::Setup => "setup",
			GamePhase::Active => "active",
			GamePhase::Paused => "paused",
			GamePhase::Finished => "finished",
		}
	}
}

/// The four pipeline phases, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TurnPhase {
	Conflict,
	Income,
	Command,
	Production,
}

impl TurnPhase {
	/// Stable discriminant used for per-phase rng seed derivation.
	pub fn seed_tag(&self) -> u8 {
		match self {
			TurnPhase::Conflict => 0,
			TurnPhase::Income => 1,
			TurnPhase::Command => 2,
			TurnPhase::Production => 3,
		}
	}
}

/// Game-wide milestone structure, computed from aggregate colonization
/// percent and prestige at the end of each Income phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Act {
	Early,
	Mid,
	Late,
}

impl Default for Act {
	fn default() -> Self {
		Act::Early
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiplomaticState {
	Allied,
	Neutral,
	Hostile,
}

impl Default for DiplomaticState {
	fn default() -> Self {
		DiplomaticState::Neutral
	}
}

/// Quality tag on an intelligence row, worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntelQuality {
	Visual,
	Scan,
	Spy,
	Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatState {
	Undamaged,
	Crippled,
}

impl CombatState {
	pub fn is_crippled(&self) -> bool {
		matches!(self, CombatState::Crippled)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FleetStatus {
	Active,
	Reserve,
	Mothballed,
}

/// Where a fleet is in its command lifecycle. `Executing` is the sole
/// trigger for command execution in the following Conflict/Income phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionState {
	Idle,
	Traveling,
	Executing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LaneClass {
	Restricted,
	Minor,
	Major,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanetClass {
	Eden,
	Terran,
	Arid,
	Hostile,
	Barren,
}

/// Resource richness of a system, multiplying colony output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceRating {
	VeryPoor,
	Poor,
	Average,
	Rich,
	VeryRich,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShipClass {
	Scout,
	Fighter,
	Corvette,
	Frigate,
	Destroyer,
	Cruiser,
	Battlecruiser,
	Battleship,
	Dreadnought,
	Raider,
	PlanetBreaker,
	// auxiliaries
	Etac,
	TroopTransport,
	Tanker,
}

impl ShipClass {
	pub fn is_auxiliary(&self) -> bool {
		matches!(self, ShipClass::Etac | ShipClass::TroopTransport | ShipClass::Tanker)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SquadronType {
	Combat,
	Expansion,
	Auxiliary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroundUnitType {
	Militia,
	Marine,
	Armor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FacilityKind {
	Spaceport,
	Shipyard,
	Starbase,
	PlanetaryShield,
	GroundBattery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImprovementKind {
	Terraforming,
	DeepCoreMines,
	OrbitalFarms,
}

/// The five technology fields open to directed research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechField {
	Weapons,
	Defense,
	Propulsion,
	Electronics,
	Biotech,
}

impl TechField {
	pub const ALL: [TechField; 5] =
		[TechField::Weapons, TechField::Defense, TechField::Propulsion, TechField::Electronics, TechField::Biotech];
}

/// A research track a house can allocate production points to.
/// Advancement order in Production is economic, science, then fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResearchTrack {
	Economic,
	Science,
	Tech(TechField),
}

impl ResearchTrack {
	pub fn in_priority_order() -> impl Iterator<Item = ResearchTrack> {
		[ResearchTrack::Economic, ResearchTrack::Science]
			.into_iter()
			.chain(TechField::ALL.into_iter().map(ResearchTrack::Tech))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn research_priority_order_is_economic_science_then_fields() {
		let order: Vec<ResearchTrack> = ResearchTrack::in_priority_order().collect();
		assert_eq!(order[0], ResearchTrack::Economic);
		assert_eq!(order[1], ResearchTrack::Science);
		assert_eq!(order.len(), 7);
	}

	#[test]
	fn intel_quality_orders_worst_to_best() {
		assert!(IntelQuality::Visual < IntelQuality::Scan);
		assert!(IntelQuality::Spy < IntelQuality::Perfect);
	}
}
