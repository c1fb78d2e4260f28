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

//! The event stream a resolved turn emits, in exact phase order. Events
//! are the only channel through which validation and execution failures
//! reach players; engine-internal failures never appear here.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::{ColonyId, FacilityId, FleetId, HouseId, ShipId, SquadronId, SystemId, Turn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
	// conflict
	SpaceCombat { system: SystemId, houses: Vec<HouseId>, rounds: u32 },
	OrbitalCombat { system: SystemId, attacker: HouseId, defender: HouseId },
	ShipCrippled { ship: ShipId, owner: HouseId, system: SystemId },
	SquadronDestroyed { squadron: SquadronId, owner: HouseId, system: SystemId },
	FleetDestroyed { fleet: FleetId, owner: HouseId, system: SystemId },
	FleetRetreated { fleet: FleetId, owner: HouseId, from: SystemId, to: SystemId },
	BlockadeEstablished { colony: ColonyId, system: SystemId, by: HouseId },
	BlockadeLifted { colony: ColonyId, system: SystemId },
	ColonyBombarded { colony: ColonyId, by: HouseId, industry_lost: u32 },
	ColonyInvaded { colony: ColonyId, by: HouseId, success: bool },
	ColonyBlitzed { colony: ColonyId, by: HouseId, success: bool },
	ColonyCaptured { colony: ColonyId, system: SystemId, from: HouseId, to: HouseId },
	ColonyDestroyed { colony: ColonyId, system: SystemId, owner: HouseId },
	FacilityDestroyed { facility: FacilityId, colony: ColonyId, kind: crate::types::FacilityKind },
	ColonyFounded { colony: ColonyId, system: SystemId, owner: HouseId, starting_iu: u32 },
	ColonizationContested { system: SystemId, winner: HouseId, losers: Vec<HouseId> },
	ScoutDetected { fleet: FleetId, owner: HouseId, system: SystemId },
	SpyMissionEstablished { fleet: FleetId, owner: HouseId, system: SystemId },
	SpyMissionYield { owner: HouseId, system: SystemId },
	SpyFleetDestroyed { fleet: FleetId, owner: HouseId, system: SystemId },
	GuildMissionResolved { buyer: HouseId, target: HouseId, success: bool },
	// income
	ProductionCollected { house: HouseId, amount: i64 },
	MaintenanceCharged { house: HouseId, amount: i64 },
	SalvageRecovered { house: HouseId, colony: ColonyId, amount: i64 },
	CapitalShipSeized { house: HouseId, squadron: SquadronId, refund: i64 },
	SquadronDisbanded { house: HouseId, squadron: SquadronId },
	FighterSquadronDisbanded { house: HouseId, colony: ColonyId, squadron: SquadronId },
	PlanetBreakerScrapped { house: HouseId, ship: ShipId },
	PrestigeAwarded { house: HouseId, amount: i64 },
	HouseEliminated { house: HouseId, reason: EliminationReason },
	GameWon { house: HouseId, condition: VictoryCondition },
	ActAdvanced { act: crate::types::Act },
	// command
	CommandAccepted { house: HouseId, fleet: FleetId, kind: String },
	CommandRejected { house: HouseId, fleet: FleetId, reason: String },
	CommandCompleted { fleet: FleetId, kind: String },
	CommandFailed { fleet: FleetId, kind: String, reason: String },
	ShipCommissioned { ship: ShipId, owner: HouseId, colony: ColonyId, class: crate::types::ShipClass },
	GroundUnitCommissioned { colony: ColonyId, owner: HouseId, kind: crate::types::GroundUnitType },
	FacilityCompleted { facility: FacilityId, colony: ColonyId, kind: crate::types::FacilityKind },
	RepairCompleted { colony: ColonyId, owner: HouseId },
	ResearchAllocated { house: HouseId, points: i64, scaled: bool },
	ResearchCancelled { house: HouseId },
	// production
	FleetArrived { fleet: FleetId, owner: HouseId, system: SystemId },
	FleetHeldByLane { fleet: FleetId, owner: HouseId, at: SystemId },
	ScoutContact { observer: HouseId, observed: HouseId, system: SystemId },
	ResearchAdvanced { house: HouseId, track: String, level: u8 },
	Breakthrough { house: HouseId, track: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationReason {
	NoColoniesNoMarines,
	DefensiveCollapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VictoryCondition {
	LastHouseStanding,
	PrestigeThreshold,
	TurnLimitHighestPrestige,
}

impl Event {
	pub fn kind_str(&self) -> &'static str {
		match self {
			Event::SpaceCombat { .. } => "space_combat",
			Event::OrbitalCombat { .. } => "orbital_combat",
			Event::ShipCrippled { .. } => "ship_crippled",
			Event::SquadronDestroyed { .. } => "squadron_destroyed",
			Event::FleetDestroyed { .. } => "fleet_destroyed",
			Event::FleetRetreated { .. } => "fleet_retreated",
			Event::BlockadeEstablished { .. } => "blockade_established",
			Event::BlockadeLifted { .. } => "blockade_lifted",
			Event::ColonyBombarded { .. } => "colony_bombarded",
			Event::ColonyInvaded { .. } => "colony_invaded",
			Event::ColonyBlitzed { .. } => "colony_blitzed",
			Event::ColonyCaptured { .. } => "colony_captured",
			Event::ColonyDestroyed { .. } => "colony_destroyed",
			Event::FacilityDestroyed { .. } => "facility_destroyed",
			Event::ColonyFounded { .. } => "colony_founded",
			Event::ColonizationContested { .. } => "colonization_contested",
			Event::ScoutDetected { .. } => "scout_detected",
			Event::SpyMissionEstablished { .. } => "spy_mission_established",
			Event::SpyMissionYield { .. } => "spy_mission_yield",
			Event::SpyFleetDestroyed { .. } => "spy_fleet_destroyed",
			Event::GuildMissionResolved { .. } => "guild_mission_resolved",
			Event::ProductionCollected { .. } => "production_collected",
			Event::MaintenanceCharged { .. } => "maintenance_charged",
			Event::SalvageRecovered { .. } => "salvage_recovered",
			Event::CapitalShipSeized { .. } => "capital_ship_seized",
			Event::SquadronDisbanded { .. } => "squadron_disbanded",
			Event::FighterSquadronDisbanded { .. } => "fighter_squadron_disbanded",
			Event::PlanetBreakerScrapped { .. } => "planet_breaker_scrapped",
			Event::PrestigeAwarded { .. } => "prestige_awarded",
			Event::HouseEliminated { .. } => "house_eliminated",
			Event::GameWon { .. } => "game_won",
			Event::ActAdvanced { .. } => "act_advanced",
			Event::CommandAccepted { .. } => "command_accepted",
			Event::CommandRejected { .. } => "command_rejected",
			Event::CommandCompleted { .. } => "command_completed",
			Event::CommandFailed { .. } => "command_failed",
			Event::ShipCommissioned { .. } => "ship_commissioned",
			Event::GroundUnitCommissioned { .. } => "ground_unit_commissioned",
			Event::FacilityCompleted { .. } => "facility_completed",
			Event::RepairCompleted { .. } => "repair_completed",
			Event::ResearchAllocated { .. } => "research_allocated",
			Event::ResearchCancelled { .. } => "research_cancelled",
			Event::FleetArrived { .. } => "fleet_arrived",
			Event::FleetHeldByLane { .. } => "fleet_held_by_lane",
			Event::ScoutContact { .. } => "scout_contact",
			Event::ResearchAdvanced { .. } => "research_advanced",
			Event::Breakthrough { .. } => "breakthrough",
		}
	}

	/// House the event is attributed to, for the queryable log.
	pub fn house(&self) -> Option<HouseId> {
		match self {
			Event::ShipCrippled { owner, .. }
			| Event::SquadronDestroyed { owner, .. }
			| Event::FleetDestroyed { owner, .. }
			| Event::FleetRetreated { owner, .. }
			| Event::ColonyFounded { owner, .. }
			| Event::ScoutDetected { owner, .. }
			| Event::SpyMissionEstablished { owner, .. }
			| Event::SpyMissionYield { owner, .. }
			| Event::SpyFleetDestroyed { owner, .. }
			| Event::ColonyDestroyed { owner, .. }
			| Event::FleetArrived { owner, .. }
			| Event::FleetHeldByLane { owner, .. }
			| Event::ShipCommissioned { owner, .. }
			| Event::GroundUnitCommissioned { owner, .. }
			| Event::RepairCompleted { owner, .. } => Some(*owner),
			Event::BlockadeEstablished { by, .. }
			| Event::ColonyBombarded { by, .. }
			| Event::ColonyInvaded { by, .. }
			| Event::ColonyBlitzed { by, .. } => Some(*by),
			Event::ColonizationContested { winner, .. } => Some(*winner),
			Event::GuildMissionResolved { buyer, .. } => Some(*buyer),
			Event::ProductionCollected { house, .. }
			| Event::MaintenanceCharged { house, .. }
			| Event::SalvageRecovered { house, .. }
			| Event::CapitalShipSeized { house, .. }
			| Event::SquadronDisbanded { house, .. }
			| Event::FighterSquadronDisbanded { house, .. }
			| Event::PlanetBreakerScrapped { house, .. }
			| Event::PrestigeAwarded { house, .. }
			| Event::HouseEliminated { house, .. }
			| Event::GameWon { house, .. }
			| Event::CommandAccepted { house, .. }
			| Event::CommandRejected { house, .. }
			| Event::ResearchAllocated { house, .. }
			| Event::ResearchCancelled { house }
			| Event::ResearchAdvanced { house, .. }
			| Event::Breakthrough { house, .. } => Some(*house),
			Event::ColonyCaptured { to, .. } => Some(*to),
			Event::ScoutContact { observer, .. } => Some(*observer),
			Event::SpaceCombat { .. }
			| Event::OrbitalCombat { .. }
			| Event::BlockadeLifted { .. }
			| Event::FacilityDestroyed { .. }
			| Event::ActAdvanced { .. }
			| Event::CommandCompleted { .. }
			| Event::CommandFailed { .. }
			| Event::FacilityCompleted { .. } => None,
		}
	}

	pub fn fleet(&self) -> Option<FleetId> {
		match self {
			Event::FleetDestroyed { fleet, .. }
			| Event::FleetRetreated { fleet, .. }
			| Event::ScoutDetected { fleet, .. }
			| Event::SpyMissionEstablished { fleet, .. }
			| Event::SpyFleetDestroyed { fleet, .. }
			| Event::CommandAccepted { fleet, .. }
			| Event::CommandRejected { fleet, .. }
			| Event::CommandCompleted { fleet, .. }
			| Event::CommandFailed { fleet, .. }
			| Event::FleetArrived { fleet, .. }
			| Event::FleetHeldByLane { fleet, .. } => Some(*fleet),
			_ => None,
		}
	}

	pub fn system(&self) -> Option<SystemId> {
		match self {
			Event::SpaceCombat { system, .. }
			| Event::OrbitalCombat { system, .. }
			| Event::ShipCrippled { system, .. }
			| Event::SquadronDestroyed { system, .. }
			| Event::FleetDestroyed { system, .. }
			| Event::BlockadeEstablished { system, .. }
			| Event::BlockadeLifted { system, .. }
			| Event::ColonyCaptured { system, .. }
			| Event::ColonyDestroyed { system, .. }
			| Event::ColonyFounded { system, .. }
			| Event::ColonizationContested { system, .. }
			| Event::ScoutDetected { system, .. }
			| Event::SpyMissionEstablished { system, .. }
			| Event::SpyMissionYield { system, .. }
			| Event::SpyFleetDestroyed { system, .. }
			| Event::FleetArrived { system, .. }
			| Event::ScoutContact { system, .. } => Some(*system),
			Event::FleetRetreated { from, .. } => Some(*from),
			Event::FleetHeldByLane { at, .. } => Some(*at),
			_ => None,
		}
	}

	/// Human-readable line for the moderator log and event table.
	pub fn description(&self) -> String {
		match self {
			Event::SpaceCombat { system, houses, rounds } => {
				format!("space combat at {} between {} houses over {} rounds", system, houses.len(), rounds)
			}
			Event::BlockadeEstablished { colony, by, .. } => format!("{} blockaded by {}", colony, by),
			Event::ColonyFounded { colony, system, owner, starting_iu } => {
				format!("{} founded {} at {} with {} IU", owner, colony, system, starting_iu)
			}
			Event::ColonyCaptured { colony, from, to, .. } => format!("{} captured {} from {}", to, colony, from),
			Event::CapitalShipSeized { house, squadron, refund } => {
				format!("guild seized {} from {} for {}", squadron, house, refund)
			}
			Event::CommandRejected { house, fleet, reason } => {
				format!("{} command for {} rejected: {}", house, fleet, reason)
			}
			Event::CommandFailed { fleet, kind, reason } => format!("{} {} failed: {}", fleet, kind, reason),
			Event::HouseEliminated { house, reason } => format!("{} eliminated ({:?})", house, reason),
			Event::GameWon { house, condition } => format!("{} wins ({:?})", house, condition),
			other => other.kind_str().to_string(),
		}
	}

	/// Structured payload for the `game_events.data_blob` column.
	pub fn data(&self) -> serde_json::Value {
		serde_json::to_value(self).unwrap_or_else(|_| json!({}))
	}

	pub fn turn_stamped(self, turn: Turn) -> StampedEvent {
		StampedEvent { turn, event: self }
	}
}

/// An event plus the turn it was produced on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedEvent {
	pub turn: Turn,
	pub event: Event,
}
