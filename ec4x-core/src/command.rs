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

//! Typed commands, the packets that carry them, and standing orders.
//!
//! Persistent commands occupy a fleet's single active slot and span
//! turns (submit -> validate -> activate -> execute). Zero-turn
//! administrative commands execute immediately inside the Command phase
//! under the store's invariants. Standing orders are rules, not
//! behaviors: they are evaluated at Production step 1 and write the
//! active slot, nothing else.

use serde::{Deserialize, Serialize};

use crate::types::{
	ColonyId, FleetId, GameId, GroundUnitId, HouseId, ResearchTrack, ShipId, SquadronId, SystemId, Turn,
};

/// A persistent fleet command. The target system (where applicable) is
/// where arrival flips the fleet to `Executing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
	// movement
	Move { to: SystemId },
	Patrol { to: SystemId },
	Hold,
	SeekHome,
	JoinFleet { target: FleetId },
	Rendezvous { at: SystemId, with: FleetId },
	// hostile
	Bombard { colony_system: SystemId },
	Invade { colony_system: SystemId },
	Blitz { colony_system: SystemId },
	Blockade { colony_system: SystemId },
	// expansion
	Colonize { system: SystemId },
	Salvage { colony_system: SystemId },
	// espionage
	SpyPlanet { system: SystemId },
	HackStarbase { system: SystemId },
	RecallSpies,
	// status
	Reserve,
	Mothball,
	Reactivate,
	View { system: SystemId },
}

impl Command {
	/// The system this command travels to, if it has one. Commands
	/// without a destination execute where the fleet stands.
	pub fn destination(&self) -> Option<SystemId> {
		match self {
			Command::Move { to } | Command::Patrol { to } => Some(*to),
			Command::Rendezvous { at, .. } => Some(*at),
			Command::Bombard { colony_system }
			| Command::Invade { colony_system }
			| Command::Blitz { colony_system }
			| Command::Blockade { colony_system }
			| Command::Salvage { colony_system } => Some(*colony_system),
			Command::Colonize { system } | Command::SpyPlanet { system } | Command::HackStarbase { system } => {
				Some(*system)
			}
			Command::View { system } => Some(*system),
			Command::Hold
			| Command::SeekHome
			| Command::JoinFleet { .. }
			| Command::RecallSpies
			| Command::Reserve
			| Command::Mothball
			| Command::Reactivate => None,
		}
	}

	/// Commands that finish inside Production rather than triggering a
	/// Conflict/Income execution.
	pub fn completes_in_production(&self) -> bool {
		matches!(
			self,
			Command::Move { .. }
				| Command::Hold | Command::SeekHome
				| Command::JoinFleet { .. }
				| Command::Rendezvous { .. }
				| Command::Reserve | Command::Mothball
				| Command::Reactivate
				| Command::View { .. }
		)
	}

	pub fn kind_str(&self) -> &'static str {
		match self {
			Command::Move { .. } => "move",
			Command::Patrol { .. } => "patrol",
			Command::Hold => "hold",
			Command::SeekHome => "seek_home",
			Command::JoinFleet { .. } => "join_fleet",
			Command::Rendezvous { .. } => "rendezvous",
			Command::Bombard { .. } => "bombard",
			Command::Invade { .. } => "invade",
			Command::Blitz { .. } => "blitz",
			Command::Blockade { .. } => "blockade",
			Command::Colonize { .. } => "colonize",
			Command::Salvage { .. } => "salvage",
			Command::SpyPlanet { .. } => "spy_planet",
			Command::HackStarbase { .. } => "hack_starbase",
			Command::RecallSpies => "recall_spies",
			Command::Reserve => "reserve",
			Command::Mothball => "mothball",
			Command::Reactivate => "reactivate",
			Command::View { .. } => "view",
		}
	}
}

/// A rule stored on a fleet that generates an active command when the
/// slot is empty at Production step 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandingOrder {
	/// Seek out and colonize the nearest known empty system.
	AutoColonize,
	/// Move to the nearest friendly shipyard when any member is crippled.
	AutoRepair,
	/// Cycle patrol between the fleet's current system and `with`.
	AutoPatrol { with: SystemId },
	/// Return to the house's highest-industry colony.
	ReturnHome,
	/// Hold position indefinitely.
	HoldStation,
}

/// Immediate, zero-turn administrative commands. These run inside the
/// Command phase, under the store's invariants, and never occupy a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdminCommand {
	ReorganizeSquadrons { fleet: FleetId, squadron: SquadronId, ships: Vec<ShipId> },
	TransferCargo { from: ShipId, to: ShipId },
	MergeFleets { dst: FleetId, src: FleetId },
	SetRoe { fleet: FleetId, roe: u8 },
	SetStandingOrder { fleet: FleetId, order: Option<StandingOrder> },
	SetTaxRate { colony: ColonyId, rate: u8 },
	SetAutoBalance { enabled: bool },
	LoadGroundUnit { unit: GroundUnitId, transport: ShipId },
	LandGroundUnit { unit: GroundUnitId, colony: ColonyId },
}

/// One fleet order inside a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetOrder {
	pub fleet: FleetId,
	pub command: Command,
}

/// A build order inside a packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOrder {
	pub colony: ColonyId,
	pub target: crate::entities::BuildTarget,
	pub priority: u8,
}

/// Allocation of production points across research tracks for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchAllocation {
	pub points: Vec<(ResearchTrack, i64)>,
}

impl ResearchAllocation {
	pub fn total(&self) -> i64 {
		self.points.iter().map(|(_, p)| *p).sum()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EspionageBuy {
	pub espionage_points: i64,
	pub counter_intel_points: i64,
	pub guild_missions: Vec<(crate::entities::GuildMissionKind, HouseId)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiplomaticAction {
	Declare { against: HouseId, state: crate::types::DiplomaticState },
}

/// Everything one house submits for one turn. Addressed by the
/// `(game, turn, house)` triple; a replayed packet for the same triple
/// supersedes the previous one until the turn resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPacket {
	pub game: GameId,
	pub turn: Turn,
	pub house: HouseId,
	pub admin: Vec<AdminCommand>,
	pub fleet_orders: Vec<FleetOrder>,
	pub build_orders: Vec<BuildOrder>,
	pub research: Option<ResearchAllocation>,
	pub espionage: Option<EspionageBuy>,
	pub diplomacy: Vec<DiplomaticAction>,
}

impl CommandPacket {
	pub fn empty(game: GameId, turn: Turn, house: HouseId) -> Self {
		Self {
			game,
			turn,
			house,
			admin: Vec::new(),
			fleet_orders: Vec::new(),
			build_orders: Vec::new(),
			research: None,
			espionage: None,
			diplomacy: Vec::new(),
		}
	}
}

/// Why a submitted command was rejected during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
	UnknownFleet(FleetId),
	NotYourFleet(FleetId),
	FleetMothballed(FleetId),
	GarrisonCannotMove(FleetId),
	UnknownSystem(SystemId),
	UnknownColony(ColonyId),
	NoEtac(FleetId),
	NoScouts(FleetId),
	NoTransports(FleetId),
	TargetNotHostile(SystemId),
	TargetOccupied(SystemId),
	DiplomaticallyForbidden(HouseId),
	SlotOccupied(FleetId),
}

impl std::fmt::Display for RejectReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RejectReason::UnknownFleet(id) => write!(f, "{} does not exist", id),
			RejectReason::NotYourFleet(id) => write!(f, "{} belongs to another house", id),
			RejectReason::FleetMothballed(id) => write!(f, "{} is mothballed", id),
			RejectReason::GarrisonCannotMove(id) => write!(f, "{} is a colony garrison", id),
			RejectReason::UnknownSystem(id) => write!(f, "{} does not exist", id),
			RejectReason::UnknownColony(id) => write!(f, "{} does not exist", id),
			RejectReason::NoEtac(id) => write!(f, "{} carries no ETAC", id),
			RejectReason::NoScouts(id) => write!(f, "{} carries no scouts", id),
			RejectReason::NoTransports(id) => write!(f, "{} carries no troop transports", id),
			RejectReason::TargetNotHostile(id) => write!(f, "no hostile presence at {}", id),
			RejectReason::TargetOccupied(id) => write!(f, "{} is already colonized", id),
			RejectReason::DiplomaticallyForbidden(id) => write!(f, "diplomatic state with {} forbids this", id),
			RejectReason::SlotOccupied(id) => write!(f, "{} already has an active command", id),
		}
	}
}
