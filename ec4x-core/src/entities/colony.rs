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

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{
	ColonyId, FacilityId, FacilityKind, FleetId, GroundUnitId, GroundUnitType, HouseId, ImprovementKind, ProjectId,
	ShipClass, ShipId, SystemId, Turn,
};

/// A settled system. Created only by Colonize execution, destroyed only
/// by capture transfer, never silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colony {
	pub id: ColonyId,
	pub system: SystemId,
	pub owner: HouseId,
	pub population: u32,
	pub industrial_units: u32,
	pub improvements: BTreeSet<ImprovementKind>,
	/// Build queue, front first. Projects live in the store; this is
	/// ordering only.
	pub build_queue: VecDeque<ProjectId>,
	/// Percent of gross output taxed into the treasury, 0..=100.
	pub tax_rate: u8,
	/// Set during Conflict blockade resolution, consumed by Income,
	/// cleared during Production cleanup.
	pub blockaded: bool,
	pub ground_units: BTreeSet<GroundUnitId>,
	/// Garrison fleet hosting fighter squadrons based here, if any.
	pub garrison: Option<FleetId>,
	/// Recoverable wreck value left by combat overhead, in production points.
	pub debris: u32,
	/// Untaxed production accumulated for the build queue; spent during
	/// the Production phase.
	pub stockpile: u32,
	/// Turns the colony has exceeded its fighter capacity; disbandment
	/// starts when this passes the grace period.
	pub fighter_overage_turns: u32,
	pub founded: Turn,
}

impl Colony {
	pub fn new(id: ColonyId, system: SystemId, owner: HouseId, industrial_units: u32, founded: Turn) -> Self {
		Self {
			id,
			system,
			owner,
			population: industrial_units * 10,
			industrial_units,
			improvements: BTreeSet::new(),
			build_queue: VecDeque::new(),
			tax_rate: 50,
			blockaded: false,
			ground_units: BTreeSet::new(),
			garrison: None,
			debris: 0,
			stockpile: 0,
			fighter_overage_turns: 0,
			founded,
		}
	}
}

/// Fixed installation at a colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
	pub id: FacilityId,
	pub owner: HouseId,
	pub colony: ColonyId,
	pub kind: FacilityKind,
	pub state: crate::types::CombatState,
}

/// What a construction project produces on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildTarget {
	Ship(ShipClass),
	Facility(FacilityKind),
	Ground(GroundUnitType),
	Improvement(ImprovementKind),
	Repair(RepairTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairTarget {
	Ship(ShipId),
	Facility(FacilityId),
}

/// An in-progress construction order at a colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildProject {
	pub id: ProjectId,
	pub colony: ColonyId,
	pub target: BuildTarget,
	/// Production points sunk so far.
	pub progress: u32,
	pub cost: u32,
	/// Lower runs first within a queue position tie.
	pub priority: u8,
}

impl BuildProject {
	pub fn is_complete(&self) -> bool {
		self.progress >= self.cost
	}
}
