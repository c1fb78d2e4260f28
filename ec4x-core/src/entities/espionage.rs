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

//! Intelligence records and espionage state. An `IntelDatabase` is the
//! only thing the fog-of-war projector will reveal about foreign assets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{FleetId, HouseId, IntelQuality, MissionId, SystemId, Turn};

/// What an observer believes about one foreign fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetObservation {
	pub fleet: FleetId,
	pub owner: HouseId,
	pub squadron_count: u32,
	/// Only populated at `Scan` quality or better.
	pub ship_classes: Vec<(crate::types::ShipClass, u32)>,
}

/// One row of a house's intelligence database, keyed by system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemIntel {
	pub system: SystemId,
	pub quality: IntelQuality,
	pub observed: Turn,
	pub colony_owner: Option<HouseId>,
	pub colony_industrial_units: Option<u32>,
	pub fleets: Vec<FleetObservation>,
}

/// Per-house intelligence store. Rows are upserted keeping the better
/// of (quality, recency) and decay per the rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntelDatabase {
	pub systems: BTreeMap<SystemId, SystemIntel>,
	/// While set, new rows are rejected (espionage intel-block effect).
	pub blocked_until: Option<Turn>,
}

impl IntelDatabase {
	/// Insert or refresh a row. An older row survives only if it is both
	/// more recent in quality and not older in turn.
	pub fn record(&mut self, intel: SystemIntel) {
		if let Some(until) = self.blocked_until {
			if intel.observed <= until {
				return;
			}
		}
		match self.systems.get(&intel.system) {
			Some(existing) if existing.observed == intel.observed && existing.quality > intel.quality => {}
			_ => {
				self.systems.insert(intel.system, intel);
			}
		}
	}

	/// Drop rows older than `max_age` turns, keeping `Perfect` rows one
	/// grade degraded instead of removed.
	pub fn decay(&mut self, now: Turn, max_age: u32) {
		let cutoff = now.saturating_sub(max_age);
		self.systems.retain(|_, row| {
			if row.observed >= cutoff {
				return true;
			}
			if row.quality == IntelQuality::Perfect {
				row.quality = IntelQuality::Spy;
				row.observed = cutoff;
				return true;
			}
			false
		});
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpyMissionKind {
	SpyPlanet,
	HackStarbase,
}

/// A fleet-based espionage mission registered at its target system.
/// Destroyed on detection or recall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpyMission {
	pub id: MissionId,
	pub fleet: FleetId,
	pub owner: HouseId,
	pub kind: SpyMissionKind,
	pub target: SystemId,
	pub started: Turn,
	pub scout_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EspionageEffectKind {
	ResearchReduction,
	NetColonyValueReduction,
	TaxReduction,
	FacilityCrippled,
	IntelBlock,
	IntelCorruption,
}

/// An ongoing effect applied against `target` each Income phase until
/// its timer runs out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EspionageEffect {
	pub kind: EspionageEffectKind,
	pub source: HouseId,
	pub target: HouseId,
	/// Interpretation depends on kind: percent for reductions, facility
	/// id for crippling.
	pub magnitude: i64,
	pub remaining_turns: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GuildMissionKind {
	IntelTheft,
	Sabotage,
	CounterIntelSweep,
}

/// A budget-funded, non-fleet mission queued at purchase time and
/// resolved from the intent queue in the next Conflict phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMission {
	pub buyer: HouseId,
	pub kind: GuildMissionKind,
	pub target: HouseId,
	pub invested: i64,
	pub purchased: Turn,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ShipClass;

	fn row(system: u32, quality: IntelQuality, observed: Turn) -> SystemIntel {
		SystemIntel {
			system: SystemId(system),
			quality,
			observed,
			colony_owner: None,
			colony_industrial_units: None,
			fleets: vec![],
		}
	}

	#[test]
	fn better_quality_same_turn_wins() {
		let mut db = IntelDatabase::default();
		db.record(row(1, IntelQuality::Spy, 4));
		db.record(row(1, IntelQuality::Visual, 4));
		assert_eq!(db.systems[&SystemId(1)].quality, IntelQuality::Spy);

		db.record(row(1, IntelQuality::Visual, 5));
		assert_eq!(db.systems[&SystemId(1)].quality, IntelQuality::Visual);
	}

	#[test]
	fn decay_degrades_perfect_rows() {
		let mut db = IntelDatabase::default();
		db.record(row(1, IntelQuality::Perfect, 1));
		db.record(row(2, IntelQuality::Visual, 1));
		db.decay(20, 5);
		assert_eq!(db.systems[&SystemId(1)].quality, IntelQuality::Spy);
		assert!(!db.systems.contains_key(&SystemId(2)));
	}

	#[test]
	fn blocked_database_rejects_rows() {
		let mut db = IntelDatabase::default();
		db.blocked_until = Some(6);
		db.record(row(1, IntelQuality::Visual, 5));
		assert!(db.systems.is_empty());
		db.record(SystemIntel {
			fleets: vec![FleetObservation {
				fleet: FleetId(9),
				owner: HouseId(2),
				squadron_count: 1,
				ship_classes: vec![(ShipClass::Scout, 1)],
			}],
			..row(1, IntelQuality::Visual, 7)
		});
		assert!(db.systems.contains_key(&SystemId(1)));
	}
}
