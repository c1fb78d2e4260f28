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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::espionage::IntelDatabase;
use crate::types::{DiplomaticState, HouseId, ResearchTrack, TechField, Turn};

/// Research levels per track. Levels start at 1 and only ever advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechLevels {
	pub economic: u8,
	pub science: u8,
	pub fields: BTreeMap<TechField, u8>,
}

impl Default for TechLevels {
	fn default() -> Self {
		Self { economic: 1, science: 1, fields: TechField::ALL.iter().map(|f| (*f, 1)).collect() }
	}
}

impl TechLevels {
	pub fn level(&self, track: ResearchTrack) -> u8 {
		match track {
			ResearchTrack::Economic => self.economic,
			ResearchTrack::Science => self.science,
			ResearchTrack::Tech(field) => self.fields.get(&field).copied().unwrap_or(1),
		}
	}

	pub fn advance(&mut self, track: ResearchTrack) {
		match track {
			ResearchTrack::Economic => self.economic = self.economic.saturating_add(1),
			ResearchTrack::Science => self.science = self.science.saturating_add(1),
			ResearchTrack::Tech(field) => {
				let level = self.fields.entry(field).or_insert(1);
				*level = level.saturating_add(1);
			}
		}
	}

	/// Electronic-intelligence level, the one tech level combat detection
	/// and scout-on-scout rolls read.
	pub fn elint(&self) -> u8 {
		self.level(ResearchTrack::Tech(TechField::Electronics))
	}
}

/// One player house. Never removed from the store; defeat sets the
/// `eliminated` flag instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
	pub id: HouseId,
	pub name: String,
	pub treasury: i64,
	pub prestige: i64,
	/// Partial prestige accrued during the running turn, in thousandths.
	/// Rounded half-up into `prestige` once, at Income step 9.
	pub prestige_pending_millis: i64,
	pub tech: TechLevels,
	pub research_points: BTreeMap<ResearchTrack, i64>,
	pub espionage_budget: i64,
	pub counter_intel_budget: i64,
	pub eliminated: bool,
	pub eliminated_turn: Option<Turn>,
	/// Consecutive Income phases spent below the collapse threshold.
	pub low_prestige_turns: u32,
	/// Turns spent above total squadron capacity; enforcement starts when
	/// this passes the grace period.
	pub total_overage_turns: u32,
	/// Espionage purchase submitted in the Command phase, processed at
	/// Income step 2 of the following turn.
	pub pending_espionage: Option<crate::command::EspionageBuy>,
	pub relations: BTreeMap<HouseId, DiplomaticState>,
	pub intel: IntelDatabase,
	/// Verification key for this house's command packets (raw ed25519).
	pub public_key: Vec<u8>,
	/// Colony automation: auto-balance squadrons across the house's fleets.
	pub auto_balance_squadrons: bool,
}

impl House {
	pub fn new(id: HouseId, name: impl Into<String>, public_key: Vec<u8>) -> Self {
		Self {
			id,
			name: name.into(),
			treasury: 0,
			prestige: 0,
			prestige_pending_millis: 0,
			tech: TechLevels::default(),
			research_points: BTreeMap::new(),
			espionage_budget: 0,
			counter_intel_budget: 0,
			eliminated: false,
			eliminated_turn: None,
			low_prestige_turns: 0,
			total_overage_turns: 0,
			pending_espionage: None,
			relations: BTreeMap::new(),
			intel: IntelDatabase::default(),
			public_key,
			auto_balance_squadrons: false,
		}
	}

	pub fn relation_with(&self, other: HouseId) -> DiplomaticState {
		if other == self.id {
			return DiplomaticState::Allied;
		}
		self.relations.get(&other).copied().unwrap_or_default()
	}

	pub fn is_hostile_to(&self, other: HouseId) -> bool {
		self.relation_with(other) == DiplomaticState::Hostile
	}

	/// Queue partial prestige, in thousandths of a point.
	pub fn award_prestige_millis(&mut self, millis: i64) {
		self.prestige_pending_millis += millis;
	}

	/// Commit pending prestige, rounding half-up (negative awards round
	/// half-down, symmetrically).
	pub fn settle_prestige(&mut self) -> i64 {
		let pending = self.prestige_pending_millis;
		self.prestige_pending_millis = 0;
		let whole = if pending >= 0 { (pending + 500) / 1000 } else { (pending - 500) / 1000 };
		self.prestige += whole;
		whole
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prestige_settles_half_up() {
		let mut h = House::new(HouseId(1), "Atreides", vec![]);
		h.award_prestige_millis(1500);
		assert_eq!(h.settle_prestige(), 2);
		assert_eq!(h.prestige, 2);

		h.award_prestige_millis(1499);
		assert_eq!(h.settle_prestige(), 1);

		h.award_prestige_millis(-2500);
		assert_eq!(h.settle_prestige(), -3);
	}

	#[test]
	fn self_relation_is_allied() {
		let h = House::new(HouseId(3), "Corrino", vec![]);
		assert_eq!(h.relation_with(HouseId(3)), DiplomaticState::Allied);
		assert_eq!(h.relation_with(HouseId(4)), DiplomaticState::Neutral);
	}
}
