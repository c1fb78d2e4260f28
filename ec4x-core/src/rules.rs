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

//! The immutable rules bundle. Loaded once at game start by an external
//! configuration collaborator and handed to the engine fully typed; the
//! engine reads but never writes. Identified by `config_hash`, which is
//! stamped on every outbound delta so clients can refuse payloads
//! computed against rules they have not accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::types::{FacilityKind, GroundUnitType, ImprovementKind, PlanetClass, ResourceRating, ShipClass};

/// Static combat profile of a ship class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
	pub attack: u32,
	pub defense: u32,
	/// Flagship rating; at or above `capital_command_rating` the squadron
	/// counts against capital capacity.
	pub command_rating: u32,
	pub build_cost: u32,
	pub maintenance: u32,
	pub cargo_capacity: u32,
	/// Electronic-intelligence contribution for detection rolls.
	pub elint: u8,
}

/// Tunable combat behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatRules {
	pub ships: BTreeMap<ShipClass, ShipStats>,
	/// Combat-effectiveness multiplier table in percent, indexed by a
	/// 2d6-style roll of 0..=10.
	pub effectiveness_percent: [u32; 11],
	/// Chance in percent that a hit is critical and bypasses the
	/// cripple-all-first rule.
	pub critical_hit_percent: u32,
	/// Detection chance in percent indexed by clamped elint advantage
	/// (-5..=5 mapped to 0..=10).
	pub detection_percent: [u32; 11],
	/// Round-1 attack bonus in percent for a cloaked side that is moving.
	pub surprise_bonus_percent: u32,
	/// Round-1 attack bonus in percent for a cloaked side that is holding.
	pub ambush_bonus_percent: u32,
	pub max_rounds: u32,
	pub facility_stats: BTreeMap<FacilityKind, ShipStats>,
	pub ground_attack: BTreeMap<GroundUnitType, u32>,
	pub ground_cost: BTreeMap<GroundUnitType, u32>,
	/// Marine effectiveness divisor when blitzing (skipping the battery
	/// phase). 2 = halved.
	pub blitz_effectiveness_divisor: u32,
	/// Industrial units surviving an invasion, in percent.
	pub invasion_iu_survival_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyRules {
	/// Base production per industrial unit by planet class, in tenths.
	pub planet_output_tenths: BTreeMap<PlanetClass, u32>,
	/// Multiplier by resource rating, in percent.
	pub resource_percent: BTreeMap<ResourceRating, u32>,
	pub improvement_bonus_percent: BTreeMap<ImprovementKind, u32>,
	/// Production lost at a blockaded colony, in percent.
	pub blockade_penalty_percent: u32,
	/// Fraction of original production cost refunded by Guild seizure,
	/// in percent.
	pub seizure_refund_percent: u32,
	/// Fraction of debris value recovered by Salvage, in percent.
	pub salvage_recovery_percent: u32,
	pub facility_cost: BTreeMap<FacilityKind, u32>,
	pub improvement_cost: BTreeMap<ImprovementKind, u32>,
	/// Production points to repair a crippled hull, percent of build cost.
	pub repair_cost_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRules {
	/// Map-size multiplier applied to both squadron capacities.
	pub map_multiplier: u32,
	pub fighter_multiplier: u32,
	/// Turns a house may exceed total/fighter capacity before forced
	/// disbandment.
	pub grace_turns: u32,
	pub capital_command_rating: u32,
}

impl CapacityRules {
	/// `max(8, floor(IU/100) * 2 * map_multiplier)`
	pub fn capital_capacity(&self, total_house_iu: u32) -> u32 {
		((total_house_iu / 100) * 2 * self.map_multiplier).max(8)
	}

	/// `max(20, floor(IU/50) * map_multiplier)`
	pub fn total_capacity(&self, total_house_iu: u32) -> u32 {
		((total_house_iu / 50) * self.map_multiplier).max(20)
	}

	/// `floor(colony_IU/100) * fighter_multiplier`
	pub fn fighter_capacity(&self, colony_iu: u32) -> u32 {
		(colony_iu / 100) * self.fighter_multiplier
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EspionageRules {
	/// Budget above which each further point costs prestige.
	pub over_investment_threshold: i64,
	/// Milli-prestige lost per point above the threshold.
	pub over_investment_millis_per_point: i64,
	pub effect_duration_turns: u32,
	pub effect_magnitude_percent: i64,
	pub guild_mission_cost: i64,
	/// Turns an intel row stays fresh before decay.
	pub intel_max_age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRules {
	/// Cost of level n+1 = base * n * n.
	pub level_cost_base: i64,
	/// A breakthrough roll happens every this many turns.
	pub breakthrough_cadence: u32,
	pub breakthrough_percent: u32,
}

impl ResearchRules {
	pub fn level_cost(&self, current_level: u8) -> i64 {
		self.level_cost_base * i64::from(current_level) * i64::from(current_level)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryRules {
	pub prestige_victory_threshold: i64,
	pub collapse_prestige_floor: i64,
	pub collapse_consecutive_turns: u32,
	pub turn_limit: u32,
	/// Colonized fraction of the map (percent) that opens the mid/late acts.
	pub mid_act_colonized_percent: u32,
	pub late_act_colonized_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeAwards {
	pub colony_founded_millis: i64,
	pub colony_captured_millis: i64,
	pub fleet_destroyed_millis: i64,
	pub battle_won_millis: i64,
	pub research_level_millis: i64,
}

/// The whole bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rules {
	pub combat: CombatRules,
	pub economy: EconomyRules,
	pub capacity: CapacityRules,
	pub espionage: EspionageRules,
	pub research: ResearchRules,
	pub victory: VictoryRules,
	pub prestige: PrestigeAwards,
	/// Starting industrial units granted by a consumed ETAC.
	pub etac_starting_iu: u32,
}

impl Rules {
	pub fn ship(&self, class: ShipClass) -> &ShipStats {
		&self.combat.ships[&class]
	}

	/// Hex sha3-256 of the canonical binary encoding. Stable across runs
	/// for the same bundle.
	pub fn config_hash(&self) -> String {
		let bytes = bincode::serialize(self).expect("rules bundle is serializable");
		let mut hasher = Sha3_256::new();
		hasher.update(&bytes);
		hex::encode(hasher.finalize())
	}
}

fn standard_ships() -> BTreeMap<ShipClass, ShipStats> {
	fn stats(attack: u32, defense: u32, command: u32, cost: u32, cargo: u32, elint: u8) -> ShipStats {
		ShipStats {
			attack,
			defense,
			command_rating: command,
			build_cost: cost,
			maintenance: cost / 20,
			cargo_capacity: cargo,
			elint,
		}
	}
	[
		(ShipClass::Scout, stats(0, 1, 1, 15, 0, 3)),
		(ShipClass::Fighter, stats(2, 1, 0, 8, 0, 0)),
		(ShipClass::Corvette, stats(2, 2, 2, 20, 0, 1)),
		(ShipClass::Frigate, stats(4, 3, 3, 35, 0, 1)),
		(ShipClass::Destroyer, stats(6, 5, 4, 50, 0, 1)),
		(ShipClass::Cruiser, stats(10, 8, 5, 80, 0, 1)),
		(ShipClass::Battlecruiser, stats(14, 10, 6, 120, 0, 1)),
		(ShipClass::Battleship, stats(20, 16, 7, 180, 0, 1)),
		(ShipClass::Dreadnought, stats(28, 24, 8, 260, 0, 1)),
		(ShipClass::Raider, stats(8, 4, 4, 70, 0, 2)),
		(ShipClass::PlanetBreaker, stats(40, 20, 9, 500, 0, 0)),
		(ShipClass::Etac, stats(0, 2, 0, 60, 50, 0)),
		(ShipClass::TroopTransport, stats(0, 3, 0, 45, 6, 0)),
		(ShipClass::Tanker, stats(0, 2, 0, 40, 20, 0)),
	]
	.into_iter()
	.collect()
}

fn standard_facilities() -> BTreeMap<FacilityKind, ShipStats> {
	fn stats(attack: u32, defense: u32) -> ShipStats {
		ShipStats {
			attack,
			defense,
			command_rating: 0,
			build_cost: 0,
			maintenance: 0,
			cargo_capacity: 0,
			elint: 0,
		}
	}
	[
		(FacilityKind::Spaceport, stats(0, 6)),
		(FacilityKind::Shipyard, stats(0, 10)),
		(FacilityKind::Starbase, stats(24, 30)),
		(FacilityKind::PlanetaryShield, stats(0, 40)),
		(FacilityKind::GroundBattery, stats(12, 12)),
	]
	.into_iter()
	.collect()
}

impl Default for Rules {
	fn default() -> Self {
		Self {
			combat: CombatRules {
				ships: standard_ships(),
				effectiveness_percent: [50, 60, 70, 85, 95, 100, 105, 115, 130, 140, 150],
				critical_hit_percent: 10,
				detection_percent: [5, 10, 15, 25, 35, 50, 65, 75, 85, 90, 95],
				surprise_bonus_percent: 50,
				ambush_bonus_percent: 25,
				max_rounds: 10,
				facility_stats: standard_facilities(),
				ground_attack: [(GroundUnitType::Militia, 1), (GroundUnitType::Marine, 3), (GroundUnitType::Armor, 5)]
					.into_iter()
					.collect(),
				ground_cost: [(GroundUnitType::Militia, 5), (GroundUnitType::Marine, 12), (GroundUnitType::Armor, 25)]
					.into_iter()
					.collect(),
				blitz_effectiveness_divisor: 2,
				invasion_iu_survival_percent: 50,
			},
			economy: EconomyRules {
				planet_output_tenths: [
					(PlanetClass::Eden, 15),
					(PlanetClass::Terran, 12),
					(PlanetClass::Arid, 9),
					(PlanetClass::Hostile, 6),
					(PlanetClass::Barren, 3),
				]
				.into_iter()
				.collect(),
				resource_percent: [
					(ResourceRating::VeryPoor, 60),
					(ResourceRating::Poor, 80),
					(ResourceRating::Average, 100),
					(ResourceRating::Rich, 125),
					(ResourceRating::VeryRich, 150),
				]
				.into_iter()
				.collect(),
				improvement_bonus_percent: [
					(ImprovementKind::Terraforming, 20),
					(ImprovementKind::DeepCoreMines, 15),
					(ImprovementKind::OrbitalFarms, 10),
				]
				.into_iter()
				.collect(),
				blockade_penalty_percent: 60,
				seizure_refund_percent: 50,
				salvage_recovery_percent: 50,
				facility_cost: [
					(FacilityKind::Spaceport, 60),
					(FacilityKind::Shipyard, 120),
					(FacilityKind::Starbase, 250),
					(FacilityKind::PlanetaryShield, 180),
					(FacilityKind::GroundBattery, 40),
				]
				.into_iter()
				.collect(),
				improvement_cost: [
					(ImprovementKind::Terraforming, 200),
					(ImprovementKind::DeepCoreMines, 150),
					(ImprovementKind::OrbitalFarms, 100),
				]
				.into_iter()
				.collect(),
				repair_cost_percent: 30,
			},
			capacity: CapacityRules {
				map_multiplier: 1,
				fighter_multiplier: 2,
				grace_turns: 2,
				capital_command_rating: 6,
			},
			espionage: EspionageRules {
				over_investment_threshold: 100,
				over_investment_millis_per_point: 10,
				effect_duration_turns: 3,
				effect_magnitude_percent: 15,
				guild_mission_cost: 50,
				intel_max_age: 10,
			},
			research: ResearchRules { level_cost_base: 40, breakthrough_cadence: 5, breakthrough_percent: 15 },
			victory: VictoryRules {
				prestige_victory_threshold: 1000,
				collapse_prestige_floor: -50,
				collapse_consecutive_turns: 5,
				turn_limit: 120,
				mid_act_colonized_percent: 40,
				late_act_colonized_percent: 75,
			},
			prestige: PrestigeAwards {
				colony_founded_millis: 5_000,
				colony_captured_millis: 10_000,
				fleet_destroyed_millis: 2_000,
				battle_won_millis: 3_000,
				research_level_millis: 1_000,
			},
			etac_starting_iu: 3,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn capacity_formulas_match_the_book() {
		let cap = CapacityRules {
			map_multiplier: 1,
			fighter_multiplier: 2,
			grace_turns: 2,
			capital_command_rating: 6,
		};
		// 350 IU: floor(350/100)*2 = 6 < 8, so the floor of 8 holds.
		assert_eq!(cap.capital_capacity(350), 8);
		assert_eq!(cap.capital_capacity(600), 12);
		assert_eq!(cap.total_capacity(350), 20);
		assert_eq!(cap.total_capacity(1500), 30);
		assert_eq!(cap.fighter_capacity(250), 4);
		assert_eq!(cap.fighter_capacity(99), 0);
	}

	#[test]
	fn config_hash_is_stable_and_sensitive() {
		let a = Rules::default();
		let b = Rules::default();
		assert_eq!(a.config_hash(), b.config_hash());

		let mut c = Rules::default();
		c.economy.blockade_penalty_percent = 59;
		assert_ne!(a.config_hash(), c.config_hash());
	}
}
