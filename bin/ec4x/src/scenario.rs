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

//! Scenario loading: a TOML description of houses, systems, lanes and
//! starting forces, validated up front. Parse and range errors are all
//! collected and reported together before any side effect.

use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use ec4x_core::{
	entities::{House, Lane, StarSystem},
	store::GameStore,
	types::{GamePhase, HouseId, LaneClass, PlanetClass, ResourceRating, ShipClass, SystemId},
};

#[derive(Debug, Deserialize)]
struct ScenarioFile {
	name: String,
	#[serde(default)]
	id: Option<u64>,
	#[serde(default)]
	houses: Vec<HouseDef>,
	#[serde(default)]
	systems: Vec<SystemDef>,
	#[serde(default)]
	lanes: Vec<LaneDef>,
}

#[derive(Debug, Deserialize)]
struct HouseDef {
	name: String,
	#[serde(default)]
	public_key: String,
}

#[derive(Debug, Deserialize)]
struct SystemDef {
	name: String,
	coords: (i32, i32),
	class: String,
	rating: String,
	#[serde(default)]
	colony: Option<ColonyDef>,
	#[serde(default)]
	fleet: Option<FleetDef>,
}

#[derive(Debug, Deserialize)]
struct ColonyDef {
	house: String,
	industrial_units: u32,
}

#[derive(Debug, Deserialize)]
struct FleetDef {
	house: String,
	class: String,
	count: u32,
}

#[derive(Debug, Deserialize)]
struct LaneDef {
	endpoints: (String, String),
	class: String,
}

#[derive(Debug)]
pub struct ScenarioError(pub Vec<String>);

impl std::fmt::Display for ScenarioError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		writeln!(f, "scenario rejected with {} problem(s):", self.0.len())?;
		for problem in &self.0 {
			writeln!(f, "  - {}", problem)?;
		}
		Ok(())
	}
}

impl std::error::Error for ScenarioError {}

/// Load and fully validate a scenario. Every problem found is reported;
/// nothing is created unless the whole file is sound.
pub fn load(path: &Path) -> Result<(String, GameStore), ScenarioError> {
	let text = fs::read_to_string(path)
		.map_err(|e| ScenarioError(vec![format!("cannot read {}: {}", path.display(), e)]))?;
	let file: ScenarioFile =
		toml::from_str(&text).map_err(|e| ScenarioError(vec![format!("TOML parse error: {}", e)]))?;

	let mut problems = Vec::new();
	if file.houses.len() < 2 {
		problems.push("a game needs at least two houses".to_string());
	}
	if file.systems.is_empty() {
		problems.push("a game needs at least one system".to_string());
	}

	let mut store = GameStore::new(file.id.unwrap_or_else(|| derive_game_id(&file.name)));
	let mut houses: BTreeMap<String, HouseId> = BTreeMap::new();
	for house in &file.houses {
		if houses.contains_key(&house.name) {
			problems.push(format!("duplicate house '{}'", house.name));
			continue;
		}
		let key = match hex::decode(&house.public_key) {
			Ok(key) if key.is_empty() || key.len() == 32 => key,
			Ok(_) => {
				problems.push(format!("house '{}': public key must be 32 bytes of hex", house.name));
				Vec::new()
			}
			Err(e) => {
				problems.push(format!("house '{}': bad public key hex: {}", house.name, e));
				Vec::new()
			}
		};
		let name = house.name.clone();
		let id = store.houses.insert_with(|id| House::new(id, name, key));
		houses.insert(house.name.clone(), id);
	}

	let mut systems: BTreeMap<String, SystemId> = BTreeMap::new();
	for system in &file.systems {
		if systems.contains_key(&system.name) {
			problems.push(format!("duplicate system '{}'", system.name));
			continue;
		}
		let class = match parse_planet_class(&system.class) {
			Some(c) => c,
			None => {
				problems.push(format!("system '{}': unknown planet class '{}'", system.name, system.class));
				PlanetClass::Barren
			}
		};
		let rating = match parse_rating(&system.rating) {
			Some(r) => r,
			None => {
				problems.push(format!("system '{}': unknown resource rating '{}'", system.name, system.rating));
				ResourceRating::Average
			}
		};
		let name = system.name.clone();
		let coords = system.coords;
		let id = store.systems.insert_with(|id| StarSystem {
			id,
			name,
			coords,
			planet_class: class,
			resource_rating: rating,
		});
		systems.insert(system.name.clone(), id);
	}

	for lane in &file.lanes {
		let a = systems.get(&lane.endpoints.0);
		let b = systems.get(&lane.endpoints.1);
		let class = parse_lane_class(&lane.class);
		match (a, b, class) {
			(Some(a), Some(b), Some(class)) if a != b => {
				let (a, b) = (*a, *b);
				store.lanes.insert_with(|id| Lane { id, endpoints: (a, b), class });
			}
			(Some(a), Some(b), _) if a == b => {
				problems.push(format!("lane loops on system '{}'", lane.endpoints.0))
			}
			(None, _, _) => problems.push(format!("lane references unknown system '{}'", lane.endpoints.0)),
			(_, None, _) => problems.push(format!("lane references unknown system '{}'", lane.endpoints.1)),
			(_, _, None) => problems.push(format!("unknown lane class '{}'", lane.class)),
			(Some(_), Some(_), Some(_)) => unreachable!("covered by the a != b and a == b guards above"),
		}
	}

	store.reindex();
	// colonies and starting fleets, once all the ids exist
	for system in &file.systems {
		let Some(system_id) = systems.get(&system.name).copied() else { continue };
		if let Some(colony) = &system.colony {
			match houses.get(&colony.house) {
				Some(house) => {
					if colony.industrial_units == 0 {
						problems.push(format!("colony at '{}' needs at least 1 IU", system.name));
					} else if let Err(e) = store.found_colony(system_id, *house, colony.industrial_units, 1) {
						problems.push(format!("colony at '{}': {}", system.name, e));
					}
				}
				None => problems.push(format!("colony at '{}' owned by unknown house '{}'", system.name, colony.house)),
			}
		}
		if let Some(fleet) = &system.fleet {
			match (houses.get(&fleet.house), parse_ship_class(&fleet.class)) {
				(Some(house), Some(class)) => {
					if fleet.count == 0 {
						problems.push(format!("fleet at '{}' needs at least 1 ship", system.name));
					} else {
						match store.create_fleet(*house, system_id) {
							Ok(fleet_id) => {
								if let Err(e) = store.commission_squadron(fleet_id, class, fleet.count, 1) {
									problems.push(format!("fleet at '{}': {}", system.name, e));
								}
							}
							Err(e) => problems.push(format!("fleet at '{}': {}", system.name, e)),
						}
					}
				}
				(None, _) => {
					problems.push(format!("fleet at '{}' owned by unknown house '{}'", system.name, fleet.house))
				}
				(_, None) => problems.push(format!("fleet at '{}': unknown ship class '{}'", system.name, fleet.class)),
			}
		}
	}

	store.phase = GamePhase::Setup;
	store.reindex();
	if let Err(violations) = store.audit() {
		for violation in violations {
			problems.push(format!("inconsistent scenario: {}", violation));
		}
	}
	if problems.is_empty() {
		Ok((file.name, store))
	} else {
		Err(ScenarioError(problems))
	}
}

fn derive_game_id(name: &str) -> u64 {
	use std::collections::hash_map::DefaultHasher;
	use std::hash::{Hash, Hasher};
	let mut hasher = DefaultHasher::new();
	name.hash(&mut hasher);
	hasher.finish()
}

fn parse_planet_class(text: &str) -> Option<PlanetClass> {
	match text.to_ascii_lowercase().as_str() {
		"eden" => Some(PlanetClass::Eden),
		"terran" => Some(PlanetClass::Terran),
		"arid" => Some(PlanetClass::Arid),
		"hostile" => Some(PlanetClass::Hostile),
		"barren" => Some(PlanetClass::Barren),
		_ => None,
	}
}

fn parse_rating(text: &str) -> Option<ResourceRating> {
	match text.to_ascii_lowercase().as_str() {
		"very-poor" | "very_poor" => Some(ResourceRating::VeryPoor),
		"poor" => Some(ResourceRating::Poor),
		"average" => Some(ResourceRating::Average),
		"rich" => Some(ResourceRating::Rich),
		"very-rich" | "very_rich" => Some(ResourceRating::VeryRich),
		_ => None,
	}
}

fn parse_lane_class(text: &str) -> Option<LaneClass> {
	match text.to_ascii_lowercase().as_str() {
		"restricted" => Some(LaneClass::Restricted),
		"minor" => Some(LaneClass::Minor),
		"major" => Some(LaneClass::Major),
		_ => None,
	}
}

fn parse_ship_class(text: &str) -> Option<ShipClass> {
	match text.to_ascii_lowercase().as_str() {
		"scout" => Some(ShipClass::Scout),
		"fighter" => Some(ShipClass::Fighter),
		"corvette" => Some(ShipClass::Corvette),
		"frigate" => Some(ShipClass::Frigate),
		"destroyer" => Some(ShipClass::Destroyer),
		"cruiser" => Some(ShipClass::Cruiser),
		"battlecruiser" => Some(ShipClass::Battlecruiser),
		"battleship" => Some(ShipClass::Battleship),
		"dreadnought" => Some(ShipClass::Dreadnought),
		"raider" => Some(ShipClass::Raider),
		"planet-breaker" | "planet_breaker" => Some(ShipClass::PlanetBreaker),
		"etac" => Some(ShipClass::Etac),
		"troop-transport" | "troop_transport" => Some(ShipClass::TroopTransport),
		"tanker" => Some(ShipClass::Tanker),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write_scenario(text: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(text.as_bytes()).unwrap();
		file
	}

	const GOOD: &str = r#"
name = "Test War"

[[houses]]
name = "Atreides"

[[houses]]
name = "Harkonnen"

[[systems]]
name = "Caladan"
coords = [0, 0]
class = "terran"
rating = "average"
colony = { house = "Atreides", industrial_units = 60 }
fleet = { house = "Atreides", class = "cruiser", count = 2 }

[[systems]]
name = "Giedi Prime"
coords = [4, 0]
class = "hostile"
rating = "rich"
colony = { house = "Harkonnen", industrial_units = 60 }

[[lanes]]
endpoints = ["Caladan", "Giedi Prime"]
class = "minor"
"#;

	#[test]
	fn good_scenario_builds_a_consistent_store() {
		let file = write_scenario(GOOD);
		let (name, store) = load(file.path()).unwrap();
		assert_eq!(name, "Test War");
		assert_eq!(store.houses.len(), 2);
		assert_eq!(store.systems.len(), 2);
		assert_eq!(store.colonies.len(), 2);
		assert_eq!(store.fleets.len(), 1);
		assert!(store.audit().is_ok());
	}

	#[test]
	fn all_problems_are_collected_before_rejection() {
		let broken = r#"
name = "Broken"

[[houses]]
name = "Atreides"

[[systems]]
name = "Caladan"
coords = [0, 0]
class = "gasgiant"
rating = "legendary"
colony = { house = "Fremen", industrial_units = 10 }

[[lanes]]
endpoints = ["Caladan", "Nowhere"]
class = "hyper"
"#;
		let file = write_scenario(broken);
		let err = load(file.path()).unwrap_err();
		let text = err.to_string();
		assert!(text.contains("two houses"));
		assert!(text.contains("planet class"));
		assert!(text.contains("resource rating"));
		assert!(text.contains("unknown house 'Fremen'"));
		assert!(text.contains("unknown system 'Nowhere'"));
		assert!(err.0.len() >= 5);
	}
}
