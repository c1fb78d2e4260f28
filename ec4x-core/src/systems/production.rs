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

//! Production phase: standing-order activation, travel, arrival
//! detection, administrative completion, scout sweeps, construction,
//! research advancement, cleanup.

use crate::{
	command::{Command, StandingOrder},
	entities::{BuildTarget, Facility, FleetObservation, RepairTarget, SystemIntel},
	error::Result,
	events::Event,
	store::PendingShip,
	types::{
		ColonyId, CombatState, FacilityKind, FleetId, FleetStatus, HouseId, IntelQuality, MissionState, ProjectId,
		ResearchTrack, ShipClass, SystemId,
	},
};

use super::{combat, travel, Phase};

pub(crate) fn run(phase: &mut Phase<'_>) -> Result<()> {
	activate_standing_orders(phase);
	travel_and_arrivals(phase)?;
	administrative_completion(phase)?;
	scout_sweep(phase);
	construction(phase)?;
	research_advancement(phase);
	cleanup(phase);
	Ok(())
}

/// Step 1: standing orders write empty active slots; every fleet with an
/// active command starts traveling.
fn activate_standing_orders(phase: &mut Phase<'_>) {
	let fleet_ids: Vec<FleetId> = phase.store.fleets.ids();
	for fleet_id in fleet_ids {
		let (owner, location, standing, idle, awake) = {
			let Some(fleet) = phase.store.fleets.get(fleet_id) else { continue };
			if fleet.is_garrison() {
				continue;
			}
			(
				fleet.owner,
				fleet.location,
				fleet.standing.clone(),
				fleet.active.is_none(),
				fleet.status != FleetStatus::Mothballed,
			)
		};
		if idle && awake {
			if let Some(order) = standing {
				if let Some(command) = evaluate_standing(phase, fleet_id, owner, location, &order) {
					let turn = phase.turn;
					let fleet = phase.store.fleets.get_mut(fleet_id).expect("listed");
					fleet.active = Some(crate::entities::ActiveCommand { command, issued: turn });
				}
			}
		}
		let turn = phase.turn;
		let fleet = phase.store.fleets.get_mut(fleet_id).expect("listed");
		if fleet.active.is_some() {
			fleet.mission_state = MissionState::Traveling;
			if fleet.mission_started.is_none() {
				fleet.mission_started = Some(turn);
			}
		}
	}
}

/// Evaluate a standing order into a concrete command, or nothing when
/// its conditions do not hold. Target selection reads the owner's
/// fog-of-war, never authoritative state.
fn evaluate_standing(
	phase: &Phase<'_>,
	fleet_id: FleetId,
	owner: HouseId,
	location: SystemId,
	order: &StandingOrder,
) -> Option<Command> {
	match order {
		StandingOrder::HoldStation => Some(Command::Hold),
		StandingOrder::AutoPatrol { with } => (*with != location).then_some(Command::Patrol { to: *with }),
		StandingOrder::ReturnHome => {
			let home = home_colony_system(phase, owner)?;
			(home != location).then_some(Command::Move { to: home })
		}
		StandingOrder::AutoRepair => {
			if !fleet_has_crippled(phase, fleet_id) {
				return None;
			}
			let avoid = travel::barred_from_restricted(phase, fleet_id);
			let yard = travel::nearest_matching(phase, location, avoid, |sys| {
				friendly_colony_with(phase, owner, sys, FacilityKind::Shipyard)
			})?;
			(yard != location).then_some(Command::Move { to: yard })
		}
		StandingOrder::AutoColonize => {
			let avoid = travel::barred_from_restricted(phase, fleet_id);
			let house = phase.store.houses.get(owner)?;
			let target = travel::nearest_matching(phase, location, avoid, |sys| {
				// believed empty: nothing in this house's intel says
				// otherwise, and it is not one of its own colonies
				let own = phase
					.store
					.indices()
					.colony_at(sys)
					.and_then(|c| phase.store.colonies.get(c))
					.map(|c| c.owner == owner)
					.unwrap_or(false);
				if own {
					return false;
				}
				match house.intel.systems.get(&sys) {
					Some(row) => row.colony_owner.is_none(),
					None => true,
				}
			})?;
			(target != location || phase.store.indices().colony_at(location).is_none())
				.then_some(Command::Colonize { system: target })
		}
	}
}

fn fleet_has_crippled(phase: &Phase<'_>, fleet_id: FleetId) -> bool {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return false };
	fleet
		.squadrons
		.iter()
		.filter_map(|sq| phase.store.squadrons.get(*sq))
		.flat_map(|sq| sq.members.iter())
		.chain(fleet.auxiliaries.iter())
		.filter_map(|s| phase.store.ships.get(*s))
		.any(|s| s.state.is_crippled())
}

fn friendly_colony_with(phase: &Phase<'_>, owner: HouseId, system: SystemId, kind: FacilityKind) -> bool {
	let Some(colony_id) = phase.store.indices().colony_at(system) else { return false };
	let Some(colony) = phase.store.colonies.get(colony_id) else { return false };
	colony.owner == owner
		&& phase
			.store
			.indices()
			.facilities_at(colony_id)
			.iter()
			.filter_map(|f| phase.store.facilities.get(*f))
			.any(|f| f.kind == kind && !f.state.is_crippled())
}

/// The house's highest-industry colony system.
fn home_colony_system(phase: &Phase<'_>, owner: HouseId) -> Option<SystemId> {
	phase
		.store
		.colonies
		.values()
		.filter(|c| c.owner == owner)
		.max_by_key(|c| (c.industrial_units, std::cmp::Reverse(c.id)))
		.map(|c| c.system)
}

/// Steps 2-3: move traveling fleets and flip arrivals to `Executing`.
fn travel_and_arrivals(phase: &mut Phase<'_>) -> Result<()> {
	let travelers: Vec<FleetId> = phase
		.store
		.fleets
		.iter()
		.filter(|(_, f)| f.mission_state == MissionState::Traveling)
		.filter(|(_, f)| {
			// a mothballed fleet can hold exactly one order: reactivate
			f.status != FleetStatus::Mothballed
				|| matches!(f.active.as_ref().map(|a| &a.command), Some(Command::Reactivate))
		})
		.map(|(id, _)| id)
		.collect();
	for fleet_id in travelers {
		let Some(fleet) = phase.store.fleets.get(fleet_id) else { continue };
		let owner = fleet.owner;
		let location = fleet.location;
		let Some(active) = fleet.active.as_ref() else { continue };
		let command = active.command.clone();

		let dest = match &command {
			Command::SeekHome => {
				let avoid = travel::barred_from_restricted(phase, fleet_id);
				travel::nearest_matching(phase, location, avoid, |sys| {
					phase
						.store
						.indices()
						.colony_at(sys)
						.and_then(|c| phase.store.colonies.get(c))
						.map(|c| c.owner == owner)
						.unwrap_or(false)
				})
			}
			Command::JoinFleet { target } => phase.store.fleets.get(*target).map(|f| f.location),
			_ => command.destination(),
		};
		let Some(dest) = dest else {
			// destination-free commands execute where the fleet stands
			let fleet = phase.store.fleets.get_mut(fleet_id).expect("listed");
			fleet.mission_state = MissionState::Executing;
			continue;
		};

		let arrived = if dest == location {
			Some(location)
		} else {
			match travel::advance(phase, fleet_id, dest) {
				Some(at) if at == dest => Some(at),
				Some(_) => None,
				None => {
					phase.events.push(Event::FleetHeldByLane { fleet: fleet_id, owner, at: location });
					phase.events.push(Event::CommandFailed {
						fleet: fleet_id,
						kind: command.kind_str().to_string(),
						reason: "no traversable lane path".into(),
					});
					if let Some(fleet) = phase.store.fleets.get_mut(fleet_id) {
						fleet.clear_mission();
					}
					None
				}
			}
		};
		if let Some(at) = arrived {
			let fleet = phase.store.fleets.get_mut(fleet_id).expect("listed");
			fleet.mission_state = MissionState::Executing;
			phase.events.push(Event::FleetArrived { fleet: fleet_id, owner, system: at });
			// arriving at an enemy colony leaves a calling card; covert
			// missions keep their silence until they report or die
			let covert = matches!(command, Command::SpyPlanet { .. } | Command::HackStarbase { .. });
			if !covert {
				record_arrival_intel(phase, owner, at);
			}
		}
	}
	Ok(())
}

/// A fleet's arrival at a foreign colony system files a visual report.
fn record_arrival_intel(phase: &mut Phase<'_>, owner: HouseId, system: SystemId) {
	let observation = {
		let colony = phase.store.indices().colony_at(system).and_then(|c| phase.store.colonies.get(c));
		match colony {
			Some(c) if c.owner != owner => SystemIntel {
				system,
				quality: IntelQuality::Visual,
				observed: phase.turn,
				colony_owner: Some(c.owner),
				colony_industrial_units: Some(c.industrial_units),
				fleets: Vec::new(),
			},
			_ => return,
		}
	};
	if let Some(house) = phase.store.houses.get_mut(owner) {
		house.intel.record(observation);
	}
}

/// Step 4: commands that complete inside Production (moves, merges,
/// status changes) are finalized here.
fn administrative_completion(phase: &mut Phase<'_>) -> Result<()> {
	let executing: Vec<FleetId> = phase
		.store
		.fleets
		.iter()
		.filter(|(_, f)| f.mission_state == MissionState::Executing)
		.filter(|(_, f)| {
			f.active.as_ref().map(|a| a.command.completes_in_production()).unwrap_or(false)
		})
		.map(|(id, _)| id)
		.collect();
	for fleet_id in executing {
		let Some(fleet) = phase.store.fleets.get(fleet_id) else { continue };
		let owner = fleet.owner;
		let location = fleet.location;
		let command = fleet.active.as_ref().map(|a| a.command.clone()).expect("filtered");
		let kind = command.kind_str().to_string();

		let mut completed = true;
		match &command {
			Command::JoinFleet { target } => {
				let target = *target;
				let co_located = phase
					.store
					.fleets
					.get(target)
					.map(|t| t.location == location && t.owner == owner)
					.unwrap_or(false);
				if co_located {
					// clear first; the merged-away fleet disappears
					if let Some(f) = phase.store.fleets.get_mut(fleet_id) {
						f.clear_mission();
					}
					phase.store.merge_fleets(target, fleet_id)?;
					phase.events.push(Event::CommandCompleted { fleet: fleet_id, kind });
					continue;
				} else if !phase.store.fleets.contains(target) {
					phase.events.push(Event::CommandFailed {
						fleet: fleet_id,
						kind,
						reason: "join target no longer exists".into(),
					});
					if let Some(f) = phase.store.fleets.get_mut(fleet_id) {
						f.clear_mission();
					}
					continue;
				}
				completed = false; // keep chasing
			}
			Command::Rendezvous { at, with } => {
				let partner_here = phase
					.store
					.fleets
					.get(*with)
					.map(|f| f.location == *at)
					.unwrap_or(false);
				if partner_here && location == *at {
					let with = *with;
					if let Some(f) = phase.store.fleets.get_mut(fleet_id) {
						f.clear_mission();
					}
					phase.store.merge_fleets(with, fleet_id)?;
					phase.events.push(Event::CommandCompleted { fleet: fleet_id, kind });
					continue;
				}
				completed = false; // wait on station
			}
			Command::Reserve => set_status(phase, fleet_id, FleetStatus::Reserve),
			Command::Mothball => set_status(phase, fleet_id, FleetStatus::Mothballed),
			Command::Reactivate => set_status(phase, fleet_id, FleetStatus::Active),
			Command::View { system } => {
				let system = *system;
				let row = view_intel(phase, system);
				if let Some(house) = phase.store.houses.get_mut(owner) {
					house.intel.record(row);
				}
			}
			Command::Move { .. } | Command::Hold | Command::SeekHome => {}
			_ => {}
		}
		if completed {
			if let Some(f) = phase.store.fleets.get_mut(fleet_id) {
				f.clear_mission();
			}
			phase.events.push(Event::CommandCompleted { fleet: fleet_id, kind });
		}
	}
	Ok(())
}

fn set_status(phase: &mut Phase<'_>, fleet_id: FleetId, status: FleetStatus) {
	if let Some(fleet) = phase.store.fleets.get_mut(fleet_id) {
		fleet.status = status;
	}
}

/// Scan-quality report of a system for a View arrival.
fn view_intel(phase: &Phase<'_>, system: SystemId) -> SystemIntel {
	let colony = phase.store.indices().colony_at(system).and_then(|c| phase.store.colonies.get(c));
	SystemIntel {
		system,
		quality: IntelQuality::Scan,
		observed: phase.turn,
		colony_owner: colony.map(|c| c.owner),
		colony_industrial_units: colony.map(|c| c.industrial_units),
		fleets: Vec::new(),
	}
}

/// Step 5: scout-on-scout detection. Both sides roll independently; a
/// success files a visual-quality report. No combat ensues.
fn scout_sweep(phase: &mut Phase<'_>) {
	let systems: Vec<SystemId> = phase.store.indices().fleets_by_location.keys().copied().collect();
	for system in systems {
		let scouts: Vec<(FleetId, HouseId)> = phase
			.store
			.indices()
			.fleets_at(system)
			.iter()
			.copied()
			.filter(|f| travel::is_pure_scout_fleet(phase, *f))
			.filter_map(|f| phase.store.fleets.get(f).map(|fleet| (f, fleet.owner)))
			.collect();
		for (i, (_observer_fleet, observer)) in scouts.iter().enumerate() {
			for (j, (observed_fleet, observed)) in scouts.iter().enumerate() {
				if i == j || observer == observed {
					continue;
				}
				let observer_elint = combat::house_elint_at(phase, *observer, system);
				let observed_elint = phase
					.store
					.houses
					.get(*observed)
					.map(|h| h.tech.elint())
					.unwrap_or(1);
				if combat::detection_roll(phase.rng, phase.rules, observer_elint, observed_elint) {
					let row = SystemIntel {
						system,
						quality: IntelQuality::Visual,
						observed: phase.turn,
						colony_owner: None,
						colony_industrial_units: None,
						fleets: vec![FleetObservation {
							fleet: *observed_fleet,
							owner: *observed,
							squadron_count: phase
								.store
								.fleets
								.get(*observed_fleet)
								.map(|f| f.squadrons.len() as u32)
								.unwrap_or(0),
							ship_classes: Vec::new(),
						}],
					};
					if let Some(house) = phase.store.houses.get_mut(*observer) {
						house.intel.record(row);
					}
					phase.events.push(Event::ScoutContact { observer: *observer, observed: *observed, system });
				}
			}
		}
	}
}

/// Step 6: advance build queues. Planetary defense commissions at once;
/// ship hulls wait in the pending buffer for the next Command phase.
fn construction(phase: &mut Phase<'_>) -> Result<()> {
	let colony_ids: Vec<ColonyId> = phase.store.colonies.ids();
	for colony_id in colony_ids {
		loop {
			let (front, mut stockpile, owner) = {
				let Some(colony) = phase.store.colonies.get(colony_id) else { break };
				(colony.build_queue.front().copied(), colony.stockpile, colony.owner)
			};
			let Some(project_id) = front else { break };
			if stockpile == 0 {
				break;
			}
			let project_row = phase
				.store
				.projects
				.get(project_id)
				.map(|p| (p.cost.saturating_sub(p.progress), p.target.clone()));
			let (remaining, target) = match project_row {
				Some(row) => row,
				None => {
					phase.store.remove_project(project_id);
					continue;
				}
			};
			let spend = remaining.min(stockpile);
			stockpile -= spend;
			{
				let colony = phase.store.colonies.get_mut(colony_id).expect("listed");
				colony.stockpile = stockpile;
			}
			let done = {
				let project = phase.store.projects.get_mut(project_id).expect("checked");
				project.progress += spend;
				project.is_complete()
			};
			if !done {
				break;
			}
			phase.store.remove_project(project_id);
			complete_project(phase, colony_id, owner, target)?;
		}
	}
	Ok(())
}

fn complete_project(phase: &mut Phase<'_>, colony_id: ColonyId, owner: HouseId, target: BuildTarget) -> Result<()> {
	match target {
		BuildTarget::Facility(kind) => {
			let id = phase.store.facilities.insert_with(|id| Facility {
				id,
				owner,
				colony: colony_id,
				kind,
				state: CombatState::Undamaged,
			});
			phase.store.reindex();
			phase.events.push(Event::FacilityCompleted { facility: id, colony: colony_id, kind });
		}
		BuildTarget::Ground(kind) => {
			phase.store.raise_ground_unit(colony_id, kind)?;
			phase.events.push(Event::GroundUnitCommissioned { colony: colony_id, owner, kind });
		}
		BuildTarget::Improvement(kind) => {
			if let Some(colony) = phase.store.colonies.get_mut(colony_id) {
				colony.improvements.insert(kind);
			}
		}
		BuildTarget::Repair(RepairTarget::Ship(ship)) => {
			if let Some(s) = phase.store.ships.get_mut(ship) {
				s.state = CombatState::Undamaged;
				phase.events.push(Event::RepairCompleted { colony: colony_id, owner });
			}
		}
		BuildTarget::Repair(RepairTarget::Facility(facility)) => {
			if let Some(f) = phase.store.facilities.get_mut(facility) {
				f.state = CombatState::Undamaged;
				phase.events.push(Event::RepairCompleted { colony: colony_id, owner });
			}
		}
		BuildTarget::Ship(ShipClass::Fighter) => {
			// fighters defend from the moment they roll off the line
			let system = phase.store.colony(colony_id)?.system;
			let garrison = match phase.store.colony(colony_id)?.garrison {
				Some(g) => g,
				None => {
					let g = phase.store.create_fleet(owner, system)?;
					phase.store.fleets.get_mut(g).expect("just created").home_colony = Some(colony_id);
					phase.store.colonies.get_mut(colony_id).expect("exists").garrison = Some(g);
					g
				}
			};
			let tech = phase.store.houses.get(owner).map(|h| h.tech.elint()).unwrap_or(1);
			let sq = phase.store.commission_squadron(garrison, ShipClass::Fighter, 1, tech)?;
			let ship = phase.store.squadrons.get(sq).expect("just created").members[0];
			phase.events.push(Event::ShipCommissioned { ship, owner, colony: colony_id, class: ShipClass::Fighter });
		}
		BuildTarget::Ship(class) => {
			let tech = phase
				.store
				.houses
				.get(owner)
				.map(|h| h.tech.level(ResearchTrack::Tech(crate::types::TechField::Weapons)))
				.unwrap_or(1);
			phase.store.pending_ships.push(PendingShip {
				colony: colony_id,
				owner,
				class,
				tech_at_build: tech,
				completed: phase.turn,
			});
		}
	}
	Ok(())
}

/// Step 7: buy research levels out of accumulated points, economic then
/// science then fields, with breakthrough rolls on the cadence.
fn research_advancement(phase: &mut Phase<'_>) {
	let houses = phase.store.living_houses();
	for house_id in houses {
		let mut advanced: Vec<(ResearchTrack, u8)> = Vec::new();
		{
			let Some(house) = phase.store.houses.get_mut(house_id) else { continue };
			for track in ResearchTrack::in_priority_order() {
				loop {
					let level = house.tech.level(track);
					let cost = phase.rules.research.level_cost(level);
					let points = house.research_points.entry(track).or_insert(0);
					if *points < cost {
						break;
					}
					*points -= cost;
					house.tech.advance(track);
					advanced.push((track, house.tech.level(track)));
				}
			}
		}
		for (track, level) in advanced {
			phase.events.push(Event::ResearchAdvanced {
				house: house_id,
				track: track_name(track),
				level,
			});
			let millis = phase.rules.prestige.research_level_millis;
			if let Some(house) = phase.store.houses.get_mut(house_id) {
				house.award_prestige_millis(millis);
			}
		}
		// breakthrough cadence
		if phase.turn % phase.rules.research.breakthrough_cadence == 0
			&& crate::rng::roll_percent(phase.rng, phase.rules.research.breakthrough_percent)
		{
			let track = {
				let Some(house) = phase.store.houses.get(house_id) else { continue };
				ResearchTrack::in_priority_order()
					.min_by_key(|t| (house.tech.level(*t), track_rank(*t)))
					.expect("tracks exist")
			};
			if let Some(house) = phase.store.houses.get_mut(house_id) {
				house.tech.advance(track);
			}
			phase.events.push(Event::Breakthrough { house: house_id, track: track_name(track) });
		}
	}
}

fn track_name(track: ResearchTrack) -> String {
	match track {
		ResearchTrack::Economic => "economic".into(),
		ResearchTrack::Science => "science".into(),
		ResearchTrack::Tech(field) => format!("{:?}", field).to_lowercase(),
	}
}

fn track_rank(track: ResearchTrack) -> u8 {
	ResearchTrack::in_priority_order().position(|t| t == track).unwrap_or(u8::MAX as usize) as u8
}

/// Step 8: cleanup. Intel decays, spy missions without fleets vanish,
/// indices rebuild, the turn counter advances.
fn cleanup(phase: &mut Phase<'_>) {
	let max_age = phase.rules.espionage.intel_max_age;
	let turn = phase.turn;
	let house_ids: Vec<HouseId> = phase.store.houses.ids();
	for house_id in house_ids {
		if let Some(house) = phase.store.houses.get_mut(house_id) {
			house.intel.decay(turn, max_age);
			if let Some(until) = house.intel.blocked_until {
				if until <= turn {
					house.intel.blocked_until = None;
				}
			}
		}
	}
	let orphaned: Vec<_> = phase
		.store
		.spy_missions
		.iter()
		.filter(|(_, m)| !phase.store.fleets.contains(m.fleet))
		.map(|(id, _)| id)
		.collect();
	for mission in orphaned {
		phase.store.remove_spy_mission(mission);
	}
	let orphan_projects: Vec<ProjectId> = phase
		.store
		.projects
		.iter()
		.filter(|(_, p)| !phase.store.colonies.contains(p.colony))
		.map(|(id, _)| id)
		.collect();
	for project in orphan_projects {
		phase.store.remove_project(project);
	}
	phase.store.reindex();
	phase.store.turn += 1;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		entities::{House, Lane, StarSystem},
		rng::phase_rng,
		rules::Rules,
		store::GameStore,
		types::{LaneClass, PlanetClass, ResourceRating, TurnPhase},
	};

	fn two_system_world() -> (GameStore, HouseId, SystemId, SystemId) {
		let mut store = GameStore::new(6);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let a = store.systems.insert_with(|id| StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		let b = store.systems.insert_with(|id| StarSystem {
			id,
			name: "Arrakis".into(),
			coords: (1, 0),
			planet_class: PlanetClass::Arid,
			resource_rating: ResourceRating::VeryRich,
		});
		store.lanes.insert_with(|id| Lane { id, endpoints: (a, b), class: LaneClass::Minor });
		store.reindex();
		(store, house, a, b)
	}

	fn run_production(store: &mut GameStore, rules: &Rules, turn: u32) -> Vec<Event> {
		let mut events = Vec::new();
		let mut rng = phase_rng(6, turn, TurnPhase::Production);
		let mut phase = Phase { store, rules, events: &mut events, rng: &mut rng, turn };
		run(&mut phase).unwrap();
		events
	}

	#[test]
	fn move_command_travels_and_arrives() {
		let (mut store, house, a, b) = two_system_world();
		let fleet = store.create_fleet(house, a).unwrap();
		store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		store.fleets.get_mut(fleet).unwrap().active = Some(crate::entities::ActiveCommand {
			command: Command::Move { to: b },
			issued: 1,
		});
		let rules = Rules::default();
		let events = run_production(&mut store, &rules, 1);

		assert!(events.iter().any(|e| matches!(e, Event::FleetArrived { fleet: f, .. } if *f == fleet)));
		assert!(events.iter().any(|e| matches!(e, Event::CommandCompleted { fleet: f, .. } if *f == fleet)));
		let f = store.fleets.get(fleet).unwrap();
		assert_eq!(f.location, b);
		assert_eq!(f.mission_state, MissionState::Idle);
		assert!(f.active.is_none());
	}

	#[test]
	fn auto_repair_standing_order_generates_a_move() {
		let (mut store, house, a, b) = two_system_world();
		let colony = store.found_colony(b, house, 30, 1).unwrap();
		store.facilities.insert_with(|id| Facility {
			id,
			owner: house,
			colony,
			kind: FacilityKind::Shipyard,
			state: CombatState::Undamaged,
		});
		store.reindex();
		let fleet = store.create_fleet(house, a).unwrap();
		let sq = store.commission_squadron(fleet, ShipClass::Cruiser, 1, 1).unwrap();
		let ship = store.squadrons.get(sq).unwrap().members[0];
		store.ships.get_mut(ship).unwrap().state = CombatState::Crippled;
		store.fleets.get_mut(fleet).unwrap().standing = Some(StandingOrder::AutoRepair);
		store.reindex();
		let rules = Rules::default();

		let events = run_production(&mut store, &rules, 1);
		// one minor hop: the fleet reached the shipyard and arrived
		assert!(events.iter().any(|e| matches!(e, Event::FleetArrived { fleet: f, .. } if *f == fleet)));
		assert_eq!(store.fleets.get(fleet).unwrap().location, b);
	}

	#[test]
	fn construction_buffers_ships_but_commissions_defenses() {
		let (mut store, house, a, _) = two_system_world();
		let colony = store.found_colony(a, house, 30, 1).unwrap();
		store.colonies.get_mut(colony).unwrap().stockpile = 1_000;
		store
			.enqueue_build(colony, BuildTarget::Facility(FacilityKind::GroundBattery), 40, 0)
			.unwrap();
		store.enqueue_build(colony, BuildTarget::Ship(ShipClass::Corvette), 20, 1).unwrap();
		let rules = Rules::default();

		let events = run_production(&mut store, &rules, 1);
		assert!(events.iter().any(|e| matches!(e, Event::FacilityCompleted { .. })));
		// the corvette is parked for the next Command phase
		assert!(!events.iter().any(|e| matches!(e, Event::ShipCommissioned { class: ShipClass::Corvette, .. })));
		assert_eq!(store.pending_ships.len(), 1);
		assert_eq!(store.pending_ships[0].class, ShipClass::Corvette);
	}

	#[test]
	fn research_levels_purchase_in_priority_order() {
		let (mut store, house, a, _) = two_system_world();
		store.found_colony(a, house, 30, 1).unwrap();
		let rules = Rules::default();
		// enough for exactly one economic level (cost = 40 * 1 * 1)
		store
			.houses
			.get_mut(house)
			.unwrap()
			.research_points
			.insert(ResearchTrack::Economic, rules.research.level_cost(1));
		let events = run_production(&mut store, &rules, 1);
		assert!(events
			.iter()
			.any(|e| matches!(e, Event::ResearchAdvanced { track, level: 2, .. } if track == "economic")));
		assert_eq!(store.houses.get(house).unwrap().tech.economic, 2);
	}
}
