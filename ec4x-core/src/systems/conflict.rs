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

//! Conflict phase. Executes the commands of fleets that arrived at
//! their targets last Production, in the fixed step order: space
//! combat, orbital combat, blockades, planetary combat, colonization,
//! espionage, administrative completion.

use std::collections::BTreeMap;

use crate::{
	command::Command,
	entities::SpyMissionKind,
	error::Result,
	events::Event,
	types::{ColonyId, FleetId, HouseId, MissionState, ShipClass, SystemId},
};

use super::{combat, ground, spies, Phase};

pub(crate) fn run(phase: &mut Phase<'_>) -> Result<()> {
	space_combat(phase)?;
	orbital_combat(phase)?;
	blockades(phase)?;
	planetary_combat(phase)?;
	colonization(phase)?;
	espionage(phase)?;
	administrative_completion(phase);
	Ok(())
}

/// Step 1: fleet engagements wherever hostile houses share a system.
fn space_combat(phase: &mut Phase<'_>) -> Result<()> {
	let systems: Vec<SystemId> = phase.store.indices().fleets_by_location.keys().copied().collect();
	for system in systems {
		// group this system's mobile, non-scout fleets by house
		let mut by_house: BTreeMap<HouseId, Vec<FleetId>> = BTreeMap::new();
		for fleet_id in phase.store.indices().fleets_at(system).to_vec() {
			let Some(fleet) = phase.store.fleets.get(fleet_id) else { continue };
			if fleet.is_garrison() || combat::is_scout_only(phase, fleet) {
				continue;
			}
			by_house.entry(fleet.owner).or_default().push(fleet_id);
		}
		let houses: Vec<HouseId> = by_house.keys().copied().collect();
		let any_hostility = houses
			.iter()
			.any(|a| houses.iter().any(|b| a != b && house_hostile(phase, *a, *b)));
		if !any_hostility {
			continue;
		}
		let combatants: Vec<HouseId> = houses
			.iter()
			.copied()
			.filter(|a| houses.iter().any(|b| a != b && house_hostile(phase, *a, *b)))
			.collect();

		let mut forces: Vec<combat::TaskForce> = combatants
			.iter()
			.map(|house| combat::task_force_from_fleets(phase, *house, &by_house[house]))
			.collect();
		let outcome = combat::fight(phase, system, &mut forces);
		if outcome.rounds > 0 {
			phase.events.push(Event::SpaceCombat {
				system,
				houses: combatants.clone(),
				rounds: outcome.rounds,
			});
		}
		combat::apply_outcome(phase, system, &outcome)?;
		for wiped in &outcome.wiped {
			for survivor in combatants.iter().filter(|h| *h != wiped) {
				let millis = phase.rules.prestige.battle_won_millis;
				if let Some(house) = phase.store.houses.get_mut(*survivor) {
					house.award_prestige_millis(millis);
				}
			}
		}
	}
	Ok(())
}

/// Step 2: survivors engage starbases and garrison fighters over
/// hostile colonies with the same round mechanic.
fn orbital_combat(phase: &mut Phase<'_>) -> Result<()> {
	let colonies: Vec<(ColonyId, SystemId, HouseId)> =
		phase.store.colonies.iter().map(|(id, c)| (id, c.system, c.owner)).collect();
	for (colony_id, system, defender) in colonies {
		let hostiles: BTreeMap<HouseId, Vec<FleetId>> = hostile_fleets_at(phase, system, defender);
		if hostiles.is_empty() {
			continue;
		}
		let defense = defense_force(phase, colony_id, system, defender);
		if defense.units.is_empty() {
			continue;
		}
		let attacker = hostiles.keys().next().copied().expect("nonempty");
		let mut forces = vec![defense];
		for (house, fleets) in &hostiles {
			forces.push(combat::task_force_from_fleets(phase, *house, fleets));
		}
		let outcome = combat::fight(phase, system, &mut forces);
		if outcome.rounds > 0 {
			phase.events.push(Event::OrbitalCombat { system, attacker, defender });
		}
		combat::apply_outcome(phase, system, &outcome)?;
	}
	Ok(())
}

fn defense_force(phase: &Phase<'_>, colony_id: ColonyId, system: SystemId, defender: HouseId) -> combat::TaskForce {
	let garrison_fleets: Vec<FleetId> = phase
		.store
		.colonies
		.get(colony_id)
		.and_then(|c| c.garrison)
		.into_iter()
		.collect();
	let mut force = combat::task_force_from_fleets(phase, defender, &garrison_fleets);
	force.never_retreats = true;
	force.cloaked = false;
	for facility_id in phase.store.indices().facilities_at(colony_id).to_vec() {
		let Some(facility) = phase.store.facilities.get(facility_id) else { continue };
		if facility.kind != crate::types::FacilityKind::Starbase {
			continue;
		}
		let stats = &phase.rules.combat.facility_stats[&facility.kind];
		force.units.push(combat::Combatant {
			ship: None,
			facility: Some(facility_id),
			fleet: None,
			attack: stats.attack,
			defense: stats.defense,
			crippled: facility.state.is_crippled(),
			destroyed: false,
		});
	}
	force
}

/// Step 3: blockade intents. The strongest surviving hostile force with
/// a blockade command flips the colony flag for the Income phase.
fn blockades(phase: &mut Phase<'_>) -> Result<()> {
	let colonies: Vec<(ColonyId, SystemId, HouseId, bool)> = phase
		.store
		.colonies
		.iter()
		.map(|(id, c)| (id, c.system, c.owner, c.blockaded))
		.collect();
	for (colony_id, system, owner, was_blockaded) in colonies {
		let mut best: Option<(u64, HouseId)> = None;
		for fleet_id in phase.store.indices().fleets_at(system).to_vec() {
			let Some(fleet) = phase.store.fleets.get(fleet_id) else { continue };
			if fleet.mission_state != MissionState::Executing {
				continue;
			}
			if !matches!(fleet.active.as_ref().map(|a| &a.command), Some(Command::Blockade { .. })) {
				continue;
			}
			if !house_hostile(phase, fleet.owner, owner) {
				continue;
			}
			let force = combat::task_force_from_fleets(phase, fleet.owner, &[fleet_id]);
			let strength = force.attack_strength(2);
			match best {
				Some((s, _)) if s >= strength => {}
				_ => best = Some((strength, fleet.owner)),
			}
		}
		match best {
			Some((_, by)) => {
				phase.store.colonies.get_mut(colony_id).expect("listed above").blockaded = true;
				if !was_blockaded {
					phase.events.push(Event::BlockadeEstablished { colony: colony_id, system, by });
				}
			}
			None if was_blockaded => {
				phase.store.colonies.get_mut(colony_id).expect("listed above").blockaded = false;
				phase.events.push(Event::BlockadeLifted { colony: colony_id, system });
			}
			None => {}
		}
	}
	Ok(())
}

/// Step 4: bombard/invade/blitz intents, invade first, then blitz, then
/// bombard, within a colony.
fn planetary_combat(phase: &mut Phase<'_>) -> Result<()> {
	#[derive(PartialEq, Eq, PartialOrd, Ord)]
	enum Strike {
		Invade,
		Blitz,
		Bombard,
	}
	let mut intents: Vec<(ColonyId, Strike, FleetId)> = Vec::new();
	for (fleet_id, fleet) in phase.store.fleets.iter() {
		if fleet.mission_state != MissionState::Executing {
			continue;
		}
		let Some(active) = &fleet.active else { continue };
		let (strike, target) = match &active.command {
			Command::Invade { colony_system } => (Strike::Invade, *colony_system),
			Command::Blitz { colony_system } => (Strike::Blitz, *colony_system),
			Command::Bombard { colony_system } => (Strike::Bombard, *colony_system),
			_ => continue,
		};
		if fleet.location != target {
			continue;
		}
		let Some(colony_id) = phase.store.indices().colony_at(target) else { continue };
		let Some(colony) = phase.store.colonies.get(colony_id) else { continue };
		if !house_hostile(phase, fleet.owner, colony.owner) {
			continue;
		}
		intents.push((colony_id, strike, fleet_id));
	}
	intents.sort_by(|a, b| (a.0, &a.1, a.2).cmp(&(b.0, &b.1, b.2)));

	for (colony_id, strike, fleet_id) in intents {
		// the colony may have fallen or changed hands earlier this step
		if !phase.store.colonies.contains(colony_id) || !phase.store.fleets.contains(fleet_id) {
			continue;
		}
		let still_hostile = {
			let colony = phase.store.colony(colony_id)?;
			let fleet = phase.store.fleet(fleet_id)?;
			house_hostile(phase, fleet.owner, colony.owner)
		};
		if !still_hostile {
			continue;
		}
		match strike {
			Strike::Invade => {
				ground::invade(phase, fleet_id, colony_id)?;
			}
			Strike::Blitz => {
				ground::blitz(phase, fleet_id, colony_id)?;
			}
			Strike::Bombard => ground::bombard(phase, fleet_id, colony_id)?,
		}
	}
	Ok(())
}

/// Step 5: colonization. Contested systems go to the greatest
/// combat-ready escort, ties to the lowest fleet id; every contender's
/// ETAC is consumed.
fn colonization(phase: &mut Phase<'_>) -> Result<()> {
	let mut contenders: BTreeMap<SystemId, Vec<(u64, FleetId, HouseId)>> = BTreeMap::new();
	for (fleet_id, fleet) in phase.store.fleets.iter() {
		if fleet.mission_state != MissionState::Executing {
			continue;
		}
		let Some(active) = &fleet.active else { continue };
		let Command::Colonize { system } = &active.command else { continue };
		if fleet.location != *system {
			continue;
		}
		let escort = escort_strength(phase, fleet_id);
		contenders.entry(*system).or_default().push((escort, fleet_id, fleet.owner));
	}

	for (system, mut rivals) in contenders {
		if phase.store.indices().colony_at(system).is_some() {
			for (_, fleet_id, _) in rivals {
				phase.events.push(Event::CommandFailed {
					fleet: fleet_id,
					kind: "colonize".into(),
					reason: "system already colonized".into(),
				});
			}
			continue;
		}
		// greatest escort wins; ties break by lowest fleet id
		rivals.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
		let (_, winner_fleet, winner_house) = rivals[0];
		let losers: Vec<HouseId> = rivals[1..].iter().map(|(_, _, h)| *h).collect();

		let mut founded = false;
		for (_, fleet_id, house) in &rivals {
			let Some(etac) = find_etac(phase, *fleet_id) else {
				phase.events.push(Event::CommandFailed {
					fleet: *fleet_id,
					kind: "colonize".into(),
					reason: "no ETAC aboard".into(),
				});
				continue;
			};
			// every rival's ETAC is consumed, winner or not
			phase.store.destroy_ship(etac)?;
			if *fleet_id == winner_fleet && !founded {
				let colony =
					phase.store.found_colony(system, *house, phase.rules.etac_starting_iu, phase.turn)?;
				founded = true;
				phase.events.push(Event::ColonyFounded {
					colony,
					system,
					owner: *house,
					starting_iu: phase.rules.etac_starting_iu,
				});
				let millis = phase.rules.prestige.colony_founded_millis;
				if let Some(h) = phase.store.houses.get_mut(*house) {
					h.award_prestige_millis(millis);
				}
			}
		}
		if founded && !losers.is_empty() {
			phase.events.push(Event::ColonizationContested { system, winner: winner_house, losers });
		}
	}
	Ok(())
}

/// Attack strength of a fleet's undamaged combat ships.
fn escort_strength(phase: &Phase<'_>, fleet_id: FleetId) -> u64 {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return 0 };
	fleet
		.squadrons
		.iter()
		.filter_map(|sq| phase.store.squadrons.get(*sq))
		.flat_map(|sq| sq.members.iter())
		.filter_map(|s| phase.store.ships.get(*s))
		.filter(|s| !s.state.is_crippled() && !s.class.is_auxiliary())
		.map(|s| u64::from(phase.rules.ship(s.class).attack))
		.sum()
}

fn find_etac(phase: &Phase<'_>, fleet_id: FleetId) -> Option<crate::types::ShipId> {
	let fleet = phase.store.fleets.get(fleet_id)?;
	fleet
		.auxiliaries
		.iter()
		.copied()
		.chain(
			fleet
				.squadrons
				.iter()
				.filter_map(|sq| phase.store.squadrons.get(*sq))
				.flat_map(|sq| sq.members.iter().copied()),
		)
		.find(|s| phase.store.ships.get(*s).map(|ship| ship.class == ShipClass::Etac).unwrap_or(false))
}

/// Step 6: espionage, arrivals before established missions, Guild
/// intents last.
fn espionage(phase: &mut Phase<'_>) -> Result<()> {
	let arrivals: Vec<(FleetId, SpyMissionKind, SystemId)> = phase
		.store
		.fleets
		.iter()
		.filter(|(_, f)| f.mission_state == MissionState::Executing)
		.filter_map(|(id, f)| {
			let active = f.active.as_ref()?;
			match &active.command {
				Command::SpyPlanet { system } if f.location == *system => {
					Some((id, SpyMissionKind::SpyPlanet, *system))
				}
				Command::HackStarbase { system } if f.location == *system => {
					Some((id, SpyMissionKind::HackStarbase, *system))
				}
				_ => None,
			}
		})
		.collect();
	for (fleet_id, kind, target) in arrivals {
		spies::arrival(phase, fleet_id, kind, target)?;
	}
	spies::established(phase)?;
	spies::guild_missions(phase)?;
	Ok(())
}

/// Step 7: commands whose effects executed above are marked done and
/// their slots cleared.
fn administrative_completion(phase: &mut Phase<'_>) {
	let executing: Vec<FleetId> = phase
		.store
		.fleets
		.iter()
		.filter(|(_, f)| f.mission_state == MissionState::Executing)
		.filter(|(_, f)| {
			matches!(
				f.active.as_ref().map(|a| &a.command),
				Some(
					Command::Bombard { .. }
						| Command::Invade { .. } | Command::Blitz { .. }
						| Command::Blockade { .. }
						| Command::Colonize { .. }
				)
			)
		})
		.map(|(id, _)| id)
		.collect();
	for fleet_id in executing {
		let kind = {
			let fleet = phase.store.fleets.get_mut(fleet_id).expect("listed above");
			let kind = fleet.active.as_ref().map(|a| a.command.kind_str().to_string()).unwrap_or_default();
			fleet.clear_mission();
			kind
		};
		phase.events.push(Event::CommandCompleted { fleet: fleet_id, kind });
	}
}

fn house_hostile(phase: &Phase<'_>, a: HouseId, b: HouseId) -> bool {
	a != b && phase.store.houses.get(a).map(|h| h.is_hostile_to(b)).unwrap_or(false)
}

fn hostile_fleets_at(phase: &Phase<'_>, system: SystemId, defender: HouseId) -> BTreeMap<HouseId, Vec<FleetId>> {
	let mut map: BTreeMap<HouseId, Vec<FleetId>> = BTreeMap::new();
	for fleet_id in phase.store.indices().fleets_at(system) {
		let Some(fleet) = phase.store.fleets.get(*fleet_id) else { continue };
		if fleet.is_garrison() || !house_hostile(phase, fleet.owner, defender) {
			continue;
		}
		if combat::is_scout_only(phase, fleet) {
			continue;
		}
		map.entry(fleet.owner).or_default().push(*fleet_id);
	}
	map
}
