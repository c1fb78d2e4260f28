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

//! Fleet-based spy missions and Space Guild intents, resolved from the
//! Conflict phase. For a mission arriving this turn the detection roll
//! runs before registration; established missions re-roll every turn.

use crate::{
	entities::{
		EspionageEffect, EspionageEffectKind, FleetObservation, GuildMissionKind, SpyMissionKind, SystemIntel,
	},
	error::Result,
	events::Event,
	rng::roll_percent,
	types::{FleetId, HouseId, IntelQuality, MissionId, SystemId},
};

use super::{combat, Phase};

/// Who guards a system against spies: the best elint among houses with a
/// colony or starbase there, counting hostile fleets too.
fn defender_elint(phase: &Phase<'_>, system: SystemId, intruder: HouseId) -> Option<u8> {
	let colony_owner = phase
		.store
		.indices()
		.colony_at(system)
		.and_then(|c| phase.store.colonies.get(c))
		.map(|c| c.owner)
		.filter(|owner| *owner != intruder);
	let hostile_fleet_owner = phase
		.store
		.indices()
		.fleets_at(system)
		.iter()
		.filter_map(|f| phase.store.fleets.get(*f))
		.map(|f| f.owner)
		.find(|owner| {
			*owner != intruder
				&& phase.store.houses.get(*owner).map(|h| h.is_hostile_to(intruder)).unwrap_or(false)
		});
	let watcher = colony_owner.or(hostile_fleet_owner)?;
	Some(combat::house_elint_at(phase, watcher, system))
}

fn spy_fleet_elint(phase: &Phase<'_>, fleet: FleetId) -> u8 {
	phase
		.store
		.fleets
		.get(fleet)
		.map(|f| combat::house_elint_at(phase, f.owner, f.location))
		.unwrap_or(1)
}

/// A perfect-quality snapshot of the target system for the spy's house.
fn perfect_intel_row(phase: &Phase<'_>, system: SystemId) -> SystemIntel {
	let colony = phase.store.indices().colony_at(system).and_then(|c| phase.store.colonies.get(c));
	let fleets = phase
		.store
		.indices()
		.fleets_at(system)
		.iter()
		.filter_map(|f| phase.store.fleets.get(*f))
		.map(|f| {
			let mut classes = std::collections::BTreeMap::new();
			for sq in f.squadrons.iter().filter_map(|s| phase.store.squadrons.get(*s)) {
				for ship in sq.members.iter().filter_map(|s| phase.store.ships.get(*s)) {
					*classes.entry(ship.class).or_insert(0u32) += 1;
				}
			}
			FleetObservation {
				fleet: f.id,
				owner: f.owner,
				squadron_count: f.squadrons.len() as u32,
				ship_classes: classes.into_iter().collect(),
			}
		})
		.collect();
	SystemIntel {
		system,
		quality: IntelQuality::Perfect,
		observed: phase.turn,
		colony_owner: colony.map(|c| c.owner),
		colony_industrial_units: colony.map(|c| c.industrial_units),
		fleets,
	}
}

/// A fleet with a spy command arrived at its target. Detection runs
/// before registration: a caught scout dies without leaving a trace in
/// its own database.
pub(crate) fn arrival(phase: &mut Phase<'_>, fleet_id: FleetId, kind: SpyMissionKind, target: SystemId) -> Result<()> {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return Ok(()) };
	let owner = fleet.owner;
	let scout_count = fleet
		.squadrons
		.iter()
		.filter_map(|sq| phase.store.squadrons.get(*sq))
		.map(|sq| sq.members.len() as u32)
		.sum::<u32>();

	if let Some(guard) = defender_elint(phase, target, owner) {
		let spy_elint = spy_fleet_elint(phase, fleet_id);
		if combat::detection_roll(phase.rng, phase.rules, guard, spy_elint) {
			phase.events.push(Event::ScoutDetected { fleet: fleet_id, owner, system: target });
			phase.store.destroy_fleet(fleet_id)?;
			return Ok(());
		}
	}
	phase.store.register_spy_mission(fleet_id, kind, target, phase.turn, scout_count)?;
	if let Some(f) = phase.store.fleets.get_mut(fleet_id) {
		f.clear_mission();
	}
	phase.events.push(Event::SpyMissionEstablished { fleet: fleet_id, owner, system: target });
	Ok(())
}

/// Walk established missions: a re-detection destroys the fleet, an
/// undetected turn yields perfect intelligence and the mission carries
/// on.
pub(crate) fn established(phase: &mut Phase<'_>) -> Result<()> {
	let missions: Vec<(MissionId, FleetId, HouseId, SystemId, crate::types::Turn, SpyMissionKind)> = phase
		.store
		.spy_missions
		.iter()
		.map(|(id, m)| (id, m.fleet, m.owner, m.target, m.started, m.kind))
		.collect();
	for (mission_id, fleet_id, owner, target, started, kind) in missions {
		if started == phase.turn {
			continue; // registered this very phase
		}
		if !phase.store.fleets.contains(fleet_id) {
			phase.store.remove_spy_mission(mission_id);
			continue;
		}
		let caught = match defender_elint(phase, target, owner) {
			Some(guard) => combat::detection_roll(phase.rng, phase.rules, guard, spy_fleet_elint(phase, fleet_id)),
			None => false,
		};
		if caught {
			phase.events.push(Event::SpyFleetDestroyed { fleet: fleet_id, owner, system: target });
			phase.store.remove_spy_mission(mission_id);
			phase.store.destroy_fleet(fleet_id)?;
		} else {
			let row = perfect_intel_row(phase, target);
			if let Some(house) = phase.store.houses.get_mut(owner) {
				house.intel.record(row);
			}
			// a hacked starbase leaks more than positions: its owner's
			// research grinds while the tap stays open
			if kind == SpyMissionKind::HackStarbase {
				let victim = phase
					.store
					.indices()
					.colony_at(target)
					.and_then(|c| phase.store.colonies.get(c))
					.map(|c| c.owner);
				if let Some(victim) = victim.filter(|v| *v != owner) {
					let already = phase
						.store
						.effects
						.iter()
						.any(|e| e.source == owner && e.target == victim && e.kind == EspionageEffectKind::ResearchReduction);
					if !already {
						phase.store.effects.push(EspionageEffect {
							kind: EspionageEffectKind::ResearchReduction,
							source: owner,
							target: victim,
							magnitude: phase.rules.espionage.effect_magnitude_percent,
							remaining_turns: phase.rules.espionage.effect_duration_turns,
						});
					}
				}
			}
			phase.events.push(Event::SpyMissionYield { owner, system: target });
		}
	}
	Ok(())
}

/// Resolve queued Space Guild intents against the targets'
/// counter-intelligence budgets.
pub(crate) fn guild_missions(phase: &mut Phase<'_>) -> Result<()> {
	let queued = std::mem::take(&mut phase.store.guild_missions);
	for mission in queued {
		let counter = phase
			.store
			.houses
			.get(mission.target)
			.map(|h| h.counter_intel_budget)
			.unwrap_or(0);
		// invested points vs counter-intel, clamped into the table range
		let margin = ((mission.invested - counter) / 10).clamp(-5, 5) as i32;
		let idx = (margin + 5) as usize;
		let success = roll_percent(phase.rng, phase.rules.combat.detection_percent[idx]);
		if success {
			match mission.kind {
				GuildMissionKind::IntelTheft => {
					let stolen: Vec<SystemIntel> = phase
						.store
						.houses
						.get(mission.target)
						.map(|h| h.intel.systems.values().cloned().collect())
						.unwrap_or_default();
					if let Some(buyer) = phase.store.houses.get_mut(mission.buyer) {
						for mut row in stolen {
							row.quality = IntelQuality::Spy;
							row.observed = phase.turn;
							buyer.intel.record(row);
						}
					}
				}
				GuildMissionKind::Sabotage => {
					phase.store.effects.push(EspionageEffect {
						kind: EspionageEffectKind::NetColonyValueReduction,
						source: mission.buyer,
						target: mission.target,
						magnitude: phase.rules.espionage.effect_magnitude_percent,
						remaining_turns: phase.rules.espionage.effect_duration_turns,
					});
				}
				GuildMissionKind::CounterIntelSweep => {
					let buyer = mission.buyer;
					phase.store.effects.retain(|e| e.target != buyer);
				}
			}
		}
		phase.events.push(Event::GuildMissionResolved { buyer: mission.buyer, target: mission.target, success });
	}
	Ok(())
}
