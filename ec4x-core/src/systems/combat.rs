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

//! Space and orbital combat. Task forces are transient per-system
//! groupings; rounds resolve simultaneously: every side's hits are
//! computed against the standing state before any are applied.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
	entities::Fleet,
	error::Result,
	events::Event,
	rng::roll_percent,
	rules::Rules,
	types::{CombatState, FacilityId, FleetId, FleetStatus, HouseId, MissionState, ShipClass, ShipId, SystemId},
};

use super::Phase;

/// One ship or facility taking part in a battle.
#[derive(Debug, Clone)]
pub(crate) struct Combatant {
	pub ship: Option<ShipId>,
	pub facility: Option<FacilityId>,
	pub fleet: Option<FleetId>,
	pub attack: u32,
	pub defense: u32,
	pub crippled: bool,
	pub destroyed: bool,
}

/// A transient grouping of one house's forces at one system.
#[derive(Debug, Clone)]
pub(crate) struct TaskForce {
	pub house: HouseId,
	pub fleets: Vec<FleetId>,
	pub units: Vec<Combatant>,
	/// All combat hulls are raiders: eligible for cloak bonuses.
	pub cloaked: bool,
	/// Arrived this turn (was `Executing` on entry); cloak grants
	/// surprise rather than ambush.
	pub moving: bool,
	/// Garrisons and starbases hold their ground whatever the odds.
	pub never_retreats: bool,
	/// Round-1 attack bonus in percent from an undetected cloak.
	pub round_one_bonus: u32,
}

impl TaskForce {
	pub fn alive(&self) -> bool {
		self.units.iter().any(|u| !u.destroyed)
	}

	pub fn attack_strength(&self, round: u32) -> u64 {
		let base: u64 = self
			.units
			.iter()
			.filter(|u| !u.destroyed)
			.map(|u| if u.crippled { u64::from(u.attack) / 2 } else { u64::from(u.attack) })
			.sum();
		if round == 1 && self.round_one_bonus > 0 {
			base * u64::from(100 + self.round_one_bonus) / 100
		} else {
			base
		}
	}

	pub fn total_defense(&self) -> u64 {
		self.units.iter().filter(|u| !u.destroyed).map(|u| u64::from(u.defense.max(1))).sum()
	}
}

/// Effective attack of one ship, scaled by build tech and status.
fn ship_attack(rules: &Rules, class: ShipClass, tech_at_build: u8, status: FleetStatus) -> u32 {
	let base = rules.ship(class).attack;
	let teched = base * (100 + 10 * u32::from(tech_at_build.saturating_sub(1))) / 100;
	match status {
		FleetStatus::Active => teched,
		FleetStatus::Reserve => teched / 2,
		FleetStatus::Mothballed => 0,
	}
}

/// True when a fleet consists entirely of scout hulls; such fleets are
/// exempt from combat and only carry intelligence.
pub(crate) fn is_scout_only(phase: &Phase<'_>, fleet: &Fleet) -> bool {
	let mut any = false;
	for sq_id in &fleet.squadrons {
		let Some(sq) = phase.store.squadrons.get(*sq_id) else { continue };
		for ship in &sq.members {
			match phase.store.ships.get(*ship) {
				Some(s) if s.class == ShipClass::Scout => any = true,
				Some(_) => return false,
				None => {}
			}
		}
	}
	any && fleet.auxiliaries.is_empty()
}

/// Build one house's task force from its non-scout fleets at a system.
pub(crate) fn task_force_from_fleets(phase: &Phase<'_>, house: HouseId, fleet_ids: &[FleetId]) -> TaskForce {
	let mut units = Vec::new();
	let mut all_raiders = true;
	let mut moving = false;
	for fleet_id in fleet_ids {
		let Some(fleet) = phase.store.fleets.get(*fleet_id) else { continue };
		if fleet.mission_state == MissionState::Executing {
			moving = true;
		}
		for sq_id in &fleet.squadrons {
			let Some(sq) = phase.store.squadrons.get(*sq_id) else { continue };
			for ship_id in &sq.members {
				let Some(ship) = phase.store.ships.get(*ship_id) else { continue };
				if ship.class != ShipClass::Raider {
					all_raiders = false;
				}
				units.push(Combatant {
					ship: Some(*ship_id),
					facility: None,
					fleet: Some(*fleet_id),
					attack: ship_attack(phase.rules, ship.class, ship.tech_at_build, fleet.status),
					defense: phase.rules.ship(ship.class).defense,
					crippled: ship.state.is_crippled(),
					destroyed: false,
				});
			}
		}
		for aux_id in &fleet.auxiliaries {
			let Some(ship) = phase.store.ships.get(*aux_id) else { continue };
			all_raiders = false;
			units.push(Combatant {
				ship: Some(*aux_id),
				facility: None,
				fleet: Some(*fleet_id),
				attack: 0,
				defense: phase.rules.ship(ship.class).defense,
				crippled: ship.state.is_crippled(),
				destroyed: false,
			});
		}
	}
	TaskForce {
		house,
		fleets: fleet_ids.to_vec(),
		cloaked: all_raiders && !units.is_empty(),
		moving,
		never_retreats: false,
		round_one_bonus: 0,
		units,
	}
}

/// Detection roll: clamped elint advantage indexes the rules table.
pub(crate) fn detection_roll(rng: &mut ChaCha8Rng, rules: &Rules, observer_elint: u8, target_elint: u8) -> bool {
	let advantage = i32::from(observer_elint) - i32::from(target_elint);
	let idx = (advantage + 5).clamp(0, 10) as usize;
	roll_percent(rng, rules.combat.detection_percent[idx])
}

/// Best electronic-intelligence level a house brings to a system: its
/// tech level plus the best sensor hull present.
pub(crate) fn house_elint_at(phase: &Phase<'_>, house: HouseId, system: SystemId) -> u8 {
	let tech = phase.store.houses.get(house).map(|h| h.tech.elint()).unwrap_or(1);
	let best_hull = phase
		.store
		.indices()
		.fleets_at(system)
		.iter()
		.filter_map(|f| phase.store.fleets.get(*f))
		.filter(|f| f.owner == house)
		.flat_map(|f| f.squadrons.iter())
		.filter_map(|sq| phase.store.squadrons.get(*sq))
		.flat_map(|sq| sq.members.iter())
		.filter_map(|s| phase.store.ships.get(*s))
		.map(|s| phase.rules.ship(s.class).elint)
		.max()
		.unwrap_or(0);
	tech.saturating_add(best_hull)
}

/// Resolve cloak detection for round 1 and stamp surprise/ambush
/// bonuses. The rules-table entries are authoritative: surprise is for a
/// cloaked side in motion, ambush for one lying in wait.
pub(crate) fn apply_cloak_bonuses(phase: &mut Phase<'_>, forces: &mut [TaskForce]) {
	let elints: Vec<u8> = forces
		.iter()
		.map(|tf| phase.store.houses.get(tf.house).map(|h| h.tech.elint()).unwrap_or(1))
		.collect();
	for i in 0..forces.len() {
		if !forces[i].cloaked {
			continue;
		}
		let own_elint = elints[i];
		let seen = (0..forces.len())
			.filter(|j| *j != i)
			.any(|j| detection_roll(phase.rng, phase.rules, elints[j], own_elint));
		if !seen {
			forces[i].round_one_bonus = if forces[i].moving {
				phase.rules.combat.surprise_bonus_percent
			} else {
				phase.rules.combat.ambush_bonus_percent
			};
		}
	}
}

#[derive(Debug, Default)]
pub(crate) struct BattleOutcome {
	pub rounds: u32,
	pub destroyed_ships: Vec<(ShipId, FleetId)>,
	pub crippled_ships: Vec<ShipId>,
	pub destroyed_facilities: Vec<FacilityId>,
	pub crippled_facilities: Vec<FacilityId>,
	pub retreats: Vec<(FleetId, SystemId)>,
	/// Houses whose whole force was wiped out.
	pub wiped: Vec<HouseId>,
}

/// Fight a battle to its end. Mutates only the in-memory task forces;
/// the caller applies the outcome to the store so that collection and
/// application never interleave.
pub(crate) fn fight(phase: &mut Phase<'_>, system: SystemId, forces: &mut Vec<TaskForce>) -> BattleOutcome {
	let mut outcome = BattleOutcome::default();
	apply_cloak_bonuses(phase, forces);

	for round in 1..=phase.rules.combat.max_rounds {
		if forces.iter().filter(|tf| tf.alive()).count() < 2 {
			break;
		}
		outcome.rounds = round;

		// collect: every side's hits against the standing state
		let strengths: Vec<u64> = forces.iter().map(|tf| tf.attack_strength(round)).collect();
		let mut hits: Vec<u64> = vec![0; forces.len()];
		for (i, force) in forces.iter().enumerate() {
			if !force.alive() {
				continue;
			}
			let eff_idx = phase.rng.gen_range(0..phase.rules.combat.effectiveness_percent.len());
			let eff = phase.rules.combat.effectiveness_percent[eff_idx];
			let dealt = strengths[i] * u64::from(eff) / 100;
			// distribute across hostile sides proportionally to their strength
			let enemies: Vec<usize> = (0..forces.len())
				.filter(|j| *j != i && forces[*j].alive() && hostile(phase, force.house, forces[*j].house))
				.collect();
			let enemy_total: u64 = enemies.iter().map(|j| strengths[*j].max(1)).sum();
			if enemy_total == 0 {
				continue;
			}
			for j in &enemies {
				hits[*j] += dealt * strengths[*j].max(1) / enemy_total;
			}
		}

		// apply: assign damage inside each force
		let mut round_damage: Vec<u64> = vec![0; forces.len()];
		for (j, force) in forces.iter_mut().enumerate() {
			round_damage[j] = assign_hits(phase.rng, phase.rules, force, hits[j]);
		}

		// retreat checks between rounds; fighters and starbases hold
		for (j, force) in forces.iter_mut().enumerate() {
			if force.never_retreats || !force.alive() {
				continue;
			}
			let defense = force.total_defense().max(1);
			let pct = round_damage[j] * 100 / defense;
			let fleeing: Vec<FleetId> = force
				.fleets
				.iter()
				.copied()
				.filter(|f| {
					phase
						.store
						.fleets
						.get(*f)
						.map(|fleet| pct > u64::from(fleet.roe) * 10)
						.unwrap_or(false)
				})
				.collect();
			for fleet_id in fleeing {
				if let Some(dest) = retreat_destination(phase, force.house, system) {
					outcome.retreats.push((fleet_id, dest));
					// the fleet's ships leave the fight standing; damage
					// they took on the way out still counts
					for unit in force.units.iter_mut() {
						if unit.fleet == Some(fleet_id) && !unit.destroyed {
							if unit.crippled {
								if let Some(ship) = unit.ship {
									outcome.crippled_ships.push(ship);
								}
							}
							unit.destroyed = true; // out of the battle, not the store
							unit.ship = None;
						}
					}
				}
			}
		}
	}

	for force in forces.iter() {
		for unit in &force.units {
			match (unit.destroyed, unit.crippled, unit.ship, unit.facility) {
				(true, _, Some(ship), _) => outcome.destroyed_ships.push((ship, unit.fleet.unwrap_or_default())),
				(false, true, Some(ship), _) => outcome.crippled_ships.push(ship),
				(true, _, _, Some(fac)) => outcome.destroyed_facilities.push(fac),
				(false, true, _, Some(fac)) => outcome.crippled_facilities.push(fac),
				_ => {}
			}
		}
		let retreated = force.fleets.iter().any(|f| outcome.retreats.iter().any(|(rf, _)| rf == f));
		if !force.alive() && !retreated {
			outcome.wiped.push(force.house);
		}
	}
	outcome
}

/// Assign a damage pool inside one force. Ships are crippled cheapest
/// first; nothing is destroyed until everything else is crippled, except
/// on a critical hit. Returns damage actually absorbed.
fn assign_hits(rng: &mut ChaCha8Rng, rules: &Rules, force: &mut TaskForce, mut pool: u64) -> u64 {
	let mut absorbed = 0u64;
	loop {
		if pool == 0 {
			return absorbed;
		}
		let all_crippled = force.units.iter().filter(|u| !u.destroyed).all(|u| u.crippled);
		let critical = roll_percent(rng, rules.combat.critical_hit_percent);

		// cheapest eligible target; already-crippled units only once the
		// rest of the force is crippled too (or on a critical)
		let target = force
			.units
			.iter_mut()
			.enumerate()
			.filter(|(_, u)| !u.destroyed)
			.filter(|(_, u)| critical || all_crippled || !u.crippled)
			.min_by_key(|(idx, u)| (u.defense, *idx))
			.map(|(idx, _)| idx);
		let Some(idx) = target else { return absorbed };
		let cost = u64::from(force.units[idx].defense.max(1));
		if pool < cost {
			return absorbed;
		}
		pool -= cost;
		absorbed += cost;
		let unit = &mut force.units[idx];
		if critical || unit.crippled {
			unit.destroyed = true;
		} else {
			unit.crippled = true;
		}
	}
}

fn hostile(phase: &Phase<'_>, a: HouseId, b: HouseId) -> bool {
	phase.store.houses.get(a).map(|h| h.is_hostile_to(b)).unwrap_or(false)
}

/// Where a beaten fleet runs: an adjacent system with a friendly colony
/// if one exists, else the lowest-id adjacent system free of hostiles.
fn retreat_destination(phase: &Phase<'_>, house: HouseId, from: SystemId) -> Option<SystemId> {
	let mut candidates: Vec<SystemId> = phase
		.store
		.indices()
		.lanes_of(from)
		.iter()
		.filter_map(|lane| phase.store.lanes.get(*lane))
		.filter_map(|lane| lane.other_end(from))
		.collect();
	candidates.sort();
	candidates.dedup();

	let friendly = candidates.iter().copied().find(|sys| {
		phase
			.store
			.indices()
			.colony_at(*sys)
			.and_then(|c| phase.store.colonies.get(c))
			.map(|c| c.owner == house)
			.unwrap_or(false)
	});
	friendly.or_else(|| {
		candidates.into_iter().find(|sys| {
			!phase
				.store
				.indices()
				.fleets_at(*sys)
				.iter()
				.filter_map(|f| phase.store.fleets.get(*f))
				.any(|f| hostile(phase, house, f.owner))
		})
	})
}

/// Apply a battle outcome to the store, emitting events in a stable
/// order. Retreats move fleets; losses cascade through the ops layer.
pub(crate) fn apply_outcome(phase: &mut Phase<'_>, system: SystemId, outcome: &BattleOutcome) -> Result<()> {
	for ship_id in &outcome.crippled_ships {
		if let Some(ship) = phase.store.ships.get_mut(*ship_id) {
			let owner = ship.owner;
			ship.state = CombatState::Crippled;
			phase.events.push(Event::ShipCrippled { ship: *ship_id, owner, system });
		}
	}
	for facility_id in &outcome.crippled_facilities {
		if let Some(facility) = phase.store.facilities.get_mut(*facility_id) {
			facility.state = CombatState::Crippled;
		}
	}
	for (fleet_id, dest) in &outcome.retreats {
		if let Some(fleet) = phase.store.fleets.get_mut(*fleet_id) {
			let owner = fleet.owner;
			fleet.location = *dest;
			fleet.clear_mission();
			phase.events.push(Event::FleetRetreated { fleet: *fleet_id, owner, from: system, to: *dest });
		}
	}
	for (ship_id, _) in &outcome.destroyed_ships {
		let Some(ship) = phase.store.ships.get(*ship_id) else { continue };
		let owner = ship.owner;
		let fleet_before = phase.store.indices().fleet_of_ship.get(ship_id).copied();
		phase.store.destroy_ship(*ship_id)?;
		if let Some(fleet_id) = fleet_before {
			if !phase.store.fleets.contains(fleet_id) {
				phase.events.push(Event::FleetDestroyed { fleet: fleet_id, owner, system });
			}
		}
	}
	for facility_id in &outcome.destroyed_facilities {
		if let Some(facility) = phase.store.facilities.get(*facility_id) {
			let colony = facility.colony;
			let kind = facility.kind;
			phase.store.destroy_facility(*facility_id)?;
			phase.events.push(Event::FacilityDestroyed { facility: *facility_id, colony, kind });
		}
	}
	// combat wreckage becomes salvageable debris at a local colony
	if let Some(colony_id) = phase.store.indices().colony_at(system) {
		let wreck_value: u32 = outcome
			.destroyed_ships
			.len()
			.try_into()
			.map(|n: u32| n * 10)
			.unwrap_or(0);
		if wreck_value > 0 {
			if let Some(colony) = phase.store.colonies.get_mut(colony_id) {
				colony.debris += wreck_value;
			}
		}
	}
	phase.store.reindex();
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{rng::phase_rng, types::TurnPhase};

	fn force(house: u32, units: Vec<(u32, u32)>) -> TaskForce {
		TaskForce {
			house: HouseId(house),
			fleets: vec![FleetId(house)],
			units: units
				.into_iter()
				.enumerate()
				.map(|(i, (attack, defense))| Combatant {
					ship: Some(ShipId(i as u32 + house * 100)),
					facility: None,
					fleet: Some(FleetId(house)),
					attack,
					defense,
					crippled: false,
					destroyed: false,
				})
				.collect(),
			cloaked: false,
			moving: false,
			never_retreats: true,
			round_one_bonus: 0,
		}
	}

	#[test]
	fn hits_cripple_before_destroying() {
		let mut rng = phase_rng(1, 1, TurnPhase::Conflict);
		let rules = {
			let mut r = Rules::default();
			r.combat.critical_hit_percent = 0;
			r
		};
		let mut tf = force(1, vec![(5, 4), (5, 4), (5, 4)]);
		// enough to cripple all three but destroy none
		assign_hits(&mut rng, &rules, &mut tf, 12);
		assert!(tf.units.iter().all(|u| u.crippled && !u.destroyed));

		// further damage starts destroying
		assign_hits(&mut rng, &rules, &mut tf, 4);
		assert_eq!(tf.units.iter().filter(|u| u.destroyed).count(), 1);
	}

	#[test]
	fn overkill_wipes_a_force() {
		let mut rng = phase_rng(2, 1, TurnPhase::Conflict);
		let rules = Rules::default();
		let mut tf = force(1, vec![(5, 2), (5, 2)]);
		assign_hits(&mut rng, &rules, &mut tf, 1_000);
		assert!(!tf.alive());
	}

	#[test]
	fn surprise_beats_ambush_in_round_one_only() {
		let mut tf = force(1, vec![(10, 2)]);
		tf.round_one_bonus = 50;
		assert_eq!(tf.attack_strength(1), 15);
		assert_eq!(tf.attack_strength(2), 10);
	}
}
