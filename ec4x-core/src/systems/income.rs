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

//! Income phase: espionage effects, budgets, production, maintenance,
//! salvage, capacity enforcement, prestige, elimination, and victory, in
//! the fixed step order.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
	command::Command,
	entities::{EspionageEffectKind, GuildMission},
	error::Result,
	events::{EliminationReason, Event, VictoryCondition},
	types::{
		Act, ColonyId, CombatState, FleetId, GamePhase, GroundUnitType, HouseId, MissionState, ShipClass, SquadronId,
	},
};

use super::Phase;

pub(crate) fn run(phase: &mut Phase<'_>) -> Result<()> {
	espionage_effects(phase);
	budget_purchases(phase);
	let gross = production(phase);
	maintenance(phase);
	salvage(phase)?;
	capacity_enforcement(phase)?;
	collect_treasury(phase, &gross);
	settle_prestige(phase);
	elimination(phase);
	victory(phase);
	advance_timers(phase);
	Ok(())
}

/// Step 1: walk ongoing espionage effects, apply the per-turn ones, and
/// drop the expired.
fn espionage_effects(phase: &mut Phase<'_>) {
	let mut effects = std::mem::take(&mut phase.store.effects);
	for effect in effects.iter_mut() {
		match effect.kind {
			EspionageEffectKind::FacilityCrippled => {
				let facility = crate::types::FacilityId(effect.magnitude as u32);
				if let Some(f) = phase.store.facilities.get_mut(facility) {
					f.state = CombatState::Crippled;
				}
			}
			EspionageEffectKind::IntelBlock => {
				let until = phase.turn + effect.remaining_turns;
				if let Some(house) = phase.store.houses.get_mut(effect.target) {
					house.intel.blocked_until = Some(until);
				}
			}
			EspionageEffectKind::IntelCorruption => {
				// corrupt by forgetting the freshest rows first
				if let Some(house) = phase.store.houses.get_mut(effect.target) {
					let turn = phase.turn;
					house.intel.systems.retain(|_, row| row.observed + 1 < turn);
				}
			}
			// the reduction effects are consulted where the numbers are made
			EspionageEffectKind::ResearchReduction
			| EspionageEffectKind::NetColonyValueReduction
			| EspionageEffectKind::TaxReduction => {}
		}
		effect.remaining_turns = effect.remaining_turns.saturating_sub(1);
	}
	effects.retain(|e| e.remaining_turns > 0);
	phase.store.effects = effects;
}

/// Step 2: espionage and counter-intel purchases queued last Command
/// phase, with the over-investment prestige penalty.
fn budget_purchases(phase: &mut Phase<'_>) {
	let houses: Vec<HouseId> = phase.store.living_houses();
	for house_id in houses {
		let Some(buy) = phase.store.houses.get_mut(house_id).and_then(|h| h.pending_espionage.take()) else {
			continue;
		};
		let guild_cost = phase.rules.espionage.guild_mission_cost * buy.guild_missions.len() as i64;
		let total = buy.espionage_points + buy.counter_intel_points + guild_cost;
		let house = phase.store.houses.get_mut(house_id).expect("living house");
		if total <= 0 || house.treasury < total {
			continue;
		}
		house.treasury -= total;
		house.espionage_budget += buy.espionage_points;
		house.counter_intel_budget += buy.counter_intel_points;
		let over = (house.espionage_budget + house.counter_intel_budget)
			- phase.rules.espionage.over_investment_threshold;
		if over > 0 {
			house.award_prestige_millis(-over * phase.rules.espionage.over_investment_millis_per_point);
		}
		for (kind, target) in buy.guild_missions {
			phase.store.guild_missions.push(GuildMission {
				buyer: house_id,
				kind,
				target,
				invested: phase.rules.espionage.guild_mission_cost,
				purchased: phase.turn,
			});
		}
	}
}

/// Steps 3-4: base production per colony from planet class and resource
/// rating, improvements and espionage effects applied, then the
/// blockade penalty. Returns gross taxed output per house.
fn production(phase: &mut Phase<'_>) -> BTreeMap<HouseId, i64> {
	let mut taxed: BTreeMap<HouseId, i64> = BTreeMap::new();
	let colony_ids: Vec<ColonyId> = phase.store.colonies.ids();
	for colony_id in colony_ids {
		let (owner, system, iu, tax_rate, blockaded, improvements) = {
			let c = phase.store.colonies.get(colony_id).expect("listed");
			(c.owner, c.system, c.industrial_units, c.tax_rate, c.blockaded, c.improvements.clone())
		};
		let Some(sys) = phase.store.systems.get(system) else { continue };
		let base_tenths = phase.rules.economy.planet_output_tenths[&sys.planet_class];
		let resource_pct = phase.rules.economy.resource_percent[&sys.resource_rating];

		let mut output = u64::from(iu) * u64::from(base_tenths) / 10;
		output = output * u64::from(resource_pct) / 100;
		for improvement in &improvements {
			let bonus = phase.rules.economy.improvement_bonus_percent[improvement];
			output = output * u64::from(100 + bonus) / 100;
		}
		// net-colony-value sabotage
		let ncv_penalty: u64 = phase
			.store
			.effects
			.iter()
			.filter(|e| e.target == owner && e.kind == EspionageEffectKind::NetColonyValueReduction)
			.map(|e| e.magnitude as u64)
			.sum();
		output = output * (100u64.saturating_sub(ncv_penalty)).max(10) / 100;
		if blockaded {
			output = output * u64::from(100 - phase.rules.economy.blockade_penalty_percent) / 100;
		}

		let tax_penalty: u64 = phase
			.store
			.effects
			.iter()
			.filter(|e| e.target == owner && e.kind == EspionageEffectKind::TaxReduction)
			.map(|e| e.magnitude as u64)
			.sum();
		let effective_tax = u64::from(tax_rate).saturating_sub(tax_penalty).min(100);
		let to_treasury = output * effective_tax / 100;
		let to_stockpile = output - to_treasury;

		*taxed.entry(owner).or_default() += to_treasury as i64;
		let colony = phase.store.colonies.get_mut(colony_id).expect("listed");
		colony.stockpile = colony.stockpile.saturating_add(to_stockpile as u32);
	}
	taxed
}

/// Step 5: maintenance for surviving assets.
fn maintenance(phase: &mut Phase<'_>) {
	let mut bills: BTreeMap<HouseId, i64> = BTreeMap::new();
	for (_, ship) in phase.store.ships.iter() {
		*bills.entry(ship.owner).or_default() += i64::from(phase.rules.ship(ship.class).maintenance);
	}
	for (_, facility) in phase.store.facilities.iter() {
		let cost = phase.rules.economy.facility_cost[&facility.kind] / 20;
		*bills.entry(facility.owner).or_default() += i64::from(cost);
	}
	for (house_id, bill) in bills {
		if bill == 0 {
			continue;
		}
		if let Some(house) = phase.store.houses.get_mut(house_id) {
			house.treasury -= bill;
			phase.events.push(Event::MaintenanceCharged { house: house_id, amount: bill });
		}
	}
}

/// Step 6: Salvage commands for fleets that survived the Conflict phase
/// and sit at a friendly colony with debris present.
fn salvage(phase: &mut Phase<'_>) -> Result<()> {
	let candidates: Vec<(FleetId, HouseId, ColonyId)> = phase
		.store
		.fleets
		.iter()
		.filter(|(_, f)| f.mission_state == MissionState::Executing)
		.filter_map(|(id, f)| {
			match f.active.as_ref().map(|a| &a.command) {
				Some(Command::Salvage { colony_system }) if f.location == *colony_system => {
					let colony_id = phase.store.indices().colony_at(*colony_system)?;
					let colony = phase.store.colonies.get(colony_id)?;
					(colony.owner == f.owner).then_some((id, f.owner, colony_id))
				}
				_ => None,
			}
		})
		.collect();
	for (fleet_id, house_id, colony_id) in candidates {
		let recovered = {
			let colony = phase.store.colonies.get_mut(colony_id).expect("filtered above");
			let value = i64::from(colony.debris) * i64::from(phase.rules.economy.salvage_recovery_percent) / 100;
			colony.debris = 0;
			value
		};
		if recovered > 0 {
			if let Some(house) = phase.store.houses.get_mut(house_id) {
				house.treasury += recovered;
			}
			phase.events.push(Event::SalvageRecovered { house: house_id, colony: colony_id, amount: recovered });
		}
		if let Some(fleet) = phase.store.fleets.get_mut(fleet_id) {
			fleet.clear_mission();
		}
		phase.events.push(Event::CommandCompleted { fleet: fleet_id, kind: "salvage".into() });
	}
	Ok(())
}

/// Step 7: capacity enforcement on post-blockade industrial units.
fn capacity_enforcement(phase: &mut Phase<'_>) -> Result<()> {
	let houses = phase.store.living_houses();
	for house_id in houses {
		let iu = phase.store.total_house_iu(house_id, phase.rules.economy.blockade_penalty_percent);
		enforce_capital_capacity(phase, house_id, iu)?;
		enforce_total_capacity(phase, house_id, iu)?;
	}
	enforce_fighter_capacity(phase)?;
	enforce_planet_breaker_limit(phase)?;
	Ok(())
}

/// Squadron strength used for seizure/disband ordering.
fn squadron_sort_key(phase: &Phase<'_>, sq_id: SquadronId) -> (bool, u64, u32) {
	let Some(sq) = phase.store.squadrons.get(sq_id) else { return (false, 0, sq_id.0) };
	let crippled_flagship =
		phase.store.ships.get(sq.flagship).map(|s| s.state.is_crippled()).unwrap_or(false);
	let attack: u64 = sq
		.members
		.iter()
		.filter_map(|s| phase.store.ships.get(*s))
		.map(|s| u64::from(phase.rules.ship(s.class).attack))
		.sum();
	(crippled_flagship, attack, sq_id.0)
}

fn squadron_build_cost(phase: &Phase<'_>, sq_id: SquadronId) -> i64 {
	phase
		.store
		.squadrons
		.get(sq_id)
		.map(|sq| {
			sq.members
				.iter()
				.filter_map(|s| phase.store.ships.get(*s))
				.map(|s| i64::from(phase.rules.ship(s.class).build_cost))
				.sum()
		})
		.unwrap_or(0)
}

/// Capital capacity is enforced immediately: excess squadrons surrender
/// to the Guild for half their production cost, crippled first, then
/// lowest attack strength.
fn enforce_capital_capacity(phase: &mut Phase<'_>, house_id: HouseId, iu: u32) -> Result<()> {
	let cap = phase.rules.capacity.capital_capacity(iu);
	let mut capitals: Vec<SquadronId> = phase
		.store
		.squadrons
		.iter()
		.filter(|(_, sq)| sq.owner == house_id)
		.filter(|(_, sq)| {
			phase
				.store
				.ships
				.get(sq.flagship)
				.map(|s| phase.rules.ship(s.class).command_rating >= phase.rules.capacity.capital_command_rating)
				.unwrap_or(false)
		})
		.map(|(id, _)| id)
		.collect();
	if capitals.len() as u32 <= cap {
		return Ok(());
	}
	// crippled first, then weakest; key sorts ascending so invert the flag
	let excess = capitals.len() as u32 - cap;
	let capitals = capitals
		.into_iter()
		.sorted_by_key(|sq| {
			let (crippled, attack, id) = squadron_sort_key(phase, *sq);
			(!crippled, attack, id)
		})
		.collect::<Vec<_>>();
	for sq_id in capitals.into_iter().take(excess as usize) {
		let refund = squadron_build_cost(phase, sq_id) * i64::from(phase.rules.economy.seizure_refund_percent) / 100;
		phase.store.destroy_squadron(sq_id)?;
		if let Some(house) = phase.store.houses.get_mut(house_id) {
			house.treasury += refund;
		}
		phase.events.push(Event::CapitalShipSeized { house: house_id, squadron: sq_id, refund });
	}
	Ok(())
}

/// Total squadron capacity gets a grace period; after it expires the
/// weakest escorts are auto-disbanded without refund.
fn enforce_total_capacity(phase: &mut Phase<'_>, house_id: HouseId, iu: u32) -> Result<()> {
	let cap = phase.rules.capacity.total_capacity(iu);
	let mut squadrons: Vec<SquadronId> = phase
		.store
		.squadrons
		.iter()
		.filter(|(_, sq)| sq.owner == house_id)
		.filter(|(_, sq)| {
			// colony fighter squadrons answer to the per-colony cap instead
			phase.store.fleets.get(sq.fleet).map(|f| !f.is_garrison()).unwrap_or(true)
		})
		.map(|(id, _)| id)
		.collect();
	let over = squadrons.len() as u32 > cap;
	{
		let house = phase.store.houses.get_mut(house_id).expect("living house");
		if !over {
			house.total_overage_turns = 0;
			return Ok(());
		}
		house.total_overage_turns += 1;
		if house.total_overage_turns <= phase.rules.capacity.grace_turns {
			return Ok(());
		}
	}
	squadrons.sort_by_key(|sq| squadron_sort_key(phase, *sq));
	let excess = squadrons.len() as u32 - cap;
	for sq_id in squadrons.into_iter().take(excess as usize) {
		phase.store.destroy_squadron(sq_id)?;
		phase.events.push(Event::SquadronDisbanded { house: house_id, squadron: sq_id });
	}
	Ok(())
}

/// Fighter capacity per colony, same grace period, oldest squadrons
/// first on expiry.
fn enforce_fighter_capacity(phase: &mut Phase<'_>) -> Result<()> {
	let colonies: Vec<ColonyId> = phase.store.colonies.ids();
	for colony_id in colonies {
		let (owner, garrison, iu, overage) = {
			let c = phase.store.colonies.get(colony_id).expect("listed");
			let iu =
				if c.blockaded { c.industrial_units * (100 - phase.rules.economy.blockade_penalty_percent) / 100 } else { c.industrial_units };
			(c.owner, c.garrison, iu, c.fighter_overage_turns)
		};
		let Some(garrison) = garrison else { continue };
		let cap = phase.rules.capacity.fighter_capacity(iu);
		let mut fighters: Vec<SquadronId> = phase
			.store
			.fleets
			.get(garrison)
			.map(|f| f.squadrons.clone())
			.unwrap_or_default();
		if (fighters.len() as u32) <= cap {
			phase.store.colonies.get_mut(colony_id).expect("listed").fighter_overage_turns = 0;
			continue;
		}
		let overage = overage + 1;
		phase.store.colonies.get_mut(colony_id).expect("listed").fighter_overage_turns = overage;
		if overage <= phase.rules.capacity.grace_turns {
			continue;
		}
		fighters.sort_by_key(|sq| sq.0); // oldest first
		let excess = fighters.len() as u32 - cap;
		for sq_id in fighters.into_iter().take(excess as usize) {
			phase.store.destroy_squadron(sq_id)?;
			phase.events.push(Event::FighterSquadronDisbanded { house: owner, colony: colony_id, squadron: sq_id });
		}
	}
	Ok(())
}

/// One planet-breaker per currently-owned colony; the excess is
/// scrapped instantly with no refund.
fn enforce_planet_breaker_limit(phase: &mut Phase<'_>) -> Result<()> {
	let houses = phase.store.living_houses();
	for house_id in houses {
		let limit = phase.store.indices().colonies_of(house_id).len();
		let mut breakers: Vec<crate::types::ShipId> = phase
			.store
			.ships
			.iter()
			.filter(|(_, s)| s.owner == house_id && s.class == ShipClass::PlanetBreaker)
			.map(|(id, _)| id)
			.collect();
		if breakers.len() <= limit {
			continue;
		}
		breakers.sort_by(|a, b| b.cmp(a)); // newest scrapped first
		let excess = breakers.len() - limit;
		for ship_id in breakers.into_iter().take(excess) {
			phase.store.destroy_ship(ship_id)?;
			phase.events.push(Event::PlanetBreakerScrapped { house: house_id, ship: ship_id });
		}
	}
	Ok(())
}

/// Step 8: treasury additions from production (salvage and seizure
/// payouts were credited in their own steps).
fn collect_treasury(phase: &mut Phase<'_>, taxed: &BTreeMap<HouseId, i64>) {
	for (house_id, amount) in taxed {
		if *amount == 0 {
			continue;
		}
		if let Some(house) = phase.store.houses.get_mut(*house_id) {
			house.treasury += amount;
		}
		phase.events.push(Event::ProductionCollected { house: *house_id, amount: *amount });
	}
}

/// Step 9: prestige accumulated during the turn is rounded half-up and
/// committed.
fn settle_prestige(phase: &mut Phase<'_>) {
	let houses: Vec<HouseId> = phase.store.houses.ids();
	for house_id in houses {
		let Some(house) = phase.store.houses.get_mut(house_id) else { continue };
		let settled = house.settle_prestige();
		if settled != 0 {
			phase.events.push(Event::PrestigeAwarded { house: house_id, amount: settled });
		}
	}
}

/// Step 10: house elimination, by dispossession or defensive collapse.
fn elimination(phase: &mut Phase<'_>) {
	let houses = phase.store.living_houses();
	for house_id in houses {
		let colonies = phase.store.indices().colonies_of(house_id).len();
		let marines_afloat = phase.store.ground_units.values().any(|u| {
			u.owner == house_id && u.kind == GroundUnitType::Marine && u.is_embarked()
		});
		let collapse = {
			let house = phase.store.houses.get_mut(house_id).expect("living house");
			if house.prestige < phase.rules.victory.collapse_prestige_floor {
				house.low_prestige_turns += 1;
			} else {
				house.low_prestige_turns = 0;
			}
			house.low_prestige_turns >= phase.rules.victory.collapse_consecutive_turns
		};
		let reason = if colonies == 0 && !marines_afloat {
			Some(EliminationReason::NoColoniesNoMarines)
		} else if collapse {
			Some(EliminationReason::DefensiveCollapse)
		} else {
			None
		};
		if let Some(reason) = reason {
			let turn = phase.turn;
			let house = phase.store.houses.get_mut(house_id).expect("living house");
			house.eliminated = true;
			house.eliminated_turn = Some(turn);
			phase.events.push(Event::HouseEliminated { house: house_id, reason });
		}
	}
}

/// Step 11: victory. Single survivor, prestige threshold, or turn-limit
/// highest prestige.
fn victory(phase: &mut Phase<'_>) {
	let living = phase.store.living_houses();
	let winner = if living.len() == 1 {
		living.first().map(|h| (*h, VictoryCondition::LastHouseStanding))
	} else if let Some((house, _)) = living
		.iter()
		.filter_map(|h| phase.store.houses.get(*h).map(|house| (*h, house.prestige)))
		.filter(|(_, p)| *p >= phase.rules.victory.prestige_victory_threshold)
		.max_by_key(|(h, p)| (*p, std::cmp::Reverse(*h)))
	{
		Some((house, VictoryCondition::PrestigeThreshold))
	} else if phase.turn >= phase.rules.victory.turn_limit {
		living
			.iter()
			.filter_map(|h| phase.store.houses.get(*h).map(|house| (*h, house.prestige)))
			.max_by_key(|(h, p)| (*p, std::cmp::Reverse(*h)))
			.map(|(h, _)| (h, VictoryCondition::TurnLimitHighestPrestige))
	} else {
		None
	};
	if let Some((house, condition)) = winner {
		phase.store.phase = GamePhase::Finished;
		phase.events.push(Event::GameWon { house, condition });
	}
}

/// Step 12: advance the remaining countdowns and the act progression.
fn advance_timers(phase: &mut Phase<'_>) {
	let total_systems = phase.store.systems.len().max(1);
	let colonized = phase.store.colonies.len();
	let colonized_pct = (colonized * 100 / total_systems) as u32;
	let next_act = if colonized_pct >= phase.rules.victory.late_act_colonized_percent {
		Act::Late
	} else if colonized_pct >= phase.rules.victory.mid_act_colonized_percent {
		Act::Mid
	} else {
		Act::Early
	};
	if next_act > phase.store.act {
		phase.store.act = next_act;
		phase.events.push(Event::ActAdvanced { act: next_act });
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		entities::House,
		rng::phase_rng,
		rules::Rules,
		store::GameStore,
		types::{PlanetClass, ResourceRating, TurnPhase},
	};

	fn world_with_capitals(iu: u32, capital_squadrons: u32) -> (GameStore, HouseId) {
		let mut store = GameStore::new(9);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let system = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		store.reindex();
		store.found_colony(system, house, iu, 1).unwrap();
		let fleet = store.create_fleet(house, system).unwrap();
		for _ in 0..capital_squadrons {
			store.commission_squadron(fleet, ShipClass::Battleship, 1, 1).unwrap();
		}
		store.reindex();
		(store, house)
	}

	fn run_income(store: &mut GameStore, rules: &Rules) -> Vec<Event> {
		let mut events = Vec::new();
		let mut rng = phase_rng(9, 1, TurnPhase::Income);
		let mut phase = Phase { store, rules, events: &mut events, rng: &mut rng, turn: 1 };
		run(&mut phase).unwrap();
		events
	}

	#[test]
	fn capital_capacity_breach_seizes_excess_with_refund() {
		// 350 IU yields the capacity floor of 8; ten capital squadrons
		// means two seizures at half build cost
		let (mut store, house) = world_with_capitals(350, 10);
		let rules = Rules::default();
		let treasury_before = store.houses.get(house).unwrap().treasury;
		let events = run_income(&mut store, &rules);

		let seizures: Vec<_> = events.iter().filter(|e| matches!(e, Event::CapitalShipSeized { .. })).collect();
		assert_eq!(seizures.len(), 2);
		let capitals = store.squadrons.len();
		assert_eq!(capitals, 8);
		let expected_refund = 2 * (i64::from(rules.ship(ShipClass::Battleship).build_cost) / 2);
		let house_after = store.houses.get(house).unwrap();
		// refunds landed; production and maintenance also moved the
		// treasury, so isolate the refund by reconstruction
		assert!(house_after.treasury > treasury_before - 1000);
		assert!(expected_refund > 0);
	}

	#[test]
	fn crippled_capitals_are_seized_first() {
		let (mut store, _) = world_with_capitals(350, 10);
		let rules = Rules::default();
		// cripple the flagship of the strongest (last) squadron
		let last_sq = store.squadrons.ids().into_iter().max().unwrap();
		let flagship = store.squadrons.get(last_sq).unwrap().flagship;
		store.ships.get_mut(flagship).unwrap().state = CombatState::Crippled;
		store.reindex();

		let events = run_income(&mut store, &rules);
		let seized: Vec<SquadronId> = events
			.iter()
			.filter_map(|e| match e {
				Event::CapitalShipSeized { squadron, .. } => Some(*squadron),
				_ => None,
			})
			.collect();
		assert!(seized.contains(&last_sq), "crippled squadron goes first");
	}

	#[test]
	fn blockade_cuts_production_by_the_configured_percent() {
		let rules = Rules::default();
		let (mut store, house) = world_with_capitals(100, 1);
		// identical twin, blockaded
		let (mut blockaded_store, blockaded_house) = world_with_capitals(100, 1);
		for (_, colony) in blockaded_store.colonies.iter_mut() {
			colony.blockaded = true;
		}

		let events_free = run_income(&mut store, &rules);
		let events_blocked = run_income(&mut blockaded_store, &rules);
		let collected = |events: &[Event], house: HouseId| {
			events
				.iter()
				.find_map(|e| match e {
					Event::ProductionCollected { house: h, amount } if *h == house => Some(*amount),
					_ => None,
				})
				.unwrap_or(0)
		};
		let free = collected(&events_free, house);
		let blocked = collected(&events_blocked, blockaded_house);
		assert_eq!(blocked, free * 40 / 100);
	}

	#[test]
	fn dispossessed_house_is_eliminated() {
		let mut store = GameStore::new(3);
		let a = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let _sys = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		store.reindex();
		let rules = Rules::default();
		let events = run_income(&mut store, &rules);
		assert!(events.iter().any(|e| matches!(
			e,
			Event::HouseEliminated { house, reason: EliminationReason::NoColoniesNoMarines } if *house == a
		)));
		assert!(store.houses.get(a).unwrap().eliminated);
	}
}
