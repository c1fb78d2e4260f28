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

//! Command phase: slot cleanup, ship commissioning, colony automation,
//! the player window (admin commands, persistent command validation),
//! and research allocation.

use std::collections::BTreeMap;

use crate::{
	command::{AdminCommand, Command, CommandPacket, DiplomaticAction, RejectReason},
	entities::{BuildTarget, Cargo, EspionageEffectKind, RepairTarget},
	error::Result,
	events::Event,
	store::PendingShip,
	types::{ColonyId, FacilityKind, FleetId, HouseId, MissionState, ShipClass, SystemId},
};

use super::Phase;

pub(crate) fn run(phase: &mut Phase<'_>, packets: &[CommandPacket]) -> Result<()> {
	cleanup(phase);
	commission_ships(phase)?;
	colony_automation(phase)?;
	player_window(phase, packets)?;
	research_allocation(phase, packets);
	Ok(())
}

/// Step 1: drop spent commands; fleets whose execution finished return
/// to idle.
fn cleanup(phase: &mut Phase<'_>) {
	for (_, fleet) in phase.store.fleets.iter_mut() {
		if fleet.active.is_none() && fleet.mission_state != MissionState::Idle {
			fleet.mission_state = MissionState::Idle;
			fleet.mission_started = None;
		}
	}
}

/// Step 2: commissioning A. Ships completed in the previous Production
/// phase enter service now, their docks having survived a Conflict
/// phase in between.
fn commission_ships(phase: &mut Phase<'_>) -> Result<()> {
	let pending = std::mem::take(&mut phase.store.pending_ships);
	// group per colony and class so same-class hulls form one squadron
	let mut grouped: BTreeMap<(ColonyId, ShipClass), Vec<PendingShip>> = BTreeMap::new();
	for ship in pending {
		// a captured or glassed colony commissions nothing
		match phase.store.colonies.get(ship.colony) {
			Some(colony) if colony.owner == ship.owner => {
				grouped.entry((ship.colony, ship.class)).or_default().push(ship);
			}
			_ => {}
		}
	}
	for ((colony_id, class), batch) in grouped {
		let (owner, system) = {
			let colony = phase.store.colony(colony_id)?;
			(colony.owner, colony.system)
		};
		let tech = batch.iter().map(|s| s.tech_at_build).max().unwrap_or(1);
		let count = batch.len() as u32;

		if class == ShipClass::Fighter {
			// fighters garrison the colony
			let garrison = match phase.store.colony(colony_id)?.garrison {
				Some(g) => g,
				None => {
					let g = phase.store.create_fleet(owner, system)?;
					phase.store.fleets.get_mut(g).expect("just created").home_colony = Some(colony_id);
					phase.store.colonies.get_mut(colony_id).expect("checked").garrison = Some(g);
					g
				}
			};
			let sq = phase.store.commission_squadron(garrison, class, count, tech)?;
			emit_commissioned(phase, sq, owner, colony_id, class);
			continue;
		}

		let fleet = receiving_fleet(phase, owner, system)?;
		if class.is_auxiliary() {
			for ship in &batch {
				// a fleet cannot live on auxiliaries alone; the first hull
				// anchors an auxiliary squadron if none exists yet
				let no_squadrons = phase.store.fleet(fleet)?.squadrons.is_empty();
				let ship_id = if no_squadrons {
					let sq = phase.store.commission_squadron(fleet, class, 1, ship.tech_at_build)?;
					phase.store.squadrons.get(sq).expect("just created").members[0]
				} else {
					phase.store.attach_auxiliary(fleet, class, ship.tech_at_build)?
				};
				if class == ShipClass::Etac {
					// ETACs put to sea fully loaded
					let capacity = phase.rules.ship(ShipClass::Etac).cargo_capacity;
					phase.store.ships.get_mut(ship_id).expect("just created").cargo =
						Some(Cargo::Colonists(capacity));
				}
				phase.events.push(Event::ShipCommissioned { ship: ship_id, owner, colony: colony_id, class });
			}
		} else {
			// scouts form scout-only squadrons, one hull each
			if class == ShipClass::Scout {
				for ship in &batch {
					let sq = phase.store.commission_squadron(fleet, class, 1, ship.tech_at_build)?;
					emit_commissioned(phase, sq, owner, colony_id, class);
				}
			} else {
				let sq = phase.store.commission_squadron(fleet, class, count, tech)?;
				emit_commissioned(phase, sq, owner, colony_id, class);
			}
		}
	}
	Ok(())
}

fn emit_commissioned(
	phase: &mut Phase<'_>,
	squadron: crate::types::SquadronId,
	owner: HouseId,
	colony: ColonyId,
	class: ShipClass,
) {
	let members: Vec<crate::types::ShipId> =
		phase.store.squadrons.get(squadron).map(|sq| sq.members.clone()).unwrap_or_default();
	for ship in members {
		phase.events.push(Event::ShipCommissioned { ship, owner, colony, class });
	}
}

/// An idle, non-garrison fleet of the house at the system, or a new one.
fn receiving_fleet(phase: &mut Phase<'_>, owner: HouseId, system: SystemId) -> Result<FleetId> {
	let existing = phase
		.store
		.indices()
		.fleets_at(system)
		.iter()
		.copied()
		.find(|f| {
			phase
				.store
				.fleets
				.get(*f)
				.map(|fleet| fleet.owner == owner && !fleet.is_garrison() && fleet.active.is_none())
				.unwrap_or(false)
		});
	match existing {
		Some(f) => Ok(f),
		None => Ok(phase.store.create_fleet(owner, system)?),
	}
}

/// Step 3: colony automation. Repairs queue for crippled hulls sitting
/// at a shipyard colony; houses with the flag set get their squadrons
/// balanced across co-located fleets.
fn colony_automation(phase: &mut Phase<'_>) -> Result<()> {
	auto_queue_repairs(phase)?;
	auto_balance_squadrons(phase)?;
	Ok(())
}

fn auto_queue_repairs(phase: &mut Phase<'_>) -> Result<()> {
	let colonies: Vec<(ColonyId, SystemId, HouseId)> =
		phase.store.colonies.iter().map(|(id, c)| (id, c.system, c.owner)).collect();
	for (colony_id, system, owner) in colonies {
		let has_shipyard = phase
			.store
			.indices()
			.facilities_at(colony_id)
			.iter()
			.filter_map(|f| phase.store.facilities.get(*f))
			.any(|f| f.kind == FacilityKind::Shipyard && !f.state.is_crippled());
		if !has_shipyard {
			continue;
		}
		let already_queued: Vec<RepairTarget> = phase
			.store
			.colonies
			.get(colony_id)
			.map(|c| {
				c.build_queue
					.iter()
					.filter_map(|p| phase.store.projects.get(*p))
					.filter_map(|p| match &p.target {
						BuildTarget::Repair(t) => Some(*t),
						_ => None,
					})
					.collect()
			})
			.unwrap_or_default();
		let crippled: Vec<(crate::types::ShipId, ShipClass)> = phase
			.store
			.indices()
			.fleets_at(system)
			.iter()
			.filter_map(|f| phase.store.fleets.get(*f))
			.filter(|f| f.owner == owner)
			.flat_map(|f| {
				f.squadrons
					.iter()
					.filter_map(|sq| phase.store.squadrons.get(*sq))
					.flat_map(|sq| sq.members.iter().copied())
					.chain(f.auxiliaries.iter().copied())
			})
			.filter_map(|s| phase.store.ships.get(s).map(|ship| (s, ship.class)))
			.filter(|(_, class)| *class != ShipClass::Fighter)
			.filter(|(s, _)| {
				phase.store.ships.get(*s).map(|ship| ship.state.is_crippled()).unwrap_or(false)
			})
			.collect();
		for (ship_id, class) in crippled {
			if already_queued.contains(&RepairTarget::Ship(ship_id)) {
				continue;
			}
			let cost =
				phase.rules.ship(class).build_cost * phase.rules.economy.repair_cost_percent / 100;
			phase.store.enqueue_build(colony_id, BuildTarget::Repair(RepairTarget::Ship(ship_id)), cost.max(1), 1)?;
		}
	}
	Ok(())
}

fn auto_balance_squadrons(phase: &mut Phase<'_>) -> Result<()> {
	let flagged: Vec<HouseId> = phase
		.store
		.houses
		.iter()
		.filter(|(_, h)| h.auto_balance_squadrons && !h.eliminated)
		.map(|(id, _)| id)
		.collect();
	for house_id in flagged {
		let systems: Vec<SystemId> = phase.store.indices().fleets_by_location.keys().copied().collect();
		for system in systems {
			let mut fleets: Vec<FleetId> = phase
				.store
				.indices()
				.fleets_at(system)
				.iter()
				.copied()
				.filter(|f| {
					phase
						.store
						.fleets
						.get(*f)
						.map(|fleet| fleet.owner == house_id && !fleet.is_garrison() && fleet.active.is_none())
						.unwrap_or(false)
				})
				.collect();
			if fleets.len() < 2 {
				continue;
			}
			fleets.sort();
			// move squadrons from the fattest fleet to the thinnest until even
			loop {
				let counts: Vec<(FleetId, usize)> = fleets
					.iter()
					.map(|f| (*f, phase.store.fleets.get(*f).map(|fl| fl.squadrons.len()).unwrap_or(0)))
					.collect();
				let (fat, fat_n) = *counts.iter().max_by_key(|(f, n)| (*n, std::cmp::Reverse(*f))).expect("nonempty");
				let (thin, thin_n) = *counts.iter().min_by_key(|(f, n)| (*n, *f)).expect("nonempty");
				if fat_n <= thin_n + 1 || fat_n < 2 {
					break;
				}
				let moved = phase.store.fleets.get(fat).and_then(|f| f.squadrons.last().copied());
				let Some(squadron) = moved else { break };
				phase.store.split_fleet(fat, &[squadron], &[])?;
				// split made a fresh fleet; fold it into the thin one
				let fresh = phase.store.squadrons.get(squadron).expect("just moved").fleet;
				phase.store.merge_fleets(thin, fresh)?;
			}
		}
	}
	Ok(())
}

/// Steps 4-5: the player window. Zero-turn admin commands execute
/// immediately; persistent commands are validated into the active slot
/// or rejected with a reason on the event stream.
fn player_window(phase: &mut Phase<'_>, packets: &[CommandPacket]) -> Result<()> {
	let mut ordered: Vec<&CommandPacket> = packets.iter().collect();
	ordered.sort_by_key(|p| p.house);
	for packet in ordered {
		if phase.store.houses.get(packet.house).map(|h| h.eliminated).unwrap_or(true) {
			continue;
		}
		for admin in &packet.admin {
			if let Err(err) = apply_admin(phase, packet.house, admin) {
				log::debug!("admin command from {} ignored: {}", packet.house, err);
			}
		}
		for order in &packet.fleet_orders {
			match validate(phase, packet.house, order.fleet, &order.command) {
				Ok(()) => {
					let turn = phase.turn;
					let fleet = phase.store.fleets.get_mut(order.fleet).expect("validated");
					fleet.active =
						Some(crate::entities::ActiveCommand { command: order.command.clone(), issued: turn });
					phase.events.push(Event::CommandAccepted {
						house: packet.house,
						fleet: order.fleet,
						kind: order.command.kind_str().to_string(),
					});
				}
				Err(reason) => {
					phase.events.push(Event::CommandRejected {
						house: packet.house,
						fleet: order.fleet,
						reason: reason.to_string(),
					});
				}
			}
		}
		for build in &packet.build_orders {
			let owned = phase
				.store
				.colonies
				.get(build.colony)
				.map(|c| c.owner == packet.house)
				.unwrap_or(false);
			if !owned {
				continue;
			}
			let cost = build_cost(phase, &build.target);
			phase.store.enqueue_build(build.colony, build.target.clone(), cost, build.priority)?;
		}
		for action in &packet.diplomacy {
			let DiplomaticAction::Declare { against, state } = action;
			if !phase.store.houses.contains(*against) || *against == packet.house {
				continue;
			}
			if let Some(house) = phase.store.houses.get_mut(packet.house) {
				house.relations.insert(*against, *state);
			}
			// hostility is never one-sided
			if *state == crate::types::DiplomaticState::Hostile {
				if let Some(other) = phase.store.houses.get_mut(*against) {
					other.relations.insert(packet.house, *state);
				}
			}
		}
		if let Some(buy) = &packet.espionage {
			if let Some(house) = phase.store.houses.get_mut(packet.house) {
				house.pending_espionage = Some(buy.clone());
			}
		}
	}
	Ok(())
}

fn build_cost(phase: &Phase<'_>, target: &BuildTarget) -> u32 {
	match target {
		BuildTarget::Ship(class) => phase.rules.ship(*class).build_cost,
		BuildTarget::Facility(kind) => phase.rules.economy.facility_cost[kind],
		BuildTarget::Ground(kind) => phase.rules.combat.ground_cost[kind],
		BuildTarget::Improvement(kind) => phase.rules.economy.improvement_cost[kind],
		BuildTarget::Repair(RepairTarget::Ship(ship)) => phase
			.store
			.ships
			.get(*ship)
			.map(|s| phase.rules.ship(s.class).build_cost * phase.rules.economy.repair_cost_percent / 100)
			.unwrap_or(1),
		BuildTarget::Repair(RepairTarget::Facility(facility)) => phase
			.store
			.facilities
			.get(*facility)
			.map(|f| phase.rules.economy.facility_cost[&f.kind] * phase.rules.economy.repair_cost_percent / 100)
			.unwrap_or(1),
	}
}

fn apply_admin(phase: &mut Phase<'_>, house: HouseId, admin: &AdminCommand) -> Result<(), String> {
	let own_fleet = |phase: &Phase<'_>, fleet: FleetId| -> Result<(), String> {
		match phase.store.fleets.get(fleet) {
			Some(f) if f.owner == house => Ok(()),
			Some(_) => Err(format!("{} is not owned by {}", fleet, house)),
			None => Err(format!("{} does not exist", fleet)),
		}
	};
	match admin {
		AdminCommand::SetRoe { fleet, roe } => {
			own_fleet(phase, *fleet)?;
			phase.store.fleets.get_mut(*fleet).expect("checked").roe = (*roe).min(10);
		}
		AdminCommand::SetStandingOrder { fleet, order } => {
			own_fleet(phase, *fleet)?;
			phase.store.fleets.get_mut(*fleet).expect("checked").standing = order.clone();
		}
		AdminCommand::MergeFleets { dst, src } => {
			own_fleet(phase, *dst)?;
			own_fleet(phase, *src)?;
			phase.store.merge_fleets(*dst, *src).map_err(|e| e.to_string())?;
		}
		AdminCommand::ReorganizeSquadrons { fleet, squadron, ships } => {
			own_fleet(phase, *fleet)?;
			let sq = phase.store.squadrons.get(*squadron).ok_or_else(|| format!("{} missing", squadron))?;
			if sq.fleet != *fleet {
				return Err(format!("{} is not in {}", squadron, fleet));
			}
			let members: Vec<_> = ships.iter().copied().filter(|s| phase.store.ships.contains(*s)).collect();
			if members.is_empty() {
				return Err("a squadron needs at least one ship".into());
			}
			let sq = phase.store.squadrons.get_mut(*squadron).expect("checked");
			sq.members = members;
			if !sq.members.contains(&sq.flagship) {
				sq.flagship = sq.members[0];
			}
			phase.store.reindex();
		}
		AdminCommand::TransferCargo { from, to } => {
			let cargo = phase
				.store
				.ships
				.get(*from)
				.filter(|s| s.owner == house)
				.and_then(|s| s.cargo.clone())
				.ok_or("source has no cargo")?;
			let dst = phase.store.ships.get(*to).filter(|s| s.owner == house).ok_or("no such ship")?;
			if dst.cargo.is_some() {
				return Err("destination slot occupied".into());
			}
			// embarked units follow their berth
			if let Cargo::Marines(units) = &cargo {
				for unit in units {
					if let Some(g) = phase.store.ground_units.get_mut(*unit) {
						g.location = crate::entities::GroundLocation::Transport(*to);
					}
				}
			}
			phase.store.ships.get_mut(*to).expect("checked").cargo = Some(cargo);
			phase.store.ships.get_mut(*from).expect("checked").cargo = None;
			phase.store.reindex();
		}
		AdminCommand::SetTaxRate { colony, rate } => {
			match phase.store.colonies.get_mut(*colony) {
				Some(c) if c.owner == house => c.tax_rate = (*rate).min(100),
				_ => return Err(format!("{} is not owned by {}", colony, house)),
			}
		}
		AdminCommand::SetAutoBalance { enabled } => {
			if let Some(h) = phase.store.houses.get_mut(house) {
				h.auto_balance_squadrons = *enabled;
			}
		}
		AdminCommand::LoadGroundUnit { unit, transport } => {
			let capacity = phase
				.store
				.ships
				.get(*transport)
				.map(|s| phase.rules.ship(s.class).cargo_capacity)
				.unwrap_or(0);
			phase.store.load_ground_unit(*unit, *transport, capacity).map_err(|e| e.to_string())?;
		}
		AdminCommand::LandGroundUnit { unit, colony } => {
			phase.store.land_ground_unit(*unit, *colony).map_err(|e| e.to_string())?;
		}
	}
	Ok(())
}

/// Validation of a persistent command against the committed store:
/// legal target, required capability, diplomatic permission.
pub(crate) fn validate(
	phase: &Phase<'_>,
	house: HouseId,
	fleet_id: FleetId,
	command: &Command,
) -> Result<(), RejectReason> {
	let fleet = phase.store.fleets.get(fleet_id).ok_or(RejectReason::UnknownFleet(fleet_id))?;
	if fleet.owner != house {
		return Err(RejectReason::NotYourFleet(fleet_id));
	}
	if fleet.is_garrison() {
		return Err(RejectReason::GarrisonCannotMove(fleet_id));
	}
	if fleet.status == crate::types::FleetStatus::Mothballed && !matches!(command, Command::Reactivate) {
		return Err(RejectReason::FleetMothballed(fleet_id));
	}
	if fleet.active.is_some() && !command.completes_in_production() {
		return Err(RejectReason::SlotOccupied(fleet_id));
	}
	if let Some(dest) = command.destination() {
		if !phase.store.systems.contains(dest) {
			return Err(RejectReason::UnknownSystem(dest));
		}
	}
	match command {
		Command::Colonize { system } => {
			if phase.store.indices().colony_at(*system).is_some() {
				return Err(RejectReason::TargetOccupied(*system));
			}
			has_class(phase, fleet_id, ShipClass::Etac).then_some(()).ok_or(RejectReason::NoEtac(fleet_id))
		}
		Command::SpyPlanet { .. } | Command::HackStarbase { .. } => {
			has_class(phase, fleet_id, ShipClass::Scout).then_some(()).ok_or(RejectReason::NoScouts(fleet_id))
		}
		Command::Invade { colony_system } | Command::Blitz { colony_system } => {
			require_hostile_colony(phase, house, *colony_system)?;
			has_class(phase, fleet_id, ShipClass::TroopTransport)
				.then_some(())
				.ok_or(RejectReason::NoTransports(fleet_id))
		}
		Command::Bombard { colony_system } | Command::Blockade { colony_system } => {
			require_hostile_colony(phase, house, *colony_system)
		}
		Command::JoinFleet { target } => {
			let target_fleet = phase.store.fleets.get(*target).ok_or(RejectReason::UnknownFleet(*target))?;
			(target_fleet.owner == house).then_some(()).ok_or(RejectReason::NotYourFleet(*target))
		}
		_ => Ok(()),
	}
}

fn require_hostile_colony(phase: &Phase<'_>, house: HouseId, system: SystemId) -> Result<(), RejectReason> {
	let colony = phase
		.store
		.indices()
		.colony_at(system)
		.and_then(|c| phase.store.colonies.get(c))
		.ok_or(RejectReason::TargetNotHostile(system))?;
	let hostile = phase
		.store
		.houses
		.get(house)
		.map(|h| h.is_hostile_to(colony.owner))
		.unwrap_or(false);
	if hostile {
		Ok(())
	} else {
		Err(RejectReason::DiplomaticallyForbidden(colony.owner))
	}
}

fn has_class(phase: &Phase<'_>, fleet_id: FleetId, class: ShipClass) -> bool {
	let Some(fleet) = phase.store.fleets.get(fleet_id) else { return false };
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
		.any(|s| phase.store.ships.get(s).map(|ship| ship.class == class).unwrap_or(false))
}

/// Step 6: research allocation. Exceeding the treasury scales the
/// allocation proportionally; a non-positive treasury cancels it.
fn research_allocation(phase: &mut Phase<'_>, packets: &[CommandPacket]) {
	let mut ordered: Vec<&CommandPacket> = packets.iter().collect();
	ordered.sort_by_key(|p| p.house);
	for packet in ordered {
		let Some(allocation) = &packet.research else { continue };
		let total = allocation.total();
		if total <= 0 {
			continue;
		}
		let Some(house) = phase.store.houses.get(packet.house) else { continue };
		if house.eliminated {
			continue;
		}
		if house.treasury <= 0 {
			phase.events.push(Event::ResearchCancelled { house: packet.house });
			continue;
		}
		let treasury = house.treasury;
		let scaled = total > treasury;
		let spend = total.min(treasury);
		let science = house.tech.science;

		// production points become research points, boosted by science
		// and dampened by hostile research-reduction effects
		let reduction: i64 = phase
			.store
			.effects
			.iter()
			.filter(|e| e.target == packet.house && e.kind == EspionageEffectKind::ResearchReduction)
			.map(|e| e.magnitude)
			.sum();
		let factor = (100 + 10 * i64::from(science) - reduction).max(10);

		let house = phase.store.houses.get_mut(packet.house).expect("checked above");
		house.treasury -= spend;
		for (track, points) in &allocation.points {
			let share = points * spend / total;
			let gained = share * factor / 100;
			*house.research_points.entry(*track).or_insert(0) += gained;
		}
		phase.events.push(Event::ResearchAllocated { house: packet.house, points: spend, scaled });
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		command::ResearchAllocation,
		entities::House,
		rng::phase_rng,
		rules::Rules,
		store::GameStore,
		types::{PlanetClass, ResearchTrack, ResourceRating, TurnPhase},
	};

	fn world() -> (GameStore, HouseId, SystemId) {
		let mut store = GameStore::new(2);
		let house = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let system = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		store.reindex();
		(store, house, system)
	}

	fn run_with(store: &mut GameStore, rules: &Rules, packets: &[CommandPacket]) -> Vec<Event> {
		let mut events = Vec::new();
		let mut rng = phase_rng(2, 1, TurnPhase::Command);
		let mut phase = Phase { store, rules, events: &mut events, rng: &mut rng, turn: 1 };
		run(&mut phase, packets).unwrap();
		events
	}

	#[test]
	fn pending_ships_form_squadrons_and_etacs_autoload() {
		let (mut store, house, system) = world();
		let colony = store.found_colony(system, house, 50, 1).unwrap();
		store.pending_ships.push(PendingShip { colony, owner: house, class: ShipClass::Cruiser, tech_at_build: 2, completed: 1 });
		store.pending_ships.push(PendingShip { colony, owner: house, class: ShipClass::Cruiser, tech_at_build: 2, completed: 1 });
		store.pending_ships.push(PendingShip { colony, owner: house, class: ShipClass::Etac, tech_at_build: 1, completed: 1 });
		let rules = Rules::default();
		let events = run_with(&mut store, &rules, &[]);

		assert_eq!(events.iter().filter(|e| matches!(e, Event::ShipCommissioned { .. })).count(), 3);
		// both cruisers landed in one squadron
		let squadron_sizes: Vec<usize> = store.squadrons.values().map(|sq| sq.members.len()).collect();
		assert!(squadron_sizes.contains(&2));
		let etac_loaded = store
			.ships
			.values()
			.any(|s| s.class == ShipClass::Etac && matches!(s.cargo, Some(Cargo::Colonists(_))));
		assert!(etac_loaded);
	}

	#[test]
	fn invalid_command_is_rejected_with_reason() {
		let (mut store, house, system) = world();
		store.found_colony(system, house, 50, 1).unwrap();
		let fleet = store.create_fleet(house, system).unwrap();
		store.commission_squadron(fleet, ShipClass::Destroyer, 1, 1).unwrap();
		let rules = Rules::default();

		let mut packet = CommandPacket::empty(2, 1, house);
		// colonize without an ETAC aboard
		packet.fleet_orders.push(crate::command::FleetOrder {
			fleet,
			command: Command::Colonize { system },
		});
		let events = run_with(&mut store, &rules, &[packet]);
		assert!(events.iter().any(|e| matches!(e, Event::CommandRejected { .. })));
		assert!(store.fleets.get(fleet).unwrap().active.is_none());
	}

	#[test]
	fn research_allocation_scales_to_treasury() {
		let (mut store, house, system) = world();
		store.found_colony(system, house, 50, 1).unwrap();
		store.houses.get_mut(house).unwrap().treasury = 100;
		let rules = Rules::default();

		let mut packet = CommandPacket::empty(2, 1, house);
		packet.research = Some(ResearchAllocation {
			points: vec![(ResearchTrack::Economic, 150), (ResearchTrack::Science, 150)],
		});
		let events = run_with(&mut store, &rules, &[packet]);
		assert!(events
			.iter()
			.any(|e| matches!(e, Event::ResearchAllocated { scaled: true, points: 100, .. })));
		assert_eq!(store.houses.get(house).unwrap().treasury, 0);
	}

	#[test]
	fn research_cancelled_when_broke() {
		let (mut store, house, system) = world();
		store.found_colony(system, house, 50, 1).unwrap();
		store.houses.get_mut(house).unwrap().treasury = -10;
		let rules = Rules::default();

		let mut packet = CommandPacket::empty(2, 1, house);
		packet.research = Some(ResearchAllocation { points: vec![(ResearchTrack::Economic, 50)] });
		let events = run_with(&mut store, &rules, &[packet]);
		assert!(events.iter().any(|e| matches!(e, Event::ResearchCancelled { .. })));
	}
}
