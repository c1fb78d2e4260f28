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

//! The four-phase turn pipeline. `TurnEngine::resolve` is a pure
//! function of (store, rules, command batch) plus the phase-seeded
//! random streams; it never suspends and never touches I/O.

mod combat;
mod command_phase;
mod conflict;
mod ground;
mod income;
mod production;
mod spies;
mod travel;

use rand_chacha::ChaCha8Rng;

use crate::{
	command::CommandPacket,
	error::{CoreError, Result},
	events::Event,
	fog::{self, PlayerState},
	rng::phase_rng,
	rules::Rules,
	store::GameStore,
	types::{GamePhase, Turn, TurnPhase},
};

/// Working context handed to every phase function. Borrows the store for
/// the duration of one phase and is dropped before anything persists.
pub(crate) struct Phase<'a> {
	pub store: &'a mut GameStore,
	pub rules: &'a Rules,
	pub events: &'a mut Vec<Event>,
	pub rng: &'a mut ChaCha8Rng,
	pub turn: Turn,
}

/// Everything one resolved turn produces.
#[derive(Debug)]
pub struct TurnOutcome {
	pub store: GameStore,
	pub events: Vec<Event>,
	/// One fog-of-war projection per non-eliminated house, for snapshot
	/// persistence and delta computation.
	pub player_states: Vec<PlayerState>,
}

pub struct TurnEngine<'r> {
	rules: &'r Rules,
}

impl<'r> TurnEngine<'r> {
	pub fn new(rules: &'r Rules) -> Self {
		Self { rules }
	}

	/// Resolve one full turn. On an invariant violation the working
	/// store is dropped with the error; the caller keeps its pristine
	/// snapshot.
	pub fn resolve(&self, mut store: GameStore, packets: &[CommandPacket]) -> Result<TurnOutcome> {
		let turn = store.turn;
		let mut events = Vec::new();
		log::info!("resolving game {} turn {}", store.game_id, turn);

		self.run_phase(&mut store, turn, TurnPhase::Conflict, &mut events, |phase| conflict::run(phase))?;
		self.run_phase(&mut store, turn, TurnPhase::Income, &mut events, |phase| income::run(phase))?;
		self.run_phase(&mut store, turn, TurnPhase::Command, &mut events, |phase| {
			command_phase::run(phase, packets)
		})?;
		self.run_phase(&mut store, turn, TurnPhase::Production, &mut events, |phase| production::run(phase))?;

		let player_states = store
			.living_houses()
			.into_iter()
			.map(|house| fog::project(&store, self.rules, house, turn))
			.collect();

		log::info!("game {} turn {} resolved with {} events", store.game_id, turn, events.len());
		Ok(TurnOutcome { store, events, player_states })
	}

	fn run_phase(
		&self,
		store: &mut GameStore,
		turn: Turn,
		which: TurnPhase,
		events: &mut Vec<Event>,
		body: impl FnOnce(&mut Phase<'_>) -> Result<()>,
	) -> Result<()> {
		// games that finished mid-pipeline (victory in Income) skip the rest
		if store.phase == GamePhase::Finished {
			return Ok(());
		}
		let mut rng = phase_rng(store.game_id, turn, which);
		let mut phase = Phase { store: &mut *store, rules: self.rules, events, rng: &mut rng, turn };
		body(&mut phase)?;
		store.reindex();
		store.audit().map_err(|violations| CoreError::Invariant {
			phase: phase_name(which),
			detail: violations.join("; "),
		})?;
		Ok(())
	}
}

fn phase_name(phase: TurnPhase) -> &'static str {
	match phase {
		TurnPhase::Conflict => "conflict",
		TurnPhase::Income => "income",
		TurnPhase::Command => "command",
		TurnPhase::Production => "production",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		entities::House,
		types::{PlanetClass, ResourceRating, ShipClass},
	};

	fn small_world() -> GameStore {
		let mut store = GameStore::new(11);
		store.phase = GamePhase::Active;
		let a = store.houses.insert_with(|id| House::new(id, "Atreides", vec![]));
		let b = store.houses.insert_with(|id| House::new(id, "Harkonnen", vec![]));
		let home = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Caladan".into(),
			coords: (0, 0),
			planet_class: PlanetClass::Terran,
			resource_rating: ResourceRating::Average,
		});
		let far = store.systems.insert_with(|id| crate::entities::StarSystem {
			id,
			name: "Giedi Prime".into(),
			coords: (9, 0),
			planet_class: PlanetClass::Hostile,
			resource_rating: ResourceRating::Rich,
		});
		store.reindex();
		store.found_colony(home, a, 50, 1).unwrap();
		store.found_colony(far, b, 50, 1).unwrap();
		let fleet = store.create_fleet(a, home).unwrap();
		store.commission_squadron(fleet, ShipClass::Cruiser, 2, 1).unwrap();
		store.reindex();
		store
	}

	#[test]
	fn resolution_is_deterministic_byte_for_byte() {
		crate::initialize();
		let rules = Rules::default();
		let engine = TurnEngine::new(&rules);

		let run = |store: GameStore| {
			let outcome = engine.resolve(store, &[]).unwrap();
			(outcome.store.snapshot().unwrap(), outcome.events)
		};
		let (snap_a, events_a) = run(small_world());
		let (snap_b, events_b) = run(small_world());
		assert_eq!(snap_a, snap_b);
		assert_eq!(events_a, events_b);
	}

	#[test]
	fn resolution_advances_the_turn_counter() {
		let rules = Rules::default();
		let engine = TurnEngine::new(&rules);
		let outcome = engine.resolve(small_world(), &[]).unwrap();
		assert_eq!(outcome.store.turn, 2);
	}
}
