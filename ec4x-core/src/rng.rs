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

//! Deterministic randomness. Every phase draws from a ChaCha stream
//! seeded by `(game_id, turn, phase)`, so the same inputs always resolve
//! to the same outputs, byte for byte, on any host.

use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use sha3::{Digest, Sha3_256};

use crate::types::{GameId, Turn, TurnPhase};

const SEED_DOMAIN: &[u8] = b"ec4x.phase.rng.v1";

/// Build the rng for one phase of one turn of one game.
pub fn phase_rng(game: GameId, turn: Turn, phase: TurnPhase) -> ChaCha8Rng {
	let mut hasher = Sha3_256::new();
	hasher.update(SEED_DOMAIN);
	hasher.update(game.to_le_bytes());
	hasher.update(turn.to_le_bytes());
	hasher.update([phase.seed_tag()]);
	let digest = hasher.finalize();
	let mut seed = [0u8; 32];
	seed.copy_from_slice(&digest);
	ChaCha8Rng::from_seed(seed)
}

/// Percent check helper: true with probability `percent`/100.
pub fn roll_percent(rng: &mut ChaCha8Rng, percent: u32) -> bool {
	use rand::Rng;
	rng.gen_range(0..100) < percent.min(100)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::RngCore;

	#[test]
	fn same_key_same_stream() {
		let mut a = phase_rng(7, 3, TurnPhase::Conflict);
		let mut b = phase_rng(7, 3, TurnPhase::Conflict);
		assert_eq!(a.next_u64(), b.next_u64());
	}

	#[test]
	fn phases_get_distinct_streams() {
		let mut a = phase_rng(7, 3, TurnPhase::Conflict);
		let mut b = phase_rng(7, 3, TurnPhase::Income);
		assert_ne!(a.next_u64(), b.next_u64());
	}

	#[test]
	fn roll_percent_bounds() {
		let mut rng = phase_rng(1, 1, TurnPhase::Conflict);
		for _ in 0..64 {
			assert!(!roll_percent(&mut rng, 0));
			assert!(roll_percent(&mut rng, 100));
		}
	}
}
