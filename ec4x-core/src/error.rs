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

use thiserror::Error;

use crate::types::{ColonyId, FacilityId, FleetId, GroundUnitId, HouseId, ShipId, SquadronId, SystemId};

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Top-level error for the engine crate.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Codec(#[from] CodecError),

	/// A post-phase audit failed. The turn must be aborted and the
	/// working store discarded; nothing of it may be persisted.
	#[error("invariant violated after {phase}: {detail}")]
	Invariant { phase: &'static str, detail: String },
}

/// Failures of the entity store and its high-level operations. Every
/// operation that returns one of these has left the store untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
	#[error("unknown house {0}")]
	NoSuchHouse(HouseId),
	#[error("unknown system {0}")]
	NoSuchSystem(SystemId),
	#[error("unknown colony {0}")]
	NoSuchColony(ColonyId),
	#[error("unknown fleet {0}")]
	NoSuchFleet(FleetId),
	#[error("unknown squadron {0}")]
	NoSuchSquadron(SquadronId),
	#[error("unknown ship {0}")]
	NoSuchShip(ShipId),
	#[error("unknown ground unit {0}")]
	NoSuchGroundUnit(GroundUnitId),
	#[error("unknown facility {0}")]
	NoSuchFacility(FacilityId),

	#[error("fleet {0} and fleet {1} are not co-located")]
	NotColocated(FleetId, FleetId),
	#[error("fleet {0} and fleet {1} have different owners")]
	OwnerMismatch(FleetId, FleetId),
	#[error("system {0} already hosts a colony")]
	SystemOccupied(SystemId),
	#[error("ship {0} is not a troop transport")]
	NotATransport(ShipId),
	#[error("ship {0} has no cargo capacity left")]
	CargoFull(ShipId),
	#[error("squadron {0} would be left without a flagship")]
	FlagshipRequired(SquadronId),
}

/// Wire-codec failures. Authentication failures are deliberately
/// indistinguishable from corrupt ciphertext.
#[derive(Debug, Error)]
pub enum CodecError {
	#[error("binary encoding: {0}")]
	Encode(#[from] bincode::Error),
	#[error("compression: {0}")]
	Compress(#[from] std::io::Error),
	#[error("payload failed authentication")]
	Sealed,
	#[error("base64 armor: {0}")]
	Armor(#[from] base64::DecodeError),
	#[error("payload too short to carry a nonce")]
	Truncated,
	#[error("fragment set incomplete: have {have} of {want}")]
	MissingFragments { have: usize, want: usize },
	#[error("reassembled plaintext does not match the fragment hash")]
	FragmentHash,
	#[error("fragment index {index} out of range for total {total}")]
	FragmentIndex { index: u32, total: u32 },
}
