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

use serde::{Deserialize, Serialize};

use crate::types::{ColonyId, CombatState, GroundUnitId, GroundUnitType, HouseId, ShipId};

/// Where a ground unit currently is. Exactly one of the two, always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroundLocation {
	Colony(ColonyId),
	Transport(ShipId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundUnit {
	pub id: GroundUnitId,
	pub owner: HouseId,
	pub kind: GroundUnitType,
	pub location: GroundLocation,
	pub state: CombatState,
}

impl GroundUnit {
	pub fn new(id: GroundUnitId, owner: HouseId, kind: GroundUnitType, location: GroundLocation) -> Self {
		Self { id, owner, kind, location, state: CombatState::Undamaged }
	}

	pub fn is_embarked(&self) -> bool {
		matches!(self.location, GroundLocation::Transport(_))
	}
}
