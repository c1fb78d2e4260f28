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

use crate::types::{LaneClass, LaneId, PlanetClass, ResourceRating, SystemId};

/// A star system. Static after map generation; occupancy is derived
/// from the colony and fleet indices, never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
	pub id: SystemId,
	pub name: String,
	pub coords: (i32, i32),
	pub planet_class: PlanetClass,
	pub resource_rating: ResourceRating,
}

/// An undirected jump lane between two systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
	pub id: LaneId,
	pub endpoints: (SystemId, SystemId),
	pub class: LaneClass,
}

impl Lane {
	/// The far end of this lane as seen from `from`, if `from` is an endpoint.
	pub fn other_end(&self, from: SystemId) -> Option<SystemId> {
		if self.endpoints.0 == from {
			Some(self.endpoints.1)
		} else if self.endpoints.1 == from {
			Some(self.endpoints.0)
		} else {
			None
		}
	}
}
