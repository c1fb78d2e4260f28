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

//! Entity definitions. One struct per row of the data-model table; all
//! cross-entity relationships are ids, resolved through the store.

mod colony;
mod espionage;
mod fleet;
mod ground;
mod house;
mod map;

pub use self::{
	colony::{BuildProject, BuildTarget, Colony, Facility, RepairTarget},
	espionage::{
		EspionageEffect, EspionageEffectKind, FleetObservation, GuildMission, GuildMissionKind, IntelDatabase,
		SpyMission, SpyMissionKind, SystemIntel,
	},
	fleet::{ActiveCommand, Cargo, Fleet, Ship, Squadron},
	ground::{GroundLocation, GroundUnit},
	house::{House, TechLevels},
	map::{Lane, StarSystem},
};
