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

//! Direct database row representations.

use sqlx::FromRow;

use ec4x_core::types::{GamePhase, HouseId, Turn};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GameRow {
	pub id: i64,
	pub name: String,
	pub slug: String,
	pub turn: i64,
	pub phase: String,
	pub deadline: Option<String>,
	pub transport_config: String,
	pub state_blob: Vec<u8>,
	pub created_at: String,
	pub updated_at: String,
}

impl GameRow {
	pub fn game_phase(&self) -> GamePhase {
		match self.phase.as_str() {
			"setup" => GamePhase::Setup,
			"active" => GamePhase::Active,
			"finished" => GamePhase::Finished,
			_ => GamePhase::Paused,
		}
	}

	pub fn current_turn(&self) -> Turn {
		self.turn.max(0) as Turn
	}
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CommandRow {
	pub game_id: i64,
	pub house: i64,
	pub turn: i64,
	pub packet_blob: Vec<u8>,
	pub submitted_at: String,
	pub processed: i64,
}

impl CommandRow {
	pub fn house_id(&self) -> HouseId {
		HouseId(self.house.max(0) as u32)
	}
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct EventRow {
	pub id: i64,
	pub game_id: i64,
	pub turn: i64,
	pub kind: String,
	pub house: Option<i64>,
	pub fleet: Option<i64>,
	pub system: Option<i64>,
	pub description: String,
	pub data_blob: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SnapshotRow {
	pub game_id: i64,
	pub house: i64,
	pub turn: i64,
	pub state_blob: Vec<u8>,
}
