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

//! Main entrypoint for the daemon. `System` owns the supervisor thread;
//! a single registry actor holds per-game state and turns messages into
//! effects, Elm style: the handlers compute, spawned tasks do the I/O
//! and send the next message.

pub mod registry;
pub mod resolver;

pub use self::registry::GameRegistry;

use std::time::Duration;

use xtra::{prelude::*, spawn::Smol};

use ec4x_core::types::GameId;

use crate::{config::DaemonConfig, error::Result, transport::CommandEnvelope};

// ---- messages ----------------------------------------------------------

/// Periodic scan: discover games, drain transports, check deadlines.
pub struct Tick;
impl Message for Tick {
	type Result = ();
}

/// A verified command packet arrived for a game.
pub struct CommandReceived(pub GameId, pub CommandEnvelope);
impl Message for CommandReceived {
	type Result = ();
}

/// Resolution requested (readiness or deadline).
pub struct ResolveTurn(pub GameId);
impl Message for ResolveTurn {
	type Result = ();
}

/// A resolution worker finished (the commit already happened on
/// success).
pub struct TurnResolved(pub GameId, pub Result<resolver::ResolvedTurn>);
impl Message for TurnResolved {
	type Result = ();
}

/// All deltas for the turn were handed to the transport.
pub struct DeltasPublished(pub GameId);
impl Message for DeltasPublished {
	type Result = ();
}

/// A new game directory appeared on disk.
pub struct GameDiscovered(pub String);
impl Message for GameDiscovered {
	type Result = ();
}

/// Transport-side failure; payloads are already parked for reload.
pub struct TransportError(pub GameId, pub String);
impl Message for TransportError {
	type Result = ();
}

/// Stop accepting new resolutions; in-flight work drains.
pub struct Drain;
impl Message for Drain {
	type Result = ();
}

/// True when nothing is resolving.
pub struct IsIdle;
impl Message for IsIdle {
	type Result = bool;
}

pub struct Die;
impl Message for Die {
	type Result = ();
}

// ---- system ------------------------------------------------------------

/// Control the execution of the daemon. Will exit on `shutdown`.
pub struct System {
	kill_tx: flume::Sender<()>,
	handle: jod_thread::JoinHandle<Result<()>>,
}

impl System {
	/// Spawn the supervisor thread and begin driving the event loop.
	pub fn start(config: DaemonConfig) -> Self {
		let (kill_tx, kill_rx) = flume::bounded(1);
		let handle = jod_thread::spawn(move || smol::block_on(Self::main_loop(config, kill_rx)));
		Self { kill_tx, handle }
	}

	async fn main_loop(config: DaemonConfig, kill_rx: flume::Receiver<()>) -> Result<()> {
		let scan_interval = Duration::from_secs(config.scan_interval_secs.max(1));
		let registry = GameRegistry::new(config).create(None).spawn(&mut Smol::Global);

		log::info!("daemon loop running, scanning every {:?}", scan_interval);
		loop {
			let tick = async {
				smol::Timer::after(scan_interval).await;
				false
			};
			let killed = async {
				let _ = kill_rx.recv_async().await;
				true
			};
			if smol::future::or(killed, tick).await {
				break;
			}
			if registry.send(Tick).await.is_err() {
				log::error!("registry actor disconnected; shutting down");
				return Err(crate::error::DaemonError::Disconnected);
			}
		}

		// refuse new resolutions, let the in-flight ones finish
		let _ = registry.send(Drain).await;
		loop {
			match registry.send(IsIdle).await {
				Ok(true) | Err(_) => break,
				Ok(false) => {
					smol::Timer::after(Duration::from_millis(200)).await;
				}
			}
		}
		let _ = registry.send(Die).await;
		log::info!("daemon loop drained and stopped");
		Ok(())
	}

	/// Signal shutdown and join the supervisor thread.
	pub fn shutdown(self) -> Result<()> {
		let _ = self.kill_tx.send(());
		self.handle.join()
	}
}
