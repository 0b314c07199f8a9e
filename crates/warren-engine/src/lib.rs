//! Actor runtime for Warren grid simulations.
//!
//! Every grid cell runs on its own thread and owns its occupancy and
//! hazard state exclusively. Mobile and stationary agents run on their
//! own threads and move by rendezvous with neighbouring cells over
//! zero-capacity channels. A single [`CancellationToken`] stops the
//! whole population; every blocking wait observes it.
//!
//! # Architecture
//!
//! ```text
//! Mobile agent                Cell (target)              Cell (home)
//!     |                           |                          |
//!     |--Enter (try_select, 4-way race)-->|                  |
//!     |<--EnterConfirm / Hazard / Deny----|                  |
//!     |   [private reply channel]         |                  |
//!     |--Leave------------------------------------------------>|
//!     |                                                      |
//!  all tasks --emit()--> EventEmitter [bounded(100)] --> EventStream
//! ```
//!
//! [`CancellationToken`]: warren_core::CancellationToken

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod board;
pub(crate) mod cell;
pub mod config;
pub(crate) mod context;
pub mod emitter;
pub(crate) mod egress;
pub mod grid;
pub(crate) mod mobile;
pub mod population;
pub mod sim;
pub(crate) mod stationary;
pub(crate) mod tasks;

pub use board::{CellStatus, Occupancy, OccupancyBoard};
pub use config::{ConfigError, SimConfig, SpawnOutcome, SpawnRates};
pub use emitter::{EventEmitter, EventStream, DEFAULT_DRAIN_WINDOW};
pub use grid::{CellInbox, CellPorts, Grid};
pub use population::{PopulationManager, Reservation};
pub use sim::{ShutdownReport, Simulation};
