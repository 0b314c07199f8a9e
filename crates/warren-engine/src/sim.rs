//! User-facing [`Simulation`] handle and its shutdown state machine.
//!
//! # Lifecycle
//!
//! ```text
//! start()                           shutdown() / Drop
//!   validate config                   Running -> Cancelling
//!   build lattice + grid                token.cancel()
//!   spawn one thread per cell         Cancelling -> Joining
//!   Running                             join cell threads
//!                                       join agent threads (cells were
//!                                       the only spawners)
//!                                     Joining -> Stopped
//!                                       drop the last emitter: stream ends
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info};
use warren_core::CancellationToken;
use warren_space::Lattice;

use crate::board::{CellStatus, OccupancyBoard};
use crate::cell::CellActor;
use crate::config::{ConfigError, SimConfig};
use crate::context::SimContext;
use crate::emitter::{EventEmitter, EventStream};
use crate::grid::Grid;
use crate::population::PopulationManager;
use crate::tasks::TaskRegistry;

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from the shutdown state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Number of cell threads joined.
    pub cells_joined: usize,
    /// Number of agent threads joined over the whole run.
    pub agents_joined: usize,
    /// Number of threads (cells or agents) that panicked.
    pub panicked: usize,
}

// ── ShutdownState ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Cancelling,
    Joining,
    Stopped,
}

// ── Simulation ───────────────────────────────────────────────────

/// A running grid simulation.
///
/// Every cell runs on its own thread from [`start`](Self::start) until
/// [`shutdown`](Self::shutdown). Dropping the handle shuts the run
/// down.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use warren_engine::{SimConfig, Simulation};
///
/// let (mut sim, events) = Simulation::start(SimConfig::with_size(4, 4)).unwrap();
/// let consumer = std::thread::spawn(move || events.count());
/// std::thread::sleep(Duration::from_millis(200));
/// let report = sim.shutdown();
/// println!("{} events, {} agents", consumer.join().unwrap(), report.agents_joined);
/// ```
pub struct Simulation {
    ctx: Option<SimContext>,
    token: CancellationToken,
    lattice: Lattice,
    board: Arc<OccupancyBoard>,
    population: Arc<PopulationManager>,
    agents: TaskRegistry,
    cell_threads: Vec<JoinHandle<()>>,
    state: ShutdownState,
}

impl Simulation {
    /// Validate `config`, build the grid and start every cell.
    ///
    /// Nothing is started when validation fails. If a cell thread
    /// cannot be spawned, the cells already running are shut down
    /// before the error is returned.
    pub fn start(config: SimConfig) -> Result<(Simulation, EventStream), ConfigError> {
        config.validate()?;
        let lattice = Lattice::new(config.width, config.height)?;
        let token = CancellationToken::new();
        let (emitter, stream) = EventEmitter::channel(config.event_capacity, token.clone());
        let emitter = emitter.with_grace(config.retry_interval);
        let (grid, inboxes) = Grid::build(lattice, config.stationary_enabled);
        let board = Arc::new(OccupancyBoard::new(lattice.cell_count()));
        let population = Arc::new(PopulationManager::new(config.population_cap()));
        let agents = TaskRegistry::new();
        let ctx = SimContext {
            config: Arc::new(config),
            grid: Arc::new(grid),
            board: Arc::clone(&board),
            population: Arc::clone(&population),
            emitter,
            token: token.clone(),
            agents: agents.clone(),
        };

        let mut sim = Simulation {
            ctx: Some(ctx.clone()),
            token,
            lattice,
            board,
            population,
            agents,
            cell_threads: Vec::with_capacity(lattice.cell_count()),
            state: ShutdownState::Running,
        };

        for ((i, pos), inbox) in lattice.positions().enumerate().zip(inboxes) {
            let cell = CellActor::new(pos, i.into(), ctx.clone());
            let spawned = thread::Builder::new()
                .name(format!("warren-cell-{i}"))
                .spawn(move || cell.run(inbox));
            match spawned {
                Ok(handle) => sim.cell_threads.push(handle),
                Err(e) => {
                    sim.shutdown();
                    return Err(ConfigError::ThreadSpawnFailed {
                        reason: format!("cell {pos}: {e}"),
                    });
                }
            }
        }
        info!(
            width = lattice.width(),
            height = lattice.height(),
            cap = sim.population.cap(),
            "simulation started"
        );
        Ok((sim, stream))
    }

    /// Stop every task and wait for it.
    ///
    /// Idempotent: later calls return an empty report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ShutdownState::Stopped {
            return ShutdownReport::default();
        }
        let start = Instant::now();

        // Phase 1: Running -> Cancelling
        self.state = ShutdownState::Cancelling;
        self.token.cancel();

        // Phase 2: Cancelling -> Joining
        self.state = ShutdownState::Joining;
        let mut cells_joined = 0;
        let mut panicked = 0;
        for handle in self.cell_threads.drain(..) {
            match handle.join() {
                Ok(()) => cells_joined += 1,
                Err(_) => panicked += 1,
            }
        }
        let agents = self.agents.join_all();

        // Phase 3: Joining -> Stopped. The runtime's emitter is the last
        // one alive; dropping it ends the event stream.
        self.ctx.take();
        self.state = ShutdownState::Stopped;

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            cells_joined,
            agents_joined: agents.joined,
            panicked: panicked + agents.panicked,
        };
        debug!(?report, "simulation stopped");
        report
    }

    /// Last published state of every cell, in identity-index order.
    pub fn snapshot(&self) -> Vec<CellStatus> {
        self.board.snapshot()
    }

    /// Mobile agents currently holding a population slot.
    pub fn live_mobile_agents(&self) -> usize {
        self.population.live()
    }

    /// The run's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The grid shape.
    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    /// Whether [`shutdown`](Self::shutdown) has completed.
    pub fn is_stopped(&self) -> bool {
        self.state == ShutdownState::Stopped
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if self.state != ShutdownState::Stopped {
            self.shutdown();
        }
    }
}
