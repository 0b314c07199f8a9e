//! Shared handles every simulation task carries.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use warren_core::CancellationToken;

use crate::board::OccupancyBoard;
use crate::config::SimConfig;
use crate::emitter::EventEmitter;
use crate::grid::Grid;
use crate::population::PopulationManager;
use crate::tasks::TaskRegistry;

/// Everything a cell or agent needs besides its own state. Cloned into
/// each task at spawn.
#[derive(Clone, Debug)]
pub(crate) struct SimContext {
    pub config: Arc<SimConfig>,
    pub grid: Arc<Grid>,
    pub board: Arc<OccupancyBoard>,
    pub population: Arc<PopulationManager>,
    pub emitter: EventEmitter,
    pub token: CancellationToken,
    pub agents: TaskRegistry,
}

/// RNG for one task. With a configured seed each task gets its own
/// stream keyed by `salt`; otherwise entropy.
pub(crate) fn task_rng(seed: Option<u64>, salt: u64) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builds a context without starting any cell threads, so unit
    //! tests can play the part of cells and agents by hand.

    use super::*;
    use crate::emitter::EventStream;
    use crate::grid::CellInbox;
    use warren_core::{CellIndex, Position};
    use warren_space::Lattice;

    pub(crate) struct Harness {
        pub ctx: SimContext,
        pub stream: EventStream,
        inboxes: Vec<Option<CellInbox>>,
    }

    impl Harness {
        /// Hand out the inbox of the cell at `pos`; each only once.
        pub(crate) fn take_inbox(&mut self, pos: Position) -> (CellIndex, CellInbox) {
            let index = self.ctx.grid.lattice().index(pos).unwrap();
            let inbox = self.inboxes[index.0].take().expect("inbox already taken");
            (index, inbox)
        }
    }

    pub(crate) fn harness(config: SimConfig) -> Harness {
        let lattice = Lattice::new(config.width, config.height).unwrap();
        let token = CancellationToken::new();
        let (emitter, stream) = EventEmitter::channel(config.event_capacity, token.clone());
        let (grid, inboxes) = Grid::build(lattice, config.stationary_enabled);
        let ctx = SimContext {
            board: Arc::new(OccupancyBoard::new(lattice.cell_count())),
            population: Arc::new(PopulationManager::new(config.population_cap())),
            config: Arc::new(config),
            grid: Arc::new(grid),
            emitter,
            token,
            agents: TaskRegistry::new(),
        };
        Harness {
            ctx,
            stream,
            inboxes: inboxes.into_iter().map(Some).collect(),
        }
    }

    /// A start signal that has already fired, for agents run without a
    /// host cell.
    pub(crate) fn started() -> crossbeam_channel::Receiver<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(()).unwrap();
        rx
    }

    /// A quiet 10 ms configuration on a `w x h` grid.
    pub(crate) fn quiet(w: u32, h: u32) -> SimConfig {
        let mut cfg = SimConfig::with_size(w, h);
        cfg.rates = crate::config::SpawnRates::QUIET;
        cfg.tick_interval = std::time::Duration::from_millis(10);
        cfg.retry_interval = std::time::Duration::from_millis(2);
        cfg.seed = Some(7);
        cfg
    }
}
