//! Lock-free published view of every cell's state.
//!
//! Cells remain the sole owners of their occupancy and hazard state.
//! After each change a cell publishes a copy here so that external
//! observers (tests, the CLI camera) can read a consistent per-cell
//! picture without messaging the cell. The board is never consulted by
//! the protocol itself.

use std::sync::atomic::{AtomicU32, Ordering};

use warren_core::{AgentId, CellIndex};

/// Who, if anyone, occupies a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Occupancy {
    /// Nobody.
    #[default]
    Empty,
    /// A mobile agent.
    Mobile(AgentId),
    /// A stationary agent.
    Stationary,
}

/// Published state of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellStatus {
    /// Current occupant.
    pub occupancy: Occupancy,
    /// Whether the cell is hazardous.
    pub hazardous: bool,
}

const ID_MASK: u32 = 0xFFFF;
const TAG_SHIFT: u32 = 16;
const TAG_MOBILE: u32 = 1;
const TAG_STATIONARY: u32 = 2;
const HAZARD_BIT: u32 = 1 << 18;

impl CellStatus {
    fn encode(self) -> u32 {
        let occ = match self.occupancy {
            Occupancy::Empty => 0,
            Occupancy::Mobile(id) => (TAG_MOBILE << TAG_SHIFT) | u32::from(id.0),
            Occupancy::Stationary => TAG_STATIONARY << TAG_SHIFT,
        };
        if self.hazardous {
            occ | HAZARD_BIT
        } else {
            occ
        }
    }

    fn decode(word: u32) -> Self {
        let occupancy = match (word >> TAG_SHIFT) & 0b11 {
            TAG_MOBILE => Occupancy::Mobile(AgentId((word & ID_MASK) as u16)),
            TAG_STATIONARY => Occupancy::Stationary,
            _ => Occupancy::Empty,
        };
        Self {
            occupancy,
            hazardous: word & HAZARD_BIT != 0,
        }
    }
}

/// One atomic word per cell.
#[derive(Debug)]
pub struct OccupancyBoard {
    cells: Box<[AtomicU32]>,
}

impl OccupancyBoard {
    /// A board of `cells` empty, safe cells.
    pub fn new(cells: usize) -> Self {
        Self {
            cells: (0..cells).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the board has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Record the state of cell `index`. Out-of-range indices are
    /// ignored.
    pub fn publish(&self, index: CellIndex, status: CellStatus) {
        if let Some(slot) = self.cells.get(index.0) {
            slot.store(status.encode(), Ordering::Release);
        }
    }

    /// Last published state of cell `index`.
    pub fn status(&self, index: CellIndex) -> Option<CellStatus> {
        self.cells
            .get(index.0)
            .map(|slot| CellStatus::decode(slot.load(Ordering::Acquire)))
    }

    /// Copy of every cell's state in identity-index order.
    pub fn snapshot(&self) -> Vec<CellStatus> {
        self.cells
            .iter()
            .map(|slot| CellStatus::decode(slot.load(Ordering::Acquire)))
            .collect()
    }

    /// Number of cells currently showing a mobile occupant.
    pub fn mobile_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|s| matches!(s.occupancy, Occupancy::Mobile(_)))
            .count()
    }
}
