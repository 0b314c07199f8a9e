//! Outbound entry channels of an agent: one lane per on-grid neighbour.
//!
//! Lanes are recomputed from the [`Grid`] whenever the agent relocates.
//! A move attempt offers one request on every lane at once and lets
//! whichever neighbour is ready take it.

use crossbeam_channel::{Select, Sender};
use smallvec::SmallVec;
use warren_core::{Direction, Message, Position};

use crate::grid::Grid;

#[derive(Clone, Debug)]
struct Lane {
    direction: Direction,
    target: Position,
    tx: Sender<Message>,
}

/// Which entry channel an [`Egress`] targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Traffic {
    Mobile,
    Stationary,
}

#[derive(Clone, Debug)]
pub(crate) struct Egress {
    lanes: SmallVec<[Lane; 4]>,
}

impl Egress {
    /// Lanes from `pos` into each neighbour's entry channel for
    /// `traffic`. Off-grid directions have no lane.
    pub(crate) fn new(grid: &Grid, pos: Position, traffic: Traffic) -> Egress {
        let lattice = grid.lattice();
        let lanes = lattice
            .neighbours(pos)
            .into_iter()
            .filter_map(|(direction, target)| {
                let ports = grid.ports(target).ok()?;
                let tx = match traffic {
                    Traffic::Mobile => ports.mobile_in.clone(),
                    Traffic::Stationary => ports.stationary_in.clone()?,
                };
                Some(Lane {
                    direction,
                    target,
                    tx,
                })
            })
            .collect();
        Egress { lanes }
    }

    /// Number of lanes.
    pub(crate) fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Offer `msg` on every lane without blocking. Returns the lane a
    /// ready neighbour took it on, or `None` if no neighbour was ready.
    /// Among several ready neighbours one is picked at random.
    pub(crate) fn race(&self, msg: Message) -> Option<(Direction, Position)> {
        if self.lanes.is_empty() {
            return None;
        }
        let mut sel = Select::new();
        for lane in &self.lanes {
            sel.send(&lane.tx);
        }
        let oper = sel.try_select().ok()?;
        let lane = &self.lanes[oper.index()];
        oper.send(&lane.tx, msg).ok()?;
        Some((lane.direction, lane.target))
    }
}
