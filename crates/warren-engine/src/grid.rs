//! Channel wiring for every cell of the lattice.
//!
//! Each cell owns up to four zero-capacity channels:
//!
//! | Channel           | Direction        | Carries                               |
//! |-------------------|------------------|---------------------------------------|
//! | `mobile_in`       | neighbour → cell | `Enter`                               |
//! | `mobile_out`      | occupant → cell  | `Leave`                               |
//! | `stationary_in`   | neighbour → cell | `StationaryEnter`                     |
//! | `stationary_out`  | occupant → cell  | `StationaryLeave`, `StationaryDied`   |
//!
//! The sending halves are shared through [`Grid`]; the receiving halves
//! are handed to the owning cell task as a [`CellInbox`]. Replies never
//! travel on these channels.

use crossbeam_channel::{bounded, never, Receiver, Sender};
use warren_core::{Message, Position};
use warren_space::{Lattice, SpaceError};

/// Sending halves of one cell's channels.
#[derive(Clone, Debug)]
pub struct CellPorts {
    /// Entry requests from mobile agents.
    pub mobile_in: Sender<Message>,
    /// Departure notices from the mobile occupant.
    pub mobile_out: Sender<Message>,
    /// Entry requests from stationary agents; `None` when the
    /// stationary class is disabled.
    pub stationary_in: Option<Sender<Message>>,
    /// Notices from the stationary occupant; `None` when the stationary
    /// class is disabled.
    pub stationary_out: Option<Sender<Message>>,
}

/// Receiving halves of one cell's channels, owned by the cell task.
///
/// When the stationary class is disabled the stationary receivers are
/// [`never`] channels, so a `select!` over them simply never fires.
#[derive(Debug)]
pub struct CellInbox {
    /// See [`CellPorts::mobile_in`].
    pub mobile_in: Receiver<Message>,
    /// See [`CellPorts::mobile_out`].
    pub mobile_out: Receiver<Message>,
    /// See [`CellPorts::stationary_in`].
    pub stationary_in: Receiver<Message>,
    /// See [`CellPorts::stationary_out`].
    pub stationary_out: Receiver<Message>,
}

/// Immutable routing table: the lattice plus every cell's ports,
/// indexed by cell identity.
#[derive(Debug)]
pub struct Grid {
    lattice: Lattice,
    ports: Vec<CellPorts>,
}

impl Grid {
    /// Create all channels. The returned inboxes are in identity-index
    /// order and must each be moved into exactly one cell task.
    pub fn build(lattice: Lattice, stationary: bool) -> (Grid, Vec<CellInbox>) {
        let n = lattice.cell_count();
        let mut ports = Vec::with_capacity(n);
        let mut inboxes = Vec::with_capacity(n);
        for _ in 0..n {
            let (mobile_in_tx, mobile_in_rx) = bounded(0);
            let (mobile_out_tx, mobile_out_rx) = bounded(0);
            let (stationary_in, stationary_in_rx, stationary_out, stationary_out_rx) =
                if stationary {
                    let (in_tx, in_rx) = bounded(0);
                    let (out_tx, out_rx) = bounded(0);
                    (Some(in_tx), in_rx, Some(out_tx), out_rx)
                } else {
                    (None, never(), None, never())
                };
            ports.push(CellPorts {
                mobile_in: mobile_in_tx,
                mobile_out: mobile_out_tx,
                stationary_in,
                stationary_out,
            });
            inboxes.push(CellInbox {
                mobile_in: mobile_in_rx,
                mobile_out: mobile_out_rx,
                stationary_in: stationary_in_rx,
                stationary_out: stationary_out_rx,
            });
        }
        (Grid { lattice, ports }, inboxes)
    }

    /// The underlying lattice.
    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    /// Ports of the cell at `pos`.
    pub fn ports(&self, pos: Position) -> Result<&CellPorts, SpaceError> {
        let idx = self.lattice.index(pos)?;
        Ok(&self.ports[idx.0])
    }
}
