//! Global cap on live mobile agents and cycling id allocation.
//!
//! The manager is the only many-writer state in a simulation that is
//! not owned by a single task. Both the capacity check and the
//! increment happen inside one critical section, so the live count can
//! never exceed the cap, even transiently.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;
use warren_core::{AgentId, ID_CYCLE};

#[derive(Debug)]
struct Counters {
    live: usize,
    next: u16,
}

/// Enforces the population cap and hands out reusable ids.
#[derive(Debug)]
pub struct PopulationManager {
    cap: usize,
    counters: Mutex<Counters>,
}

impl PopulationManager {
    /// A manager allowing at most `cap` live agents.
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            counters: Mutex::new(Counters { live: 0, next: 1 }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent across a panic: every mutation is a
        // single field store.
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve a slot. Returns the new agent's id, or `None` when the
    /// population is at its cap.
    pub fn try_reserve(&self) -> Option<AgentId> {
        let mut c = self.lock();
        if c.live >= self.cap {
            return None;
        }
        c.live += 1;
        let id = AgentId(c.next);
        c.next = if c.next >= ID_CYCLE { 1 } else { c.next + 1 };
        Some(id)
    }

    /// Return a slot.
    pub fn release(&self) {
        let mut c = self.lock();
        if c.live == 0 {
            warn!("population release with no live agents");
            return;
        }
        c.live -= 1;
    }

    /// Current live count.
    pub fn live(&self) -> usize {
        self.lock().live
    }

    /// Configured cap.
    pub fn cap(&self) -> usize {
        self.cap
    }
}

/// A held population slot; released on drop.
///
/// An agent task owns its reservation for its whole life, so the slot
/// is returned however the task ends, panics included.
#[derive(Debug)]
pub struct Reservation {
    id: AgentId,
    manager: Arc<PopulationManager>,
}

impl Reservation {
    /// Reserve a slot from `manager`, or `None` at the cap.
    pub fn acquire(manager: &Arc<PopulationManager>) -> Option<Reservation> {
        let id = manager.try_reserve()?;
        Some(Reservation {
            id,
            manager: Arc::clone(manager),
        })
    }

    /// Id issued with this slot.
    pub fn id(&self) -> AgentId {
        self.id
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.manager.release();
    }
}
