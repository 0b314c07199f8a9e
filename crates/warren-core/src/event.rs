//! Domain events emitted by cells and agents.
//!
//! Events flow from the simulation core to external consumers (journal,
//! terminal camera) over a bounded stream. They are facts about what a
//! task observed, stamped when the task observed it.

use std::time::SystemTime;

use crate::id::{AgentId, Direction, Position};

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A cell spawned a mobile agent on itself.
    AgentSpawned {
        /// New agent.
        agent: AgentId,
        /// Host cell.
        at: Position,
    },
    /// A mobile agent's entry into a neighbour was confirmed.
    AgentMoved {
        /// Moving agent.
        agent: AgentId,
        /// Cell it left.
        from: Position,
        /// Cell it entered.
        to: Position,
        /// Direction of travel.
        direction: Direction,
    },
    /// A cell admitted a mobile agent.
    AgentReceived {
        /// Admitted agent.
        agent: AgentId,
        /// Admitting cell.
        at: Position,
    },
    /// A cell was notified that its mobile occupant left.
    AgentLeft {
        /// Departed agent.
        agent: AgentId,
        /// Cell that is now empty.
        at: Position,
    },
    /// A mobile agent was destroyed by a hazard.
    AgentDied {
        /// Destroyed agent.
        agent: AgentId,
        /// Hazardous cell it tried to enter.
        at: Position,
    },
    /// A hazardous cell consumed its hazard on an entrant.
    AgentEnteredHazard {
        /// Victim.
        agent: AgentId,
        /// Cell whose hazard was consumed.
        at: Position,
    },
    /// A cell became hazardous.
    HazardSpawned {
        /// Hazardous cell.
        at: Position,
    },
    /// A hazard expired unconsumed.
    HazardDisappeared {
        /// Cell that is safe again.
        at: Position,
    },
    /// A cell spawned a stationary agent on itself.
    StationarySpawned {
        /// Host cell.
        at: Position,
    },
    /// A stationary agent relocated.
    StationaryMoved {
        /// Cell it left.
        from: Position,
        /// Cell it entered.
        to: Position,
        /// Direction of travel.
        direction: Direction,
    },
    /// A stationary agent expired or was shut down.
    StationaryDied {
        /// Its last host cell.
        at: Position,
    },
}

/// A timestamped [`EventKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    /// Wall-clock time at which the emitting task observed the event.
    pub timestamp: SystemTime,
    /// Event payload.
    pub kind: EventKind,
}

impl Event {
    /// Stamp `kind` with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: SystemTime::now(),
            kind,
        }
    }

    /// The cell this event is anchored at. Moves report their
    /// destination.
    pub fn cell(&self) -> Position {
        match self.kind {
            EventKind::AgentSpawned { at, .. }
            | EventKind::AgentReceived { at, .. }
            | EventKind::AgentLeft { at, .. }
            | EventKind::AgentDied { at, .. }
            | EventKind::AgentEnteredHazard { at, .. }
            | EventKind::HazardSpawned { at }
            | EventKind::HazardDisappeared { at }
            | EventKind::StationarySpawned { at }
            | EventKind::StationaryDied { at } => at,
            EventKind::AgentMoved { to, .. } | EventKind::StationaryMoved { to, .. } => to,
        }
    }

    /// The mobile agent involved, if any.
    pub fn agent(&self) -> Option<AgentId> {
        match self.kind {
            EventKind::AgentSpawned { agent, .. }
            | EventKind::AgentMoved { agent, .. }
            | EventKind::AgentReceived { agent, .. }
            | EventKind::AgentLeft { agent, .. }
            | EventKind::AgentDied { agent, .. }
            | EventKind::AgentEnteredHazard { agent, .. } => Some(agent),
            _ => None,
        }
    }
}
