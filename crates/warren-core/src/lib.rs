//! Core types for the Warren grid simulation.
//!
//! This is the leaf crate of the workspace. It defines the vocabulary
//! shared by every task in a running simulation: agent and cell
//! identifiers, the rendezvous message protocol, the process-wide
//! cancellation token with its cancellation-aware channel helpers, and
//! the event types carried to downstream consumers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod rendezvous;

pub use cancel::CancellationToken;
pub use error::RendezvousError;
pub use event::{Event, EventKind};
pub use id::{AgentId, CellIndex, Direction, Position, ID_CYCLE};
pub use message::{Message, MessageKind};
pub use rendezvous::{recv_until, send_until, DEFAULT_RETRY_INTERVAL};
