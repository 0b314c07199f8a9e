//! Error types for rendezvous operations.

use std::error::Error;
use std::fmt;

/// Why a cancellation-aware send or receive gave up.
///
/// Neither outcome is fatal to the task that sees it: both mean the
/// exchange did not happen and the caller should carry on (or exit its
/// loop on the next cancellation check).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendezvousError {
    /// The cancellation token fired before the peer became ready.
    Cancelled,
    /// The peer's end of the channel was dropped.
    Disconnected,
}

impl fmt::Display for RendezvousError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled before the peer was ready"),
            Self::Disconnected => write!(f, "peer disconnected"),
        }
    }
}

impl Error for RendezvousError {}
