//! Bounded event stream from simulation tasks to external consumers.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::debug;
use warren_core::{CancellationToken, Event, EventKind, DEFAULT_RETRY_INTERVAL};

/// How long producers keep waiting on a full buffer once the run has
/// been cancelled.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(500);

/// Producer half of the event stream. Cheap to clone; every task holds
/// one.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: Sender<Event>,
    token: CancellationToken,
    grace: Duration,
    drain_window: Duration,
    /// Shared by all clones: set by the first emit that finds the buffer
    /// full after cancellation.
    drain_deadline: Arc<OnceLock<Instant>>,
}

impl EventEmitter {
    /// Create a stream with room for `capacity` buffered events.
    pub fn channel(capacity: usize, token: CancellationToken) -> (EventEmitter, EventStream) {
        let (tx, rx) = bounded(capacity);
        (
            EventEmitter {
                tx,
                token,
                grace: DEFAULT_RETRY_INTERVAL,
                drain_window: DEFAULT_DRAIN_WINDOW,
                drain_deadline: Arc::new(OnceLock::new()),
            },
            EventStream { rx },
        )
    }

    /// Set the wait granularity used while the buffer is full.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Set how long blocked producers keep waiting after cancellation.
    pub fn with_drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    /// Stamp `kind` with the current time and push it downstream.
    ///
    /// Blocks while the buffer is full and the run is live. After
    /// cancellation a consumer that keeps reading still gets every event,
    /// but only until the drain window closes; from then on a full buffer
    /// drops the event, so shutdown never waits on a stalled consumer for
    /// longer than the window. The window opens once for the whole stream,
    /// not per event. A closed stream drops the event silently.
    pub fn emit(&self, kind: EventKind) {
        let mut event = Event::now(kind);
        loop {
            match self.tx.send_timeout(event, self.grace) {
                Ok(()) => return,
                Err(SendTimeoutError::Disconnected(_)) => return,
                Err(SendTimeoutError::Timeout(back)) => {
                    if self.token.is_cancelled() {
                        let deadline = *self
                            .drain_deadline
                            .get_or_init(|| Instant::now() + self.drain_window);
                        if Instant::now() >= deadline {
                            debug!(kind = ?back.kind, "event dropped after cancellation");
                            return;
                        }
                    }
                    event = back;
                }
            }
        }
    }
}

/// Consumer half of the event stream.
///
/// Iteration ends once every [`EventEmitter`] clone has been dropped.
#[derive(Debug)]
pub struct EventStream {
    rx: Receiver<Event>,
}

impl EventStream {
    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Take an event if one is buffered.
    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Iterator for EventStream {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.rx.recv().ok()
    }
}
