//! Test fixtures for Warren development.
//!
//! Provides configuration presets tuned for fast, bounded test runs and
//! an [`EventCollector`] that drains a simulation's event stream on its
//! own thread so producers never stall on backpressure.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use warren_core::Event;
use warren_engine::{EventStream, SimConfig, SpawnRates};

/// Tick used by every preset.
pub const TEST_TICK: Duration = Duration::from_millis(5);

/// A grid where nothing spawns on its own. Tests opt cells in with
/// [`SimConfig::override_rates`].
pub fn quiet_config(width: u32, height: u32) -> SimConfig {
    SimConfig {
        rates: SpawnRates::QUIET,
        ..busy_config(width, height)
    }
}

/// A lively grid: reference spawn rates, fast ticks, short lifetimes
/// and a fixed seed.
pub fn busy_config(width: u32, height: u32) -> SimConfig {
    SimConfig {
        tick_interval: TEST_TICK,
        retry_interval: Duration::from_millis(2),
        hazard_lifetime: TEST_TICK * 10,
        stationary_lifetime: TEST_TICK * 10,
        seed: Some(0x5eed),
        ..SimConfig::with_size(width, height)
    }
}

/// Rates that spawn a mobile agent on every idle tick.
pub fn certain_mobile_spawn() -> SpawnRates {
    SpawnRates {
        mobile: 1.0,
        ..SpawnRates::QUIET
    }
}

/// Drains an [`EventStream`] on a background thread into a shared log.
pub struct EventCollector {
    events: Arc<Mutex<Vec<Event>>>,
    drain: Option<JoinHandle<()>>,
}

impl EventCollector {
    pub fn spawn(stream: EventStream) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let drain = thread::Builder::new()
            .name("warren-test-collector".into())
            .spawn(move || {
                for event in stream {
                    lock(&sink).push(event);
                }
            })
            .expect("spawn collector thread");
        Self {
            events,
            drain: Some(drain),
        }
    }

    /// Copy of everything collected so far.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Poll until some collected event satisfies `pred`. Returns it, or
    /// `None` after `timeout`.
    pub fn wait_for(&self, timeout: Duration, pred: impl Fn(&Event) -> bool) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(e) = lock(&self.events).iter().find(|e| pred(e)) {
                return Some(*e);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Wait for the stream to close and return every event, in order.
    ///
    /// Only returns once every producer is gone, i.e. after the
    /// simulation has shut down.
    pub fn finish(mut self) -> Vec<Event> {
        if let Some(drain) = self.drain.take() {
            drain.join().expect("collector thread panicked");
        }
        std::mem::take(&mut *lock(&self.events))
    }
}

fn lock(events: &Mutex<Vec<Event>>) -> MutexGuard<'_, Vec<Event>> {
    events.lock().unwrap_or_else(PoisonError::into_inner)
}
