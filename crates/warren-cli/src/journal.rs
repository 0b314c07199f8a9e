//! Append-only event journal.
//!
//! One line per event, written through a buffered writer and flushed
//! when the stream closes. Board-changing events are forwarded to the
//! camera after they are written.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::Sender;
use tracing::debug;
use warren_core::{Event, EventKind};
use warren_space::Lattice;

pub struct Journal<W: Write> {
    lattice: Lattice,
    out: BufWriter<W>,
    written: usize,
}

impl Journal<File> {
    /// Truncate or create the journal file at `path`.
    pub fn create(path: &Path, lattice: Lattice) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?, lattice))
    }
}

impl<W: Write> Journal<W> {
    pub fn new(out: W, lattice: Lattice) -> Self {
        Self {
            lattice,
            out: BufWriter::new(out),
            written: 0,
        }
    }

    pub fn record(&mut self, event: &Event) -> io::Result<()> {
        writeln!(self.out, "{}", self.line(event))?;
        self.written += 1;
        Ok(())
    }

    /// Drain `events` until every producer is gone. Returns the number
    /// of lines written.
    pub fn run(
        mut self,
        events: impl IntoIterator<Item = Event>,
        camera: Option<Sender<Event>>,
    ) -> io::Result<usize> {
        for event in events {
            self.record(&event)?;
            if let Some(tx) = &camera {
                if shows_on_board(&event.kind) && tx.send(event).is_err() {
                    debug!("camera gone, journal continues alone");
                }
            }
        }
        self.out.flush()?;
        Ok(self.written)
    }

    fn line(&self, event: &Event) -> String {
        let cell = match self.lattice.index(event.cell()) {
            Ok(index) => format!("{:2}", index.0),
            Err(_) => "??".to_string(),
        };
        format!(
            "ID: {cell} [{}] {}",
            timestamp(event.timestamp),
            describe(&event.kind)
        )
    }
}

fn describe(kind: &EventKind) -> String {
    match *kind {
        EventKind::AgentSpawned { agent, at } => format!("E-ID: {agent} {:>12} {at}", "spawned at"),
        EventKind::AgentMoved {
            agent,
            from,
            to,
            direction,
        } => format!("E-ID: {agent} {:>12} {from} to {to} [{direction}]", "sent from"),
        EventKind::AgentReceived { agent, at } => {
            format!("E-ID: {agent} {:>12} {at}", "received at")
        }
        EventKind::AgentLeft { agent, at } => format!("E-ID: {agent} {:>12} {at}", "left from"),
        EventKind::AgentDied { agent, at } => format!("E-ID: {agent} {:>12} {at}", "died at"),
        EventKind::AgentEnteredHazard { agent, at } => {
            format!("E-ID: {agent} {:>12} {at}", "hazard hit")
        }
        EventKind::HazardSpawned { at } => format!("HAZARD   {:>12} {at}", "appeared at"),
        EventKind::HazardDisappeared { at } => format!("HAZARD   {:>12} {at}", "faded at"),
        EventKind::StationarySpawned { at } => format!("S-AGENT  {:>12} {at}", "spawned at"),
        EventKind::StationaryMoved {
            from,
            to,
            direction,
        } => format!("S-AGENT  {:>12} {from} to {to} [{direction}]", "moved from"),
        EventKind::StationaryDied { at } => format!("S-AGENT  {:>12} {at}", "died at"),
    }
}

/// Seconds and microseconds since the Unix epoch.
fn timestamp(at: SystemTime) -> String {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:06}", since.as_secs(), since.subsec_micros())
}

/// Events that change what the camera draws.
fn shows_on_board(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::AgentReceived { .. } | EventKind::AgentLeft { .. }
    )
}
