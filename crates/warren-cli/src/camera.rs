//! Terminal camera: periodically draws the board as ASCII art.
//!
//! Mobile agents show as their two-digit id, stationary agents as `**`
//! and hazards as `##`. Edges crossed since the previous frame are drawn
//! in red.

use std::io::{self, Write};
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver};
use warren_core::{AgentId, Event, EventKind, Position};
use warren_space::Lattice;

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";

/// Redraw period of the reference camera.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Tile {
    #[default]
    Empty,
    Mobile(AgentId),
    Stationary,
    Hazard,
}

enum Wake {
    Event(Event),
    Frame,
    Closed,
}

pub struct Camera {
    lattice: Lattice,
    tiles: Vec<Tile>,
    /// Crossed edge towards the east neighbour, per cell.
    crossed_east: Vec<bool>,
    /// Crossed edge towards the south neighbour, per cell.
    crossed_south: Vec<bool>,
}

impl Camera {
    pub fn new(lattice: Lattice) -> Self {
        let n = lattice.cell_count();
        Self {
            lattice,
            tiles: vec![Tile::Empty; n],
            crossed_east: vec![false; n],
            crossed_south: vec![false; n],
        }
    }

    /// Draw a frame every `period` until `events` closes, then draw the
    /// final board once more.
    pub fn run(
        mut self,
        events: Receiver<Event>,
        period: Duration,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let frames = tick(period);
        loop {
            let wake = select! {
                recv(events) -> e => e.map_or(Wake::Closed, Wake::Event),
                recv(frames) -> _ => Wake::Frame,
            };
            match wake {
                Wake::Event(e) => self.apply(&e),
                Wake::Frame => self.draw(out)?,
                Wake::Closed => break,
            }
        }
        self.draw(out)
    }

    fn draw(&mut self, out: &mut impl Write) -> io::Result<()> {
        out.write_all(self.render().as_bytes())?;
        out.flush()?;
        self.crossed_east.fill(false);
        self.crossed_south.fill(false);
        Ok(())
    }

    pub fn apply(&mut self, event: &Event) {
        match event.kind {
            EventKind::AgentSpawned { agent, at } => self.set(at, Tile::Mobile(agent)),
            EventKind::AgentMoved { agent, from, to, .. } => {
                if self.tile(from) == Some(Tile::Mobile(agent)) {
                    self.set(from, Tile::Empty);
                }
                self.set(to, Tile::Mobile(agent));
                self.cross(from, to);
            }
            EventKind::AgentDied { agent, .. } => {
                // The victim never left its cell; it vanishes from there.
                if let Some(i) = self.tiles.iter().position(|t| *t == Tile::Mobile(agent)) {
                    self.tiles[i] = Tile::Empty;
                }
            }
            EventKind::HazardSpawned { at } => self.set(at, Tile::Hazard),
            EventKind::HazardDisappeared { at } | EventKind::AgentEnteredHazard { at, .. } => {
                if self.tile(at) == Some(Tile::Hazard) {
                    self.set(at, Tile::Empty);
                }
            }
            EventKind::StationarySpawned { at } => self.set(at, Tile::Stationary),
            EventKind::StationaryMoved { from, to, .. } => {
                if self.tile(from) == Some(Tile::Stationary) {
                    self.set(from, Tile::Empty);
                }
                self.set(to, Tile::Stationary);
                self.cross(from, to);
            }
            EventKind::StationaryDied { at } => {
                if self.tile(at) == Some(Tile::Stationary) {
                    self.set(at, Tile::Empty);
                }
            }
            EventKind::AgentReceived { .. } | EventKind::AgentLeft { .. } => {}
        }
    }

    pub fn render(&self) -> String {
        let (w, h) = (self.lattice.width() as usize, self.lattice.height() as usize);
        let mut s = String::new();
        let separator = format!("+{}\n", "--+".repeat(w));
        s.push_str(&separator);
        for y in 0..h {
            s.push('|');
            for x in 0..w {
                let i = y * w + x;
                match self.tiles[i] {
                    Tile::Empty => s.push_str("  "),
                    Tile::Mobile(id) => s.push_str(&id.to_string()),
                    Tile::Stationary => s.push_str("**"),
                    Tile::Hazard => s.push_str("##"),
                }
                if x + 1 == w {
                    s.push_str("|\n");
                } else if self.crossed_east[i] {
                    s.push_str(RED);
                    s.push('|');
                    s.push_str(RESET);
                } else {
                    s.push(' ');
                }
            }
            if y + 1 < h {
                s.push('+');
                for x in 0..w {
                    if self.crossed_south[y * w + x] {
                        s.push_str(RED);
                        s.push_str("--");
                        s.push_str(RESET);
                    } else {
                        s.push_str("  ");
                    }
                    s.push('+');
                }
                s.push('\n');
            }
        }
        s.push_str(&separator);
        s
    }

    fn tile(&self, pos: Position) -> Option<Tile> {
        let i = self.lattice.index(pos).ok()?;
        self.tiles.get(i.0).copied()
    }

    fn set(&mut self, pos: Position, tile: Tile) {
        if let Ok(i) = self.lattice.index(pos) {
            self.tiles[i.0] = tile;
        }
    }

    fn cross(&mut self, a: Position, b: Position) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let Ok(i) = self.lattice.index(lo) else {
            return;
        };
        if lo.y == hi.y {
            self.crossed_east[i.0] = true;
        } else {
            self.crossed_south[i.0] = true;
        }
    }
}
