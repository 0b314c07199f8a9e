//! Warren command-line runner.
//!
//! Starts a simulation on a `WIDTH x HEIGHT` grid, journals every event
//! to a log file, draws the board in the terminal and shuts everything
//! down after a fixed run time.

mod camera;
mod journal;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warren_engine::{SimConfig, Simulation};

use crate::camera::{Camera, FRAME_INTERVAL};
use crate::journal::Journal;

const DEFAULT_SIDE: u32 = 10;

#[derive(Parser, Debug)]
#[command(name = "warren")]
#[command(version, about = "Concurrent grid simulation with rendezvous-coupled cells", long_about = None)]
struct Cli {
    /// Grid width and height; a single value makes a square grid
    #[arg(value_name = "DIM", num_args = 0..=2, value_parser = clap::value_parser!(u32).range(1..))]
    dims: Vec<u32>,

    /// How long to run before shutting down, in milliseconds
    #[arg(long, default_value = "5000")]
    duration_ms: u64,

    /// Seed for every task's random draws
    #[arg(long)]
    seed: Option<u64>,

    /// Event journal path
    #[arg(long, default_value = "log.txt")]
    log_file: PathBuf,

    /// Do not draw the board
    #[arg(long)]
    no_camera: bool,
}

impl Cli {
    fn dimensions(&self) -> Result<(u32, u32)> {
        match *self.dims.as_slice() {
            [] => Ok((DEFAULT_SIDE, DEFAULT_SIDE)),
            [side] => Ok((side, side)),
            [width, height] => Ok((width, height)),
            _ => bail!("expected at most two dimensions, got {}", self.dims.len()),
        }
    }

    fn config(&self) -> Result<SimConfig> {
        let (width, height) = self.dimensions()?;
        let mut config = SimConfig::with_size(width, height);
        config.seed = self.seed;
        config.validate().context("invalid simulation configuration")?;
        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config()?;
    let (mut sim, events) = Simulation::start(config).context("failed to start simulation")?;
    let lattice = sim.lattice();

    let (camera_tx, camera_rx) = crossbeam_channel::unbounded();
    let camera = if cli.no_camera {
        None
    } else {
        let handle = thread::Builder::new()
            .name("warren-camera".into())
            .spawn(move || Camera::new(lattice).run(camera_rx, FRAME_INTERVAL, &mut io::stdout()))
            .context("failed to spawn camera thread")?;
        Some(handle)
    };
    let forward = camera.as_ref().map(|_| camera_tx);

    let journal = Journal::create(&cli.log_file, lattice)
        .with_context(|| format!("cannot open {}", cli.log_file.display()))?;
    let writer = thread::Builder::new()
        .name("warren-journal".into())
        .spawn(move || journal.run(events, forward))
        .context("failed to spawn journal thread")?;

    info!(width = lattice.width(), height = lattice.height(), "running");
    thread::sleep(Duration::from_millis(cli.duration_ms));
    let report = sim.shutdown();
    info!(?report, "shut down");

    let lines = match writer.join() {
        Ok(written) => written.context("journal write failed")?,
        Err(_) => bail!("journal thread panicked"),
    };
    if let Some(handle) = camera {
        match handle.join() {
            Ok(drawn) => drawn.context("camera write failed")?,
            Err(_) => bail!("camera thread panicked"),
        }
    }
    info!(lines, path = %cli.log_file.display(), "journal closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("warren").chain(args.iter().copied()))
    }

    #[test]
    fn no_arguments_give_the_default_grid() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.dimensions().unwrap(), (10, 10));
        assert_eq!(cli.duration_ms, 5000);
        assert_eq!(cli.log_file, PathBuf::from("log.txt"));
        assert!(!cli.no_camera);
    }

    #[test]
    fn one_argument_makes_a_square() {
        assert_eq!(parse(&["7"]).unwrap().dimensions().unwrap(), (7, 7));
    }

    #[test]
    fn two_arguments_set_width_and_height() {
        assert_eq!(parse(&["4", "2"]).unwrap().dimensions().unwrap(), (4, 2));
    }

    #[test]
    fn three_arguments_are_rejected() {
        assert!(parse(&["1", "2", "3"]).is_err());
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        assert!(parse(&["0"]).is_err());
        assert!(parse(&["-3"]).is_err());
        assert!(parse(&["wide"]).is_err());
    }

    #[test]
    fn options_reach_the_config() {
        let cli = parse(&["3", "--seed", "11", "--no-camera", "--duration-ms", "20"]).unwrap();
        let config = cli.config().unwrap();
        assert_eq!((config.width, config.height), (3, 3));
        assert_eq!(config.seed, Some(11));
        assert!(cli.no_camera);
        assert_eq!(cli.duration_ms, 20);
    }
}
