//! Simulation configuration, validation, and error types.
//!
//! [`SimConfig`] is the input to [`Simulation::start`](crate::Simulation::start).
//! [`validate()`](SimConfig::validate) checks every structural invariant
//! before any task is spawned; a configuration error is the only
//! failure that ever reaches the operator.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use warren_core::{Position, DEFAULT_RETRY_INTERVAL};
use warren_space::SpaceError;

// ── SpawnRates ─────────────────────────────────────────────────────

/// Per-tick probabilities an idle cell rolls against.
///
/// The three rates share a single uniform draw and are evaluated by
/// sequential subtraction in fixed priority order (mobile spawn, then
/// hazard, then stationary spawn), so at most one outcome fires per
/// tick. See [`choose`](Self::choose).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRates {
    /// Probability of spawning a mobile agent. Default: 0.05.
    pub mobile: f64,
    /// Probability of becoming hazardous. Default: 0.05.
    pub hazard: f64,
    /// Probability of spawning a stationary agent. Default: 0.05.
    pub stationary: f64,
}

impl Default for SpawnRates {
    fn default() -> Self {
        Self {
            mobile: 0.05,
            hazard: 0.05,
            stationary: 0.05,
        }
    }
}

/// The single outcome of an idle cell's tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// Spawn a mobile agent (subject to the population cap).
    Mobile,
    /// Become hazardous.
    Hazard,
    /// Spawn a stationary agent.
    Stationary,
}

impl SpawnRates {
    /// All rates zero: a cell that never spawns anything.
    pub const QUIET: SpawnRates = SpawnRates {
        mobile: 0.0,
        hazard: 0.0,
        stationary: 0.0,
    };

    /// Map one uniform draw `r` in `[0, 1)` to at most one outcome.
    pub fn choose(&self, r: f64) -> Option<SpawnOutcome> {
        let mut r = r;
        if r < self.mobile {
            return Some(SpawnOutcome::Mobile);
        }
        r -= self.mobile;
        if r < self.hazard {
            return Some(SpawnOutcome::Hazard);
        }
        r -= self.hazard;
        if r < self.stationary {
            return Some(SpawnOutcome::Stationary);
        }
        None
    }

    fn sum(&self) -> f64 {
        self.mobile + self.hazard + self.stationary
    }

    fn check(&self, at: Option<Position>) -> Result<(), ConfigError> {
        for (name, value) in [
            ("mobile spawn", self.mobile),
            ("hazard", self.hazard),
            ("stationary spawn", self.stationary),
        ] {
            check_probability(name, value)?;
        }
        let sum = self.sum();
        if sum > 1.0 {
            return Err(ConfigError::RatesExceedOne { sum, at });
        }
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidProbability { name, value });
    }
    Ok(())
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SimConfig::validate()`] or startup.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Grid dimensions are unusable.
    Space(SpaceError),
    /// A probability is NaN, infinite, or outside `[0, 1]`.
    InvalidProbability {
        /// Which probability.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
    /// Spawn rates sum above 1.
    RatesExceedOne {
        /// The sum.
        sum: f64,
        /// Override position, or `None` for the grid-wide rates.
        at: Option<Position>,
    },
    /// A duration that must be positive is zero.
    ZeroDuration {
        /// Which duration.
        name: &'static str,
    },
    /// The event stream needs room for at least one event.
    EventCapacityZero,
    /// A rate override names a position outside the grid.
    OverrideOutOfBounds {
        /// The offending position.
        position: Position,
    },
    /// A rate override asks for stationary spawns while the stationary
    /// class is disabled.
    StationaryDisabled {
        /// The offending position.
        position: Position,
    },
    /// A cell thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(e) => write!(f, "grid: {e}"),
            Self::InvalidProbability { name, value } => {
                write!(f, "{name} probability must be within [0, 1], got {value}")
            }
            Self::RatesExceedOne { sum, at: None } => {
                write!(f, "spawn rates sum to {sum}, above 1")
            }
            Self::RatesExceedOne { sum, at: Some(p) } => {
                write!(f, "spawn rates at {p} sum to {sum}, above 1")
            }
            Self::ZeroDuration { name } => write!(f, "{name} must be non-zero"),
            Self::EventCapacityZero => write!(f, "event_capacity must be at least 1"),
            Self::OverrideOutOfBounds { position } => {
                write!(f, "rate override at {position} lies outside the grid")
            }
            Self::StationaryDisabled { position } => write!(
                f,
                "rate override at {position} spawns stationary agents but they are disabled"
            ),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Space(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpaceError> for ConfigError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Complete configuration for a simulation run.
///
/// `Default` reproduces the reference tuning: a 10x10 grid ticking
/// every 50 ms.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Grid columns. Default: 10.
    pub width: u32,
    /// Grid rows. Default: 10.
    pub height: u32,
    /// Period of every cell and agent tick. Default: 50 ms.
    pub tick_interval: Duration,
    /// Granularity of cancellation-aware blocking waits. Default: 10 ms.
    pub retry_interval: Duration,
    /// Grid-wide spawn rates.
    pub rates: SpawnRates,
    /// Per-cell rate overrides.
    pub rate_overrides: IndexMap<Position, SpawnRates>,
    /// Per-tick probability that a mobile agent attempts a move.
    /// Default: 0.10.
    pub move_probability: f64,
    /// Per-tick probability that a stationary agent relocates on its
    /// own. Default: 0.10.
    pub stationary_move_probability: f64,
    /// How long an unconsumed hazard lasts. Default: 10 ticks.
    pub hazard_lifetime: Duration,
    /// Lifetime of a stationary agent. Default: 10 ticks.
    pub stationary_lifetime: Duration,
    /// Maximum live mobile agents. `None` = one per cell.
    pub max_mobile_agents: Option<usize>,
    /// Whether stationary agents exist at all. Default: true.
    pub stationary_enabled: bool,
    /// Capacity of the downstream event stream. Default: 100.
    pub event_capacity: usize,
    /// Seed for every task's RNG. `None` = seeded from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let tick = Duration::from_millis(50);
        Self {
            width: 10,
            height: 10,
            tick_interval: tick,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            rates: SpawnRates::default(),
            rate_overrides: IndexMap::new(),
            move_probability: 0.10,
            stationary_move_probability: 0.10,
            hazard_lifetime: tick * 10,
            stationary_lifetime: tick * 10,
            max_mobile_agents: None,
            stationary_enabled: true,
            event_capacity: 100,
            seed: None,
        }
    }
}

impl SimConfig {
    /// A default configuration on a `width x height` grid.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Replace the rates of the cell at `pos`.
    pub fn override_rates(mut self, pos: Position, rates: SpawnRates) -> Self {
        self.rate_overrides.insert(pos, rates);
        self
    }

    /// Rates that apply to the cell at `pos`. The stationary rate is
    /// zeroed when the stationary class is disabled.
    pub fn rates_at(&self, pos: Position) -> SpawnRates {
        let mut rates = self.rate_overrides.get(&pos).copied().unwrap_or(self.rates);
        if !self.stationary_enabled {
            rates.stationary = 0.0;
        }
        rates
    }

    /// Effective population cap.
    pub fn population_cap(&self) -> usize {
        self.max_mobile_agents
            .unwrap_or_else(|| (self.width as usize).saturating_mul(self.height as usize))
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Grid must be non-empty and addressable.
        let lattice = warren_space::Lattice::new(self.width, self.height)?;
        // 2. Durations.
        for (name, d) in [
            ("tick_interval", self.tick_interval),
            ("retry_interval", self.retry_interval),
            ("hazard_lifetime", self.hazard_lifetime),
            ("stationary_lifetime", self.stationary_lifetime),
        ] {
            if d.is_zero() {
                return Err(ConfigError::ZeroDuration { name });
            }
        }
        // 3. Probabilities.
        check_probability("move", self.move_probability)?;
        check_probability("stationary move", self.stationary_move_probability)?;
        self.rates.check(None)?;
        for (&position, rates) in &self.rate_overrides {
            if !lattice.contains(position) {
                return Err(ConfigError::OverrideOutOfBounds { position });
            }
            rates.check(Some(position))?;
            if !self.stationary_enabled && rates.stationary > 0.0 {
                return Err(ConfigError::StationaryDisabled { position });
            }
        }
        // 4. Event stream.
        if self.event_capacity == 0 {
            return Err(ConfigError::EventCapacityZero);
        }
        Ok(())
    }
}
