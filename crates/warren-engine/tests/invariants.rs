//! Whole-system invariants sampled while a busy simulation runs.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use warren_core::{Direction, EventKind, Position};
use warren_engine::{Occupancy, Simulation, SpawnRates};
use warren_test_utils::{busy_config, certain_mobile_spawn, quiet_config, EventCollector};

// ── Capacity ─────────────────────────────────────────────────────

#[test]
fn live_agents_never_exceed_cap() {
    const CAP: usize = 4;
    let mut cfg = busy_config(6, 6);
    cfg.max_mobile_agents = Some(CAP);
    cfg.rates = SpawnRates {
        mobile: 0.5,
        hazard: 0.0,
        stationary: 0.1,
    };
    cfg.move_probability = 0.8;

    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);

    let deadline = Instant::now() + Duration::from_millis(400);
    let mut peak = 0;
    while Instant::now() < deadline {
        let live = sim.live_mobile_agents();
        peak = peak.max(live);
        assert!(live <= CAP, "live {live} above cap {CAP}");

        // A mover briefly shows in both its old and new cell, but never
        // under more distinct ids than there are slots. Without hazards no
        // slot is freed before shutdown, so stale tiles cannot add ids.
        let ids: HashSet<_> = sim
            .snapshot()
            .iter()
            .filter_map(|s| match s.occupancy {
                Occupancy::Mobile(id) => Some(id),
                _ => None,
            })
            .collect();
        assert!(ids.len() <= CAP, "{} distinct agents on the board", ids.len());
        thread::sleep(Duration::from_millis(1));
    }
    sim.shutdown();
    events.finish();
    assert!(peak > 0, "nothing ever spawned");
    assert_eq!(sim.live_mobile_agents(), 0);
}

#[test]
fn zero_cap_spawns_no_mobile_agents() {
    let mut cfg = busy_config(3, 3);
    cfg.max_mobile_agents = Some(0);
    cfg.rates.mobile = 0.9;
    cfg.rates.hazard = 0.0;
    cfg.rates.stationary = 0.0;
    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(100));
    sim.shutdown();
    assert!(events.finish().is_empty());
}

// ── Published cell state ─────────────────────────────────────────

#[test]
fn hazards_only_mark_empty_cells() {
    let mut cfg = busy_config(6, 6);
    cfg.rates = SpawnRates {
        mobile: 0.3,
        hazard: 0.3,
        stationary: 0.2,
    };
    cfg.move_probability = 0.8;

    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);

    let deadline = Instant::now() + Duration::from_millis(400);
    let (mut hazards, mut occupied) = (0, 0);
    while Instant::now() < deadline {
        for status in sim.snapshot() {
            if status.hazardous {
                hazards += 1;
                assert_eq!(status.occupancy, Occupancy::Empty, "{status:?}");
            } else if status.occupancy != Occupancy::Empty {
                occupied += 1;
            }
        }
        thread::sleep(Duration::from_millis(1));
    }
    sim.shutdown();
    events.finish();
    assert!(hazards > 0, "no hazard ever published");
    assert!(occupied > 0, "no occupant ever published");
}

// ── Shutdown ─────────────────────────────────────────────────────

#[test]
fn shutdown_terminates_a_busy_grid() {
    let (mut sim, stream) = Simulation::start(busy_config(3, 3)).unwrap();
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(300));

    let report = sim.shutdown();
    assert!(
        report.total_ms < 2000,
        "shutdown took too long: {}ms",
        report.total_ms
    );
    assert_eq!(report.cells_joined, 9);
    assert_eq!(report.panicked, 0);
    assert_eq!(sim.live_mobile_agents(), 0);
    // The stream closes only after every producer has exited.
    assert!(!events.finish().is_empty());
}

#[test]
fn shutdown_with_an_undrained_stream_does_not_hang() {
    let mut cfg = busy_config(4, 4);
    cfg.event_capacity = 1;
    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    thread::sleep(Duration::from_millis(100));

    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    let waiter = thread::spawn(move || {
        let report = sim.shutdown();
        flag.store(true, Ordering::SeqCst);
        report
    });
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "shutdown blocked on backpressure");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(waiter.join().unwrap().cells_joined, 16);
    drop(stream);
}

#[test]
fn repeated_runs_leave_no_threads_behind() {
    let agents = AtomicUsize::new(0);
    for _ in 0..5 {
        let (mut sim, stream) = Simulation::start(busy_config(2, 2)).unwrap();
        let events = EventCollector::spawn(stream);
        thread::sleep(Duration::from_millis(30));
        let report = sim.shutdown();
        agents.fetch_add(report.agents_joined, Ordering::Relaxed);
        events.finish();
    }
    assert!(agents.load(Ordering::Relaxed) > 0);
}

// ── Event stream consistency ─────────────────────────────────────

#[test]
fn moves_follow_their_direction() {
    let mut cfg = busy_config(5, 5);
    cfg.move_probability = 0.5;
    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(300));
    sim.shutdown();

    let all = events.finish();
    let mut moves = 0;
    for e in &all {
        let (from, to, direction) = match e.kind {
            EventKind::AgentMoved {
                from, to, direction, ..
            }
            | EventKind::StationaryMoved {
                from, to, direction,
            } => (from, to, direction),
            _ => continue,
        };
        moves += 1;
        assert_eq!(from.step(direction), Some(to), "{e:?}");
        assert!(Direction::ALL.contains(&direction));
    }
    assert!(moves > 0, "no moves in {} events", all.len());
}

#[test]
fn disabled_stationary_class_stays_silent() {
    let mut cfg = busy_config(4, 4);
    cfg.stationary_enabled = false;
    cfg.rates.stationary = 0.0;
    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(150));
    sim.shutdown();
    let all = events.finish();
    assert!(!all.iter().any(|e| matches!(
        e.kind,
        EventKind::StationarySpawned { .. }
            | EventKind::StationaryMoved { .. }
            | EventKind::StationaryDied { .. }
    )));
}

#[test]
fn every_death_matches_a_hazard_entry_of_the_same_agent() {
    let mut cfg = busy_config(4, 4);
    cfg.rates = SpawnRates {
        mobile: 0.2,
        hazard: 0.3,
        stationary: 0.0,
    };
    cfg.move_probability = 0.9;
    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(400));
    sim.shutdown();

    // The cell and the victim emit these two after the same rendezvous,
    // so either may come first.
    let all = events.finish();
    let mut entries: HashMap<_, usize> = HashMap::new();
    let mut deaths: HashMap<_, usize> = HashMap::new();
    for e in &all {
        match e.kind {
            EventKind::AgentEnteredHazard { agent, at } => {
                *entries.entry((agent, at)).or_default() += 1;
            }
            EventKind::AgentDied { agent, at } => {
                *deaths.entry((agent, at)).or_default() += 1;
            }
            _ => {}
        }
    }
    assert!(!deaths.is_empty(), "nobody died in {} events", all.len());
    for (key, died) in &deaths {
        let entered = entries.get(key).copied().unwrap_or(0);
        assert!(*died <= entered, "{key:?} died {died} times, entered {entered}");
    }
}

#[test]
fn agents_are_announced_before_they_act() {
    // A walker from (0,0) runs east into a hazard that keeps coming back
    // at (3,0). The tiny buffer and the late consumer hold every emit
    // back, which is when a fresh agent could overtake its own spawn.
    let mut cfg = quiet_config(4, 1)
        .override_rates(Position::new(0, 0), certain_mobile_spawn())
        .override_rates(
            Position::new(3, 0),
            SpawnRates {
                hazard: 1.0,
                ..SpawnRates::QUIET
            },
        );
    cfg.max_mobile_agents = Some(2);
    cfg.move_probability = 1.0;
    cfg.stationary_enabled = false;
    cfg.event_capacity = 1;

    let (mut sim, stream) = Simulation::start(cfg).unwrap();
    thread::sleep(Duration::from_millis(60));
    let events = EventCollector::spawn(stream);
    thread::sleep(Duration::from_millis(300));
    sim.shutdown();

    let all = events.finish();
    let mut live = HashSet::new();
    let mut acted = 0;
    for e in &all {
        match e.kind {
            EventKind::AgentSpawned { agent, .. } => {
                live.insert(agent);
            }
            EventKind::AgentMoved { agent, .. } => {
                acted += 1;
                assert!(live.contains(&agent), "{e:?} before its spawn");
            }
            EventKind::AgentDied { agent, .. } => {
                acted += 1;
                assert!(live.remove(&agent), "{e:?} before its spawn");
            }
            _ => {}
        }
    }
    assert!(acted > 0, "no agent ever acted: {all:?}");
}
