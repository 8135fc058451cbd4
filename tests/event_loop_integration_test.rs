extern crate tapmetro;

use tapmetro::detector::AccelSample;
use tapmetro::replay::{Jitter, Simulation};
use tapmetro::{EngineMessage, SessionState, Settings};

const JOLT: AccelSample = AccelSample {
    x: 0,
    y: 0,
    z: 1400,
};
const REST: AccelSample = AccelSample {
    x: 0,
    y: 0,
    z: 1000,
};

fn tap_batch() -> EngineMessage {
    EngineMessage::Samples(vec![JOLT, REST])
}

#[test]
fn integration_test_tap_then_tick_then_idle() {
    let mut sim = Simulation::new(&Settings::default(), Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();

    for i in 0..10 {
        sim.send_at(1_000 + i * 600, tap_batch()).unwrap();
    }
    let report = sim.report();
    assert_eq!(report.taps.len(), 10);
    assert_eq!(report.tempo_changes, vec![(6_400, 100)]);

    sim.send_at(7_000, EngineMessage::Advance).unwrap();
    assert_eq!(sim.event_loop().state(), SessionState::Vibing);
    sim.run_until(9_400).unwrap();
    assert_eq!(sim.pulses(), vec![7_600, 8_200, 8_800, 9_400]);

    sim.send_at(9_500, EngineMessage::Advance).unwrap();
    sim.run_until(30_000).unwrap();
    assert_eq!(sim.pulses().len(), 4, "no pulses after returning to idle");
    assert!(sim.timer().pending().is_none());
}

#[test]
fn integration_test_poll_path_detects_taps() {
    let mut sim = Simulation::new(&Settings::default(), Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();

    for i in 0..10 {
        sim.run_until(1_000 + i * 500).unwrap();
        sim.accelerometer().push(JOLT);
        sim.accelerometer().push(REST);
    }
    sim.run_until(6_000).unwrap();

    let report = sim.report();
    assert_eq!(report.taps.first(), Some(&1_008));
    assert_eq!(report.tempo_changes, vec![(5_508, 120)]);
    assert_eq!(report.final_bpm, 120);
}

#[test]
fn integration_test_taps_ignored_outside_sampling() {
    let mut sim = Simulation::new(&Settings::default(), Jitter::none());
    for i in 0..12 {
        sim.send_at(i * 300, tap_batch()).unwrap();
    }
    assert!(sim.report().taps.is_empty());
    assert_eq!(sim.event_loop().status().bpm, 120);
}

#[test]
fn integration_test_zero_interval_keeps_bpm() {
    let mut settings = Settings::default();
    settings.tap.min_tap_interval_ms = 0;
    let mut sim = Simulation::new(&settings, Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();

    // Ten taps inside one millisecond tick.
    sim.send_at(50, EngineMessage::Samples([JOLT, REST].repeat(10)))
        .unwrap();
    let report = sim.report();
    assert_eq!(report.taps.len(), 10);
    assert!(report.tempo_changes.is_empty());
    assert_eq!(report.final_bpm, 120);
}

#[test]
fn integration_test_shutdown_while_ticking() {
    let mut sim = Simulation::new(&Settings::default(), Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();
    sim.send_at(10, EngineMessage::Advance).unwrap();
    sim.run_until(1_010).unwrap();
    assert_eq!(sim.pulses(), vec![510, 1_010]);

    sim.send_at(1_100, EngineMessage::Shutdown).unwrap();
    sim.run_until(60_000).unwrap();
    assert_eq!(sim.pulses(), vec![510, 1_010]);
    assert_eq!(sim.event_loop().state(), SessionState::Idle);
    assert!(sim.event_loop().armed().is_none());
}

#[test]
fn integration_test_display_follows_session() {
    let mut sim = Simulation::new(&Settings::default(), Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();
    sim.send_at(100, tap_batch()).unwrap();
    sim.send_at(200, EngineMessage::Nudge(-1)).unwrap();
    sim.send_at(300, EngineMessage::Advance).unwrap();

    let frames = sim.display().frames();
    let states: Vec<_> = frames.iter().map(|f| f.state).collect();
    assert_eq!(states.first(), Some(&SessionState::Idle));
    assert_eq!(states.last(), Some(&SessionState::Vibing));
    assert!(frames.iter().any(|f| f.tap_flash));
    assert_eq!(frames.last().unwrap().bpm_text(), "BPM: 119");
}

#[test]
fn integration_test_warming_updates_reported() {
    let mut settings = Settings::default();
    settings.tempo.history_len = 3;
    let mut sim = Simulation::new(&settings, Jitter::none());
    sim.send_at(0, EngineMessage::Advance).unwrap();

    let mut updates = Vec::new();
    for i in 0..3 {
        sim.run_until(1_000 + i * 250).unwrap();
        updates.push(sim.report().taps.len());
        sim.send_at(1_000 + i * 250, tap_batch()).unwrap();
    }
    assert_eq!(updates, vec![0, 1, 2]);
    assert_eq!(sim.report().tempo_changes, vec![(1_500, 240)]);
}
