//! Session state machine and drift-corrected beat scheduling
//!
//! Every handler returns the [`TimerAction`] the host must apply instead of
//! touching a timer itself, so the whole machine can be driven by a real
//! timer thread or by a virtual clock in tests.
//!
//! Beat deadlines are always computed from the tempo anchor
//! (`bpm_start_time`, `tick_count`, `bpm`), never from the previous firing.
//! A late callback therefore only delays that one beat; the grid itself
//! never slips.

use crate::config::Settings;
use crate::detector::{AccelSample, TapDetector};
use crate::tempo::{TempoEstimate, TempoEstimator, TempoUpdate};
use log::{debug, info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sampling,
    Vibing,
}

impl SessionState {
    /// The only transition reachable through `advance_state`.
    pub fn next(self) -> Self {
        match self {
            SessionState::Idle => SessionState::Sampling,
            SessionState::Sampling => SessionState::Vibing,
            SessionState::Vibing => SessionState::Idle,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Sampling => "Sampling",
            SessionState::Vibing => "Ticking",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the host should do with its single one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Cancel whatever is pending, then arm for `delay_ms` from now.
    Arm { delay_ms: u64 },
    /// Cancel whatever is pending. Harmless when nothing is.
    Cancel,
    /// Leave the timer alone.
    Keep,
}

/// What a timer firing asks the host to do, besides the returned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerFiring {
    /// Pull one sample from the accelerometer and feed it back.
    Poll,
    /// Emit one haptic pulse.
    Pulse,
    /// Nothing to do (fired while idle).
    Ignored,
}

/// Read-only snapshot for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: SessionState,
    pub bpm: u32,
    /// Flips on every accepted tap so a display can flash.
    pub tap_flash: bool,
}

impl Status {
    pub fn bpm_text(&self) -> String {
        format!("BPM: {}", self.bpm)
    }
}

/// Absolute deadline (ms) of beat `tick_count` against the anchor.
pub fn beat_deadline_ms(estimate: &TempoEstimate) -> u64 {
    let interval_us = 60_000_000 / estimate.bpm.max(1) as u64;
    estimate.bpm_start_time + interval_us * estimate.tick_count / 1000
}

pub struct BeatScheduler {
    state: SessionState,
    detector: TapDetector,
    estimator: TempoEstimator,
    sampling_poll_ms: u64,
    skip_first_in_batch: bool,
    tap_flash: bool,
}

impl BeatScheduler {
    pub fn new(settings: &Settings) -> Self {
        info!(
            "Creating BeatScheduler with initial BPM: {}",
            settings.tempo.initial_bpm
        );
        Self {
            state: SessionState::Idle,
            detector: TapDetector::new(&settings.tap),
            estimator: TempoEstimator::new(&settings.tempo, &settings.schedule),
            sampling_poll_ms: settings.schedule.sampling_poll_ms,
            skip_first_in_batch: settings.tap.skip_first_in_batch,
            tap_flash: false,
        }
    }

    /// Idle -> Sampling -> Vibing -> Idle.
    pub fn advance_state(&mut self, now_ms: u64) -> TimerAction {
        self.state = self.state.next();
        info!("Session state changed to {}", self.state);

        match self.state {
            SessionState::Sampling => {
                self.estimator.clear_history();
                TimerAction::Arm {
                    delay_ms: self.sampling_poll_ms,
                }
            }
            SessionState::Vibing => {
                let bpm = self.estimator.bpm();
                self.estimator.set_bpm(bpm, now_ms);
                self.rearm_beat(now_ms)
            }
            SessionState::Idle => TimerAction::Cancel,
        }
    }

    /// Manual tempo change. Always re-anchors; while vibing the next beat is
    /// re-armed straight away from the new anchor.
    pub fn nudge_bpm(&mut self, delta: i32, now_ms: u64) -> TimerAction {
        self.estimator.nudge_bpm(delta, now_ms);
        match self.state {
            SessionState::Vibing => self.rearm_beat(now_ms),
            _ => TimerAction::Keep,
        }
    }

    /// Feeds one sample through the detector. Taps only reach the tempo
    /// estimator while sampling.
    pub fn on_sample(&mut self, sample: AccelSample, now_ms: u64) -> Option<TempoUpdate> {
        if !self.detector.on_sample(sample, now_ms) {
            return None;
        }
        self.accept_tap(now_ms)
    }

    /// Feeds a pushed batch in order.
    pub fn on_samples(&mut self, samples: &[AccelSample], now_ms: u64) -> Vec<TempoUpdate> {
        self.detector
            .on_batch(samples, now_ms, self.skip_first_in_batch)
            .into_iter()
            .filter_map(|tap_ms| self.accept_tap(tap_ms))
            .collect()
    }

    pub fn on_timer_fired(&mut self, now_ms: u64) -> (TimerFiring, TimerAction) {
        match self.state {
            SessionState::Idle => {
                debug!("Timer fired while idle, ignoring");
                (TimerFiring::Ignored, TimerAction::Cancel)
            }
            SessionState::Sampling => (
                TimerFiring::Poll,
                TimerAction::Arm {
                    delay_ms: self.sampling_poll_ms,
                },
            ),
            SessionState::Vibing => {
                let action = self.rearm_beat(now_ms);
                (TimerFiring::Pulse, action)
            }
        }
    }

    /// Stops the session; the host must apply the returned cancel.
    pub fn teardown(&mut self) -> TimerAction {
        if self.state != SessionState::Idle {
            info!("Tearing down session from {}", self.state);
        }
        self.state = SessionState::Idle;
        TimerAction::Cancel
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn bpm(&self) -> u32 {
        self.estimator.bpm()
    }

    pub fn estimate(&self) -> TempoEstimate {
        self.estimator.estimate()
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            bpm: self.estimator.bpm(),
            tap_flash: self.tap_flash,
        }
    }

    pub fn estimator(&self) -> &TempoEstimator {
        &self.estimator
    }

    fn accept_tap(&mut self, tap_ms: u64) -> Option<TempoUpdate> {
        if self.state != SessionState::Sampling {
            debug!("Tap at {} ms ignored in {} state", tap_ms, self.state);
            return None;
        }
        self.tap_flash = !self.tap_flash;
        Some(self.estimator.record_tap(tap_ms))
    }

    fn rearm_beat(&mut self, now_ms: u64) -> TimerAction {
        let estimate = self.estimator.estimate();
        let deadline = beat_deadline_ms(&estimate);
        let delay = deadline as i64 - now_ms as i64;
        if delay < 0 {
            warn!(
                "Beat {} is {} ms late, firing immediately",
                estimate.tick_count, -delay
            );
        }
        debug!(
            "Beat {} at {} BPM due at {} ms (delay {} ms)",
            estimate.tick_count, estimate.bpm, deadline, delay
        );
        self.estimator.advance_tick();
        TimerAction::Arm {
            delay_ms: delay.max(0) as u64,
        }
    }
}
