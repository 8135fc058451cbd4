//! Deterministic replay of recorded sensor/button traces in virtual time
//!
//! Trace format, one event per line (`#` starts a comment):
//!
//! ```text
//! 0,0,0,1000              # one sample at 0 ms
//! 4,batch,0:0:1400;0:0:1000  # a pushed batch at 4 ms
//! 500,advance
//! 900,up
//! 950,down
//! ```

use crate::config::Settings;
use crate::detector::AccelSample;
use crate::error::MetronomeError;
use crate::event_loop::{EngineMessage, EventLoop};
use crate::platform::mock::{
    ManualClock, ManualTimer, RecordingDisplay, RecordingHaptics, ScriptedAccelerometer,
};
use crate::platform::{Clock, Platform, TimerHandle};
use crate::scheduler::{BeatScheduler, SessionState};
use crate::tempo::TempoUpdate;
use log::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub at_ms: u64,
    pub message: EngineMessage,
}

pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>, MetronomeError> {
    let mut events = Vec::new();
    let mut last_at = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let fields: Vec<&str> = content.split(',').map(str::trim).collect();
        let at_ms = fields[0].parse::<u64>().map_err(|_| MetronomeError::Trace {
            line,
            reason: format!("invalid timestamp '{}'", fields[0]),
        })?;
        if at_ms < last_at {
            return Err(MetronomeError::Trace {
                line,
                reason: format!("timestamp {} goes back from {}", at_ms, last_at),
            });
        }
        last_at = at_ms;

        let message = match &fields[1..] {
            ["advance"] => EngineMessage::Advance,
            ["up"] => EngineMessage::Nudge(1),
            ["down"] => EngineMessage::Nudge(-1),
            ["batch", samples] => EngineMessage::Samples(
                samples
                    .split(';')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| parse_sample(&s.split(':').collect::<Vec<_>>(), line))
                    .collect::<Result<_, _>>()?,
            ),
            [x, y, z] => EngineMessage::Samples(vec![parse_sample(&[*x, *y, *z], line)?]),
            _ => {
                return Err(MetronomeError::Trace {
                    line,
                    reason: format!("unrecognised event '{}'", content),
                })
            }
        };
        events.push(TraceEvent { at_ms, message });
    }

    Ok(events)
}

fn parse_sample(axes: &[&str], line: usize) -> Result<AccelSample, MetronomeError> {
    let parsed: Vec<i16> = axes
        .iter()
        .map(|a| a.trim().parse::<i16>())
        .collect::<Result<_, _>>()
        .map_err(|e| MetronomeError::Trace {
            line,
            reason: format!("bad axis value: {}", e),
        })?;
    match parsed[..] {
        [x, y, z] => Ok(AccelSample::new(x, y, z)),
        _ => Err(MetronomeError::Trace {
            line,
            reason: format!("expected 3 axes, got {}", parsed.len()),
        }),
    }
}

/// Per-firing callback latency. A small xorshift keeps runs reproducible.
#[derive(Debug, Clone)]
pub struct Jitter {
    state: u64,
    max_ms: u64,
}

impl Jitter {
    pub fn new(seed: u64, max_ms: u64) -> Self {
        Jitter {
            state: seed.max(1),
            max_ms,
        }
    }

    pub fn none() -> Self {
        Self::new(1, 0)
    }

    pub fn next_ms(&mut self) -> u64 {
        if self.max_ms == 0 {
            return 0;
        }
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state % (self.max_ms + 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    /// Times (ms) at which taps were accepted
    pub taps: Vec<u64>,
    /// (time, BPM) for every new estimate
    pub tempo_changes: Vec<(u64, u32)>,
    pub pulses: Vec<u64>,
    pub final_bpm: u32,
    pub final_state: Option<SessionState>,
}

/// An [`EventLoop`] on a virtual clock with a hand-fired timer.
pub struct Simulation {
    event_loop: EventLoop,
    clock: ManualClock,
    timer: ManualTimer,
    haptics: RecordingHaptics,
    accelerometer: ScriptedAccelerometer,
    display: RecordingDisplay,
    jitter: Jitter,
    next_fire: Option<(TimerHandle, u64)>,
    report: ReplayReport,
}

impl Simulation {
    pub fn new(settings: &Settings, jitter: Jitter) -> Self {
        let clock = ManualClock::new(0);
        let timer = ManualTimer::new(clock.clone());
        let haptics = RecordingHaptics::new(clock.clone());
        let accelerometer = ScriptedAccelerometer::new();
        let display = RecordingDisplay::new();
        let platform = Platform {
            clock: Box::new(clock.clone()),
            timer: Box::new(timer.clone()),
            haptics: Box::new(haptics.clone()),
            accelerometer: Box::new(accelerometer.clone()),
            display: Box::new(display.clone()),
        };
        Simulation {
            event_loop: EventLoop::new(BeatScheduler::new(settings), platform),
            clock,
            timer,
            haptics,
            accelerometer,
            display,
            jitter,
            next_fire: None,
            report: ReplayReport::default(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn timer(&self) -> &ManualTimer {
        &self.timer
    }

    pub fn accelerometer(&self) -> &ScriptedAccelerometer {
        &self.accelerometer
    }

    pub fn display(&self) -> &RecordingDisplay {
        &self.display
    }

    pub fn pulses(&self) -> Vec<u64> {
        self.haptics.pulses()
    }

    /// Fires every timer due up to `until_ms`, then leaves the clock there.
    pub fn run_until(&mut self, until_ms: u64) -> Result<(), MetronomeError> {
        while let Some(pending) = self.timer.pending() {
            let fire_at = match self.next_fire {
                Some((handle, at)) if handle == pending.handle => at,
                _ => {
                    let at = pending.due_ms + self.jitter.next_ms();
                    self.next_fire = Some((pending.handle, at));
                    at
                }
            };
            if fire_at > until_ms {
                break;
            }
            self.clock.set(fire_at.max(self.now_ms()));
            if let Some(handle) = self.timer.fire() {
                self.deliver(EngineMessage::TimerFired(handle))?;
            }
        }
        if until_ms > self.now_ms() {
            self.clock.set(until_ms);
        }
        Ok(())
    }

    /// Delivers `message` at `at_ms`, firing any timers due first.
    pub fn send_at(&mut self, at_ms: u64, message: EngineMessage) -> Result<(), MetronomeError> {
        self.run_until(at_ms)?;
        self.deliver(message)
    }

    pub fn replay(&mut self, events: &[TraceEvent], until_ms: Option<u64>) -> Result<(), MetronomeError> {
        info!("Replaying {} trace events", events.len());
        for event in events {
            self.send_at(event.at_ms, event.message.clone())?;
        }
        if let Some(until_ms) = until_ms {
            self.run_until(until_ms)?;
        }
        Ok(())
    }

    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            pulses: self.haptics.pulses(),
            final_bpm: self.event_loop.status().bpm,
            final_state: Some(self.event_loop.state()),
            ..self.report.clone()
        }
    }

    fn deliver(&mut self, message: EngineMessage) -> Result<(), MetronomeError> {
        let now = self.now_ms();
        let outcome = self.event_loop.handle(message)?;
        for update in outcome.tempo_updates {
            self.report.taps.push(now);
            if let TempoUpdate::Updated(bpm) = update {
                debug!("Replay tempo change at {} ms: {} BPM", now, bpm);
                self.report.tempo_changes.push((now, bpm));
            }
        }
        Ok(())
    }
}
