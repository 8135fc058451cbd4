// event_loop.rs

use crate::detector::AccelSample;
use crate::error::{MetronomeError, PlatformError};
use crate::platform::{Platform, TimerHandle};
use crate::scheduler::{BeatScheduler, SessionState, Status, TimerAction, TimerFiring};
use crate::tempo::TempoUpdate;
use crossbeam::channel::Receiver;
use log::{debug, info, trace};

/// Everything that can wake the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Pushed accelerometer batch, oldest first
    Samples(Vec<AccelSample>),
    TimerFired(TimerHandle),
    /// The single "next state" button
    Advance,
    /// Manual BPM adjustment (+1 / -1)
    Nudge(i32),
    Shutdown,
}

/// What handling one message produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub tempo_updates: Vec<TempoUpdate>,
    pub pulsed: bool,
    pub shutdown: bool,
}

/// Single-threaded owner of the scheduler and its collaborators. Messages
/// are handled strictly one at a time, so no state is ever shared.
pub struct EventLoop {
    scheduler: BeatScheduler,
    platform: Platform,
    armed: Option<TimerHandle>,
    last_status: Option<Status>,
}

impl EventLoop {
    pub fn new(scheduler: BeatScheduler, platform: Platform) -> Self {
        let mut event_loop = EventLoop {
            scheduler,
            platform,
            armed: None,
            last_status: None,
        };
        event_loop.refresh_display();
        event_loop
    }

    /// Blocks on `rx` until a shutdown message arrives or every sender is gone.
    pub fn run(&mut self, rx: &Receiver<EngineMessage>) -> Result<(), MetronomeError> {
        info!("Event loop started");
        loop {
            match rx.recv() {
                Ok(message) => {
                    if self.handle(message)?.shutdown {
                        break;
                    }
                }
                Err(_) => {
                    info!("Engine channel closed, shutting down");
                    self.shutdown();
                    break;
                }
            }
        }
        info!("Event loop stopped");
        Ok(())
    }

    pub fn handle(&mut self, message: EngineMessage) -> Result<Outcome, PlatformError> {
        let now = self.platform.clock.now_ms();
        trace!("Handling {:?} at {} ms", message, now);
        let mut outcome = Outcome::default();

        match message {
            EngineMessage::Samples(samples) => {
                outcome.tempo_updates = self.scheduler.on_samples(&samples, now);
            }
            EngineMessage::TimerFired(handle) => {
                if self.armed != Some(handle) {
                    debug!("Dropping stale timer firing {:?}", handle);
                    return Ok(outcome);
                }
                self.armed = None;

                let (firing, action) = self.scheduler.on_timer_fired(now);
                self.apply(action)?;
                match firing {
                    TimerFiring::Poll => {
                        if let Some(sample) = self.platform.accelerometer.peek() {
                            outcome.tempo_updates.extend(self.scheduler.on_sample(sample, now));
                        }
                    }
                    TimerFiring::Pulse => {
                        self.platform.haptics.pulse();
                        outcome.pulsed = true;
                    }
                    TimerFiring::Ignored => {}
                }
            }
            EngineMessage::Advance => {
                let action = self.scheduler.advance_state(now);
                if self.scheduler.state() == SessionState::Sampling {
                    self.platform.accelerometer.discard_pending();
                }
                self.apply(action)?;
            }
            EngineMessage::Nudge(delta) => {
                let action = self.scheduler.nudge_bpm(delta, now);
                self.apply(action)?;
            }
            EngineMessage::Shutdown => {
                self.shutdown();
                outcome.shutdown = true;
            }
        }

        self.refresh_display();
        Ok(outcome)
    }

    /// Returns to idle and cancels any pending timer so nothing fires later.
    pub fn shutdown(&mut self) {
        let action = self.scheduler.teardown();
        // Cancel cannot fail.
        let _ = self.apply(action);
        self.refresh_display();
    }

    pub fn state(&self) -> SessionState {
        self.scheduler.state()
    }

    pub fn status(&self) -> Status {
        self.scheduler.status()
    }

    pub fn scheduler(&self) -> &BeatScheduler {
        &self.scheduler
    }

    pub fn armed(&self) -> Option<TimerHandle> {
        self.armed
    }

    fn apply(&mut self, action: TimerAction) -> Result<(), PlatformError> {
        match action {
            TimerAction::Arm { delay_ms } => {
                if let Some(handle) = self.armed.take() {
                    self.platform.timer.cancel(handle);
                }
                self.armed = Some(self.platform.timer.arm(delay_ms)?);
            }
            TimerAction::Cancel => {
                if let Some(handle) = self.armed.take() {
                    self.platform.timer.cancel(handle);
                }
            }
            TimerAction::Keep => {}
        }
        Ok(())
    }

    fn refresh_display(&mut self) {
        let status = self.scheduler.status();
        if self.last_status != Some(status) {
            self.platform.display.show(&status);
            self.last_status = Some(status);
        }
    }
}
