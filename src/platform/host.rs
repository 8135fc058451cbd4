use super::{Accelerometer, Clock, Timer, TimerHandle};
use crate::detector::AccelSample;
use crate::error::PlatformError;
use crate::event_loop::EngineMessage;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, info, trace};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Milliseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

enum TimerCommand {
    Arm(TimerHandle, Instant),
    Cancel(TimerHandle),
    Shutdown,
}

/// Timer backed by a dedicated thread. Holds at most one pending deadline;
/// arming again replaces it.
pub struct ThreadTimer {
    control_tx: Sender<TimerCommand>,
    next_handle: u64,
    thread: Option<thread::JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn spawn(fired_tx: Sender<EngineMessage>) -> Self {
        let (control_tx, control_rx) = channel::unbounded();
        let thread = thread::spawn(move || {
            info!("Timer thread started");
            run_timer_thread(control_rx, fired_tx);
            info!("Timer thread stopped");
        });
        ThreadTimer {
            control_tx,
            next_handle: 0,
            thread: Some(thread),
        }
    }
}

fn run_timer_thread(control_rx: Receiver<TimerCommand>, fired_tx: Sender<EngineMessage>) {
    let mut pending: Option<(TimerHandle, Instant)> = None;
    loop {
        let command = match pending {
            Some((handle, due)) => {
                crossbeam::select! {
                    recv(control_rx) -> command => command,
                    recv(channel::at(due)) -> _ => {
                        trace!("Timer {:?} fired", handle);
                        pending = None;
                        if fired_tx.send(EngineMessage::TimerFired(handle)).is_err() {
                            return;
                        }
                        continue;
                    }
                }
            }
            None => control_rx.recv(),
        };

        match command {
            Ok(TimerCommand::Arm(handle, due)) => pending = Some((handle, due)),
            Ok(TimerCommand::Cancel(handle)) => {
                if pending.is_some_and(|(armed, _)| armed == handle) {
                    pending = None;
                }
            }
            Ok(TimerCommand::Shutdown) | Err(_) => return,
        }
    }
}

impl Timer for ThreadTimer {
    fn arm(&mut self, delay_ms: u64) -> Result<TimerHandle, PlatformError> {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        let due = Instant::now() + Duration::from_millis(delay_ms);
        self.control_tx
            .send(TimerCommand::Arm(handle, due))
            .map_err(|_| PlatformError::TimerClosed)?;
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        // Nothing left to cancel once the thread is gone.
        let _ = self.control_tx.send(TimerCommand::Cancel(handle));
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let _ = self.control_tx.send(TimerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Requests one synthetic tap from another thread.
#[derive(Debug, Clone)]
pub struct TapTrigger(Arc<AtomicBool>);

impl TapTrigger {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Stands in for a wrist sensor on a desktop: reports a resting gravity
/// vector, and a single jolt after each tap request. The jolt followed by
/// the return to rest is the sharp drop the detector looks for.
#[derive(Debug)]
pub struct SyntheticAccelerometer {
    rest: AccelSample,
    jolt: AccelSample,
    tap_requested: Arc<AtomicBool>,
}

impl SyntheticAccelerometer {
    pub fn new() -> Self {
        SyntheticAccelerometer {
            rest: AccelSample::new(0, 0, 1000),
            jolt: AccelSample::new(120, -80, 1500),
            tap_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) -> TapTrigger {
        TapTrigger(self.tap_requested.clone())
    }
}

impl Default for SyntheticAccelerometer {
    fn default() -> Self {
        Self::new()
    }
}

impl Accelerometer for SyntheticAccelerometer {
    fn peek(&mut self) -> Option<AccelSample> {
        if self.tap_requested.swap(false, Ordering::SeqCst) {
            debug!("Synthetic jolt sample");
            Some(self.jolt)
        } else {
            Some(self.rest)
        }
    }

    fn discard_pending(&mut self) {
        if self.tap_requested.swap(false, Ordering::SeqCst) {
            debug!("Discarding tap requested outside sampling");
        }
    }
}
