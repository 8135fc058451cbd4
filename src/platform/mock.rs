use super::{Accelerometer, Clock, Haptics, StatusDisplay, Timer, TimerHandle};
use crate::detector::AccelSample;
use crate::error::PlatformError;
use crate::scheduler::Status;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock(Arc::new(AtomicU64::new(start_ms)))
    }

    pub fn set(&self, now_ms: u64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    pub due_ms: u64,
}

#[derive(Debug, Default)]
struct TimerLog {
    next_handle: u64,
    pending: Option<PendingTimer>,
    armed_delays: Vec<u64>,
    cancels: usize,
}

/// Records arm/cancel calls against a [`ManualClock`]; nothing fires on its
/// own, the test or simulation calls [`ManualTimer::fire`].
#[derive(Debug, Clone)]
pub struct ManualTimer {
    clock: ManualClock,
    log: Arc<Mutex<TimerLog>>,
}

impl ManualTimer {
    pub fn new(clock: ManualClock) -> Self {
        ManualTimer {
            clock,
            log: Arc::new(Mutex::new(TimerLog::default())),
        }
    }

    pub fn pending(&self) -> Option<PendingTimer> {
        self.log.lock().unwrap().pending
    }

    /// Marks the pending timer as fired and hands back its handle.
    pub fn fire(&self) -> Option<TimerHandle> {
        self.log.lock().unwrap().pending.take().map(|p| p.handle)
    }

    pub fn armed_delays(&self) -> Vec<u64> {
        self.log.lock().unwrap().armed_delays.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.log.lock().unwrap().cancels
    }
}

impl Timer for ManualTimer {
    fn arm(&mut self, delay_ms: u64) -> Result<TimerHandle, PlatformError> {
        let mut log = self.log.lock().unwrap();
        log.next_handle += 1;
        let handle = TimerHandle(log.next_handle);
        log.pending = Some(PendingTimer {
            handle,
            due_ms: self.clock.now_ms() + delay_ms,
        });
        log.armed_delays.push(delay_ms);
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut log = self.log.lock().unwrap();
        log.cancels += 1;
        if log.pending.is_some_and(|p| p.handle == handle) {
            log.pending = None;
        }
    }
}

/// Stores the clock time of every pulse.
#[derive(Debug, Clone)]
pub struct RecordingHaptics {
    clock: ManualClock,
    pulses: Arc<Mutex<Vec<u64>>>,
}

impl RecordingHaptics {
    pub fn new(clock: ManualClock) -> Self {
        RecordingHaptics {
            clock,
            pulses: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pulses(&self) -> Vec<u64> {
        self.pulses.lock().unwrap().clone()
    }
}

impl Haptics for RecordingHaptics {
    fn pulse(&mut self) {
        let now = self.clock.now_ms();
        self.pulses.lock().unwrap().push(now);
    }
}

/// Plays back queued samples, then keeps repeating the last one like a
/// real sensor register would.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAccelerometer {
    queue: Arc<Mutex<(VecDeque<AccelSample>, Option<AccelSample>)>>,
}

impl ScriptedAccelerometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: AccelSample) {
        self.queue.lock().unwrap().0.push_back(sample);
    }
}

impl Accelerometer for ScriptedAccelerometer {
    fn peek(&mut self) -> Option<AccelSample> {
        let mut guard = self.queue.lock().unwrap();
        let (queue, last) = &mut *guard;
        if let Some(sample) = queue.pop_front() {
            *last = Some(sample);
        }
        *last
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    frames: Arc<Mutex<Vec<Status>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Status> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Status> {
        self.frames.lock().unwrap().last().copied()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, status: &Status) {
        self.frames.lock().unwrap().push(*status);
    }
}
