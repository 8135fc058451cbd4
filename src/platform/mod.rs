//! Collaborator contracts for the metronome core
//!
//! The core never talks to hardware directly. It needs:
//! - [`Clock`] for monotonic milliseconds
//! - [`Timer`], one cancellable one-shot callback at a time
//! - [`Haptics`], a fire-and-forget "pulse now"
//! - [`Accelerometer`] for poll-based sampling
//! - [`StatusDisplay`] to render state and BPM text
//!
//! [`host`] provides desktop implementations, [`mock`] deterministic ones for
//! tests and trace replay.

pub mod host;
pub mod mock;

use crate::detector::AccelSample;
use crate::error::PlatformError;
use crate::scheduler::Status;

/// Identifies one armed timer. Firings carry it back so stale ones can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// One-shot delayed callback service. Firings are delivered to the event loop
/// as `EngineMessage::TimerFired(handle)`.
pub trait Timer: Send {
    /// Registers a firing `delay_ms` from now. A zero delay fires as soon as
    /// the loop is free.
    fn arm(&mut self, delay_ms: u64) -> Result<TimerHandle, PlatformError>;

    /// Cancels `handle`. A no-op if it already fired or was never armed.
    fn cancel(&mut self, handle: TimerHandle);
}

pub trait Haptics: Send {
    fn pulse(&mut self);
}

pub trait Accelerometer: Send {
    /// Latest reading, if the sensor has one.
    fn peek(&mut self) -> Option<AccelSample>;

    /// Drops anything queued before a new sampling session starts.
    fn discard_pending(&mut self) {}
}

pub trait StatusDisplay: Send {
    fn show(&mut self, status: &Status);
}

/// Everything the event loop drives besides the scheduler itself.
pub struct Platform {
    pub clock: Box<dyn Clock>,
    pub timer: Box<dyn Timer>,
    pub haptics: Box<dyn Haptics>,
    pub accelerometer: Box<dyn Accelerometer>,
    pub display: Box<dyn StatusDisplay>,
}
