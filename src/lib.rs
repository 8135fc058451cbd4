pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod logging;
pub mod platform;
pub mod replay;
pub mod scheduler;
pub mod tempo;
pub mod ui;

pub use cli::{Args, Command};
pub use config::Settings;
pub use detector::{AccelSample, TapDetector};
pub use error::{MetronomeError, PlatformError};
pub use event_loop::{EngineMessage, EventLoop};
pub use scheduler::{BeatScheduler, SessionState, Status, TimerAction, TimerFiring};
pub use tempo::{TapHistory, TempoEstimate, TempoEstimator, TempoUpdate};
