// config.rs

use crate::error::MetronomeError;
use config::{Config, Environment, File};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_BPM: u32 = 120;
/// Fastest tempo whose beat interval is still at least one millisecond.
pub const BPM_CEILING: u32 = 60_000;
pub const ENV_PREFIX: &str = "TAPMETRO";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    /// Fixed-point scale for the magnitude ratio (10 = one decimal digit)
    pub ratio_factor: u32,
    /// Scaled ratio a drop must exceed to count as a tap
    pub ratio_max: u32,
    pub min_tap_interval_ms: u64,
    /// Drop the first sample of every pushed batch
    pub skip_first_in_batch: bool,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            ratio_factor: 10,
            ratio_max: 12,
            min_tap_interval_ms: 150,
            skip_first_in_batch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TempoSettings {
    pub history_len: usize,
    pub initial_bpm: u32,
}

impl Default for TempoSettings {
    fn default() -> Self {
        Self {
            history_len: 10,
            initial_bpm: DEFAULT_BPM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Poll period for pulling accelerometer samples while sampling
    pub sampling_poll_ms: u64,
    pub min_bpm: u32,
    pub max_bpm: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            sampling_poll_ms: 4,
            min_bpm: 1,
            max_bpm: 600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tap: TapSettings,
    pub tempo: TempoSettings,
    pub schedule: ScheduleSettings,
}

impl Settings {
    /// Layers defaults, an optional config file and `TAPMETRO__SECTION__KEY`
    /// environment variables, then validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, MetronomeError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        debug!("Resolved settings: {:?}", settings);
        settings.validate()?;
        Ok(settings)
    }

    /// CLI override for the starting tempo.
    pub fn with_initial_bpm(mut self, bpm: Option<u32>) -> Result<Self, MetronomeError> {
        if let Some(bpm) = bpm {
            debug!("Initial BPM overridden to {}", bpm);
            self.tempo.initial_bpm = bpm;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), MetronomeError> {
        if self.tap.ratio_factor == 0 {
            return Err(MetronomeError::Config(
                "tap.ratio_factor must be at least 1".into(),
            ));
        }
        if self.tempo.history_len < 2 {
            return Err(MetronomeError::Config(format!(
                "tempo.history_len must be at least 2, got {}",
                self.tempo.history_len
            )));
        }
        if self.schedule.sampling_poll_ms == 0 {
            return Err(MetronomeError::Config(
                "schedule.sampling_poll_ms must be at least 1".into(),
            ));
        }
        if self.schedule.min_bpm == 0 {
            return Err(MetronomeError::Config(
                "schedule.min_bpm must be at least 1".into(),
            ));
        }
        if self.schedule.max_bpm < self.schedule.min_bpm || self.schedule.max_bpm > BPM_CEILING {
            return Err(MetronomeError::Config(format!(
                "schedule.max_bpm must be between schedule.min_bpm ({}) and {}, got {}",
                self.schedule.min_bpm, BPM_CEILING, self.schedule.max_bpm
            )));
        }
        if self.tempo.initial_bpm > self.schedule.max_bpm {
            return Err(MetronomeError::Config(format!(
                "tempo.initial_bpm ({}) is above schedule.max_bpm ({})",
                self.tempo.initial_bpm, self.schedule.max_bpm
            )));
        }
        if self.tempo.initial_bpm < self.schedule.min_bpm {
            return Err(MetronomeError::Config(format!(
                "tempo.initial_bpm ({}) is below schedule.min_bpm ({})",
                self.tempo.initial_bpm, self.schedule.min_bpm
            )));
        }
        Ok(())
    }
}
