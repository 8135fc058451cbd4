// ui.rs

use crate::platform::{Haptics, StatusDisplay};
use crate::scheduler::{SessionState, Status};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn create_status_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap(),
    );
    pb.set_prefix("Metronome");
    pb
}

pub fn format_status(status: &Status) -> String {
    let flash = if status.tap_flash { "◆" } else { "◇" };
    match status.state {
        SessionState::Sampling => format!("{} | {} {}", status.state, status.bpm_text(), flash),
        _ => format!("{} | {}", status.state, status.bpm_text()),
    }
}

/// Renders the session state and BPM on a single spinner line.
pub struct SpinnerStatus {
    pb: ProgressBar,
}

impl SpinnerStatus {
    pub fn new(pb: ProgressBar) -> Self {
        pb.enable_steady_tick(Duration::from_millis(120));
        SpinnerStatus { pb }
    }
}

impl StatusDisplay for SpinnerStatus {
    fn show(&mut self, status: &Status) {
        self.pb.set_message(format_status(status));
    }
}

/// Desktop stand-in for the vibration motor: prints a beat marker above the
/// spinner.
pub struct ConsoleHaptics {
    pb: ProgressBar,
    beats: u64,
}

impl ConsoleHaptics {
    pub fn new(pb: ProgressBar) -> Self {
        ConsoleHaptics { pb, beats: 0 }
    }
}

impl Haptics for ConsoleHaptics {
    fn pulse(&mut self) {
        self.beats += 1;
        self.pb.println(format!(
            "  ● beat {:>4}  {}",
            self.beats,
            Local::now().format("%H:%M:%S%.3f")
        ));
        log::debug!("Haptic pulse {}", self.beats);
    }
}
