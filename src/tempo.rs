//! Tempo estimation from a sliding window of tap timestamps

use crate::config::{ScheduleSettings, TempoSettings, BPM_CEILING};
use log::{debug, info};

/// Fixed-capacity ring of the most recent tap timestamps (ms).
#[derive(Debug, Clone)]
pub struct TapHistory {
    taps: Vec<u64>,
    cursor: usize,
    recorded: usize,
}

impl TapHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            taps: vec![0; capacity.max(2)],
            cursor: 0,
            recorded: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.taps.len()
    }

    /// Number of real taps held, capped at capacity.
    pub fn len(&self) -> usize {
        self.recorded
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    pub fn is_full(&self) -> bool {
        self.recorded == self.capacity()
    }

    /// Overwrites the slot under the cursor and advances it.
    pub fn push(&mut self, timestamp_ms: u64) {
        self.taps[self.cursor] = timestamp_ms;
        self.cursor = (self.cursor + 1) % self.capacity();
        self.recorded = (self.recorded + 1).min(self.capacity());
    }

    pub fn newest(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        let idx = (self.cursor + self.capacity() - 1) % self.capacity();
        Some(self.taps[idx])
    }

    /// The entry next in line to be overwritten, i.e. capacity-1 taps before
    /// the newest. Only meaningful once the ring is full.
    pub fn oldest(&self) -> Option<u64> {
        self.is_full().then(|| self.taps[self.cursor])
    }

    pub fn clear(&mut self) {
        self.taps.iter_mut().for_each(|t| *t = 0);
        self.cursor = 0;
        self.recorded = 0;
    }
}

/// Current tempo plus the anchor every beat deadline is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEstimate {
    pub bpm: u32,
    pub bpm_start_time: u64,
    pub tick_count: u64,
}

/// Outcome of recording one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoUpdate {
    /// Not enough taps in the window yet.
    Warming { recorded: usize, needed: usize },
    /// A new estimate replaced the old one and re-anchored the beat.
    Updated(u32),
    /// The window spans zero time; the previous BPM is kept.
    Unchanged(u32),
}

pub struct TempoEstimator {
    history: TapHistory,
    estimate: TempoEstimate,
    min_bpm: u32,
    max_bpm: u32,
}

impl TempoEstimator {
    pub fn new(tempo: &TempoSettings, schedule: &ScheduleSettings) -> Self {
        let min_bpm = schedule.min_bpm.max(1);
        let max_bpm = schedule.max_bpm.min(BPM_CEILING).max(min_bpm);
        Self {
            history: TapHistory::new(tempo.history_len),
            estimate: TempoEstimate {
                bpm: tempo.initial_bpm.clamp(min_bpm, max_bpm),
                bpm_start_time: 0,
                tick_count: 1,
            },
            min_bpm,
            max_bpm,
        }
    }

    pub fn record_tap(&mut self, timestamp_ms: u64) -> TempoUpdate {
        self.history.push(timestamp_ms);

        let (Some(newest), Some(oldest)) = (self.history.newest(), self.history.oldest()) else {
            debug!(
                "Tap {}/{} recorded, estimate not yet available",
                self.history.len(),
                self.history.capacity()
            );
            return TempoUpdate::Warming {
                recorded: self.history.len(),
                needed: self.history.capacity(),
            };
        };

        // Scaled by 1000 to keep sub-millisecond precision in integer math.
        let intervals = (self.history.capacity() - 1) as u64;
        let avg_interval_x1000 = newest.saturating_sub(oldest) * 1000 / intervals;
        if avg_interval_x1000 == 0 {
            debug!("Tap window spans no time, keeping {} BPM", self.estimate.bpm);
            return TempoUpdate::Unchanged(self.estimate.bpm);
        }

        let bpm = (60_000_000 / avg_interval_x1000).min(u32::MAX as u64) as u32;
        self.set_bpm(bpm, timestamp_ms);
        info!("Tempo estimate {} BPM", self.estimate.bpm);
        TempoUpdate::Updated(self.estimate.bpm)
    }

    /// Overwrites the tempo and re-anchors the beat grid at `now_ms`.
    pub fn set_bpm(&mut self, bpm: u32, now_ms: u64) {
        self.estimate = TempoEstimate {
            bpm: bpm.clamp(self.min_bpm, self.max_bpm),
            bpm_start_time: now_ms,
            tick_count: 1,
        };
    }

    /// Manual +/- adjustment, held within the configured BPM range.
    pub fn nudge_bpm(&mut self, delta: i32, now_ms: u64) -> u32 {
        let target = (self.estimate.bpm as i64 + delta as i64).clamp(0, u32::MAX as i64);
        self.set_bpm(target as u32, now_ms);
        info!("BPM nudged by {} to {}", delta, self.estimate.bpm);
        self.estimate.bpm
    }

    pub fn bpm(&self) -> u32 {
        self.estimate.bpm
    }

    pub fn estimate(&self) -> TempoEstimate {
        self.estimate
    }

    /// Counts one more beat scheduled against the current anchor.
    pub fn advance_tick(&mut self) {
        self.estimate.tick_count += 1;
    }

    pub fn history(&self) -> &TapHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
