//! Tap detection from raw accelerometer samples
//!
//! A tap shows up as a sharp drop in acceleration magnitude between two
//! consecutive samples. Detection is ratio based so the resting gravity
//! vector (whatever way the wrist is turned) cancels out.

use crate::config::TapSettings;
use log::{info, trace};

/// One 3-axis reading in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AccelSample {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Squared magnitude; the square root is never needed since only ratios matter.
    pub fn magnitude_sq(&self) -> u64 {
        let (x, y, z) = (self.x as i64, self.y as i64, self.z as i64);
        (x * x + y * y + z * z) as u64
    }
}

#[derive(Debug)]
pub struct TapDetector {
    ratio_factor: u64,
    ratio_max: u64,
    min_tap_interval_ms: u64,
    last_magnitude: Option<u64>,
    last_tap_ms: Option<u64>,
}

impl TapDetector {
    pub fn new(settings: &TapSettings) -> Self {
        Self {
            ratio_factor: settings.ratio_factor as u64,
            ratio_max: settings.ratio_max as u64,
            min_tap_interval_ms: settings.min_tap_interval_ms,
            last_magnitude: None,
            last_tap_ms: None,
        }
    }

    /// Classifies one sample. Returns true iff it is the trailing edge of a tap.
    pub fn on_sample(&mut self, sample: AccelSample, now_ms: u64) -> bool {
        let magnitude = sample.magnitude_sq();
        let previous = self.last_magnitude.replace(magnitude);

        let Some(previous) = previous else {
            trace!("First sample, magnitude {}", magnitude);
            return false;
        };
        if magnitude == 0 {
            trace!("Zero magnitude sample skipped");
            return false;
        }

        // previous * factor / magnitude > ratio_max, compared without truncation.
        let scaled_previous = previous * self.ratio_factor;
        let ratio = scaled_previous / magnitude;
        trace!("Sample magnitude {} ratio {}", magnitude, ratio);
        if scaled_previous <= magnitude * self.ratio_max || !self.debounce_elapsed(now_ms) {
            return false;
        }

        self.last_tap_ms = Some(now_ms);
        info!("Tap detected at {} ms (ratio {})", now_ms, ratio);
        true
    }

    /// Feeds a batch in order and returns the timestamps of accepted taps.
    ///
    /// With `skip_first` the leading sample is dropped; some sensor feeds
    /// repeat the previous batch's last reading there.
    pub fn on_batch(&mut self, samples: &[AccelSample], now_ms: u64, skip_first: bool) -> Vec<u64> {
        let start = usize::from(skip_first).min(samples.len());
        samples[start..]
            .iter()
            .filter_map(|sample| self.on_sample(*sample, now_ms).then_some(now_ms))
            .collect()
    }

    fn debounce_elapsed(&self, now_ms: u64) -> bool {
        match self.last_tap_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.min_tap_interval_ms,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> TapDetector {
        TapDetector::new(&TapSettings::default())
    }

    const REST: AccelSample = AccelSample {
        x: 0,
        y: 0,
        z: 1000,
    };
    const SPIKE: AccelSample = AccelSample {
        x: 0,
        y: 0,
        z: 1400,
    };

    #[test]
    fn test_magnitude_squares_every_axis() {
        assert_eq!(AccelSample::new(3, -4, 12).magnitude_sq(), 169);
        assert_eq!(AccelSample::new(i16::MIN, i16::MIN, i16::MIN).magnitude_sq(), 3 << 30);
    }

    #[test]
    fn test_first_sample_never_taps() {
        let mut detector = detector();
        assert!(!detector.on_sample(SPIKE, 1000));
    }

    #[test]
    fn test_constant_magnitude_never_taps() {
        let mut detector = detector();
        for i in 0..500 {
            let sample = match i % 3 {
                0 => AccelSample::new(0, 0, 1000),
                1 => AccelSample::new(1000, 0, 0),
                _ => AccelSample::new(0, -1000, 0),
            };
            assert!(!detector.on_sample(sample, i * 200));
        }
    }

    #[test]
    fn test_sharp_drop_is_a_tap() {
        let mut detector = detector();
        detector.on_sample(SPIKE, 0);
        assert!(detector.on_sample(REST, 4));
    }

    #[test]
    fn test_threshold_is_exact() {
        let mut detector = detector();
        // 2500 -> 2000 is a 1.25x drop; truncated integer ratio would read 12.
        detector.on_sample(AccelSample::new(0, 0, 50), 0);
        assert!(detector.on_sample(AccelSample::new(0, 20, 40), 0));

        // 3600 -> 3000 is exactly 1.2x, which does not exceed the threshold.
        let mut detector = TapDetector::new(&TapSettings::default());
        detector.on_sample(AccelSample::new(0, 0, 60), 0);
        assert!(!detector.on_sample(AccelSample::new(10, 20, 50), 0));
    }

    #[test]
    fn test_rise_is_not_a_tap() {
        let mut detector = detector();
        detector.on_sample(REST, 0);
        assert!(!detector.on_sample(SPIKE, 4));
    }

    #[test]
    fn test_debounce_boundary() {
        let mut detector = detector();
        detector.on_sample(SPIKE, 0);
        assert!(detector.on_sample(REST, 10));

        detector.on_sample(SPIKE, 150);
        assert!(!detector.on_sample(REST, 159), "149ms after last tap");

        detector.on_sample(SPIKE, 160);
        assert!(detector.on_sample(REST, 160), "exactly 150ms after last tap");
    }

    #[test]
    fn test_zero_magnitude_is_skipped() {
        let mut detector = detector();
        detector.on_sample(SPIKE, 0);
        assert!(!detector.on_sample(AccelSample::default(), 200));
        // Previous magnitude is now zero, so the next sample cannot be a tap either.
        assert!(!detector.on_sample(REST, 400));
    }

    #[test]
    fn test_batch_skips_stale_first_sample() {
        let mut detector = detector();
        detector.on_sample(REST, 0);
        // The stale SPIKE is dropped, so REST -> REST never taps.
        assert!(detector.on_batch(&[SPIKE, REST], 100, true).is_empty());
        assert_eq!(detector.on_batch(&[SPIKE, REST], 300, false), vec![300]);
        assert!(detector.on_batch(&[], 600, true).is_empty());
    }
}
