//! Tempo estimation from 24 PPQN clock pulses.
//!
//! One estimate is produced per quarter note. Raw estimates are clamped, blended
//! into the running tempo with a confidence-dependent weight, and finally snapped
//! to an integer once the smoothed value has sat next to that integer for a few
//! consecutive measurements.

use crate::config::{
    BPM_SNAP_THRESHOLD, BPM_STABILITY_COUNT, DEFAULT_BPM, MAX_BPM, MIN_BPM, PULSES_PER_QUARTER,
    SMOOTHING_FACTOR,
};
use log::debug;
use std::time::Instant;

/// Running estimator state. Only the event-processing thread touches this;
/// `current_bpm` and `measurement_count` are published through
/// [`crate::state::SharedTransportState`] by the transport controller.
#[derive(Debug, Clone, PartialEq)]
pub struct BpmState {
    pub current_bpm: f64,
    /// Pulses seen in the current window, 0..24.
    pub pulse_count: u32,
    /// Window boundary. `None` until the first pulse after a (re)start.
    pub last_pulse_time: Option<Instant>,
    pub measurement_count: u64,
    pub last_snapped_bpm: f64,
    pub stability_counter: u32,
}

impl Default for BpmState {
    fn default() -> Self {
        Self {
            current_bpm: DEFAULT_BPM,
            pulse_count: 0,
            last_pulse_time: None,
            measurement_count: 0,
            last_snapped_bpm: 0.0,
            stability_counter: 0,
        }
    }
}

/// A single raw measurement, consumed immediately by the smoothing step.
#[derive(Debug, Clone, Copy)]
struct TempoSample {
    raw_bpm: f64,
    timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoUpdate {
    /// Tempo after smoothing and snapping.
    pub bpm: f64,
    /// Clamped tempo measured over the last window.
    pub raw_bpm: f64,
    /// Whether `bpm` is a snapped integer.
    pub locked: bool,
    /// Measurement count after this update.
    pub measurement: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseOutcome {
    /// First pulse after a (re)start; only the timestamp was recorded.
    FirstPulse,
    /// Pulse counted towards the current window.
    Counted,
    /// The window completed but its elapsed time was not positive.
    Discarded,
    Tempo(TempoUpdate),
}

impl PulseOutcome {
    pub fn tempo(&self) -> Option<TempoUpdate> {
        match self {
            PulseOutcome::Tempo(update) => Some(*update),
            _ => None,
        }
    }

    pub fn is_first_pulse(&self) -> bool {
        matches!(self, PulseOutcome::FirstPulse)
    }
}

#[derive(Debug, Default)]
pub struct TempoEstimator {
    state: BpmState,
}

impl TempoEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BpmState {
        &self.state
    }

    pub fn current_bpm(&self) -> f64 {
        self.state.current_bpm
    }

    pub fn measurement_count(&self) -> u64 {
        self.state.measurement_count
    }

    pub fn on_clock_pulse(&mut self) -> PulseOutcome {
        self.on_clock_pulse_at(Instant::now())
    }

    /// Feeds one clock pulse observed at `now`.
    pub fn on_clock_pulse_at(&mut self, now: Instant) -> PulseOutcome {
        let window_start = match self.state.last_pulse_time {
            Some(start) => start,
            None => {
                self.state.last_pulse_time = Some(now);
                self.state.pulse_count = 1;
                return PulseOutcome::FirstPulse;
            }
        };

        self.state.pulse_count += 1;
        if self.state.pulse_count < PULSES_PER_QUARTER {
            return PulseOutcome::Counted;
        }

        self.state.pulse_count = 0;
        self.state.last_pulse_time = Some(now);

        let elapsed_us = now
            .checked_duration_since(window_start)
            .map_or(0, |elapsed| elapsed.as_micros());
        if elapsed_us == 0 {
            debug!("Discarding tempo sample: non-positive window length");
            return PulseOutcome::Discarded;
        }

        let sample = TempoSample {
            raw_bpm: (60_000_000.0 / elapsed_us as f64).clamp(MIN_BPM, MAX_BPM),
            timestamp: now,
        };
        PulseOutcome::Tempo(self.apply_sample(sample))
    }

    /// Start: forget the window, the first-pulse flag and the measurement history.
    pub fn reset_counters(&mut self) {
        self.reset_pulse_window();
        self.state.measurement_count = 0;
    }

    /// Stop: the next pulse begins a fresh window.
    pub fn reset_pulse_window(&mut self) {
        self.state.pulse_count = 0;
        self.state.last_pulse_time = None;
    }

    fn apply_sample(&mut self, sample: TempoSample) -> TempoUpdate {
        let current = self.state.current_bpm;
        let weight = smoothing_weight(self.state.measurement_count, sample.raw_bpm, current);
        let smoothed = current * (1.0 - weight) + sample.raw_bpm * weight;
        let (bpm, locked) = self.snap(smoothed);

        self.state.current_bpm = bpm;
        self.state.measurement_count += 1;

        debug!(
            "Tempo estimate #{} at {:?}: {:.2} (raw: {:.2}){}",
            self.state.measurement_count,
            sample.timestamp,
            bpm,
            sample.raw_bpm,
            if locked { " [LOCKED]" } else { "" }
        );

        TempoUpdate {
            bpm,
            raw_bpm: sample.raw_bpm,
            locked,
            measurement: self.state.measurement_count,
        }
    }

    fn snap(&mut self, smoothed: f64) -> (f64, bool) {
        let nearest = smoothed.round();
        if (smoothed - nearest).abs() > BPM_SNAP_THRESHOLD {
            self.state.stability_counter = 0;
            return (smoothed, false);
        }

        if (self.state.last_snapped_bpm - nearest).abs() < 0.5 {
            self.state.stability_counter += 1;
        } else {
            self.state.stability_counter = 1;
            self.state.last_snapped_bpm = nearest;
        }

        if self.state.stability_counter >= BPM_STABILITY_COUNT {
            (nearest, true)
        } else {
            (smoothed, false)
        }
    }
}

/// Weight given to the raw sample: trust new readings early on and on large
/// jumps, damp noise once the estimate has settled.
fn smoothing_weight(measurement_count: u64, raw_bpm: f64, current_bpm: f64) -> f64 {
    let jump = (raw_bpm - current_bpm).abs();
    if measurement_count < 5 || jump > 10.0 {
        0.9
    } else if measurement_count < 10 || jump > 3.0 {
        0.5
    } else {
        SMOOTHING_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_smoothing_weight_tiers() {
        assert_eq!(smoothing_weight(0, 120.0, 120.0), 0.9);
        assert_eq!(smoothing_weight(20, 135.0, 120.0), 0.9);
        assert_eq!(smoothing_weight(7, 120.0, 120.0), 0.5);
        assert_eq!(smoothing_weight(20, 124.0, 120.0), 0.5);
        assert_eq!(smoothing_weight(20, 121.0, 120.0), SMOOTHING_FACTOR);
    }

    #[test]
    fn test_snap_requires_three_consecutive_readings() {
        let mut est = TempoEstimator::new();
        assert_eq!(est.snap(120.05), (120.05, false));
        assert_eq!(est.snap(119.9), (119.9, false));
        assert_eq!(est.snap(120.1), (120.0, true));
        assert_eq!(est.snap(120.02), (120.0, true));
        assert_eq!(est.state.stability_counter, 4);
    }

    #[test]
    fn test_snap_run_resets_outside_threshold() {
        let mut est = TempoEstimator::new();
        est.snap(120.05);
        est.snap(120.05);
        assert_eq!(est.snap(120.3), (120.3, false));
        assert_eq!(est.state.stability_counter, 0);
        assert_eq!(est.snap(120.05), (120.05, false));
        assert_eq!(est.state.stability_counter, 1);
    }

    #[test]
    fn test_snap_retargets_on_new_integer() {
        let mut est = TempoEstimator::new();
        est.snap(120.05);
        est.snap(120.05);
        assert_eq!(est.snap(121.02), (121.02, false));
        assert_eq!(est.state.stability_counter, 1);
        assert_eq!(est.state.last_snapped_bpm, 121.0);
    }

    #[test]
    fn test_first_pulse_only_records_timestamp() {
        let mut est = TempoEstimator::new();
        let t0 = Instant::now();
        assert_eq!(est.on_clock_pulse_at(t0), PulseOutcome::FirstPulse);
        assert_eq!(est.state().pulse_count, 1);
        assert_eq!(est.state().last_pulse_time, Some(t0));
        assert_eq!(
            est.on_clock_pulse_at(t0 + Duration::from_millis(20)),
            PulseOutcome::Counted
        );
    }

    #[test]
    fn test_sample_uses_smoothed_value_of_raw_reading() {
        let mut est = TempoEstimator::new();
        let t0 = Instant::now();
        let update = est.apply_sample(TempoSample {
            raw_bpm: 130.0,
            timestamp: t0,
        });
        assert!((update.bpm - 129.0).abs() < EPSILON);
        assert_eq!(update.raw_bpm, 130.0);
        assert!(!update.locked);
        assert_eq!(update.measurement, 1);
    }

    #[test]
    fn test_reset_counters_keeps_tempo() {
        let mut est = TempoEstimator::new();
        let t0 = Instant::now();
        est.apply_sample(TempoSample {
            raw_bpm: 100.0,
            timestamp: t0,
        });
        est.on_clock_pulse_at(t0);
        est.reset_counters();
        assert_eq!(est.measurement_count(), 0);
        assert_eq!(est.state().pulse_count, 0);
        assert_eq!(est.state().last_pulse_time, None);
        assert!((est.current_bpm() - 102.0).abs() < EPSILON);
    }
}
