//! Transport state machine.
//!
//! Reacts to Start/Stop/Continue and clock pulses from the event source, feeds the
//! tempo estimator, and publishes mode, frame origin and tempo into the shared
//! state read by the real-time callbacks. Runs on the event-processing thread.

use crate::config::{SIGNIFICANT_BPM_CHANGE, STATUS_EVERY_MEASUREMENTS};
use crate::midi::ClockEvent;
use crate::state::{SharedTransportState, StatusSnapshot, TransportMode};
use crate::tempo::{PulseOutcome, TempoEstimator, TempoUpdate};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

pub struct TransportController {
    estimator: TempoEstimator,
    state: Arc<SharedTransportState>,
    last_reported_bpm: f64,
}

impl TransportController {
    pub fn new(state: Arc<SharedTransportState>) -> Self {
        let estimator = TempoEstimator::new();
        state.set_bpm(estimator.current_bpm());
        Self {
            estimator,
            state,
            last_reported_bpm: 0.0,
        }
    }

    pub fn state(&self) -> &Arc<SharedTransportState> {
        &self.state
    }

    pub fn estimator(&self) -> &TempoEstimator {
        &self.estimator
    }

    pub fn mode(&self) -> TransportMode {
        self.state.mode()
    }

    pub fn handle_event(&mut self, event: ClockEvent) -> Option<TempoUpdate> {
        match event {
            ClockEvent::Clock => return self.on_clock_pulse(),
            ClockEvent::Start => self.on_start(),
            ClockEvent::Stop => self.on_stop(),
            ClockEvent::Continue => self.on_continue(),
        }
        None
    }

    /// Rewinds to 1:1:0 and starts rolling.
    pub fn on_start(&mut self) {
        info!("START received");
        self.rewind();
        self.state.set_mode(TransportMode::Rolling);
    }

    pub fn on_stop(&mut self) {
        info!("STOP received");
        self.state.set_mode(TransportMode::Stopped);
        self.estimator.reset_pulse_window();
    }

    /// Resumes rolling from the current frame.
    pub fn on_continue(&mut self) {
        info!("CONTINUE received");
        self.state.set_mode(TransportMode::Rolling);
    }

    /// Auto-start for sources that send clock without a Start message.
    pub fn on_first_clock_pulse(&mut self) {
        if self.state.mode() == TransportMode::Stopped {
            info!("First clock received, auto-starting transport");
            self.state.set_mode(TransportMode::Rolling);
        }
    }

    pub fn on_clock_pulse(&mut self) -> Option<TempoUpdate> {
        self.on_clock_pulse_at(Instant::now())
    }

    pub fn on_clock_pulse_at(&mut self, now: Instant) -> Option<TempoUpdate> {
        match self.estimator.on_clock_pulse_at(now) {
            PulseOutcome::FirstPulse => {
                self.on_first_clock_pulse();
                None
            }
            PulseOutcome::Tempo(update) => {
                self.publish(&update);
                Some(update)
            }
            PulseOutcome::Counted | PulseOutcome::Discarded => None,
        }
    }

    /// Back to frame 0 / bar 1 as after a Start, keeping the current mode.
    pub fn reset(&mut self) {
        info!("Transport reset");
        self.rewind();
    }

    /// Manually flips Rolling and Stopped, independent of incoming events.
    pub fn toggle_play_pause(&mut self) -> TransportMode {
        let mode = match self.state.mode() {
            TransportMode::Rolling => TransportMode::Stopped,
            TransportMode::Stopped => TransportMode::Rolling,
        };
        self.state.set_mode(mode);
        info!("Transport toggled to {}", mode);
        mode
    }

    pub fn get_status_snapshot(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    fn rewind(&mut self) {
        self.state.set_frame(0);
        self.state.store_position(1, 1, 0);
        self.estimator.reset_counters();
        self.state.set_measurement_count(0);
        self.state.request_reposition();
    }

    fn publish(&mut self, update: &TempoUpdate) {
        self.state.set_bpm(update.bpm);
        self.state.set_measurement_count(update.measurement);
        self.state.request_reposition();

        if (update.bpm - self.last_reported_bpm).abs() > SIGNIFICANT_BPM_CHANGE {
            self.last_reported_bpm = update.bpm;
            info!("Transport BPM updated to {:.2}", update.bpm);
        }

        debug!(
            "{}:{} | BPM: {:.2} (raw: {:.2}){}",
            self.state.bar(),
            self.state.beat(),
            update.bpm,
            update.raw_bpm,
            if update.locked { " [LOCKED]" } else { "" }
        );

        if update.measurement % STATUS_EVERY_MEASUREMENTS == 0 {
            info!("Status: {}", self.state.snapshot());
        }
    }
}
