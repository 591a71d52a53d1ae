//! Lock-free transport state shared between the event loop and the real-time
//! callbacks.
//!
//! Every field is an independent single-word atomic. Readers may briefly see one
//! field updated before another (e.g. `frame` reset before `rolling` flips);
//! nothing here offers multi-field transactions.

use crate::config::DEFAULT_BPM;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stopped,
    Rolling,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Stopped => write!(f, "STOPPED"),
            TransportMode::Rolling => write!(f, "ROLLING"),
        }
    }
}

/// Point-in-time copy of [`SharedTransportState`] for display and introspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub bpm: f64,
    pub mode: TransportMode,
    pub frame: u64,
    pub bar: u32,
    pub beat: u32,
    pub tick: u32,
    pub measurement_count: u64,
    pub sample_rate: u32,
    pub timebase_master: bool,
}

impl StatusSnapshot {
    /// True once at least one tempo estimate has been published since the last
    /// Start. Distinguishes a silent source from a legitimately idle transport.
    pub fn has_tempo(&self) -> bool {
        self.measurement_count > 0
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | BPM: {:.2} | Pos: {}:{}:{} | Frame: {} | Measurements: {}{}",
            self.mode,
            self.bpm,
            self.bar,
            self.beat,
            self.tick,
            self.frame,
            self.measurement_count,
            if self.timebase_master { "" } else { " | follower" }
        )
    }
}

pub struct SharedTransportState {
    bpm_bits: AtomicU64,
    rolling: AtomicBool,
    frame: AtomicU64,
    bar: AtomicU32,
    beat: AtomicU32,
    tick: AtomicU32,
    measurement_count: AtomicU64,
    reposition_requested: AtomicBool,
    timebase_master: AtomicBool,
    sample_rate: u32,
}

impl SharedTransportState {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            bpm_bits: AtomicU64::new(DEFAULT_BPM.to_bits()),
            rolling: AtomicBool::new(false),
            frame: AtomicU64::new(0),
            bar: AtomicU32::new(1),
            beat: AtomicU32::new(1),
            tick: AtomicU32::new(0),
            measurement_count: AtomicU64::new(0),
            reposition_requested: AtomicBool::new(false),
            timebase_master: AtomicBool::new(false),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_bpm(&self, bpm: f64) {
        self.bpm_bits.store(bpm.to_bits(), Ordering::Release);
    }

    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm_bits.load(Ordering::Acquire))
    }

    pub fn set_mode(&self, mode: TransportMode) {
        self.rolling
            .store(mode == TransportMode::Rolling, Ordering::Release);
    }

    pub fn mode(&self) -> TransportMode {
        if self.is_rolling() {
            TransportMode::Rolling
        } else {
            TransportMode::Stopped
        }
    }

    pub fn is_rolling(&self) -> bool {
        self.rolling.load(Ordering::Acquire)
    }

    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    pub fn set_frame(&self, frame: u64) {
        self.frame.store(frame, Ordering::Release);
    }

    /// Adds `frames` to the frame counter if rolling. Real-time safe.
    pub fn advance_frames(&self, frames: u64) {
        if self.is_rolling() {
            self.frame.fetch_add(frames, Ordering::AcqRel);
        }
    }

    pub fn store_position(&self, bar: u32, beat: u32, tick: u32) {
        self.bar.store(bar, Ordering::Relaxed);
        self.beat.store(beat, Ordering::Relaxed);
        self.tick.store(tick, Ordering::Relaxed);
    }

    pub fn bar(&self) -> u32 {
        self.bar.load(Ordering::Relaxed)
    }

    pub fn beat(&self) -> u32 {
        self.beat.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn set_measurement_count(&self, count: u64) {
        self.measurement_count.store(count, Ordering::Release);
    }

    pub fn measurement_count(&self) -> u64 {
        self.measurement_count.load(Ordering::Acquire)
    }

    /// Asks the host to re-run its position query promptly.
    pub fn request_reposition(&self) {
        self.reposition_requested.store(true, Ordering::Release);
    }

    /// Consumes a pending reposition request, if any.
    pub fn take_reposition_request(&self) -> bool {
        self.reposition_requested.swap(false, Ordering::AcqRel)
    }

    pub fn set_timebase_master(&self, master: bool) {
        self.timebase_master.store(master, Ordering::Release);
    }

    pub fn is_timebase_master(&self) -> bool {
        self.timebase_master.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            bpm: self.bpm(),
            mode: self.mode(),
            frame: self.frame(),
            bar: self.bar(),
            beat: self.beat(),
            tick: self.tick(),
            measurement_count: self.measurement_count(),
            sample_rate: self.sample_rate,
            timebase_master: self.is_timebase_master(),
        }
    }
}

impl fmt::Debug for SharedTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTransportState")
            .field(&self.snapshot())
            .finish()
    }
}
