//! Bar/beat/tick derivation from the sample-frame counter.
//!
//! Position is never tracked incrementally: it is recomputed from
//! `(frame, bpm, sample_rate)` on every query, so there is no drift and a
//! relocation is just a new frame value.

use crate::config::{BEATS_PER_BAR, TICKS_PER_BEAT};
use crate::state::SharedTransportState;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPosition {
    pub frame: u64,
    /// 1-based.
    pub bar: u32,
    /// 1-based, at most `BEATS_PER_BAR`.
    pub beat: u32,
    /// 0-based, below `TICKS_PER_BEAT`.
    pub tick: u32,
}

impl TransportPosition {
    pub fn origin(frame: u64) -> Self {
        Self {
            frame,
            bar: 1,
            beat: 1,
            tick: 0,
        }
    }

    /// Absolute tick at which the current bar starts.
    pub fn bar_start_tick(&self) -> u64 {
        u64::from(self.bar - 1) * u64::from(BEATS_PER_BAR) * u64::from(TICKS_PER_BEAT)
    }

    pub fn bbt(&self) -> (u32, u32, u32) {
        (self.bar, self.beat, self.tick)
    }
}

impl fmt::Display for TransportPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.beat, self.tick)
    }
}

/// Computes the musical position of `frame` at a constant `bpm`.
///
/// Pure function of its inputs. A zero sample rate or a non-positive tempo maps
/// every frame to the origin.
#[inline]
pub fn position_at(frame: u64, bpm: f64, sample_rate: u32) -> TransportPosition {
    if sample_rate == 0 || bpm.is_nan() || bpm <= 0.0 {
        return TransportPosition::origin(frame);
    }

    let seconds = frame as f64 / f64::from(sample_rate);
    let beats_elapsed = bpm / 60.0 * seconds;
    let beats_per_bar = f64::from(BEATS_PER_BAR);

    let beat_in_bar = beats_elapsed % beats_per_bar;

    TransportPosition {
        frame,
        // Saturates on absurdly distant frames instead of wrapping to bar 0.
        bar: ((beats_elapsed / beats_per_bar).floor() as u32).saturating_add(1),
        beat: beat_in_bar.floor() as u32 + 1,
        tick: (beat_in_bar.fract() * f64::from(TICKS_PER_BEAT)).floor() as u32,
    }
}

/// Real-time facing side of the transport: frame advance and position query.
///
/// Both entry points are a handful of atomic operations; neither allocates,
/// locks or loops.
#[derive(Debug, Clone)]
pub struct PositionClock {
    state: Arc<SharedTransportState>,
}

impl PositionClock {
    pub fn new(state: Arc<SharedTransportState>) -> Self {
        Self { state }
    }

    /// Audio-block callback. Only moves the frame counter while rolling.
    #[inline]
    pub fn advance(&self, frames: u64) {
        self.state.advance_frames(frames);
    }

    /// Host position callback.
    ///
    /// `relocation` carries the host's frame when it signals a position
    /// discontinuity; that frame wins for this call and becomes the internal
    /// counter, so the next `advance` continues from it.
    #[inline]
    pub fn query(&self, relocation: Option<u64>) -> TransportPosition {
        let frame = match relocation {
            Some(frame) => {
                self.state.set_frame(frame);
                frame
            }
            None => self.state.frame(),
        };

        let position = position_at(frame, self.state.bpm(), self.state.sample_rate());
        self.state
            .store_position(position.bar, position.beat, position.tick);
        position
    }

    pub fn state(&self) -> &Arc<SharedTransportState> {
        &self.state
    }
}
