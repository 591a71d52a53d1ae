//! MIDI-facing side of the sync engine.
//!
//! The MIDI transport itself (device binding, byte decoding) lives outside this
//! crate; it hands over already decoded [`ClockEvent`]s through a crossbeam
//! channel. [`ClockGenerator`] is an internal source producing the same events.

mod generator;

pub use generator::ClockGenerator;

use crossbeam::channel::{self, Receiver, Sender};

/// Decoded MIDI real-time message relevant to clock sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Timing clock pulse, 24 per quarter note.
    Clock,
    Start,
    Stop,
    Continue,
}

/// Unbounded channel carrying clock events in source order.
pub fn event_channel() -> (Sender<ClockEvent>, Receiver<ClockEvent>) {
    channel::unbounded()
}
