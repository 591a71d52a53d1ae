pub mod cli;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod host;
pub mod input;
pub mod logging;
pub mod midi;
pub mod position;
pub mod state;
pub mod tempo;
pub mod transport;
pub mod ui;

pub use error::{Error, Result};
pub use event_loop::{ControlCommand, EventLoop};
pub use midi::{ClockEvent, ClockGenerator};
pub use position::{PositionClock, TransportPosition};
pub use state::{SharedTransportState, StatusSnapshot, TransportMode};
pub use tempo::{BpmState, PulseOutcome, TempoEstimator, TempoUpdate};
pub use transport::TransportController;
