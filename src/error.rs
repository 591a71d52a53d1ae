use thiserror::Error;

/// Errors surfaced while setting up or wiring the sync engine.
///
/// Timing anomalies inside the tempo estimator never show up here: they are
/// discarded samples, not failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The host refused to hand over control of the global position.
    #[error("timebase master unavailable: {0}")]
    TimebaseUnavailable(String),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
