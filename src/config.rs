// config.rs

use crate::cli::Args;
use crate::error::{Error, Result};
use log::{debug, LevelFilter};
use std::time::Duration;

pub const PULSES_PER_QUARTER: u32 = 24;
pub const BEATS_PER_BAR: u32 = 4;
pub const TICKS_PER_BEAT: u32 = 1920;
pub const BARS_PER_PHRASE: u32 = 4;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
pub const DEFAULT_BPM: f64 = 120.0;

pub const SMOOTHING_FACTOR: f64 = 0.3;
pub const BPM_SNAP_THRESHOLD: f64 = 0.15;
pub const BPM_STABILITY_COUNT: u32 = 3;

pub const STATUS_EVERY_MEASUREMENTS: u64 = 16;
pub const SIGNIFICANT_BPM_CHANGE: f64 = 0.3;

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_BLOCK_SIZE: u32 = 256;
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 100;

const DEFAULT_CONFIG_NAME: &str = "clocksync";
const ENV_PREFIX: &str = "CLOCKSYNC";

/// Runtime settings, layered as defaults < config file < environment < CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sample_rate: u32,
    pub block_size: u32,
    /// Tempo of the internal clock source.
    pub clock_bpm: f64,
    pub log_level: LevelFilter,
    pub status_interval: Duration,
    /// Whether the simulated host grants timebase master.
    pub timebase: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            clock_bpm: DEFAULT_BPM,
            log_level: LevelFilter::Debug,
            status_interval: Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS),
            timebase: true,
        }
    }
}

impl Settings {
    pub fn load(args: &Args) -> Result<Self> {
        let file = args
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string());
        debug!("Loading settings from '{}' (optional)", file);

        let layered = config::Config::builder()
            .set_default("sample_rate", i64::from(DEFAULT_SAMPLE_RATE))?
            .set_default("block_size", i64::from(DEFAULT_BLOCK_SIZE))?
            .set_default("clock_bpm", DEFAULT_BPM)?
            .set_default("log_level", "debug")?
            .set_default("status_interval_ms", DEFAULT_STATUS_INTERVAL_MS as i64)?
            .set_default("timebase", true)?
            .add_source(config::File::with_name(&file).required(args.config.is_some()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .set_override_option("sample_rate", args.sample_rate.map(i64::from))?
            .set_override_option("block_size", args.block_size.map(i64::from))?
            .set_override_option("clock_bpm", args.bpm)?
            .set_override_option("timebase", args.no_timebase.then_some(false))?
            .build()?;

        Self::from_config(&layered)
    }

    fn from_config(layered: &config::Config) -> Result<Self> {
        let sample_rate = positive_u32(layered.get_int("sample_rate")?, "sample_rate")?;
        let block_size = positive_u32(layered.get_int("block_size")?, "block_size")?;

        let clock_bpm = layered.get_float("clock_bpm")?;
        if !(MIN_BPM..=MAX_BPM).contains(&clock_bpm) {
            return Err(Error::InvalidSetting {
                key: "clock_bpm",
                reason: format!("{} is outside [{}, {}]", clock_bpm, MIN_BPM, MAX_BPM),
            });
        }

        let level = layered.get_string("log_level")?;
        let log_level = level.parse::<LevelFilter>().map_err(|_| Error::InvalidSetting {
            key: "log_level",
            reason: format!("unknown level '{}'", level),
        })?;

        let interval_ms = layered.get_int("status_interval_ms")?;
        if interval_ms <= 0 {
            return Err(Error::InvalidSetting {
                key: "status_interval_ms",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Settings {
            sample_rate,
            block_size,
            clock_bpm,
            log_level,
            status_interval: Duration::from_millis(interval_ms as u64),
            timebase: layered.get_bool("timebase")?,
        })
    }

    /// Wall-clock length of one audio block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.block_size) / f64::from(self.sample_rate))
    }
}

fn positive_u32(value: i64, key: &'static str) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::InvalidSetting {
            key,
            reason: format!("{} is not a positive 32-bit value", value),
        }),
    }
}
