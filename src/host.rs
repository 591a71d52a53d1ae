//! Audio host seam.
//!
//! A real integration (JACK, CoreAudio, a plugin host) implements [`AudioHost`]
//! and calls [`PositionClock::advance`] / [`PositionClock::query`] from its
//! real-time callbacks. [`SimulatedHost`] and [`run_block_clock`] stand in for it
//! when no audio server is involved.

use crate::error::{Error, Result};
use crate::position::PositionClock;
use crate::state::SharedTransportState;
use log::{info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub trait AudioHost {
    /// Queried once at startup and treated as constant for the run.
    fn sample_rate(&self) -> u32;

    /// Requests authority over the host-wide transport position.
    fn acquire_timebase(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SimulatedHost {
    sample_rate: u32,
    block_size: u32,
    grant_timebase: bool,
}

impl SimulatedHost {
    pub fn new(sample_rate: u32, block_size: u32, grant_timebase: bool) -> Self {
        Self {
            sample_rate,
            block_size,
            grant_timebase,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.block_size) / f64::from(self.sample_rate))
    }
}

impl AudioHost for SimulatedHost {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn acquire_timebase(&mut self) -> Result<()> {
        if self.grant_timebase {
            Ok(())
        } else {
            Err(Error::TimebaseUnavailable(
                "another timebase master is registered".to_string(),
            ))
        }
    }
}

/// Tries once to become timebase master and records the outcome in `state`.
///
/// Refusal is a permanent degraded mode: tempo keeps being tracked, position is
/// not pushed to the host.
pub fn setup_timebase<H: AudioHost>(host: &mut H, state: &SharedTransportState) -> bool {
    match host.acquire_timebase() {
        Ok(()) => {
            state.set_timebase_master(true);
            info!("Registered as timebase master");
            true
        }
        Err(e) => {
            state.set_timebase_master(false);
            warn!("Could not become timebase master: {}", e);
            warn!("Will still track BPM but won't control transport BBT");
            false
        }
    }
}

/// Spawns the real-time stand-in: one `advance` per block and, when master, one
/// position query per block.
pub fn run_block_clock(
    clock: PositionClock,
    block_size: u32,
    block_duration: Duration,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("audio-block".to_string())
        .spawn(move || {
            info!(
                "Block clock running: {} frames every {:?}",
                block_size, block_duration
            );
            let mut deadline = Instant::now();
            while running.load(Ordering::SeqCst) {
                clock.advance(u64::from(block_size));

                if clock.state().is_timebase_master() {
                    let repositioned = clock.state().take_reposition_request();
                    let position = clock.query(None);
                    if repositioned {
                        trace!("Host re-evaluated position: {}", position);
                    }
                }

                deadline += block_duration;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
            info!("Block clock stopped");
        })?;
    Ok(handle)
}
