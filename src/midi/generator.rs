use super::ClockEvent;
use crate::config::PULSES_PER_QUARTER;
use crate::error::{Error, Result};
use crossbeam::channel::Sender;
use log::{debug, error, info, trace};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Emits MIDI clock events at a fixed tempo from a dedicated thread.
pub struct ClockGenerator {
    bpm: f64,
    tx: Sender<ClockEvent>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ClockGenerator {
    pub fn new(bpm: f64, tx: Sender<ClockEvent>) -> Self {
        Self {
            bpm,
            tx,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Time between two clock pulses at `bpm`.
    pub fn pulse_interval(bpm: f64) -> Duration {
        Duration::from_secs_f64(60.0 / (bpm * f64::from(PULSES_PER_QUARTER)))
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sends `Start`, then spawns the pulse thread.
    pub fn start(&mut self) -> Result<()> {
        if self.thread_handle.is_some() {
            return Ok(());
        }

        self.tx
            .send(ClockEvent::Start)
            .map_err(|_| Error::ChannelClosed("clock event"))?;

        let tx = self.tx.clone();
        let running = Arc::clone(&self.running);
        let interval = Self::pulse_interval(self.bpm);
        self.running.store(true, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name("clock-generator".to_string())
            .spawn(move || {
                // Deadlines advance by a fixed step so sleep overshoot does not accumulate.
                let mut deadline = Instant::now();
                while running.load(Ordering::SeqCst) {
                    if tx.send(ClockEvent::Clock).is_err() {
                        error!("Clock receiver dropped, stopping generator");
                        running.store(false, Ordering::SeqCst);
                        break;
                    }

                    deadline += interval;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        trace!("Clock generator behind schedule by {:?}", now - deadline);
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                info!("Internal clock started at {} BPM ({:?} per pulse)", self.bpm, interval);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Stops the pulse thread and sends `Stop`.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("Clock generator thread panicked");
            }
            if self.tx.send(ClockEvent::Stop).is_err() {
                debug!("Clock receiver already gone, Stop not delivered");
            }
            info!("Internal clock stopped");
        }
    }
}

impl Drop for ClockGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::event_channel;

    #[test]
    fn test_pulse_interval_at_120() {
        let interval = ClockGenerator::pulse_interval(120.0);
        assert_eq!(interval.as_micros(), 20_833);
    }

    #[test]
    fn test_generator_emits_start_clocks_stop() {
        let (tx, rx) = event_channel();
        let mut generator = ClockGenerator::new(300.0, tx);

        generator.start().unwrap();
        assert!(generator.is_running());
        thread::sleep(Duration::from_millis(100));
        generator.stop();
        assert!(!generator.is_running());

        let events: Vec<ClockEvent> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&ClockEvent::Start));
        assert_eq!(events.last(), Some(&ClockEvent::Stop));
        let clocks = events.iter().filter(|e| **e == ClockEvent::Clock).count();
        assert!(clocks >= 5, "expected several pulses, got {}", clocks);
    }

    #[test]
    fn test_start_fails_when_receiver_is_gone() {
        let (tx, rx) = event_channel();
        drop(rx);
        let mut generator = ClockGenerator::new(120.0, tx);
        assert!(matches!(generator.start(), Err(Error::ChannelClosed(_))));
    }

    #[test]
    fn test_stop_after_receiver_dropped() {
        let (tx, rx) = event_channel();
        let mut generator = ClockGenerator::new(240.0, tx);
        generator.start().unwrap();
        drop(rx);

        thread::sleep(Duration::from_millis(30));
        generator.stop();
        assert!(!generator.is_running());
        assert!(generator.thread_handle.is_none());
    }
}
