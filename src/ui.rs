// ui.rs

use crate::config::{BARS_PER_PHRASE, BEATS_PER_BAR};
use crate::error::Result;
use crate::state::SharedTransportState;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn bar_style(template: &str, progress_chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(progress_chars)
}

fn create_beat_progress(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(BEATS_PER_BAR)));
    pb.set_style(bar_style(
        "{prefix:.bold} [{bar:40.cyan}] {pos}/{len}",
        "⣀⣤⣦⣶⣷⣿ ",
    ));
    pb.set_prefix("Beat");
    pb
}

fn create_bar_progress(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new(u64::from(BARS_PER_PHRASE)));
    pb.set_style(bar_style(
        "{prefix:.bold} [{bar:20.white/black}] {pos}/{len}",
        "█▊ ",
    ));
    pb.set_prefix("Bar");
    pb
}

fn create_transport_spinner(multi_progress: &MultiProgress) -> ProgressBar {
    let pb = multi_progress.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix("Transport");
    pb
}

/// Bar number within the current phrase, 1-based.
pub fn phrase_bar(bar: u32) -> u32 {
    (bar.max(1) - 1) % BARS_PER_PHRASE + 1
}

pub struct StatusInspector {
    state: Arc<SharedTransportState>,

    #[allow(dead_code)]
    multi_progress: MultiProgress,
    beat_pb: ProgressBar,
    bar_pb: ProgressBar,
    transport_pb: ProgressBar,
}

impl StatusInspector {
    pub fn new(state: Arc<SharedTransportState>) -> Self {
        Self::with_draw_target(state, ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(state: Arc<SharedTransportState>, target: ProgressDrawTarget) -> Self {
        let multi_progress = MultiProgress::with_draw_target(target);
        let beat_pb = create_beat_progress(&multi_progress);
        let bar_pb = create_bar_progress(&multi_progress);
        let transport_pb = create_transport_spinner(&multi_progress);

        StatusInspector {
            state,
            multi_progress,
            beat_pb,
            bar_pb,
            transport_pb,
        }
    }

    /// Redraws from a fresh snapshot.
    pub fn refresh(&self) {
        let snapshot = self.state.snapshot();

        self.beat_pb.set_position(u64::from(snapshot.beat));
        self.bar_pb
            .set_position(u64::from(phrase_bar(snapshot.bar)));
        self.transport_pb.set_message(snapshot.to_string());
        self.transport_pb.tick();
    }

    pub fn beat_position(&self) -> u64 {
        self.beat_pb.position()
    }

    pub fn bar_position(&self) -> u64 {
        self.bar_pb.position()
    }

    pub fn finish(&self) {
        self.beat_pb.finish_and_clear();
        self.bar_pb.finish_and_clear();
        self.transport_pb.finish_and_clear();
    }
}

pub fn run_status_inspector(
    state: Arc<SharedTransportState>,
    interval: Duration,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("status-inspector".to_string())
        .spawn(move || {
            let inspector = StatusInspector::new(state);
            while running.load(Ordering::SeqCst) {
                inspector.refresh();
                thread::sleep(interval);
            }
            inspector.finish();
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_inspector(state: Arc<SharedTransportState>) -> StatusInspector {
        StatusInspector::with_draw_target(state, ProgressDrawTarget::hidden())
    }

    #[test]
    fn test_phrase_bar_wraps() {
        assert_eq!(phrase_bar(1), 1);
        assert_eq!(phrase_bar(4), 4);
        assert_eq!(phrase_bar(5), 1);
        assert_eq!(phrase_bar(0), 1);
    }

    #[test]
    fn test_progress_lengths() {
        let inspector = hidden_inspector(Arc::new(SharedTransportState::new(48_000)));
        assert_eq!(inspector.beat_pb.length(), Some(u64::from(BEATS_PER_BAR)));
        assert_eq!(inspector.bar_pb.length(), Some(u64::from(BARS_PER_PHRASE)));
        assert!(inspector.transport_pb.length().is_none());
    }

    #[test]
    fn test_refresh_follows_cached_position() {
        let state = Arc::new(SharedTransportState::new(48_000));
        let inspector = hidden_inspector(state.clone());

        state.store_position(6, 3, 100);
        inspector.refresh();

        assert_eq!(inspector.beat_position(), 3);
        assert_eq!(inspector.bar_position(), 2);
    }
}
