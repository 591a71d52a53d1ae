use clocksyncrs::config::PULSES_PER_QUARTER;
use clocksyncrs::{ClockEvent, PositionClock, SharedTransportState, TransportController, TransportMode};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (TransportController, PositionClock) {
    init();
    let state = Arc::new(SharedTransportState::new(48_000));
    state.set_timebase_master(true);
    (
        TransportController::new(Arc::clone(&state)),
        PositionClock::new(state),
    )
}

#[test]
fn test_start_rewinds_and_rolls() {
    let (mut ctl, clock) = setup();
    ctl.state().set_frame(77_000);

    ctl.handle_event(ClockEvent::Start);
    assert_eq!(ctl.mode(), TransportMode::Rolling);

    let position = clock.query(None);
    assert_eq!((position.frame, position.bar, position.beat, position.tick), (0, 1, 1, 0));
}

#[test]
fn test_stop_holds_frame() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(10_000);

    ctl.handle_event(ClockEvent::Stop);
    clock.advance(512);
    clock.advance(512);

    assert_eq!(ctl.mode(), TransportMode::Stopped);
    assert_eq!(ctl.state().frame(), 10_000);
}

#[test]
fn test_stop_is_idempotent() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(2_048);

    ctl.on_stop();
    let once = ctl.get_status_snapshot();
    ctl.on_stop();
    let twice = ctl.get_status_snapshot();

    assert_eq!(once, twice);
    assert_eq!(twice.mode, TransportMode::Stopped);
}

#[test]
fn test_continue_resumes_in_place() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(24_000);
    ctl.on_stop();

    ctl.handle_event(ClockEvent::Continue);
    assert_eq!(ctl.mode(), TransportMode::Rolling);
    assert_eq!(ctl.state().frame(), 24_000);

    clock.advance(24_000);
    let position = clock.query(None);
    assert_eq!(position.frame, 48_000);
    assert_eq!(position.bbt(), (1, 3, 0));
}

#[test]
fn test_reset_returns_to_origin() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(100_000);
    clock.query(None);

    ctl.reset();
    let position = clock.query(None);
    assert_eq!((position.frame, position.bar, position.beat, position.tick), (0, 1, 1, 0));
    assert_eq!(ctl.mode(), TransportMode::Rolling);
    assert_eq!(ctl.state().measurement_count(), 0);
}

#[test]
fn test_first_clock_auto_starts() {
    let (mut ctl, _clock) = setup();
    assert_eq!(ctl.mode(), TransportMode::Stopped);

    ctl.handle_event(ClockEvent::Clock);
    assert_eq!(ctl.mode(), TransportMode::Rolling);
}

#[test]
fn test_clock_after_stop_does_not_restart_window_timing() {
    let (mut ctl, _clock) = setup();
    let t0 = Instant::now();
    let step = Duration::from_micros(20_833);

    for i in 0..10 {
        ctl.on_clock_pulse_at(t0 + step * i);
    }
    ctl.on_stop();

    // A long pause must not leak into the next estimate.
    let t1 = t0 + Duration::from_secs(30);
    let mut update = None;
    for i in 0..PULSES_PER_QUARTER {
        update = update.or(ctl.on_clock_pulse_at(t1 + step * i));
    }
    let update = update.expect("fresh window should produce a tempo");
    assert!(update.raw_bpm > 120.0 && update.raw_bpm < 130.0);
}

#[test]
fn test_tempo_reaches_position() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    let t0 = Instant::now();
    let step = Duration::from_micros(31_250); // 80 BPM at 24 PPQN

    for i in 0..PULSES_PER_QUARTER * 8 {
        ctl.on_clock_pulse_at(t0 + step * i);
    }
    assert!((ctl.state().bpm() - 80.0).abs() < 0.5);

    // Just past one bar at the estimated tempo.
    let frames_per_bar = (4.0 * 60.0 / ctl.state().bpm() * 48_000.0).ceil() as u64;
    clock.advance(frames_per_bar + 48);
    assert_eq!(clock.query(None).bar, 2);
}

#[test]
fn test_measurement_count_separates_silence_from_idle() {
    let (mut ctl, _clock) = setup();
    ctl.on_start();
    assert!(!ctl.get_status_snapshot().has_tempo());

    let t0 = Instant::now();
    let step = Duration::from_micros(20_833);
    for i in 0..PULSES_PER_QUARTER {
        ctl.on_clock_pulse_at(t0 + step * i);
    }
    let snapshot = ctl.get_status_snapshot();
    assert!(snapshot.has_tempo());
    assert_eq!(snapshot.measurement_count, 1);

    ctl.on_start();
    assert_eq!(ctl.get_status_snapshot().measurement_count, 0);
}

#[test]
fn test_toggle_play_pause_keeps_position() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(4_800);

    assert_eq!(ctl.toggle_play_pause(), TransportMode::Stopped);
    clock.advance(4_800);
    assert_eq!(ctl.state().frame(), 4_800);

    assert_eq!(ctl.toggle_play_pause(), TransportMode::Rolling);
    clock.advance(4_800);
    assert_eq!(ctl.state().frame(), 9_600);
}

#[test]
fn test_host_relocation_wins() {
    let (mut ctl, clock) = setup();
    ctl.on_start();
    clock.advance(1_000);

    let position = clock.query(Some(96_000));
    assert_eq!(position.bbt(), (2, 1, 0));
    clock.advance(1_000);
    assert_eq!(ctl.state().frame(), 97_000);
}
