use clap::Parser;
use clocksyncrs::{
    cli::Args,
    config::Settings,
    event_loop::{ControlCommand, EventLoop},
    host::{run_block_clock, setup_timebase, AudioHost, SimulatedHost},
    input::run_stdin_input,
    logging,
    midi::{event_channel, ClockGenerator},
    ui::run_status_inspector,
    PositionClock, SharedTransportState, TransportController,
};
use crossbeam::channel::unbounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

fn main() {
    let args = Args::parse();
    let settings = Settings::load(&args).unwrap_or_else(|e| exit_with_error("Invalid settings", e));

    if let Err(e) = logging::init_logger(settings.log_level, args.verbose) {
        exit_with_error("Logger initialization failed", e);
    }
    log::info!("Application starting");
    log::info!("Settings loaded: {:?}", settings);

    if let Err(e) = run(&settings, args.headless) {
        exit_with_error("Fatal error", e);
    }
    log::info!("Application exiting");
}

fn exit_with_error(context: &str, error: impl std::fmt::Display) -> ! {
    let error_msg = format!("{}: {}", context, error);
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn run(settings: &Settings, headless: bool) -> clocksyncrs::Result<()> {
    let mut host = SimulatedHost::new(settings.sample_rate, settings.block_size, settings.timebase);
    let state = Arc::new(SharedTransportState::new(host.sample_rate()));
    setup_timebase(&mut host, &state);

    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    workers.push(run_block_clock(
        PositionClock::new(state.clone()),
        host.block_size(),
        host.block_duration(),
        running.clone(),
    )?);

    if !headless {
        workers.push(run_status_inspector(
            state.clone(),
            settings.status_interval,
            running.clone(),
        )?);
    }

    let (event_tx, event_rx) = event_channel();
    let (command_tx, command_rx) = unbounded::<ControlCommand>();
    // Detached: blocks on stdin.
    run_stdin_input(command_tx, shutdown.clone())?;

    let mut generator = ClockGenerator::new(settings.clock_bpm, event_tx);
    generator.start()?;

    println!("\nCommands: r = reset, p = play/pause, q = quit");
    let controller = TransportController::new(state.clone());
    let controller = EventLoop::new(controller, event_rx, command_rx, shutdown).run();

    generator.stop();
    running.store(false, Ordering::SeqCst);
    for worker in workers {
        if worker.join().is_err() {
            log::error!("Worker thread panicked");
        }
    }

    log::info!("Final status: {}", controller.get_status_snapshot());
    Ok(())
}
