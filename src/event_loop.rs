// event_loop.rs

use crate::midi::ClockEvent;
use crate::transport::TransportController;
use crossbeam::channel::{never, select, Receiver, RecvError};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the loop waits for input before re-checking the shutdown flag.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Operator commands, independent of the clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reset,
    TogglePlayPause,
}

enum Next {
    Event(Result<ClockEvent, RecvError>),
    Command(Result<ControlCommand, RecvError>),
    Idle,
}

pub struct EventLoop {
    controller: TransportController,
    events: Receiver<ClockEvent>,
    commands: Receiver<ControlCommand>,
    shutdown: Arc<AtomicBool>,
}

impl EventLoop {
    pub fn new(
        controller: TransportController,
        events: Receiver<ClockEvent>,
        commands: Receiver<ControlCommand>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        EventLoop {
            controller,
            events,
            commands,
            shutdown,
        }
    }

    /// Processes events until shutdown is requested or the clock source goes
    /// away, then hands the controller back.
    pub fn run(mut self) -> TransportController {
        info!("Event loop started");

        while !self.shutdown.load(Ordering::SeqCst) {
            let next = select! {
                recv(self.events) -> msg => Next::Event(msg),
                recv(self.commands) -> cmd => Next::Command(cmd),
                default(POLL_TIMEOUT) => Next::Idle,
            };

            match next {
                Next::Event(Ok(event)) => {
                    self.controller.handle_event(event);
                }
                Next::Event(Err(_)) => {
                    error!("Clock event channel disconnected, leaving event loop");
                    break;
                }
                Next::Command(Ok(command)) => self.handle_command(command),
                Next::Command(Err(_)) => {
                    debug!("Control channel closed, ignoring further commands");
                    self.commands = never();
                }
                Next::Idle => {}
            }
        }

        info!("Event loop stopped");
        self.controller
    }

    fn handle_command(&mut self, command: ControlCommand) {
        debug!("Control command: {:?}", command);
        match command {
            ControlCommand::Reset => self.controller.reset(),
            ControlCommand::TogglePlayPause => {
                self.controller.toggle_play_pause();
            }
        }
    }
}
