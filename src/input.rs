//! Line-based operator input on stdin.

use crate::error::Result;
use crate::event_loop::ControlCommand;
use crossbeam::channel::Sender;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    Command(ControlCommand),
    Quit,
}

/// `r`/`reset`, `p`/`play`/`pause`, `q`/`quit`. Anything else is ignored.
pub fn parse_input(line: &str) -> Option<OperatorInput> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "reset" => Some(OperatorInput::Command(ControlCommand::Reset)),
        "p" | "play" | "pause" => Some(OperatorInput::Command(ControlCommand::TogglePlayPause)),
        "q" | "quit" | "exit" => Some(OperatorInput::Quit),
        _ => None,
    }
}

/// Feeds operator lines from `reader` until quit, end of input, or a closed
/// command channel. Quit raises `shutdown`; end of input does not.
pub fn forward_input<R: BufRead>(
    reader: R,
    commands: &Sender<ControlCommand>,
    shutdown: &AtomicBool,
) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            Some(OperatorInput::Command(command)) => {
                if commands.send(command).is_err() {
                    debug!("Control channel closed, operator input stops");
                    break;
                }
            }
            Some(OperatorInput::Quit) => {
                info!("Quit requested");
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            None => debug!("Ignoring operator input '{}'", line.trim()),
        }
    }
}

pub fn run_stdin_input(
    commands: Sender<ControlCommand>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("operator-input".to_string())
        .spawn(move || forward_input(io::stdin().lock(), &commands, &shutdown))?;
    Ok(handle)
}
