use chrono::Local;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Directory holding the daily log files: `$HOME/.local/share/clocksyncrs/logs`.
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("clocksyncrs")
        .join("logs"))
}

/// One file per day, e.g. `clocksync-2024-05-01.log`.
pub fn log_file_name() -> String {
    format!("clocksync-{}.log", Local::now().format("%Y-%m-%d"))
}

pub fn init_logger(level: LevelFilter, mirror_to_stderr: bool) -> Result<(), Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(log_file_name()))?;

    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![WriteLogger::new(level, config.clone(), log_file)];
    if mirror_to_stderr {
        loggers.push(TermLogger::new(
            level,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    INIT.call_once(|| {
        if CombinedLogger::init(loggers).is_ok() {
            LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
        }
    });

    if LOGGER_INITIALIZED.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Other, "Logger initialization failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_is_dated() {
        let name = log_file_name();
        assert!(name.starts_with("clocksync-"));
        assert!(name.ends_with(".log"));
        // clocksync-YYYY-MM-DD.log
        assert_eq!(name.len(), "clocksync-".len() + 10 + ".log".len());
    }
}
