use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// A subcommand prints to stdout; logs can share the terminal on stderr.
    Headless,
    /// The alternate screen owns the terminal; nothing may write to it.
    Tui,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stderr,
    File(PathBuf),
    Off,
}

pub fn sink_for(mode: LogMode, cache_dir: Option<&Path>) -> LogSink {
    match (mode, cache_dir) {
        (LogMode::Headless, _) => LogSink::Stderr,
        (LogMode::Tui, Some(dir)) => LogSink::File(dir.join("octoseek").join("octoseek.log")),
        (LogMode::Tui, None) => LogSink::Off,
    }
}

fn open_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. `RUST_LOG` overrides the default `warn` level.
pub fn init(mode: LogMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match sink_for(mode, dirs::cache_dir().as_deref()) {
        LogSink::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .init();
        }
        LogSink::File(path) => {
            // No log file means no logs; stderr is not an option under the TUI.
            if let Ok(file) = open_log(&path) {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(Mutex::new(file)),
                    )
                    .init();
            }
        }
        LogSink::Off => {}
    }
}
