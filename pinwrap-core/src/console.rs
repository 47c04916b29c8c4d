//! User-facing console output.
//!
//! The launcher talks to the user with short single-line messages whose
//! prefix tells the severity apart. A `Console` carries the verbosity
//! threshold chosen on the command line and is handed to every component
//! that needs to report something, so there is no process-wide log level.
//!
//! Diagnostic logging for developers goes through `tracing` instead and is
//! controlled by `RUST_LOG`.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use crate::install::downloader::DownloadProgress;

/// Default verbosity when `--log` is not given.
pub const DEFAULT_VERBOSITY: u8 = 1;

const INFO_PREFIX: &str = "[Wrapper] ";
const WARNING_PREFIX: &str = "[Wrapper warning] ";
const ERROR_PREFIX: &str = "[Wrapper error] *** ";

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// Verbosity-gated writer for user-visible messages.
#[derive(Debug, Clone)]
pub struct Console {
    verbosity: u8,
    interactive: bool,
    sink: Sink,
}

impl Console {
    /// Creates a console that writes to stdout.
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            interactive: io::stdout().is_terminal(),
            sink: Sink::Stdout,
        }
    }

    /// Creates a console that writes into a shared in-memory buffer.
    ///
    /// Used by tests to assert on what the user would have seen.
    pub fn buffered(verbosity: u8) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let console = Self {
            verbosity,
            interactive: false,
            sink: Sink::Buffer(Arc::clone(&buffer)),
        };
        (console, buffer)
    }

    /// Returns the verbosity threshold.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Returns true if a message at `level` would be shown.
    pub fn enabled(&self, level: u8) -> bool {
        level <= self.verbosity
    }

    /// Informational message, shown when `level <= verbosity`.
    pub fn log(&self, level: u8, message: impl Display) {
        if self.enabled(level) {
            self.write(&format!("{INFO_PREFIX}{message}\n"));
        }
    }

    /// Warning, shown at the default verbosity and above.
    pub fn warn(&self, message: impl Display) {
        if self.enabled(1) {
            self.write(&format!("{WARNING_PREFIX}{message}\n"));
        }
    }

    /// Error, always shown.
    pub fn error(&self, message: impl Display) {
        self.write(&format!("{ERROR_PREFIX}{message}\n"));
    }

    /// Unprefixed line, always shown.
    pub fn println(&self, message: impl Display) {
        self.write(&format!("{message}\n"));
    }

    // ========================================================================
    // Download progress
    // ========================================================================

    /// Announces a download. Off a terminal this is the only progress line.
    pub fn progress_started(&self, url: &str) {
        if self.enabled(1) && !self.interactive {
            self.write(&format!("\rDownloading {url}"));
        }
    }

    /// Renders one progress tick: a percentage when the total is known,
    /// otherwise a single dot.
    pub fn progress(&self, url: &str, progress: &DownloadProgress) {
        if !self.enabled(1) || !self.interactive {
            return;
        }
        match progress.percent {
            Some(percent) => self.write(&format!("\rDownloading {url} {percent:.0}%")),
            None => self.write("."),
        }
    }

    /// Terminates the progress line.
    pub fn progress_finished(&self) {
        if self.enabled(1) {
            self.write("\n");
        }
    }

    fn write(&self, text: &str) {
        match &self.sink {
            Sink::Stdout => {
                let mut stdout = io::stdout().lock();
                let _ = stdout.write_all(text.as_bytes());
                let _ = stdout.flush();
            }
            Sink::Buffer(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.extend_from_slice(text.as_bytes());
                }
            }
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(DEFAULT_VERBOSITY)
    }
}
