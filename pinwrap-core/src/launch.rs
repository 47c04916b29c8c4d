//! Hands control to the installed tool.
//!
//! The jar runs as a child process that shares the launcher's standard
//! streams. Its exit code becomes the launcher's exit code.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::console::Console;

/// JVM option forcing a stable encoding for the tool's output.
const FILE_ENCODING_OPTION: &str = "-Dfile.encoding=UTF-8";

/// Process launch failures.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Couldn't start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Lost track of {program}: {source}")]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Runs a jar with the configured Java runtime.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    java: PathBuf,
    console: Console,
}

impl ProcessLauncher {
    pub fn new(java: impl Into<PathBuf>, console: Console) -> Self {
        Self {
            java: java.into(),
            console,
        }
    }

    /// Returns the full command line, program first.
    pub fn command_line(&self, jar: &Path, args: &[String]) -> Vec<OsString> {
        let jar = std::path::absolute(jar).unwrap_or_else(|_| jar.to_path_buf());

        let mut command = vec![
            self.java.clone().into_os_string(),
            OsString::from(FILE_ENCODING_OPTION),
            OsString::from("-jar"),
            jar.into_os_string(),
        ];
        command.extend(args.iter().map(OsString::from));
        command
    }

    /// Runs the jar and waits for it. A child killed by a signal reports 1.
    pub async fn launch(&self, jar: &Path, args: &[String]) -> Result<i32, LaunchError> {
        let command_line = self.command_line(jar, args);
        let rendered = command_line
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        self.console.log(2, format!("Launching\n  {rendered}"));
        info!("Launching {}", rendered);

        let mut child = Command::new(&command_line[0])
            .args(&command_line[1..])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.java.clone(),
                source,
            })?;

        let status = child.wait().await.map_err(|source| LaunchError::Wait {
            program: self.java.clone(),
            source,
        })?;

        debug!("Child exited with {}", status);
        Ok(status.code().unwrap_or(1))
    }
}
