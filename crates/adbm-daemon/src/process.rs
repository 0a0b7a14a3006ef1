//! External command execution
//!
//! Every interaction with `adb`, `avahi-browse` and `scrcpy` goes through a
//! [`ProcessRunner`]. Captured-output calls never fail: spawn errors, non-zero
//! exits, timeouts and I/O errors all come back as an empty string, so callers
//! only ever see "some output" or "no output".

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use adbm_core::prelude::*;

/// Default limit for a captured-output command
pub const DEFAULT_OUTPUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs external commands
///
/// `argv[0]` is the program, the rest are its arguments.
#[trait_variant::make(ProcessRunner: Send)]
pub trait LocalProcessRunner {
    /// Run a command to completion and return its stdout
    ///
    /// Returns an empty string on any failure.
    async fn output(&self, argv: &[String]) -> String;

    /// Run a command until it exits, without capturing output
    ///
    /// Returns the exit code (`None` when killed by a signal), or an error if
    /// the process could not be spawned.
    async fn wait(&self, argv: &[String]) -> Result<Option<i32>>;
}

/// [`ProcessRunner`] backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    output_timeout: Duration,
}

impl Default for TokioProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_TIMEOUT)
    }
}

impl TokioProcessRunner {
    pub fn new(output_timeout: Duration) -> Self {
        Self { output_timeout }
    }
}

impl ProcessRunner for TokioProcessRunner {
    async fn output(&self, argv: &[String]) -> String {
        let Some((program, args)) = argv.split_first() else {
            return String::new();
        };

        let run = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match timeout(self.output_timeout, run).await {
            Err(_) => {
                debug!(
                    "{} timed out after {:?}, treating as no output",
                    argv.join(" "),
                    self.output_timeout
                );
                String::new()
            }
            Ok(Err(e)) => {
                debug!("Failed to run {}: {}", program, e);
                String::new()
            }
            Ok(Ok(output)) if !output.status.success() => {
                debug!(
                    "{} exited with code {:?}: {}",
                    argv.join(" "),
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                String::new()
            }
            Ok(Ok(output)) => String::from_utf8_lossy(&output.stdout).into_owned(),
        }
    }

    async fn wait(&self, argv: &[String]) -> Result<Option<i32>> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::process_spawn("empty command line"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool_not_found(program.as_str())
                } else {
                    Error::process_spawn(format!("{}: {}", program, e))
                }
            })?;

        debug!("Spawned {} with PID {:?}", program, child.id());

        let status = child.wait().await?;
        Ok(status.code())
    }
}

/// Build an argv from a program path and borrowed arguments
pub(crate) fn command_line(program: &str, args: &[&str]) -> Vec<String> {
    std::iter::once(program)
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}
