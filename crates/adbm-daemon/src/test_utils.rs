//! Test utilities for process-driven code
//!
//! Provides [`FakeProcessRunner`], a scripted [`ProcessRunner`] that records
//! every command line it is asked to run.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::process::ProcessRunner;
use adbm_core::{Error, Result};

/// A command line received by the fake runner
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Arguments joined with single spaces
    pub command: String,
    /// Tokio clock time at which the call started
    pub at: Instant,
}

#[derive(Default)]
struct FakeState {
    /// Queued outputs per command; the last entry repeats forever
    outputs: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    exit_codes: HashMap<String, Option<i32>>,
    spawn_failures: HashSet<String>,
    calls: Vec<RecordedCall>,
}

impl FakeState {
    fn next_output(&mut self, command: &str) -> String {
        match self.outputs.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue.first().cloned().unwrap_or_default(),
            None => String::new(),
        }
    }
}

/// Scripted [`ProcessRunner`]
///
/// Commands are matched on their full argv joined with spaces, e.g.
/// `"adb devices"`. Unscripted commands produce no output and exit with code 0.
#[derive(Default)]
pub struct FakeProcessRunner {
    state: Mutex<FakeState>,
}

impl FakeProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `command` with `output`
    pub fn with_output(self, command: &str, output: &str) -> Self {
        self.with_output_sequence(command, &[output])
    }

    /// Answer `command` with each output in turn, repeating the last one
    pub fn with_output_sequence(self, command: &str, outputs: &[&str]) -> Self {
        self.lock().outputs.insert(
            command.to_string(),
            outputs.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Make `command` take `delay` (tokio time) before completing
    pub fn with_delay(self, command: &str, delay: Duration) -> Self {
        self.lock().delays.insert(command.to_string(), delay);
        self
    }

    /// Exit code returned by [`ProcessRunner::wait`] for `command`
    pub fn with_exit_code(self, command: &str, code: Option<i32>) -> Self {
        self.lock().exit_codes.insert(command.to_string(), code);
        self
    }

    /// Make [`ProcessRunner::wait`] fail to spawn `command`
    pub fn with_spawn_failure(self, command: &str) -> Self {
        self.lock().spawn_failures.insert(command.to_string());
        self
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Command lines received so far, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.command.clone()).collect()
    }

    /// Calls received for one command line
    pub fn calls_to(&self, command: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.command == command)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls_to(command).len()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, argv: &[String]) -> (String, Option<Duration>) {
        let command = argv.join(" ");
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            command: command.clone(),
            at: Instant::now(),
        });
        let delay = state.delays.get(&command).copied();
        (command, delay)
    }
}

impl ProcessRunner for FakeProcessRunner {
    async fn output(&self, argv: &[String]) -> String {
        let (command, delay) = self.record(argv);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock().next_output(&command)
    }

    async fn wait(&self, argv: &[String]) -> Result<Option<i32>> {
        let (command, delay) = self.record(argv);
        let fails = self.lock().spawn_failures.contains(&command);
        if fails {
            return Err(Error::process_spawn(format!("{}: scripted failure", command)));
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.lock().exit_codes.get(&command).copied().unwrap_or(Some(0)))
    }
}
