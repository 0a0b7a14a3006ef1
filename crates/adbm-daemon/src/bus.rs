//! Bus directory: device enumeration through `adb`
//!
//! `adb devices` is the authoritative source of attached devices and their
//! state. Its output is a table:
//!
//! ```text
//! List of devices attached
//! R58M123ABC      device
//! 10.0.0.5:41234  offline
//! ```

use std::sync::Arc;

use crate::process::{command_line, ProcessRunner};
use adbm_core::prelude::*;
use adbm_core::{BusListing, BusState};

/// Header line printed before the device table
const HEADER_PREFIX: &str = "List of devices";

/// Property holding the human-readable model name
pub const MODEL_PROPERTY: &str = "ro.product.model";

/// Queries and commands issued through the `adb` binary
pub struct BusDirectory<R> {
    runner: Arc<R>,
    adb: String,
}

impl<R: ProcessRunner + Sync> BusDirectory<R> {
    pub fn new(runner: Arc<R>, adb: impl Into<String>) -> Self {
        Self {
            runner,
            adb: adb.into(),
        }
    }

    /// Path of the `adb` binary in use
    pub fn adb(&self) -> &str {
        &self.adb
    }

    /// Make sure the adb server is running; safe to call repeatedly
    pub async fn start_server(&self) {
        self.runner
            .output(&command_line(&self.adb, &["start-server"]))
            .await;
    }

    /// List attached devices in enumeration order
    pub async fn list_devices(&self) -> BusListing {
        let output = self
            .runner
            .output(&command_line(&self.adb, &["devices"]))
            .await;
        let devices = parse_devices_output(&output);
        debug!("adb reports {} device(s)", devices.len());
        devices
    }

    /// Resolve the model name of a device, falling back to its id
    pub async fn resolve_display_name(&self, id: &str) -> String {
        let output = self
            .runner
            .output(&command_line(
                &self.adb,
                &["-s", id, "shell", "getprop", MODEL_PROPERTY],
            ))
            .await;

        match output.trim() {
            "" => id.to_string(),
            model => model.to_string(),
        }
    }

    /// Ask adb to connect to a network address
    ///
    /// The result is not inspected; callers poll [`list_devices`](Self::list_devices)
    /// to find out whether the connection came up.
    pub async fn connect(&self, address: &str) {
        let output = self
            .runner
            .output(&command_line(&self.adb, &["connect", address]))
            .await;
        debug!("adb connect {}: {}", address, output.trim());
    }
}

/// Parse the output of `adb devices`
///
/// Blank lines and the header are skipped. Lines with fewer than two
/// whitespace-separated tokens are malformed and dropped. Only the `device`,
/// `offline` and `unauthorized` states are kept.
pub fn parse_devices_output(output: &str) -> BusListing {
    let mut devices = BusListing::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(HEADER_PREFIX) {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(id), Some(state)) = (tokens.next(), tokens.next()) else {
            trace!("Dropping malformed adb devices line: {:?}", line);
            continue;
        };

        match BusState::parse(state) {
            Some(state) => {
                devices.insert(id.to_string(), state);
            }
            None => trace!("Ignoring {} in unsupported state {:?}", id, state),
        }
    }

    devices
}
