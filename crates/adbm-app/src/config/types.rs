//! Configuration types for adb-mirror
//!
//! Defines `Settings` (the whole `config.toml`) and its sections. Every field
//! has a default so a partial or empty file is valid.

use std::time::Duration;

use adbm_daemon::{ToolPaths, DEFAULT_MIRROR_ARGS, DEFAULT_SERVICE_TYPE};
use serde::{Deserialize, Serialize};

/// Application settings (`config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub tools: ToolPaths,

    #[serde(default)]
    pub connection: ConnectionSettings,

    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub mirror: MirrorSettings,

    #[serde(default)]
    pub process: ProcessSettings,
}

/// Connection polling settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionSettings {
    /// Delay between two checks of the bus state, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of checks before giving up on a connection
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    10
}

/// Network discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoverySettings {
    /// Browse the local network for wireless-debugging devices
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// mDNS service type to browse
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service_type: default_service_type(),
        }
    }
}

fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}

fn default_true() -> bool {
    true
}

/// Mirroring tool settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorSettings {
    /// Extra arguments passed after `-s <device>`
    #[serde(default = "default_mirror_args")]
    pub args: Vec<String>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            args: default_mirror_args(),
        }
    }
}

fn default_mirror_args() -> Vec<String> {
    DEFAULT_MIRROR_ARGS.iter().map(|s| s.to_string()).collect()
}

/// External process settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessSettings {
    /// Limit for commands whose output is captured, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ProcessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}
