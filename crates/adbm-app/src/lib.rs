//! adbm-app - Orchestration for adb-mirror
//!
//! Loads configuration, runs device refreshes, drives connection attempts to
//! network devices and starts mirroring sessions.

pub mod config;
pub mod connection;
pub mod orchestrator;

pub use config::{default_config_path, init_config, load_settings, Settings};
pub use connection::{ConnectionConfig, ConnectionPhase, ConnectionStateMachine};
pub use orchestrator::{Activation, Orchestrator, PendingLaunch, RefreshOutcome};

// Re-export daemon types for the CLI
pub use adbm_daemon::{ProcessRunner, TokioProcessRunner, ToolAvailability};
