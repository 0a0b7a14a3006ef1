//! # adbm-daemon - External Tool Management
//!
//! Runs `adb`, `avahi-browse` and `scrcpy`, parses their output and tracks
//! mirroring sessions.
//!
//! Depends on [`adbm_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Execution
//! - [`ProcessRunner`] - Trait seam for running external commands
//! - [`TokioProcessRunner`] - Production runner on `tokio::process`
//!
//! ### Device Directories
//! - [`BusDirectory`] - `adb devices`, model lookup, `adb connect`
//! - [`parse_devices_output()`] - Parse an `adb devices` table
//! - [`NetworkDirectory`] - One-shot mDNS browse for wireless-debugging devices
//! - [`parse_browse_output()`] - Parse `avahi-browse -p -r` records
//!
//! ### Mirroring
//! - [`Launcher`] - Spawn `scrcpy` sessions and expose the busy signal
//!
//! ### Platform Utilities
//! - [`ToolAvailability`], [`ToolPaths`] - Locate the external tools

pub mod bus;
pub mod mirror;
pub mod network;
pub mod process;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;

pub use bus::{parse_devices_output, BusDirectory, MODEL_PROPERTY};
pub use mirror::{Launcher, DEFAULT_MIRROR_ARGS};
pub use network::{parse_browse_output, NetworkDirectory, DEFAULT_SERVICE_TYPE};
pub use process::{LocalProcessRunner, ProcessRunner, TokioProcessRunner, DEFAULT_OUTPUT_TIMEOUT};
pub use tool_availability::{ToolAvailability, ToolPaths};
