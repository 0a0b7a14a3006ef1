//! # adbm-core - Core Domain Types
//!
//! Device types and the bus/network reconciliation step, plus the error type
//! and logging setup every other adb-mirror crate builds on. Nothing in here
//! runs a process.
//!
//! - [`types`]: [`Device`], [`DeviceList`], [`DeviceAction`] and the raw
//!   [`BusListing`] / [`NetworkListing`] produced by the directories
//! - [`reconcile`]: [`merge()`], bus entries first, network candidates after
//! - [`error`]: [`Error`], [`Result`], [`ResultExt`]
//! - [`logging`]: file logging filtered by `ADBM_LOG`
//!
//! Most modules start with `use adbm_core::prelude::*;`.

pub mod error;
pub mod logging;
pub mod reconcile;
pub mod types;

/// Error handling and tracing macros
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use reconcile::merge;
pub use types::{BusListing, BusState, Device, DeviceAction, DeviceList, NetworkListing};
