//! Tool availability checking for device discovery and mirroring
//!
//! Locates `adb`, `avahi-browse` and `scrcpy`, either at a configured path or
//! on `PATH`. `adb` is required; without `avahi-browse` network discovery is
//! skipped; without `scrcpy` mirroring fails at launch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const ADB: &str = "adb";
pub const AVAHI_BROWSE: &str = "avahi-browse";
pub const SCRCPY: &str = "scrcpy";

/// Optional explicit paths for the external tools (`[tools]` config section)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolPaths {
    #[serde(default)]
    pub adb: Option<PathBuf>,

    #[serde(default)]
    pub avahi_browse: Option<PathBuf>,

    #[serde(default)]
    pub scrcpy: Option<PathBuf>,
}

/// Resolved locations of the external tools
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    pub adb: Option<PathBuf>,
    pub avahi_browse: Option<PathBuf>,
    pub scrcpy: Option<PathBuf>,
}

impl ToolAvailability {
    /// Locate all tools (run once at startup)
    pub fn check(paths: &ToolPaths) -> Self {
        let availability = Self {
            adb: locate(ADB, paths.adb.as_deref()),
            avahi_browse: locate(AVAHI_BROWSE, paths.avahi_browse.as_deref()),
            scrcpy: locate(SCRCPY, paths.scrcpy.as_deref()),
        };
        debug!("Tool availability: {:?}", availability);
        availability
    }

    pub fn adb_path(&self) -> Option<String> {
        path_string(self.adb.as_deref())
    }

    pub fn avahi_browse_path(&self) -> Option<String> {
        path_string(self.avahi_browse.as_deref())
    }

    /// Path of `scrcpy`, or its bare name so a launch attempt reports the failure
    pub fn scrcpy_command(&self) -> String {
        path_string(self.scrcpy.as_deref()).unwrap_or_else(|| SCRCPY.to_string())
    }

    /// Get user-friendly message for a missing `adb`
    pub fn adb_unavailable_message(&self) -> Option<&'static str> {
        if self.adb.is_some() {
            None
        } else {
            Some("adb not found")
        }
    }

    /// Get user-friendly message for a missing `avahi-browse`
    pub fn discovery_unavailable_message(&self) -> Option<&'static str> {
        if self.avahi_browse.is_some() {
            None
        } else {
            Some("avahi-browse not found. Wireless devices will not be discovered.")
        }
    }
}

/// Find a tool at its configured path, falling back to `PATH`
fn locate(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        match which::which(path) {
            Ok(found) => return Some(found),
            Err(e) => warn!(
                "Configured {} path {} is not usable ({}), searching PATH",
                name,
                path.display(),
                e
            ),
        }
    }

    which::which(name)
        .inspect_err(|e| debug!("{} not found on PATH: {}", name, e))
        .ok()
}

fn path_string(path: Option<&Path>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}
