//! Settings file location, loading and initialization

use std::path::{Path, PathBuf};

use adbm_core::prelude::*;

use super::types::Settings;

const CONFIG_DIR_NAME: &str = "adb-mirror";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# adb-mirror configuration

[tools]
# Explicit tool paths; leave commented out to search PATH
# adb = "/opt/android-sdk/platform-tools/adb"
# avahi_browse = "/usr/bin/avahi-browse"
# scrcpy = "/usr/bin/scrcpy"

[connection]
poll_interval_ms = 500  # Delay between two checks after `adb connect`
max_attempts = 10       # Checks before giving up

[discovery]
enabled = true
service_type = "_adb-tls-connect._tcp"

[mirror]
args = ["--always-on-top"]  # Passed to scrcpy after `-s <device>`

[process]
timeout_ms = 10000      # Limit for adb / avahi-browse queries
"#;

/// Default location of the settings file: `<config dir>/adb-mirror/config.toml`
///
/// Falls back to the current directory when the platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILENAME)
}

/// Load settings from `config_path`
///
/// A missing file gives the defaults; an unreadable or invalid one gives the
/// defaults with a warning.
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {}, using defaults", config_path.display());
        return Settings::default();
    }

    read_settings(config_path).unwrap_or_else(|e| {
        warn!("Ignoring {}: {}", config_path.display(), e);
        Settings::default()
    })
}

fn read_settings(config_path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(config_path)?;
    let settings = toml::from_str(&content).map_err(|e| Error::config(e.to_string()))?;
    debug!("Loaded settings from {}", config_path.display());
    Ok(settings)
}

/// Write a commented default config file at `config_path`
///
/// An existing file is left untouched. Returns `true` if a file was created.
pub fn init_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("writing {}", config_path.display()))?;

    info!("Created config file {}", config_path.display());
    Ok(true)
}
