//! Configuration file parsing for adb-mirror
//!
//! Settings live in `<config dir>/adb-mirror/config.toml` unless a path is
//! given on the command line.

pub mod settings;
pub mod types;

pub use settings::{default_config_path, init_config, load_settings};
pub use types::*;
