//! adb-mirror command library
//!
//! The `adbm` binary parses arguments and hands over to [`commands`].

pub mod commands;
pub mod output;
