//! Error types shared by the adb-mirror crates
//!
//! Failures of the external tools themselves never surface here: captured
//! output degrades to an empty string at the process boundary. What remains
//! are missing tools, spawn failures, unknown devices, configuration and I/O.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required external tool is neither configured nor on `PATH`
    #[error("{tool} not found. Install it or set its path in the [tools] config section.")]
    ToolNotFound { tool: String },

    #[error("Could not start process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Process error: {message}")]
    Process { message: String },

    /// The id is not in the freshly refreshed device list
    #[error("No phone with id '{id}' is listed")]
    DeviceNotFound { id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound { id: id.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Retrying the same command later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Process { .. } | Error::ProcessSpawn { .. } | Error::DeviceNotFound { .. }
        )
    }

    /// Nothing will work until the user fixes their setup
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ToolNotFound { .. } | Error::Config { .. })
    }
}

/// Log an error together with what was being attempted, then pass it on
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`context`](Self::context), building the message only on error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("Failed {}: {}", f(), err);
            err
        })
    }
}
