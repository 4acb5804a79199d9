//! Error types for the importer.

use std::path::PathBuf;
use std::time::Duration;

/// Faults raised by the remote browser session.
///
/// Timeouts while waiting for an expected control state are *not* channel
/// errors; the classifier treats those as ordinary outcomes.
#[derive(thiserror::Error, Debug)]
pub enum ChannelError {
    #[error("no browser session is attached")]
    Detached,

    #[error("control '{selector}' was not displayed within {timeout:?}")]
    ControlMissing { selector: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("remote command failed: {0}")]
    Command(String),
}

/// Broad classes of fatal errors, used to pick the diagnostic wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    ChannelUnavailable,
    Channel,
}

/// All fatal errors that can end an import run.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("Please select either '--dry-run' or '--compare'")]
    ConflictingModes,

    #[error("Unknown file format supplied: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unable to find input file '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("Unable to open input file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Feature {position} is missing a valid '{field}'")]
    InvalidProperty {
        position: usize,
        field: &'static str,
    },

    #[error("Remote debugging endpoint {host}:{port} is not reachable")]
    ChannelUnavailable { host: String, port: u16 },

    #[error("Browser session failed: {0}")]
    Channel(#[from] ChannelError),

    #[error("Operator input failed: {0}")]
    Operator(String),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::ConflictingModes
            | ImportError::UnsupportedFormat { .. }
            | ImportError::Config(_) => ErrorKind::Configuration,
            ImportError::NotFound { .. }
            | ImportError::Io { .. }
            | ImportError::MalformedInput(_)
            | ImportError::InvalidProperty { .. } => ErrorKind::Input,
            ImportError::ChannelUnavailable { .. } => ErrorKind::ChannelUnavailable,
            ImportError::Channel(_) | ImportError::Operator(_) => ErrorKind::Channel,
        }
    }

    /// Build the right error for a failed read of `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ImportError::NotFound { path }
        } else {
            ImportError::Io { path, source }
        }
    }
}

/// Convenience result type.
pub type ImportResult<T> = Result<T, ImportError>;
