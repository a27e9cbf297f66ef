//! Centralized error and warning types for mailbinder.
//!
//! [`BinderError`] aborts a run. [`Warning`] is recorded, logged and
//! summarized at the end while the run carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced by the mailbinder library.
#[derive(Error, Debug)]
pub enum BinderError {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A source could not acquire or refresh its credentials. The shipped
    /// file-backed sources never need credentials; remote `MailSource`
    /// implementations report through this.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The mail source failed to search or fetch.
    #[error("Mail source error: {0}")]
    Source(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file or directory does not exist.
    #[error("Not found: {0}")]
    FileNotFound(PathBuf),

    /// The renderer could not produce an artifact at all. `HtmlRenderer`
    /// cannot fail; other `Renderer` backends (PDF) report through this.
    #[error("Render error: {0}")]
    Render(String),
}

/// Convenience alias for `Result<T, BinderError>`.
pub type Result<T> = std::result::Result<T, BinderError>;

impl BinderError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error` on a source file, turning `NotFound` into [`BinderError::FileNotFound`].
    pub fn source_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// Recoverable problems that do not stop a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A message body payload could not be decoded; its body is left empty.
    #[error("message {index}: could not decode body ({reason})")]
    Decode { index: usize, reason: String },

    /// An attachment or the config snapshot could not be written.
    #[error("could not save '{path}': {reason}")]
    Persist { path: PathBuf, reason: String },

    /// The renderer produced an artifact but reported layout issues.
    #[error("renderer: {0}")]
    Render(String),
}
