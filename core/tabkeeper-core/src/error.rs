//! Error types for tabkeeper-core operations.
//!
//! Only settings I/O can fail. Tab tracking and the placement/focus policies
//! degrade to no-ops instead of returning errors.

use std::path::PathBuf;

/// All errors that can occur in tabkeeper-core operations.
#[derive(Debug, thiserror::Error)]
pub enum TabkeeperError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Settings file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Settings write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings serialization failed: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using TabkeeperError.
pub type Result<T> = std::result::Result<T, TabkeeperError>;
