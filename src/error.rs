//! copilot-sync error types.
//!
//! Every failure is terminal for the run: nothing is retried, the CLI prints
//! the category and message and exits non-zero. The variants mirror the
//! pipeline stages: fetch (`Network`/`Auth`/`Protocol`), settings read
//! (`NotFound`/`Parse`), settings write (`Backup`/`Write`).

use std::path::PathBuf;

/// copilot-sync error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    // Catalog fetch errors
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication rejected by {url} (HTTP {status})")]
    Auth { url: String, status: u16 },

    #[error("malformed catalog response: {0}")]
    Protocol(String),

    // Settings read errors
    #[error("settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse settings: {0}")]
    Parse(String),

    // Settings write errors
    #[error("backup failed: {0}")]
    Backup(String),

    #[error("write failed: {0}")]
    Write(String),

    // Environment errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Short category name for the failure, printed alongside the message
    /// so scripts can tell a dead endpoint from a mangled settings file.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Network(_) => "network",
            SyncError::Auth { .. } => "auth",
            SyncError::Protocol(_) => "protocol",
            SyncError::NotFound(_) => "not-found",
            SyncError::Parse(_) => "parse",
            SyncError::Backup(_) => "backup",
            SyncError::Write(_) => "write",
            SyncError::Config(_) => "config",
        }
    }
}

/// Result type alias for copilot-sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
