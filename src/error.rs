//! Error types for the countdown engine and its collaborators.

use std::path::PathBuf;

/// A stored record that cannot be turned into a [`crate::task::Task`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    #[error("task has no id")]
    MissingId,

    #[error("task {0} has no due date")]
    MissingDue(u64),

    #[error("task {id} has an unreadable due date `{raw}`")]
    InvalidDue { id: u64, raw: String },

    #[error("task name cannot be empty")]
    EmptyName,

    #[error("stored task entry is unreadable: {reason}")]
    Unreadable { id: Option<u64>, reason: String },
}

/// Faults raised by the recurrence and projection engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Calendar arithmetic left the representable date range.
    #[error("date arithmetic out of range while advancing from {0}")]
    OutOfRange(String),
}

/// Persistence collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("task {0} not found")]
    NotFound(u64),
}

/// Notification collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reminder outbox {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings file failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a calling flow in [`crate::service`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] TaskValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Convenience result type for the calling flows.
pub type Result<T> = std::result::Result<T, ServiceError>;
