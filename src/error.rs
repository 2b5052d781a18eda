//! # Error Types
//!
//! Custom error types for Arm Sentry using `thiserror`.
//!
//! Each component owns its own error type so failures can be contained at
//! the component boundary. Only [`ArmSentryError::Fatal`] is allowed to end
//! the controller loop.

use std::path::PathBuf;
use thiserror::Error;

/// Telemetry link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// The transport reached end of stream
    #[error("telemetry link closed")]
    Closed,

    /// Reading from the serial device failed
    #[error("serial error: {0}")]
    Serial(String),

    /// Malformed frame on the wire (bad checksum, bad length)
    #[error("MAVLink protocol error: {0}")]
    Protocol(String),
}

impl LinkError {
    /// Whether the receive path can make no further progress
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Closed | LinkError::Serial(_))
    }
}

/// Session sink errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Log directory could not be created
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sink file could not be created or opened
    #[error("failed to open {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Append to an open sink failed
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Flush or fsync on close failed
    #[error("failed to sync {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Perception process supervision errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The child could not be launched
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The termination request could not be delivered
    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// Waiting for the child to exit failed
    #[error("failed to wait for pid {pid}: {reason}")]
    Wait { pid: u32, reason: String },

    /// Forceful termination failed
    #[error("failed to kill pid {pid}: {reason}")]
    Kill { pid: u32, reason: String },
}

/// Main error type for Arm Sentry
#[derive(Debug, Error)]
pub enum ArmSentryError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry link errors
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Session sink errors
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Unrecoverable receive-path failure
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Result type alias for Arm Sentry
pub type Result<T> = std::result::Result<T, ArmSentryError>;
