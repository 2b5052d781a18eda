//! # Session Module
//!
//! Per-session output files.
//!
//! This module handles:
//! - Creating the raw recording and structured telemetry sinks on arm
//! - Append-only writes with a flush after every append
//! - Flush, fsync and close on disarm or shutdown (idempotent)

pub mod manager;
pub mod sink;

pub use manager::{SessionManager, SessionPaths, SessionSummary};
