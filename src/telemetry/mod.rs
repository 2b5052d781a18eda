//! # Telemetry Module
//!
//! Handles typed telemetry and the structured telemetry log.
//!
//! This module handles:
//! - Classifying link messages into heartbeats and samples
//! - Mapping samples onto the fixed row schema
//! - Formatting rows as CSV or JSONL
//! - Routing samples into the open session

pub mod logger;
pub mod recorder;
pub mod types;
