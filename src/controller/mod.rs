//! # Controller Module
//!
//! Arm-state driven control of recording and perception.
//!
//! This module handles:
//! - Detecting arm/disarm edges from the heartbeat stream
//! - Starting and stopping the perception process
//! - Running the main loop and its shutdown teardown

pub mod lifecycle;
pub mod supervisor;
pub mod tracker;

pub use lifecycle::{Controller, ControllerStats, Phase};
