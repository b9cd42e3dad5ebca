//! # RCK Common Library
//!
//! Shared code for the runner check-in workspace:
//! - Checkpoint token grammar and payload validation
//! - Event types (CheckinEvent enum) and EventBus
//! - Check-in API wire types
//! - Configuration loading and pipeline tuning parameters
//! - Timestamp helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod time;
pub mod token;

pub use error::{Error, Result};
pub use token::{CheckpointToken, PayloadValidator};
