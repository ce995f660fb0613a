//! Gomoku Common - Shared types and utilities for the Gomoku sandbox workspace.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AdvisorConfig, Config, ObservabilityConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
