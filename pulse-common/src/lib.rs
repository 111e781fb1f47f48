//! # Pulse Common Library
//!
//! Shared code for the pulse campaign-analytics services including:
//! - Canonical record models
//! - Database initialization and schema
//! - Error taxonomy
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
