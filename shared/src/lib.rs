//! Shared types and models for the Weather Insights platform
//!
//! This crate contains the observation and insights types shared between the
//! backend and the collectors, plus the write-time validation rules.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
