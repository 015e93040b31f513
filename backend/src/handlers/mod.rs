//! HTTP request handlers

pub mod health;
pub mod insights;
pub mod observation;

pub use health::*;
pub use insights::*;
pub use observation::*;
