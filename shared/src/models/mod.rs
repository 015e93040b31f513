//! Domain models for the Weather Insights platform

mod insights;
mod observation;

pub use insights::*;
pub use observation::*;
