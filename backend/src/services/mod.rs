//! Business logic services for the Weather Insights backend

pub mod insights;
pub mod narrative;
pub mod observation;
pub mod patterns;
pub mod statistics;

#[cfg(test)]
mod fixtures;

pub use insights::InsightsService;
pub use narrative::{Narrative, NarrativeGenerator};
pub use observation::{ObservationService, ObservationSource};
