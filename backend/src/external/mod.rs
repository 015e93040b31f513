//! External API integrations

pub mod gemini;
pub mod text_generation;

pub use gemini::GeminiClient;
pub use text_generation::{GenerationError, GenerationRequest, TextGenerator};
