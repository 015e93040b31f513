//! Capability interface for generative text services

use async_trait::async_trait;
use thiserror::Error;

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Ways a generation call can fail
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Something that turns a prompt into raw text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier reported alongside generated narratives
    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
