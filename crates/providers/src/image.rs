//! Image generation contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub model: Option<String>,
    pub safety_filter_level: Option<String>,
    pub person_generation: Option<String>,
}

/// A generated image. Inline image bytes are carried as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageOutput {
    pub url: String,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput, ProviderError>;
}
