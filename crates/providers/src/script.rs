//! Script generation contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, Serialize)]
pub struct ScriptRequest {
    pub title: String,
    pub description: String,
    pub system_instruction: Option<String>,
}

/// One segment of a generated script, in playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSegment {
    pub order: i32,
    pub script: String,
    #[serde(default)]
    pub video_prompt: Option<String>,
}

#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Split a story idea into ordered segments.
    async fn generate(&self, request: &ScriptRequest) -> Result<Vec<ScriptSegment>, ProviderError>;
}
