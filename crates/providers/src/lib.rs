//! External AI service collaborators.
//!
//! Each service is an `async-trait` contract with two implementations: a
//! reqwest client for the hosted API ([`http::AiServiceClient`]) and an
//! explicit simulation ([`simulated::SimulatedProvider`]) selected through
//! configuration, never as an implicit fallback.

use std::sync::Arc;

pub mod backoff;
pub mod config;
pub mod error;
pub mod http;
pub mod image;
pub mod script;
pub mod simulated;
pub mod speech;
pub mod video;

pub use config::{ProviderConfig, ProviderMode};
pub use error::ProviderError;
pub use image::{ImageGenerator, ImageOutput, ImageRequest};
pub use script::{ScriptGenerator, ScriptRequest, ScriptSegment};
pub use speech::{SpeechOutput, SpeechRequest, SpeechSynthesizer};
pub use video::{VideoGenerator, VideoMode, VideoRequest, VideoSubmission};

/// The full set of collaborators used by the workflow.
#[derive(Clone)]
pub struct Providers {
    pub script: Arc<dyn ScriptGenerator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub image: Arc<dyn ImageGenerator>,
    pub video: Arc<dyn VideoGenerator>,
}

impl Providers {
    /// Build the providers selected by `config.mode`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        match config.mode {
            ProviderMode::Live => {
                let client = Arc::new(http::AiServiceClient::new(config)?);
                Ok(Self {
                    script: client.clone(),
                    speech: client.clone(),
                    image: client.clone(),
                    video: client,
                })
            }
            ProviderMode::Simulated => Ok(Self::simulated()),
        }
    }

    pub fn simulated() -> Self {
        let sim = Arc::new(simulated::SimulatedProvider::default());
        Self {
            script: sim.clone(),
            speech: sim.clone(),
            image: sim.clone(),
            video: sim,
        }
    }
}
