//! REST client for the hosted AI service.
//!
//! One client serves all four contracts:
//!
//! | Contract | Endpoint |
//! |----------|----------|
//! | script   | `POST /scripts` |
//! | speech   | `POST /speech` |
//! | image    | `POST /images` |
//! | video    | `POST /videos`, `GET /videos/{id}`, `POST /videos/{id}/cancel` |

use async_trait::async_trait;
use serde::Deserialize;
use storyreel_core::task::RemoteTaskState;

use crate::backoff::{retry, RetryConfig};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::image::{ImageGenerator, ImageOutput, ImageRequest};
use crate::script::{ScriptGenerator, ScriptRequest, ScriptSegment};
use crate::speech::{SpeechOutput, SpeechRequest, SpeechSynthesizer};
use crate::video::{VideoGenerator, VideoRequest, VideoSubmission};

/// HTTP client for the AI service.
pub struct AiServiceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct ScriptResponse {
    segments: Vec<ScriptSegment>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: Option<String>,
    image_base64: Option<String>,
    mime_type: Option<String>,
}

impl AiServiceClient {
    /// Build a client from live-mode configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("AI_API_BASE_URL is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("AI_API_KEY is not set".into()))?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy used for idempotent requests.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ScriptGenerator for AiServiceClient {
    async fn generate(&self, request: &ScriptRequest) -> Result<Vec<ScriptSegment>, ProviderError> {
        let response: ScriptResponse = self.post_json("/scripts", request).await?;
        if response.segments.is_empty() {
            return Err(ProviderError::Malformed(
                "script generation returned no segments".into(),
            ));
        }
        let mut segments = response.segments;
        segments.sort_by_key(|s| s.order);
        Ok(segments)
    }
}

#[async_trait]
impl SpeechSynthesizer for AiServiceClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechOutput, ProviderError> {
        self.post_json("/speech", request).await
    }
}

#[async_trait]
impl ImageGenerator for AiServiceClient {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageOutput, ProviderError> {
        let response: ImageResponse = self.post_json("/images", request).await?;
        match (response.url, response.image_base64) {
            (Some(url), _) => Ok(ImageOutput { url }),
            (None, Some(data)) => {
                let mime = response.mime_type.as_deref().unwrap_or("image/png");
                Ok(ImageOutput {
                    url: format!("data:{mime};base64,{data}"),
                })
            }
            (None, None) => Err(ProviderError::Malformed(
                "image response carried neither url nor image data".into(),
            )),
        }
    }
}

#[async_trait]
impl VideoGenerator for AiServiceClient {
    async fn submit(&self, request: &VideoRequest) -> Result<VideoSubmission, ProviderError> {
        let submission: VideoSubmission = self.post_json("/videos", request).await?;
        if submission.task_id.is_empty() {
            return Err(ProviderError::Malformed("video submission returned an empty task id".into()));
        }
        Ok(submission)
    }

    async fn poll(&self, task_id: &str) -> Result<RemoteTaskState, ProviderError> {
        let url = self.url(&format!("/videos/{task_id}"));
        let url = url.as_str();
        retry(&self.retry, "video_poll", || async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            Self::parse_response(response).await
        })
        .await
    }

    async fn cancel(&self, task_id: &str) -> Result<(), ProviderError> {
        let url = self.url(&format!("/videos/{task_id}/cancel"));
        let url = url.as_str();
        retry(&self.retry, "video_cancel", || async move {
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            Self::ensure_success(response).await?;
            Ok(())
        })
        .await
    }
}
