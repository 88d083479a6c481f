use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::InferenceConfig;
use crate::error::{Result, VidsumError};
use crate::request::{ChatCompletionResponse, SummaryRequest};

/// Sends an assembled request to a multimodal model and returns its answer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn infer(&self, request: &SummaryRequest) -> Result<String>;
}

/// Client for OpenAI-style chat-completions endpoints
///
/// One POST per call. No retries and no streaming.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("vidsum/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| VidsumError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl InferenceClient for ChatCompletionsClient {
    async fn infer(&self, request: &SummaryRequest) -> Result<String> {
        let payload = request.to_payload();

        info!(
            "Sending {} frame(s) to model {} at {}",
            request.frames.len(),
            request.model,
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(VidsumError::InferenceTransport)?;

        let status = response.status();
        let body = response.text().await.map_err(VidsumError::InferenceTransport)?;

        if !status.is_success() {
            return Err(VidsumError::InferenceApi {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Inference response: {} bytes", body.len());

        let completion: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| VidsumError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VidsumError::InvalidResponse("Response contained no completion text".to_string()))
    }
}
