//! Cohere chat backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::CompletionBackend;
use crate::config::LlmEndpointConfig;
use crate::credentials::ApiKey;
use crate::error::PlanningError;

#[derive(Debug, Clone, Serialize)]
struct CohereChatRequest {
    model: String,
    message: String,
    preamble: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CohereChatResponse {
    #[serde(default)]
    text: String,
}

/// Cohere `/chat` client
pub struct CohereBackend {
    config: LlmEndpointConfig,
    api_key: ApiKey,
    http: Client,
}

impl CohereBackend {
    pub fn new(config: LlmEndpointConfig, api_key: ApiKey) -> Result<Self, PlanningError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlanningError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            http,
        })
    }
}

#[async_trait]
impl CompletionBackend for CohereBackend {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, PlanningError> {
        debug!("Sending request to Cohere API");

        let request = CohereChatRequest {
            model: self.config.model.clone(),
            message: prompt.to_string(),
            preamble: system.to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Cohere API error: {} - {}", status, body);
            return Err(PlanningError::Backend(format!(
                "Cohere API error: {} - {}",
                status, body
            )));
        }

        let chat: CohereChatResponse = response
            .json()
            .await
            .map_err(|e| PlanningError::Unparseable(format!("Failed to parse Cohere response: {}", e)))?;

        debug!("Cohere response received: {} chars", chat.text.len());
        Ok(chat.text)
    }
}
