//! Completion client for the external language model
//!
//! One stateless request per call against an OpenAI-compatible chat
//! endpoint (Groq in production). No conversation memory, no retries: a
//! failed call surfaces immediately and the orchestrator degrades.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Resource};

/// Trait for clients that turn a composed prompt into generated text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion round-trip.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AdvisorError>;
}

/// Client for Groq's OpenAI-compatible chat completion API.
#[derive(Debug)]
pub struct GroqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqClient {
    /// Build a client from configuration. Fails when the API key is
    /// absent: credentials are a construction-time concern, not a
    /// per-call one.
    pub fn new(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AdvisorError::unavailable(Resource::Credentials, "GROQ_API_KEY not set in environment")
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdvisorError::unavailable(Resource::Credentials, e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.completion_endpoint.clone(),
            api_key,
            model: config.completion_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, AdvisorError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!("Requesting completion from {} ({})", self.base_url, self.model);

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::GenerationFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdvisorError::GenerationFailed(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisorError::GenerationFailed(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AdvisorError::GenerationFailed("empty completion response".to_string())
            })?;

        Ok(content.to_string())
    }
}
