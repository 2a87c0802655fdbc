//! Advisor configuration
//!
//! Populated from environment variables with sensible defaults. Loading
//! never fails: a missing API key only surfaces when the completion client
//! is constructed, so retrieval-only usage still works without one.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the persisted vector index artifact.
pub const DEFAULT_INDEX_PATH: &str = "index/advisor_index.bin";

/// Configuration for the advice pipeline.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Path to the persisted vector index built by the offline job.
    pub index_path: PathBuf,
    /// Completion service API key, if present in the environment.
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL of the completion service.
    pub completion_endpoint: String,
    /// Model identifier sent with every completion request.
    pub completion_model: String,
    /// Sampling temperature. Kept low: advice should be stable, not creative.
    pub temperature: f32,
    /// Output token cap for the completion call.
    pub max_tokens: u32,
    /// Number of chunks retrieved per query. Small on purpose: a short
    /// context bounds prompt size and the hallucination surface.
    pub top_k: usize,
    /// Upper bound on every outbound HTTP call.
    pub request_timeout: Duration,
    /// Upper bound on constructing each cached resource (embedding model
    /// load, index load, client setup). The first model load may download
    /// weights, so this is much looser than the per-request timeout.
    pub startup_timeout: Duration,
}

impl AdvisorConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("ADVISOR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        let startup_secs = std::env::var("ADVISOR_STARTUP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(120);

        Self {
            index_path: std::env::var("ADVISOR_INDEX_PATH")
                .unwrap_or_else(|_| DEFAULT_INDEX_PATH.to_string())
                .into(),
            api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            completion_endpoint: std::env::var("ADVISOR_COMPLETION_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            completion_model: std::env::var("ADVISOR_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            temperature: 0.2,
            max_tokens: 100,
            top_k: 2,
            request_timeout: Duration::from_secs(timeout_secs),
            startup_timeout: Duration::from_secs(startup_secs),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AdvisorConfig {
            index_path: DEFAULT_INDEX_PATH.into(),
            api_key: None,
            completion_endpoint: "https://api.groq.com/openai/v1".to_string(),
            completion_model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.2,
            max_tokens: 100,
            top_k: 2,
            request_timeout: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(120),
        };
        assert_eq!(cfg.top_k, 2);
        assert!(cfg.temperature < 1.0);
        assert!(cfg.startup_timeout > cfg.request_timeout);
    }
}
