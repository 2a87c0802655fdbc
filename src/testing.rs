//! Deterministic test doubles
//!
//! Shared by unit and integration tests so the pipeline can run without
//! model downloads or network access.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::completion::CompletionClient;
use crate::embedding::{normalize, TextEmbedder};
use crate::error::AdvisorError;

/// Embedder that hashes words into a small bag-of-words vector.
///
/// Identical texts always embed identically; texts sharing vocabulary get
/// proportionally similar vectors. No weights, no I/O.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimension: 16 }
    }
}

impl HashEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.trim_matches(|c: char| !c.is_alphanumeric()).hash(&mut hasher);
            vec[(hasher.finish() as usize) % self.dimension] += 1.0;
        }
        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Completion client that records every prompt and replays canned answers.
pub struct RecordingClient {
    pub prompts: Arc<Mutex<Vec<String>>>,
    response: String,
}

impl RecordingClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            prompts: Arc::new(Mutex::new(Vec::new())),
            response: response.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for RecordingClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, AdvisorError> {
        self.prompts.lock().await.push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Completion client that always fails, for degradation tests.
pub struct FailingClient;

#[async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AdvisorError> {
        Err(AdvisorError::GenerationFailed(
            "completion backend down".to_string(),
        ))
    }
}
