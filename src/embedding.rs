//! Text embedding provider
//!
//! Wraps fastembed's MiniLM model behind a trait seam so the index and
//! tests can run against a deterministic stand-in. Vectors are always
//! L2-normalized, so dot product equals cosine similarity downstream.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{AdvisorError, Resource};

/// Model identifier stored in the index header. Queries embedded with a
/// different model than the indexed chunks produce meaningless similarity
/// scores, so load-time verification checks against this name.
pub const MINILM_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Trait for embedding providers that convert text to vectors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts into normalized vectors.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError>;

    /// Dimensionality of the produced vectors.
    fn dimension(&self) -> usize;

    /// Name of the underlying model, for index compatibility checks.
    fn model_name(&self) -> &str;
}

/// Scale a vector to unit length in place.
pub fn normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Local MiniLM embedder (all-MiniLM-L6-v2, 384 dimensions).
///
/// Loading downloads/loads model weights and is the expensive step; the
/// resource cache makes sure it happens once per process.
pub struct MiniLmEmbedder {
    // fastembed's embed() takes &mut self
    inner: Arc<Mutex<TextEmbedding>>,
}

impl MiniLmEmbedder {
    pub fn new() -> Result<Self, AdvisorError> {
        info!("Loading embedding model ({})...", MINILM_MODEL_NAME);
        let embedder = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| AdvisorError::unavailable(Resource::Embedding, e.to_string()))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(embedder)),
        })
    }
}

#[async_trait]
impl TextEmbedder for MiniLmEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AdvisorError> {
        let mut embedder = self.inner.lock().await;
        let mut embeddings = embedder
            .embed(texts.to_vec(), None)
            .map_err(|e| AdvisorError::unavailable(Resource::Embedding, e.to_string()))?;
        for emb in &mut embeddings {
            normalize(emb);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        384
    }

    fn model_name(&self) -> &str {
        MINILM_MODEL_NAME
    }
}
