//! Local vector index over reference document chunks
//!
//! Immutable after load. Persisted as zstd-compressed bincode together
//! with the embedding model name and a digest of the source document, so
//! a query embedded with a different model is rejected instead of
//! silently scoring garbage.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::TextEmbedder;
use crate::error::{AdvisorError, Resource};

/// An immutable fragment of the grounding document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceChunk {
    pub id: String,
    pub text: String,
    /// Normalized embedding, computed once at build time.
    pub embedding: Vec<f32>,
}

/// One retrieval hit: a chunk and its cosine similarity to the query.
pub type ScoredChunk = (ReferenceChunk, f32);

/// Pre-built nearest-neighbor index over [`ReferenceChunk`]s.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model the chunks were built with.
    model_name: String,
    dimension: usize,
    /// SHA-256 of the source document, for provenance.
    source_digest: String,
    built_at: DateTime<Utc>,
    chunks: Vec<ReferenceChunk>,
}

/// Hex SHA-256 digest of a source document.
pub fn source_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

impl VectorIndex {
    /// Embed `texts` and assemble a fresh index.
    pub async fn build(
        texts: Vec<String>,
        embedder: &dyn TextEmbedder,
        source_digest: String,
    ) -> Result<Self, AdvisorError> {
        let embeddings = embedder.embed(&texts).await?;
        let chunks = texts
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| ReferenceChunk {
                id: Uuid::new_v4().to_string(),
                text,
                embedding,
            })
            .collect::<Vec<_>>();

        info!("Built vector index with {} chunks", chunks.len());
        Ok(Self {
            model_name: embedder.model_name().to_string(),
            dimension: embedder.dimension(),
            source_digest,
            built_at: Utc::now(),
            chunks,
        })
    }

    /// Persist the index as zstd-compressed bincode.
    pub fn save(&self, path: &Path) -> Result<(), AdvisorError> {
        let io_err = |e: std::io::Error| AdvisorError::unavailable(Resource::Index, e.to_string());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let file = File::create(path).map_err(io_err)?;
        let writer = BufWriter::new(file);
        let mut encoder = zstd::stream::write::Encoder::new(writer, 3).map_err(io_err)?;
        bincode::serialize_into(&mut encoder, self)
            .map_err(|e| AdvisorError::unavailable(Resource::Index, e.to_string()))?;
        encoder.finish().map_err(io_err)?;
        info!("Vector index saved to {:?}", path);
        Ok(())
    }

    /// Load a persisted index, verifying it was built with `expected_model`.
    pub fn load(path: &Path, expected_model: &str) -> Result<Self, AdvisorError> {
        if !path.exists() {
            return Err(AdvisorError::unavailable(
                Resource::Index,
                format!("index not found at {:?}; run the build_index job", path),
            ));
        }

        let file = File::open(path)
            .map_err(|e| AdvisorError::unavailable(Resource::Index, e.to_string()))?;
        let decoder = zstd::stream::read::Decoder::new(BufReader::new(file))
            .map_err(|e| AdvisorError::unavailable(Resource::Index, e.to_string()))?;
        let index: VectorIndex = bincode::deserialize_from(decoder).map_err(|e| {
            AdvisorError::unavailable(Resource::Index, format!("corrupt index: {e}"))
        })?;

        if index.model_name != expected_model {
            return Err(AdvisorError::unavailable(
                Resource::Index,
                format!(
                    "index built with {} but queries use {}; rebuild the index",
                    index.model_name, expected_model
                ),
            ));
        }

        info!(
            "Vector index loaded: {} chunks, model {}, built {}",
            index.chunks.len(),
            index.model_name,
            index.built_at
        );
        Ok(index)
    }

    /// Return the `k` chunks most similar to `query`, ordered by
    /// descending cosine similarity. Deterministic for a fixed index and
    /// query; ties carry no stability guarantee.
    pub async fn similarity_search(
        &self,
        embedder: &dyn TextEmbedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, AdvisorError> {
        if self.chunks.is_empty() {
            return Err(AdvisorError::IndexNotLoaded);
        }

        let query_embedding = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AdvisorError::unavailable(Resource::Embedding, "empty embedding batch")
            })?;

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .par_iter()
            .map(|chunk| (chunk.clone(), dot_product(&query_embedding, &chunk.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(
            "Retrieved {} chunks for query ({} candidates)",
            scored.len(),
            self.chunks.len()
        );
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn source_digest(&self) -> &str {
        &self.source_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;
    use tempfile::tempdir;

    async fn sample_index(embedder: &HashEmbedder) -> VectorIndex {
        let texts = vec![
            "Sprint retrospectives should address recurring blockers.".to_string(),
            "The daily scrum is a fifteen minute event for developers.".to_string(),
            "Product backlog refinement is an ongoing activity.".to_string(),
            "The sprint goal is the single objective for the sprint.".to_string(),
        ];
        VectorIndex::build(texts, embedder, source_digest("guide"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_identical_text_ranks_first() {
        let embedder = HashEmbedder::default();
        let index = sample_index(&embedder).await;

        let results = index
            .similarity_search(
                &embedder,
                "Sprint retrospectives should address recurring blockers.",
                2,
            )
            .await
            .unwrap();
        assert_eq!(
            results[0].0.text,
            "Sprint retrospectives should address recurring blockers."
        );
        assert!((results[0].1 - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_retrieval_is_deterministic() {
        let embedder = HashEmbedder::default();
        let index = sample_index(&embedder).await;

        let first = index
            .similarity_search(&embedder, "blocked sprint work", 2)
            .await
            .unwrap();
        for _ in 0..5 {
            let again = index
                .similarity_search(&embedder, "blocked sprint work", 2)
                .await
                .unwrap();
            let ids: Vec<_> = again.iter().map(|(c, _)| c.id.clone()).collect();
            let expected: Vec<_> = first.iter().map(|(c, _)| c.id.clone()).collect();
            assert_eq!(ids, expected);
        }
    }

    #[tokio::test]
    async fn test_k_bounds_result_count() {
        let embedder = HashEmbedder::default();
        let texts: Vec<String> = (0..200)
            .map(|i| format!("chunk number {i} about sprint planning and delivery"))
            .collect();
        let index = VectorIndex::build(texts, &embedder, source_digest("big"))
            .await
            .unwrap();

        let results = index
            .similarity_search(&embedder, "sprint planning", 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_is_not_loaded() {
        let embedder = HashEmbedder::default();
        let index = VectorIndex::build(vec![], &embedder, source_digest(""))
            .await
            .unwrap();
        let err = index
            .similarity_search(&embedder, "anything", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::IndexNotLoaded));
    }

    #[tokio::test]
    async fn test_save_load_preserves_chunks() {
        let embedder = HashEmbedder::default();
        let index = sample_index(&embedder).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");

        index.save(&path).unwrap();
        let loaded = VectorIndex::load(&path, embedder.model_name()).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.source_digest(), index.source_digest());
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = VectorIndex::load(&dir.path().join("absent.bin"), "any-model").unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::ResourceUnavailable {
                resource: Resource::Index,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_model_mismatch() {
        let embedder = HashEmbedder::default();
        let index = sample_index(&embedder).await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");
        index.save(&path).unwrap();

        let err = VectorIndex::load(&path, "some-other-model").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rebuild the index"), "unexpected error: {msg}");
    }
}
