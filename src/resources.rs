//! Resource cache for the expensive pipeline dependencies
//!
//! The embedding model, vector index, and completion client are each
//! constructed at most once per process and shared read-only afterwards.
//! Construction is guarded by a single mutex so concurrent first-callers
//! never double-pay a load, runs on the blocking pool under an explicit
//! timeout so a stalled model download cannot wedge the first caller,
//! and a failed slot stays empty so the next call retries that slot
//! only. Populated slots are never replaced.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::completion::{CompletionClient, GroqClient};
use crate::config::AdvisorConfig;
use crate::embedding::{MiniLmEmbedder, TextEmbedder};
use crate::error::{AdvisorError, Resource};
use crate::index::VectorIndex;

/// Shared handles to the three constructed resources.
#[derive(Clone)]
pub struct ReadyResources {
    pub embedder: Arc<dyn TextEmbedder>,
    pub index: Arc<VectorIndex>,
    pub completion: Arc<dyn CompletionClient>,
}

impl std::fmt::Debug for ReadyResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyResources").finish_non_exhaustive()
    }
}

pub type EmbedderFactory =
    Box<dyn Fn() -> Result<Arc<dyn TextEmbedder>, AdvisorError> + Send + Sync>;
pub type IndexFactory = Box<
    dyn Fn(&Arc<dyn TextEmbedder>) -> Result<Arc<VectorIndex>, AdvisorError> + Send + Sync,
>;
pub type CompletionFactory =
    Box<dyn Fn() -> Result<Arc<dyn CompletionClient>, AdvisorError> + Send + Sync>;

// Factories are cloned onto the blocking pool per construction attempt.
type SharedEmbedderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn TextEmbedder>, AdvisorError> + Send + Sync>;
type SharedIndexFactory =
    Arc<dyn Fn(&Arc<dyn TextEmbedder>) -> Result<Arc<VectorIndex>, AdvisorError> + Send + Sync>;
type SharedCompletionFactory =
    Arc<dyn Fn() -> Result<Arc<dyn CompletionClient>, AdvisorError> + Send + Sync>;

#[derive(Default)]
struct Slots {
    embedder: Option<Arc<dyn TextEmbedder>>,
    index: Option<Arc<VectorIndex>>,
    completion: Option<Arc<dyn CompletionClient>>,
}

/// Lazily-initialized holder for the pipeline's expensive resources.
pub struct ResourceCache {
    slots: Mutex<Slots>,
    embedder_factory: SharedEmbedderFactory,
    index_factory: SharedIndexFactory,
    completion_factory: SharedCompletionFactory,
    /// Bound on each slot's construction attempt.
    startup_timeout: Duration,
    /// Number of slot constructions attempted, for tests and diagnostics.
    constructions: AtomicU64,
}

impl ResourceCache {
    /// Cache wired to production factories: fastembed MiniLM, the on-disk
    /// index at `config.index_path`, and the Groq completion client.
    pub fn new(config: AdvisorConfig) -> Self {
        let startup_timeout = config.startup_timeout;
        let index_path: PathBuf = config.index_path.clone();
        let client_config = config.clone();

        Self::with_factories(
            Box::new(|| {
                MiniLmEmbedder::new().map(|e| Arc::new(e) as Arc<dyn TextEmbedder>)
            }),
            Box::new(move |embedder| {
                VectorIndex::load(&index_path, embedder.model_name()).map(Arc::new)
            }),
            Box::new(move || {
                GroqClient::new(&client_config)
                    .map(|c| Arc::new(c) as Arc<dyn CompletionClient>)
            }),
        )
        .with_startup_timeout(startup_timeout)
    }

    /// Cache with injected factories. The index factory receives the
    /// already-constructed embedder because loading verifies the model
    /// the index was built with.
    pub fn with_factories(
        embedder_factory: EmbedderFactory,
        index_factory: IndexFactory,
        completion_factory: CompletionFactory,
    ) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            embedder_factory: Arc::from(embedder_factory),
            index_factory: Arc::from(index_factory),
            completion_factory: Arc::from(completion_factory),
            startup_timeout: Duration::from_secs(120),
            constructions: AtomicU64::new(0),
        }
    }

    /// Override the per-slot construction bound.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Construct any still-empty slot, in dependency order, and return
    /// handles to all three resources.
    ///
    /// Idempotent: populated slots are skipped. Each construction attempt
    /// runs on the blocking pool bounded by the startup timeout; a
    /// failure (or timeout) leaves its slot empty and aborts, so
    /// subsequent calls retry from the failed slot onward.
    pub async fn ensure_ready(&self) -> Result<ReadyResources, AdvisorError> {
        let mut slots = self.slots.lock().await;

        let embedder = match &slots.embedder {
            Some(embedder) => embedder.clone(),
            None => {
                self.constructions.fetch_add(1, Ordering::Relaxed);
                let factory = self.embedder_factory.clone();
                let embedder = self.construct(Resource::Embedding, move || factory()).await?;
                info!("Embedding model ready ({})", embedder.model_name());
                slots.embedder = Some(embedder.clone());
                embedder
            }
        };

        let index = match &slots.index {
            Some(index) => index.clone(),
            None => {
                self.constructions.fetch_add(1, Ordering::Relaxed);
                let factory = self.index_factory.clone();
                let for_index = embedder.clone();
                let index = self
                    .construct(Resource::Index, move || factory(&for_index))
                    .await?;
                info!("Vector index ready ({} chunks)", index.len());
                slots.index = Some(index.clone());
                index
            }
        };

        let completion = match &slots.completion {
            Some(completion) => completion.clone(),
            None => {
                self.constructions.fetch_add(1, Ordering::Relaxed);
                let factory = self.completion_factory.clone();
                let completion = self
                    .construct(Resource::Credentials, move || factory())
                    .await?;
                info!("Completion client ready");
                slots.completion = Some(completion.clone());
                completion
            }
        };

        Ok(ReadyResources {
            embedder,
            index,
            completion,
        })
    }

    /// Run one construction attempt on the blocking pool, bounded by the
    /// startup timeout.
    async fn construct<T, F>(&self, resource: Resource, build: F) -> Result<T, AdvisorError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AdvisorError> + Send + 'static,
    {
        let attempt = tokio::task::spawn_blocking(build);
        match tokio::time::timeout(self.startup_timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AdvisorError::unavailable(resource, join_error.to_string())),
            Err(_) => Err(AdvisorError::unavailable(
                resource,
                format!(
                    "construction timed out after {:?}",
                    self.startup_timeout
                ),
            )),
        }
    }

    /// Total slot constructions attempted so far.
    pub fn construction_count(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::source_digest;
    use crate::testing::{FailingClient, HashEmbedder, RecordingClient};
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    async fn in_memory_index(embedder: &HashEmbedder) -> Arc<VectorIndex> {
        let texts = vec!["Sprint planning sets the sprint goal.".to_string()];
        Arc::new(
            VectorIndex::build(texts, embedder, source_digest("guide"))
                .await
                .unwrap(),
        )
    }

    fn working_cache(index: Arc<VectorIndex>) -> ResourceCache {
        ResourceCache::with_factories(
            Box::new(|| Ok(Arc::new(HashEmbedder::default()) as Arc<dyn TextEmbedder>)),
            Box::new(move |_| Ok(index.clone())),
            Box::new(|| Ok(Arc::new(RecordingClient::new("ok")) as Arc<dyn CompletionClient>)),
        )
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let embedder = HashEmbedder::default();
        let cache = working_cache(in_memory_index(&embedder).await);

        for _ in 0..5 {
            cache.ensure_ready().await.unwrap();
        }
        // One construction per slot, ever.
        assert_eq!(cache.construction_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_slot_is_retried_alone() {
        let embedder = HashEmbedder::default();
        let index = in_memory_index(&embedder).await;
        let index_should_fail = Arc::new(AtomicBool::new(true));
        let fail_flag = index_should_fail.clone();

        let cache = ResourceCache::with_factories(
            Box::new(|| Ok(Arc::new(HashEmbedder::default()) as Arc<dyn TextEmbedder>)),
            Box::new(move |_| {
                if fail_flag.load(Ordering::Relaxed) {
                    Err(AdvisorError::IndexNotLoaded)
                } else {
                    Ok(index.clone())
                }
            }),
            Box::new(|| Ok(Arc::new(FailingClient) as Arc<dyn CompletionClient>)),
        );

        assert!(cache.ensure_ready().await.is_err());
        // Embedder (1) + failed index attempt (1).
        assert_eq!(cache.construction_count(), 2);

        index_should_fail.store(false, Ordering::Relaxed);
        cache.ensure_ready().await.unwrap();
        // Embedder slot untouched; index retried (1) + completion (1).
        assert_eq!(cache.construction_count(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_first_callers_construct_once() {
        let embedder = HashEmbedder::default();
        let cache = Arc::new(working_cache(in_memory_index(&embedder).await));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.ensure_ready().await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(cache.construction_count(), 3);
    }

    #[tokio::test]
    async fn test_stalled_construction_times_out() {
        let cache = ResourceCache::with_factories(
            Box::new(|| {
                // Simulates a hung model download.
                std::thread::sleep(Duration::from_secs(1));
                Ok(Arc::new(HashEmbedder::default()) as Arc<dyn TextEmbedder>)
            }),
            Box::new(|_| Err(AdvisorError::IndexNotLoaded)),
            Box::new(|| Ok(Arc::new(FailingClient) as Arc<dyn CompletionClient>)),
        )
        .with_startup_timeout(Duration::from_millis(50));

        let start = Instant::now();
        let err = cache.ensure_ready().await.unwrap_err();

        assert!(matches!(
            err,
            AdvisorError::ResourceUnavailable {
                resource: Resource::Embedding,
                ..
            }
        ));
        // The caller is released at the timeout, not when the factory
        // eventually finishes.
        assert!(start.elapsed() < Duration::from_millis(900));
    }
}
