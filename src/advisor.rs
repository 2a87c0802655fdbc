//! Advice orchestrator
//!
//! The single entry point the serving layer calls. Retrieval and
//! generation are best-effort: every internal failure is logged with its
//! cause and collapsed into one fixed degraded string, so callers always
//! get some text back and never an error.

use tracing::{debug, warn};

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::resources::ResourceCache;

/// Fixed fallback returned whenever any pipeline stage fails. Deliberately
/// templated so a reviewer can tell it apart from generated advice.
pub const DEGRADED_ADVICE: &str =
    "Standard Protocol: Prioritize task refinement and ensure team sync. (Advice module degraded)";

/// System prompt for the completion call.
const SYSTEM_PROMPT: &str = "You are a Scrum Master with a PhD in Neuroscience.";

/// Retrieval-augmented advice generator for cognitive-state assessments.
pub struct Advisor {
    cache: ResourceCache,
    top_k: usize,
}

impl Advisor {
    /// Wrap a resource cache. `top_k` chunks are retrieved per query;
    /// two keeps the grounding context short and the prompt bounded.
    pub fn new(cache: ResourceCache) -> Self {
        Self { cache, top_k: 2 }
    }

    /// Production wiring: cache built from `config`, retrieval width from
    /// `config.top_k`.
    pub fn from_config(config: AdvisorConfig) -> Self {
        let top_k = config.top_k;
        Self {
            cache: ResourceCache::new(config),
            top_k,
        }
    }

    /// Produce a grounded recommendation for the given role, predicted
    /// cognitive state, and dominant biometric signal.
    ///
    /// Never fails: any internal error degrades to [`DEGRADED_ADVICE`].
    /// All three inputs are free strings at this boundary; validating
    /// `state` against the classifier's label set is the caller's job.
    pub async fn get_advice(&self, role: &str, state: &str, dominant_signal: &str) -> String {
        match self.generate(role, state, dominant_signal).await {
            Ok(advice) => advice,
            Err(e) => {
                warn!(kind = e.kind(), "Advice pipeline degraded: {e}");
                DEGRADED_ADVICE.to_string()
            }
        }
    }

    /// The fallible pipeline behind [`get_advice`].
    async fn generate(
        &self,
        role: &str,
        state: &str,
        dominant_signal: &str,
    ) -> Result<String, AdvisorError> {
        let resources = self.cache.ensure_ready().await?;

        let query = format!(
            "Management protocols for {state} cognitive status with {dominant_signal} activity in a {role} role."
        );
        debug!("Retrieval query: {query}");

        let hits = resources
            .index
            .similarity_search(resources.embedder.as_ref(), &query, self.top_k)
            .await?;

        let context = hits
            .iter()
            .map(|(chunk, _)| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Role: {role}\n\
             Cognitive State: {state}\n\
             Biometric Signal: {dominant_signal}\n\
             Agile Context: {context}\n\n\
             Provide one highly specific, actionable Scrum-compliant recommendation \
             (max 2 sentences), citing the agile context where relevant."
        );

        let advice = resources.completion.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(advice.trim().to_string())
    }
}
