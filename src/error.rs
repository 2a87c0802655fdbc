//! Error taxonomy for the advice pipeline
//!
//! Every variant stays internal to the crate: the orchestrator collapses
//! all of them into the degraded fallback string at its outer boundary.

use thiserror::Error;

/// Which cached resource failed to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Embedding,
    Index,
    Credentials,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Embedding => write!(f, "embedding model"),
            Resource::Index => write!(f, "vector index"),
            Resource::Credentials => write!(f, "API credentials"),
        }
    }
}

/// Errors that can occur inside the RAG advice pipeline.
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// A cached resource could not be constructed (missing index files,
    /// missing credentials, embedding backend down).
    #[error("resource unavailable ({resource}): {reason}")]
    ResourceUnavailable { resource: Resource, reason: String },

    /// Retrieval was attempted without a usable index.
    #[error("vector index not loaded; run the build_index job first")]
    IndexNotLoaded,

    /// The completion call errored, timed out, or returned nothing usable.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl AdvisorError {
    pub fn unavailable(resource: Resource, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            resource,
            reason: reason.into(),
        }
    }

    /// Short label for structured logging at the degradation boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceUnavailable {
                resource: Resource::Embedding,
                ..
            } => "resource_unavailable.embedding",
            Self::ResourceUnavailable {
                resource: Resource::Index,
                ..
            } => "resource_unavailable.index",
            Self::ResourceUnavailable {
                resource: Resource::Credentials,
                ..
            } => "resource_unavailable.credentials",
            Self::IndexNotLoaded => "index_not_loaded",
            Self::GenerationFailed(_) => "generation_failed",
        }
    }
}
