//! SprintSense Advisor
//!
//! Retrieval-augmented advice core for the SprintSense cognitive-load
//! platform:
//! - Local MiniLM embeddings (fastembed)
//! - Pre-built vector index over an agile reference guide
//! - Groq completion client for grounded recommendations
//! - Lazy resource cache and graceful degradation on any failure

pub mod advisor;
pub mod chunker;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod resources;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience
pub use advisor::{Advisor, DEGRADED_ADVICE};
pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use index::{ReferenceChunk, VectorIndex};
pub use resources::ResourceCache;
