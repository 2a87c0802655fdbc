//! Offline index construction job
//!
//! Reads the plain-text agile reference guide, splits it into overlapping
//! chunks, embeds them with the same MiniLM model the query path uses,
//! and writes the index artifact the advisor loads at runtime.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use sprintsense_advisor::chunker::split_text;
use sprintsense_advisor::embedding::MiniLmEmbedder;
use sprintsense_advisor::index::{source_digest, VectorIndex};
use sprintsense_advisor::AdvisorConfig;

const CHUNK_SIZE: usize = 500;
const CHUNK_OVERLAP: usize = 50;
const DEFAULT_SOURCE: &str = "data/scrum_guide.txt";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let source_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    let config = AdvisorConfig::from_env();

    if !Path::new(&source_path).exists() {
        anyhow::bail!("reference document not found at {source_path}");
    }

    info!("Loading reference document from {source_path}...");
    let text = std::fs::read_to_string(&source_path)
        .with_context(|| format!("failed to read {source_path}"))?;

    let chunks = split_text(&text, CHUNK_SIZE, CHUNK_OVERLAP);
    info!("Split into {} chunks", chunks.len());
    if chunks.is_empty() {
        anyhow::bail!("reference document produced no indexable chunks");
    }

    let embedder = MiniLmEmbedder::new().context("failed to initialize embedding model")?;
    let index = VectorIndex::build(chunks, &embedder, source_digest(&text))
        .await
        .context("failed to embed chunks")?;

    index
        .save(&config.index_path)
        .with_context(|| format!("failed to save index to {:?}", config.index_path))?;

    info!(
        "Index build complete: {} chunks at {:?}",
        index.len(),
        config.index_path
    );
    Ok(())
}
