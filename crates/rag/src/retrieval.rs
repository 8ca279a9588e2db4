//! Retrieval client
//!
//! Wraps query embedding plus the nearest-neighbor store query and
//! normalizes raw hits into a ranked, quality-annotated sequence.

use investiq_common::errors::Result;
use investiq_common::store::ScoredChunk;
use investiq_common::{metrics, Embedder, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Hard cap on results per query; requests are clamped into [1, MAX_TOP_K]
pub const MAX_TOP_K: usize = 30;

/// Distance below which a hit is "excellent"
pub const EXCELLENT_MAX_DISTANCE: f32 = 1.0;
/// Distance below which a hit is "good"
pub const GOOD_MAX_DISTANCE: f32 = 1.5;
/// Distance below which a hit is "fair"; anything at or above is "poor"
pub const FAIR_MAX_DISTANCE: f32 = 2.0;

/// Quality tier derived purely from distance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    /// Map a raw distance (lower is more similar) to its tier
    pub fn from_distance(distance: f32) -> Self {
        if distance < EXCELLENT_MAX_DISTANCE {
            QualityTier::Excellent
        } else if distance < GOOD_MAX_DISTANCE {
            QualityTier::Good
        } else if distance < FAIR_MAX_DISTANCE {
            QualityTier::Fair
        } else {
            QualityTier::Poor
        }
    }
}

/// One retrieved chunk with its similarity annotation. Created per query,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedResult {
    pub text: String,
    pub source_url: String,
    pub source_type: String,
    pub chunk_index: usize,
    pub crawled_at: String,
    pub chunk_size: usize,
    pub distance: f32,
    pub quality_tier: QualityTier,
}

impl From<ScoredChunk> for RetrievedResult {
    fn from(scored: ScoredChunk) -> Self {
        Self {
            text: scored.record.text,
            source_url: scored.record.source_url,
            source_type: scored.record.source_type,
            chunk_index: scored.record.chunk_index,
            crawled_at: scored.record.crawled_at,
            chunk_size: scored.record.chunk_size,
            distance: scored.distance,
            quality_tier: QualityTier::from_distance(scored.distance),
        }
    }
}

/// Retrieval client over the embedding service and the vector store
pub struct RetrievalClient {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl RetrievalClient {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Semantic search through one company's chunks.
    ///
    /// Returns results in ascending-distance order (ties keep store order).
    /// A company with nothing indexed yields an empty sequence, not an
    /// error; embedding and store failures surface as their own kinds.
    pub async fn search(
        &self,
        company: &str,
        query: &str,
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedResult>> {
        let start = Instant::now();
        let top_k = top_k.clamp(1, MAX_TOP_K);

        let embedding = self.embedder.embed(query).await?;

        // The store only filters by company; fetch extra when a source
        // filter applies and narrow client-side
        let fetch = if source_filter.is_some() {
            top_k * 2
        } else {
            top_k
        };
        let mut scored = self.store.query(company, &embedding, fetch).await?;
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let results: Vec<RetrievedResult> = scored
            .into_iter()
            .filter(|s| {
                source_filter
                    .map(|f| s.record.source_type == f)
                    .unwrap_or(true)
            })
            .take(top_k)
            .map(RetrievedResult::from)
            .collect();

        metrics::record_search(start.elapsed().as_secs_f64(), results.len());
        info!(
            company = %company,
            query = %query,
            top_k,
            results = results.len(),
            "Search completed"
        );

        Ok(results)
    }
}
