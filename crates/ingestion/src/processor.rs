//! Ingestion processor
//!
//! Core logic for turning scraped company sources into stored chunks:
//! chunking, identity assignment, batched embedding, and the store write.
//! Idempotent at the granularity of one company: re-running a run with the
//! same crawl timestamps overwrites the same identifiers.

use crate::chunker::chunk;
use crate::identity::chunk_id;
use chrono::{DateTime, SecondsFormat, Utc};
use investiq_common::config::{ChunkingConfig, EmbeddingConfig};
use investiq_common::errors::{AppError, Result};
use investiq_common::store::ChunkRecord;
use investiq_common::{metrics, Embedder, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// One scraped source page for a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source_type: String,
    pub source_url: String,
    pub text: String,
    pub crawled_at: DateTime<Utc>,
}

/// Ingestion run statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub company: String,
    pub sources_processed: usize,
    pub chunks_created: usize,
    pub chunks_stored: usize,
    pub errors: Vec<String>,
}

/// Ingestion processor
pub struct IngestionProcessor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunking: ChunkingConfig,
    batch_size: usize,
    rate_limit_backoff: Duration,
}

impl IngestionProcessor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunking: ChunkingConfig,
        embedding: &EmbeddingConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            chunking,
            batch_size: embedding.batch_size.max(1),
            rate_limit_backoff: Duration::from_secs(embedding.rate_limit_backoff_secs),
        }
    }

    /// Override the rate-limit backoff (tests)
    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Ingest all sources for one company.
    ///
    /// Chunks every source, drops fragments below the minimum content
    /// length, embeds in batches, and writes everything in a single upsert
    /// once all batches succeeded - an interrupted run leaves no partial
    /// state under fresh identifiers.
    #[instrument(skip(self, sources), fields(company = %company, sources = sources.len()))]
    pub async fn ingest_company(
        &self,
        company: &str,
        sources: Vec<SourceDocument>,
        force_refresh: bool,
    ) -> Result<IngestStats> {
        let start = Instant::now();

        let mut stats = IngestStats {
            company: company.to_string(),
            sources_processed: 0,
            chunks_created: 0,
            chunks_stored: 0,
            errors: Vec::new(),
        };

        if force_refresh {
            info!("Force refresh: deleting existing chunks");
            self.store.delete_company(company).await?;
        }

        let mut records = Vec::new();
        for source in &sources {
            if source.text.trim().is_empty() {
                stats
                    .errors
                    .push(format!("{}: skipped (empty text)", source.source_type));
                continue;
            }

            let pieces = chunk(
                &source.text,
                self.chunking.chunk_size,
                self.chunking.chunk_overlap,
            );
            stats.chunks_created += pieces.len();

            // Fragments below the minimum content length are dropped here,
            // and the survivors re-indexed 0..n
            let kept: Vec<String> = pieces
                .into_iter()
                .filter(|p| p.chars().count() >= self.chunking.min_chunk_chars)
                .collect();

            if kept.is_empty() {
                stats.errors.push(format!(
                    "{}: skipped (no chunks above minimum length)",
                    source.source_type
                ));
                continue;
            }

            let crawled_at = source
                .crawled_at
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            let total_chunks = kept.len();
            for (chunk_index, text) in kept.into_iter().enumerate() {
                let chunk_size = text.chars().count();
                records.push(ChunkRecord {
                    id: chunk_id(company, &source.source_type, chunk_index, &crawled_at),
                    company: company.to_string(),
                    source_type: source.source_type.clone(),
                    source_url: source.source_url.clone(),
                    chunk_index,
                    total_chunks,
                    text,
                    crawled_at: crawled_at.clone(),
                    chunk_size,
                });
            }

            stats.sources_processed += 1;
        }

        if records.is_empty() {
            info!("No chunks to store");
            return Ok(stats);
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embed_batch_with_retry(batch).await?);
        }

        stats.chunks_stored = records.len();
        self.store.upsert(records, embeddings).await?;

        let elapsed = start.elapsed().as_secs_f64();
        metrics::record_ingestion(elapsed, stats.chunks_stored);
        info!(
            sources = stats.sources_processed,
            chunks_created = stats.chunks_created,
            chunks_stored = stats.chunks_stored,
            elapsed_secs = elapsed,
            "Company ingested"
        );

        Ok(stats)
    }

    /// Embed one batch, retrying exactly once after a fixed backoff when the
    /// embedding service signals a rate limit.
    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.embedder.embed_batch(batch).await {
            Err(AppError::EmbeddingRateLimited) => {
                warn!(
                    backoff_secs = self.rate_limit_backoff.as_secs_f64(),
                    "Embedding batch rate limited, backing off"
                );
                tokio::time::sleep(self.rate_limit_backoff).await;
                self.embedder.embed_batch(batch).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use investiq_common::embeddings::MockEmbedder;
    use investiq_common::store::MemoryVectorStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunking() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_chars: 50,
        }
    }

    fn embedding_config() -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: None,
            api_base: None,
            model: "mock".to_string(),
            dimension: 8,
            timeout_secs: 5,
            batch_size: 50,
            rate_limit_backoff_secs: 60,
        }
    }

    fn homepage(text: &str) -> SourceDocument {
        SourceDocument {
            source_type: "homepage".to_string(),
            source_url: "https://acme.com/".to_string(),
            text: text.to_string(),
            crawled_at: "2026-01-15T08:30:00Z".parse().unwrap(),
        }
    }

    fn processor(store: Arc<MemoryVectorStore>) -> IngestionProcessor {
        IngestionProcessor::new(
            Arc::new(MockEmbedder::new(8)),
            store,
            chunking(),
            &embedding_config(),
        )
    }

    #[tokio::test]
    async fn test_homepage_text_yields_four_indexed_chunks() {
        let store = Arc::new(MemoryVectorStore::new());
        let text = "data ".repeat(600); // 3000 chars
        let stats = processor(store.clone())
            .ingest_company("acme", vec![homepage(&text)], false)
            .await
            .unwrap();

        assert_eq!(stats.sources_processed, 1);
        assert_eq!(stats.chunks_stored, 4);
        assert_eq!(store.len(), 4);

        let mut records: Vec<_> = store
            .query("acme", &[0.0; 8], 10)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.record)
            .collect();
        records.sort_by_key(|r| r.chunk_index);

        let indices: Vec<usize> = records.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        for record in &records {
            assert_eq!(record.total_chunks, 4);
            assert_eq!(record.chunk_size, record.text.chars().count());
            assert_eq!(record.crawled_at, "2026-01-15T08:30:00Z");
        }

        // Concatenation minus overlaps reproduces the source
        let mut rebuilt = records[0].text.clone();
        for pair in records.windows(2) {
            rebuilt.extend(pair[1].text.chars().skip(200));
        }
        assert_eq!(rebuilt, text);
    }

    #[tokio::test]
    async fn test_same_run_is_idempotent() {
        let store = Arc::new(MemoryVectorStore::new());
        let proc = processor(store.clone());
        let text = "data ".repeat(600);

        proc.ingest_company("acme", vec![homepage(&text)], false)
            .await
            .unwrap();
        // Retry of the same run: same timestamps, same ids, overwrite
        proc.ingest_company("acme", vec![homepage(&text)], false)
            .await
            .unwrap();
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_refresh_run_coexists_until_force_refresh() {
        let store = Arc::new(MemoryVectorStore::new());
        let proc = processor(store.clone());
        let text = "data ".repeat(600);

        proc.ingest_company("acme", vec![homepage(&text)], false)
            .await
            .unwrap();

        let mut refreshed = homepage(&text);
        refreshed.crawled_at = "2026-02-20T10:00:00Z".parse().unwrap();

        // A later run gets fresh ids and coexists with the old chunks
        proc.ingest_company("acme", vec![refreshed.clone()], false)
            .await
            .unwrap();
        assert_eq!(store.len(), 8);

        // Forced refresh prunes before storing
        proc.ingest_company("acme", vec![refreshed], true)
            .await
            .unwrap();
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_short_fragments_dropped_and_reindexed() {
        let store = Arc::new(MemoryVectorStore::new());
        let proc = IngestionProcessor::new(
            Arc::new(MockEmbedder::new(8)),
            store.clone(),
            ChunkingConfig {
                chunk_size: 100,
                chunk_overlap: 10,
                min_chunk_chars: 50,
            },
            &embedding_config(),
        );

        // First paragraph chunks to 42 chars (dropped), tail to 100 (kept)
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(90));
        let stats = proc
            .ingest_company("acme", vec![homepage(&text)], false)
            .await
            .unwrap();

        assert_eq!(stats.chunks_created, 2);
        assert_eq!(stats.chunks_stored, 1);
        let records = store.query("acme", &[0.0; 8], 10).await.unwrap();
        assert_eq!(records[0].record.chunk_index, 0);
        assert_eq!(records[0].record.total_chunks, 1);
    }

    #[tokio::test]
    async fn test_empty_sources_skipped_with_note() {
        let store = Arc::new(MemoryVectorStore::new());
        let stats = processor(store.clone())
            .ingest_company("acme", vec![homepage("   \n ")], false)
            .await
            .unwrap();
        assert_eq!(stats.sources_processed, 0);
        assert_eq!(stats.chunks_stored, 0);
        assert_eq!(stats.errors.len(), 1);
        assert!(store.is_empty());
    }

    /// Embedder that rate-limits a configured number of calls before
    /// delegating to the deterministic mock.
    struct RateLimitedEmbedder {
        inner: MockEmbedder,
        failures_left: AtomicUsize,
    }

    impl RateLimitedEmbedder {
        fn new(failures: usize) -> Self {
            Self {
                inner: MockEmbedder::new(8),
                failures_left: AtomicUsize::new(failures),
            }
        }
    }

    #[async_trait]
    impl Embedder for RateLimitedEmbedder {
        async fn embed(&self, text: &str) -> investiq_common::Result<Vec<f32>> {
            self.embed_batch(std::slice::from_ref(&text.to_string()))
                .await
                .map(|mut v| v.remove(0))
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> investiq_common::Result<Vec<Vec<f32>>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::EmbeddingRateLimited);
            }
            self.inner.embed_batch(texts).await
        }

        fn model_name(&self) -> &str {
            "rate-limited-mock"
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_batch_retried_once() {
        let store = Arc::new(MemoryVectorStore::new());
        let proc = IngestionProcessor::new(
            Arc::new(RateLimitedEmbedder::new(1)),
            store.clone(),
            chunking(),
            &embedding_config(),
        );

        let stats = proc
            .ingest_company("acme", vec![homepage(&"data ".repeat(600))], false)
            .await
            .unwrap();
        assert_eq!(stats.chunks_stored, 4);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_fails_run() {
        let store = Arc::new(MemoryVectorStore::new());
        let proc = IngestionProcessor::new(
            Arc::new(RateLimitedEmbedder::new(2)),
            store.clone(),
            chunking(),
            &embedding_config(),
        );

        let result = proc
            .ingest_company("acme", vec![homepage(&"data ".repeat(600))], false)
            .await;
        assert!(matches!(result, Err(AppError::EmbeddingRateLimited)));
        // Nothing was written
        assert!(store.is_empty());
    }
}
