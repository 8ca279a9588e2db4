//! Vector store client abstraction
//!
//! The vector store is an external, already-concurrent-safe collaborator.
//! This module defines the per-chunk record shape it persists, the client
//! trait the core talks through, an HTTP implementation for a hosted
//! tenant/database/collection store, and an exact in-memory implementation
//! for tests.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;

/// A persisted chunk record. Immutable once stored; re-ingestion supersedes
/// records under fresh identifiers rather than mutating them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// Deterministic identity digest (see ingestion::identity)
    pub id: String,
    pub company: String,
    pub source_type: String,
    pub source_url: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub text: String,
    /// RFC 3339 crawl timestamp shared by the whole ingestion run
    pub crawled_at: String,
    /// Always equals the chunk's character count
    pub chunk_size: usize,
}

/// A chunk returned from a similarity query, with its raw distance
/// (lower means more similar).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// Store-wide statistics, surfaced read-only through /stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub total_companies: usize,
    pub companies: Vec<String>,
    pub source_types: Vec<String>,
}

/// Client trait for the external vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunks by id, with their embeddings
    async fn upsert(&self, chunks: Vec<ChunkRecord>, embeddings: Vec<Vec<f32>>) -> Result<()>;

    /// Nearest-neighbor query restricted to one company, ascending distance
    async fn query(
        &self,
        company: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Delete all chunks for a company (forced refresh / prune)
    async fn delete_company(&self, company: &str) -> Result<()>;

    /// Companies present in the index, sorted
    async fn list_companies(&self) -> Result<Vec<String>>;

    /// Aggregate statistics
    async fn stats(&self) -> Result<StoreStats>;

    /// Connectivity check
    async fn ping(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Chunk metadata as persisted alongside each document
#[derive(Debug, Serialize, Deserialize)]
struct ChunkMetadata {
    company_name: String,
    source_type: String,
    source_url: String,
    chunk_index: usize,
    total_chunks: usize,
    crawled_at: String,
    chunk_size: usize,
}

#[derive(Serialize)]
struct UpsertRequest {
    ids: Vec<String>,
    documents: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<ChunkMetadata>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    #[serde(rename = "where")]
    where_filter: serde_json::Value,
    include: Vec<&'static str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    documents: Vec<Vec<String>>,
    metadatas: Vec<Vec<ChunkMetadata>>,
    distances: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct DeleteRequest {
    #[serde(rename = "where")]
    where_filter: serde_json::Value,
}

#[derive(Serialize)]
struct GetRequest {
    include: Vec<&'static str>,
}

#[derive(Deserialize)]
struct GetResponse {
    metadatas: Vec<ChunkMetadata>,
}

/// HTTP client for a hosted vector store with a
/// tenant / database / collection layout.
pub struct HttpVectorStore {
    client: reqwest::Client,
    collection_url: String,
    heartbeat_url: String,
    api_key: Option<String>,
}

impl HttpVectorStore {
    pub fn new(config: &crate::config::VectorStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base = config.url.trim_end_matches('/');
        Ok(Self {
            client,
            collection_url: format!(
                "{}/api/v2/tenants/{}/databases/{}/collections/{}",
                base, config.tenant, config.database, config.collection
            ),
            heartbeat_url: format!("{}/api/v2/heartbeat", base),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        builder
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.collection_url, path);
        let response = self.request(&url).json(body).send().await.map_err(|e| {
            AppError::VectorStoreUnavailable {
                message: format!("Request failed: {}", e),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable {
                message: format!("Store error {}: {}", status, body),
            });
        }
        Ok(response)
    }

    fn record_from(id: String, document: String, meta: ChunkMetadata) -> ChunkRecord {
        ChunkRecord {
            id,
            company: meta.company_name,
            source_type: meta.source_type,
            source_url: meta.source_url,
            chunk_index: meta.chunk_index,
            total_chunks: meta.total_chunks,
            text: document,
            crawled_at: meta.crawled_at,
            chunk_size: meta.chunk_size,
        }
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(&self, chunks: Vec<ChunkRecord>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Internal {
                message: format!(
                    "Chunk/embedding count mismatch: {} vs {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(chunks.len());
        let mut documents = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            ids.push(chunk.id);
            documents.push(chunk.text);
            metadatas.push(ChunkMetadata {
                company_name: chunk.company,
                source_type: chunk.source_type,
                source_url: chunk.source_url,
                chunk_index: chunk.chunk_index,
                total_chunks: chunk.total_chunks,
                crawled_at: chunk.crawled_at,
                chunk_size: chunk.chunk_size,
            });
        }

        self.post_json(
            "upsert",
            &UpsertRequest {
                ids,
                documents,
                embeddings,
                metadatas,
            },
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        company: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let response = self
            .post_json(
                "query",
                &QueryRequest {
                    query_embeddings: vec![embedding],
                    n_results: limit,
                    where_filter: serde_json::json!({ "company_name": company }),
                    include: vec!["documents", "metadatas", "distances"],
                },
            )
            .await?;

        let mut parsed: QueryResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::VectorStoreUnavailable {
                    message: format!("Failed to parse query response: {}", e),
                })?;

        // One query embedding in, one result row out
        if parsed.ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = parsed.ids.remove(0);
        let documents = parsed.documents.remove(0);
        let metadatas = parsed.metadatas.remove(0);
        let distances = parsed.distances.remove(0);

        Ok(ids
            .into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(distances)
            .map(|(((id, document), meta), distance)| ScoredChunk {
                record: Self::record_from(id, document, meta),
                distance,
            })
            .collect())
    }

    async fn delete_company(&self, company: &str) -> Result<()> {
        self.post_json(
            "delete",
            &DeleteRequest {
                where_filter: serde_json::json!({ "company_name": company }),
            },
        )
        .await?;
        Ok(())
    }

    async fn list_companies(&self) -> Result<Vec<String>> {
        Ok(self.stats().await?.companies)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let response = self
            .post_json(
                "get",
                &GetRequest {
                    include: vec!["metadatas"],
                },
            )
            .await?;

        let parsed: GetResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::VectorStoreUnavailable {
                    message: format!("Failed to parse get response: {}", e),
                })?;

        let mut companies = BTreeSet::new();
        let mut source_types = BTreeSet::new();
        for meta in &parsed.metadatas {
            companies.insert(meta.company_name.clone());
            source_types.insert(meta.source_type.clone());
        }

        Ok(StoreStats {
            total_chunks: parsed.metadatas.len(),
            total_companies: companies.len(),
            companies: companies.into_iter().collect(),
            source_types: source_types.into_iter().collect(),
        })
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.heartbeat_url)
            .send()
            .await
            .map_err(|e| AppError::VectorStoreUnavailable {
                message: format!("Heartbeat failed: {}", e),
            })?;
        if !response.status().is_success() {
            return Err(AppError::VectorStoreUnavailable {
                message: format!("Heartbeat status {}", response.status()),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests)
// ---------------------------------------------------------------------------

/// Exact in-memory vector store for tests. Distances are squared L2,
/// matching the hosted store's default space.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: Mutex<HashMap<String, (ChunkRecord, Vec<f32>)>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a record by id
    pub fn get(&self, id: &str) -> Option<ChunkRecord> {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .map(|(record, _)| record.clone())
    }

    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunks: Vec<ChunkRecord>, embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Internal {
                message: "Chunk/embedding count mismatch".to_string(),
            });
        }
        let mut entries = self.entries.lock().unwrap();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            entries.insert(chunk.id.clone(), (chunk, embedding));
        }
        Ok(())
    }

    async fn query(
        &self,
        company: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let entries = self.entries.lock().unwrap();
        let mut scored: Vec<ScoredChunk> = entries
            .values()
            .filter(|(record, _)| record.company == company)
            .map(|(record, stored)| ScoredChunk {
                record: record.clone(),
                distance: Self::squared_l2(embedding, stored),
            })
            .collect();
        // Stable: ties keep store order
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_company(&self, company: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|_, (record, _)| record.company != company);
        Ok(())
    }

    async fn list_companies(&self) -> Result<Vec<String>> {
        let entries = self.entries.lock().unwrap();
        let companies: BTreeSet<String> = entries
            .values()
            .map(|(record, _)| record.company.clone())
            .collect();
        Ok(companies.into_iter().collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let entries = self.entries.lock().unwrap();
        let mut companies = BTreeSet::new();
        let mut source_types = BTreeSet::new();
        for (record, _) in entries.values() {
            companies.insert(record.company.clone());
            source_types.insert(record.source_type.clone());
        }
        Ok(StoreStats {
            total_chunks: entries.len(),
            total_companies: companies.len(),
            companies: companies.into_iter().collect(),
            source_types: source_types.into_iter().collect(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, company: &str, source_type: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            company: company.to_string(),
            source_type: source_type.to_string(),
            source_url: format!("https://{}.com/{}", company, source_type),
            chunk_index: 0,
            total_chunks: 1,
            text: text.to_string(),
            crawled_at: "2026-01-15T00:00:00Z".to_string(),
            chunk_size: text.chars().count(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_query_ordering() {
        let store = MemoryVectorStore::new();
        store
            .upsert(
                vec![
                    record("a", "acme", "homepage", "near"),
                    record("b", "acme", "about", "far"),
                    record("c", "other", "homepage", "other company"),
                ],
                vec![vec![0.1, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]],
            )
            .await
            .unwrap();

        let results = store.query("acme", &[0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "a");
        assert!(results[0].distance < results[1].distance);
    }

    #[tokio::test]
    async fn test_memory_store_upsert_overwrites() {
        let store = MemoryVectorStore::new();
        store
            .upsert(vec![record("a", "acme", "homepage", "v1")], vec![vec![0.0]])
            .await
            .unwrap();
        store
            .upsert(vec![record("a", "acme", "homepage", "v2")], vec![vec![0.0]])
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().text, "v2");
    }

    #[tokio::test]
    async fn test_memory_store_delete_company() {
        let store = MemoryVectorStore::new();
        store
            .upsert(
                vec![
                    record("a", "acme", "homepage", "x"),
                    record("b", "zen", "homepage", "y"),
                ],
                vec![vec![0.0], vec![0.0]],
            )
            .await
            .unwrap();
        store.delete_company("acme").await.unwrap();
        assert_eq!(store.list_companies().await.unwrap(), vec!["zen"]);
    }

    #[tokio::test]
    async fn test_memory_store_stats() {
        let store = MemoryVectorStore::new();
        store
            .upsert(
                vec![
                    record("a", "acme", "homepage", "x"),
                    record("b", "acme", "about", "y"),
                ],
                vec![vec![0.0], vec![0.0]],
            )
            .await
            .unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_companies, 1);
        assert_eq!(stats.source_types, vec!["about", "homepage"]);
    }
}
