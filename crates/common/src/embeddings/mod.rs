//! Embedding service abstraction
//!
//! Provides a unified interface over the external embedding provider plus a
//! deterministic mock for tests. Requests are single-shot: the one permitted
//! rate-limit retry during ingestion belongs to the ingestion processor, and
//! query-time failures are surfaced immediately.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (one batch, one request)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embedder from configuration
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key is required".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
        })
    }

    async fn make_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
            dimensions: self.dimension,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmbeddingUnavailable {
                message: format!("Request failed: {}", e),
            })?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::EmbeddingRateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbeddingUnavailable {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::EmbeddingUnavailable {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if result.data.len() != texts.len() {
            return Err(AppError::EmbeddingUnavailable {
                message: format!(
                    "Expected {} embeddings, got {}",
                    texts.len(),
                    result.data.len()
                ),
            });
        }

        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.make_request(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingUnavailable {
                message: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.make_request(texts).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic mock embedder for testing.
///
/// Same input always yields the same vector; a fixed vector can be pinned
/// for tests that need controlled distances.
pub struct MockEmbedder {
    dimension: usize,
    fixed: Option<Vec<f32>>,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: None,
        }
    }

    /// Return this vector for every input
    pub fn with_fixed(vector: Vec<f32>) -> Self {
        Self {
            dimension: vector.len(),
            fixed: Some(vector),
        }
    }

    fn derive(&self, text: &str) -> Vec<f32> {
        if let Some(v) = &self.fixed {
            return v.clone();
        }
        // Cheap byte-fold so distinct texts map to distinct directions
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for b in text.bytes() {
            state = (state ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3);
        }
        (0..self.dimension)
            .map(|i| {
                let x = state.wrapping_add(i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
                ((x >> 33) as f32 / u32::MAX as f32) - 0.5
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.derive(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.derive(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new(384);
        let a = embedder.embed("acme funding round").await.unwrap();
        let b = embedder.embed("acme funding round").await.unwrap();
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);

        let c = embedder.embed("different text").await.unwrap();
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_mock_batch() {
        let embedder = MockEmbedder::new(8);
        let texts = vec!["text1".to_string(), "text2".to_string()];
        let embeddings = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 8);
    }

    #[tokio::test]
    async fn test_fixed_vector() {
        let embedder = MockEmbedder::with_fixed(vec![0.0, 1.0, 0.0]);
        assert_eq!(embedder.dimension(), 3);
        let v = embedder.embed("anything").await.unwrap();
        assert_eq!(v, vec![0.0, 1.0, 0.0]);
    }
}
