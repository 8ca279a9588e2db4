//! Web search client abstraction
//!
//! External search used by the chat router when internal retrieval cannot
//! ground a company question.

use crate::config::WebSearchConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// One web search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSnippet {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Trait for external web search
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebSnippet>>;
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
    url: String,
    #[serde(alias = "content")]
    snippet: String,
}

/// JSON-API web search client
pub struct HttpWebSearchClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    max_results: usize,
}

impl HttpWebSearchClient {
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "web_search.api_key is required when web search is enabled".to_string(),
            })?;
        let api_base = config
            .api_base
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "web_search.api_base is required when web search is enabled".to_string(),
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
            api_base,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearchClient for HttpWebSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<WebSnippet>> {
        let response = self
            .client
            .post(&self.api_base)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&SearchRequest {
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| AppError::WebSearchUnavailable {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WebSearchUnavailable {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::WebSearchUnavailable {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|hit| WebSnippet {
                title: hit.title,
                url: hit.url,
                snippet: hit.snippet,
            })
            .collect())
    }
}

/// Mock web search with fixed snippets, recording the queries it receives
#[derive(Default)]
pub struct MockWebSearchClient {
    snippets: Vec<WebSnippet>,
    queries: Mutex<Vec<String>>,
}

impl MockWebSearchClient {
    pub fn new(snippets: Vec<WebSnippet>) -> Self {
        Self {
            snippets,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearchClient for MockWebSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<WebSnippet>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.snippets.clone())
    }
}
