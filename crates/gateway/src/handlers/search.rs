//! RAG search handlers

use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use investiq_rag::RetrievedResult;
use investiq_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Search request, shared by the GET and POST forms
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,

    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 30))]
    pub top_k: usize,

    #[serde(default)]
    pub filter_source: Option<String>,
}

fn default_top_k() -> usize {
    5
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub company_name: String,
    pub query: String,
    pub results: Vec<RetrievedResult>,
    pub total_results: usize,
}

/// Semantic search through company data (POST)
pub async fn search_post(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    run_search(state, request).await
}

/// Semantic search through company data (GET)
pub async fn search_get(
    State(state): State<AppState>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    run_search(state, request).await
}

async fn run_search(state: AppState, request: SearchRequest) -> Result<Json<SearchResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    // UI placeholders arrive as literal sentinel strings
    let filter = request
        .filter_source
        .as_deref()
        .filter(|f| !matches!(*f, "" | "string" | "null"));

    let results = state
        .retrieval
        .search(&request.company_name, &request.query, request.top_k, filter)
        .await?;

    Ok(Json(SearchResponse {
        company_name: request.company_name,
        query: request.query,
        total_results: results.len(),
        results,
    }))
}
