//! Metadata handlers: service banner, health, companies, stats
//!
//! All read-only passthroughs over the vector store; the registry of
//! ingested companies is external metadata the core queries, never owns.

use crate::AppState;
use axum::{extract::State, Json};
use investiq_common::errors::Result;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub vector_db_connected: bool,
    pub companies_indexed: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_chunks: usize,
    pub total_companies: usize,
    pub companies: Vec<String>,
    pub source_types: Vec<String>,
    pub embedding_model: String,
    pub chunking_method: String,
}

/// Service banner with the endpoint map
pub async fn root() -> Json<Value> {
    Json(json!({
        "title": "InvestIQ API - RAG Pipeline",
        "version": investiq_common::VERSION,
        "description": "Semantic search and AI-generated investment analysis",
        "endpoints": {
            "health": "GET /health - Health check with vector DB status",
            "companies": "GET /companies - List all indexed companies",
            "stats": "GET /stats - Vector store statistics",
            "rag_search": "GET/POST /rag/search - Semantic search through company data",
            "dashboard_rag": "POST /dashboard/rag - Generate investment analysis",
            "chat": "POST /chat - Conversational analyst"
        }
    }))
}

/// Health check. Never fails: a store outage degrades to
/// `vector_db_connected: false`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.store.list_companies().await {
        Ok(companies) => Json(HealthResponse {
            status: "ok".to_string(),
            vector_db_connected: true,
            companies_indexed: companies.len(),
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Vector store unreachable");
            Json(HealthResponse {
                status: "ok".to_string(),
                vector_db_connected: false,
                companies_indexed: 0,
            })
        }
    }
}

/// Sorted list of indexed companies
pub async fn companies(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.store.list_companies().await?))
}

/// Vector store statistics
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.store.stats().await?;
    Ok(Json(StatsResponse {
        total_chunks: stats.total_chunks,
        total_companies: stats.total_companies,
        companies: stats.companies,
        source_types: stats.source_types,
        embedding_model: state.config.embedding.model.clone(),
        chunking_method: "recursive boundary splitter".to_string(),
    }))
}
