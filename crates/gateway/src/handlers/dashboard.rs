//! Dashboard generation handlers

use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use investiq_common::errors::{AppError, Result};
use investiq_common::llm::GenerationParams;
use investiq_rag::context::{build_context, SourceFragment};
use investiq_rag::dashboard::retrieve_dashboard_context;
use investiq_rag::generate::DASHBOARD_TEMPERATURE;
use investiq_rag::DashboardResult;
use serde::Deserialize;
use validator::Validate;

/// Dashboard request (POST body; the GET form carries the same fields as
/// path + query parameters)
#[derive(Debug, Deserialize, Validate)]
pub struct DashboardRequest {
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,

    #[serde(default = "default_top_k")]
    #[validate(range(min = 5, max = 30))]
    pub top_k: usize,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1000, max = 8000))]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,

    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DashboardQuery {
    #[serde(default = "default_top_k")]
    #[validate(range(min = 5, max = 30))]
    pub top_k: usize,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1000, max = 8000))]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,

    #[serde(default)]
    pub model: Option<String>,
}

fn default_top_k() -> usize {
    15
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_temperature() -> f32 {
    DASHBOARD_TEMPERATURE
}

/// Generate an investment analysis dashboard (POST)
pub async fn dashboard_post(
    State(state): State<AppState>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<DashboardResult>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    run_dashboard(state, request).await
}

/// Generate an investment analysis dashboard (GET)
pub async fn dashboard_get(
    State(state): State<AppState>,
    Path(company_name): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResult>> {
    let request = DashboardRequest {
        company_name,
        top_k: query.top_k,
        max_tokens: query.max_tokens,
        temperature: query.temperature,
        model: query.model,
    };
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    run_dashboard(state, request).await
}

async fn run_dashboard(
    state: AppState,
    request: DashboardRequest,
) -> Result<Json<DashboardResult>> {
    let chunks =
        retrieve_dashboard_context(&state.retrieval, &request.company_name, request.top_k).await?;

    // An indexed company always yields some chunks, so nothing retrieved
    // means the company is absent from the index
    if chunks.is_empty() {
        let indexed = state.store.list_companies().await?;
        if !indexed.contains(&request.company_name) {
            return Err(AppError::CompanyNotFound {
                company: request.company_name,
            });
        }
    }

    let context = build_context(
        chunks.iter().map(SourceFragment::from),
        state.config.retrieval.dashboard_token_budget,
    );

    let params = GenerationParams {
        model: request
            .model
            .unwrap_or_else(|| state.config.generation.model.clone()),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let mut result = state
        .orchestrator
        .generate_dashboard(&request.company_name, &context, &params)
        .await?;
    // The orchestrator only sees what fit the budget; report what retrieval
    // actually produced
    result.metadata.chunks_retrieved = chunks.len();

    Ok(Json(result))
}
