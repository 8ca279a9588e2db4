//! Error types for InvestIQ services
//!
//! Provides:
//! - Distinct error kinds for the failure modes of the RAG core
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,

    // Resource errors (4xxx)
    CompanyNotFound,

    // External service errors (8xxx)
    EmbeddingUnavailable,
    EmbeddingRateLimited,
    VectorStoreUnavailable,
    GenerationUnavailable,
    GenerationMalformed,
    WebSearchUnavailable,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,

            // Resources (4xxx)
            ErrorCode::CompanyNotFound => 4001,

            // External (8xxx)
            ErrorCode::EmbeddingUnavailable => 8001,
            ErrorCode::EmbeddingRateLimited => 8002,
            ErrorCode::VectorStoreUnavailable => 8003,
            ErrorCode::GenerationUnavailable => 8004,
            ErrorCode::GenerationMalformed => 8005,
            ErrorCode::WebSearchUnavailable => 8006,
            ErrorCode::UpstreamError => 8007,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors - rejected before any external call
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    // Resource errors
    #[error("Company not found in the index: {company}")]
    CompanyNotFound { company: String },

    // External service errors
    #[error("Embedding service unavailable: {message}")]
    EmbeddingUnavailable { message: String },

    #[error("Embedding service rate limited")]
    EmbeddingRateLimited,

    #[error("Vector store unavailable: {message}")]
    VectorStoreUnavailable { message: String },

    #[error("Generation service unavailable: {message}")]
    GenerationUnavailable { message: String },

    #[error("Generation output malformed: {message}")]
    GenerationMalformed { message: String },

    #[error("Web search unavailable: {message}")]
    WebSearchUnavailable { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::CompanyNotFound { .. } => ErrorCode::CompanyNotFound,
            AppError::EmbeddingUnavailable { .. } => ErrorCode::EmbeddingUnavailable,
            AppError::EmbeddingRateLimited => ErrorCode::EmbeddingRateLimited,
            AppError::VectorStoreUnavailable { .. } => ErrorCode::VectorStoreUnavailable,
            AppError::GenerationUnavailable { .. } => ErrorCode::GenerationUnavailable,
            AppError::GenerationMalformed { .. } => ErrorCode::GenerationMalformed,
            AppError::WebSearchUnavailable { .. } => ErrorCode::WebSearchUnavailable,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::MissingField { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::CompanyNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::GenerationMalformed { .. } | AppError::HttpClient(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 503 Service Unavailable - a user-facing request cannot wait
            AppError::EmbeddingUnavailable { .. }
            | AppError::EmbeddingRateLimited
            | AppError::VectorStoreUnavailable { .. }
            | AppError::GenerationUnavailable { .. }
            | AppError::WebSearchUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// True when the upstream condition may clear on its own; callers that
    /// are allowed a retry (generation, ingestion batches) key off this.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::EmbeddingUnavailable { .. }
                | AppError::EmbeddingRateLimited
                | AppError::VectorStoreUnavailable { .. }
                | AppError::GenerationUnavailable { .. }
                | AppError::WebSearchUnavailable { .. }
                | AppError::HttpClient(_)
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::CompanyNotFound {
            company: "acme".into(),
        };
        assert_eq!(err.code(), ErrorCode::CompanyNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "top_k out of range".into(),
            field: Some("top_k".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_errors_are_transient() {
        assert!(AppError::EmbeddingRateLimited.is_transient());
        assert!(AppError::GenerationUnavailable {
            message: "timeout".into()
        }
        .is_transient());
        assert!(!AppError::Validation {
            message: "bad".into(),
            field: None
        }
        .is_transient());
    }

    #[test]
    fn test_distinct_upstream_kinds() {
        // Embedding and store failures must stay distinguishable
        let embed = AppError::EmbeddingUnavailable {
            message: "down".into(),
        };
        let store = AppError::VectorStoreUnavailable {
            message: "down".into(),
        };
        assert_ne!(embed.code(), store.code());
        assert_eq!(embed.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(store.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
