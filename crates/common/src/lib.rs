//! InvestIQ Common Library
//!
//! Shared code for the InvestIQ services including:
//! - Error types and HTTP error responses
//! - Configuration management
//! - Embedding client abstraction
//! - Vector store client abstraction
//! - Chat completion (LLM) client abstraction
//! - Web search client abstraction
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod store;
pub mod websearch;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::ChatClient;
pub use store::VectorStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Default generation model
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o";
