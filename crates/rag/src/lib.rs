//! InvestIQ RAG core
//!
//! The retrieval-and-generation orchestration layer:
//! - Retrieval client with distance-based quality tiering
//! - Token-budgeted, source-attributed context assembly
//! - Per-turn routing between internal retrieval and external web search
//! - Prompt construction and generation orchestration for dashboards and chat

pub mod context;
pub mod dashboard;
pub mod generate;
pub mod prompts;
pub mod retrieval;
pub mod router;

pub use context::{build_context, ContextBlock, ContextFragment, SourceFragment};
pub use generate::{ChatResult, DashboardResult, GenerationOrchestrator};
pub use retrieval::{QualityTier, RetrievalClient, RetrievedResult};
pub use router::{matches_company_intent, RouteDecision, Router};
