//! Chat handler
//!
//! One stateless turn: the router picks the grounding (retrieval, web, or
//! none), the assembler builds a budgeted context from the evidence, and the
//! orchestrator generates the answer. Conversation history belongs to the
//! caller and is never persisted here.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use investiq_common::errors::{AppError, Result};
use investiq_common::llm::{ChatMessage, GenerationParams};
use investiq_common::websearch::WebSnippet;
use investiq_rag::context::{build_context, ContextBlock, SourceFragment};
use investiq_rag::generate::{CHAT_MAX_TOKENS, CHAT_TEMPERATURE};
use investiq_rag::{RetrievedResult, RouteDecision};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Chat request for one conversational turn
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,

    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,

    #[validate(length(min = 1, max = 200))]
    pub company_name: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,

    #[serde(default)]
    pub enable_web_search: bool,
}

fn default_temperature() -> f32 {
    CHAT_TEMPERATURE
}

/// Chat response, annotated with the evidence the router used
#[derive(Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub used_retrieval: bool,
    pub used_web_search: bool,
    pub chunks_retrieved: usize,
    pub chunks: Vec<RetrievedResult>,
    pub web_sources: Vec<WebSnippet>,
    pub tokens_used: u32,
}

/// Answer one chat turn
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let decision = state
        .router
        .route(
            &request.company_name,
            &request.message,
            request.enable_web_search,
        )
        .await?;

    let budget = state.config.chat.context_token_budget;
    let (context, chunks, web_sources) = match &decision {
        RouteDecision::Rag(results) => (
            Some(build_context(results.iter().map(SourceFragment::from), budget)),
            results.clone(),
            Vec::new(),
        ),
        RouteDecision::Web(snippets) => (
            Some(build_context(snippets.iter().map(SourceFragment::from), budget)),
            Vec::new(),
            snippets.clone(),
        ),
        RouteDecision::NoContext => (None::<ContextBlock>, Vec::new(), Vec::new()),
    };

    let params = GenerationParams {
        model: request
            .model
            .unwrap_or_else(|| state.config.generation.model.clone()),
        temperature: request.temperature,
        max_tokens: CHAT_MAX_TOKENS,
    };

    let result = state
        .orchestrator
        .generate_chat(
            &request.message,
            &request.conversation_history,
            context.as_ref(),
            &params,
        )
        .await?;

    Ok(Json(ChatResponse {
        message: result.message,
        used_retrieval: matches!(&decision, RouteDecision::Rag(_)),
        used_web_search: matches!(&decision, RouteDecision::Web(_)),
        chunks_retrieved: chunks.len(),
        chunks,
        web_sources,
        tokens_used: result.tokens_used,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use investiq_common::config::AppConfig;
    use investiq_common::embeddings::MockEmbedder;
    use investiq_common::llm::MockChatClient;
    use investiq_common::store::{ChunkRecord, MemoryVectorStore, VectorStore};
    use investiq_common::websearch::{MockWebSearchClient, WebSearchClient};
    use std::sync::Arc;

    fn chat_request(message: &str, enable_web_search: bool) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            conversation_history: Vec::new(),
            company_name: "acme".to_string(),
            model: None,
            temperature: 0.7,
            enable_web_search,
        }
    }

    async fn state_with(
        llm: Arc<MockChatClient>,
        seeded: bool,
        web: Option<Arc<dyn WebSearchClient>>,
    ) -> AppState {
        let store = Arc::new(MemoryVectorStore::new());
        if seeded {
            store
                .upsert(
                    vec![ChunkRecord {
                        id: "a".to_string(),
                        company: "acme".to_string(),
                        source_type: "product".to_string(),
                        source_url: "https://acme.com/product".to_string(),
                        chunk_index: 0,
                        total_chunks: 1,
                        text: "Acme offers an ambient clinical documentation product."
                            .to_string(),
                        crawled_at: "2026-01-15T08:30:00Z".to_string(),
                        chunk_size: 54,
                    }],
                    vec![vec![0.2, 0.0]],
                )
                .await
                .unwrap();
        }

        AppState::new(
            Arc::new(AppConfig::default()),
            Arc::new(MockEmbedder::with_fixed(vec![0.0, 0.0])),
            store,
            llm,
            web,
        )
    }

    #[tokio::test]
    async fn test_grounded_turn_reports_retrieval() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("Acme offers clinical documentation software.", 80);

        let state = state_with(llm.clone(), true, None).await;
        let response = chat(
            State(state),
            Json(chat_request("What products does Acme offer?", false)),
        )
        .await
        .unwrap();

        assert!(response.0.used_retrieval);
        assert!(!response.0.used_web_search);
        assert_eq!(response.0.chunks_retrieved, 1);
        assert_eq!(response.0.chunks.len(), 1);
        assert!(response.0.web_sources.is_empty());
        assert_eq!(response.0.tokens_used, 80);

        // The evidence was injected into the prompt
        let calls = llm.calls();
        assert!(calls[0]
            .iter()
            .any(|m| m.content.contains("--- Chunk 1 ---")));
    }

    #[tokio::test]
    async fn test_web_fallback_turn() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("Based on recent news, Acme raised $40M.", 60);
        let web = Arc::new(MockWebSearchClient::new(vec![WebSnippet {
            title: "Acme raises $40M".to_string(),
            url: "https://news.example.com/acme".to_string(),
            snippet: "Acme announced a Series B.".to_string(),
        }]));

        let state = state_with(llm, false, Some(web)).await;
        let response = chat(
            State(state),
            Json(chat_request("What products does Acme offer?", true)),
        )
        .await
        .unwrap();

        assert!(!response.0.used_retrieval);
        assert!(response.0.used_web_search);
        assert_eq!(response.0.web_sources.len(), 1);
        assert_eq!(response.0.chunks_retrieved, 0);
    }

    #[tokio::test]
    async fn test_ungrounded_turn() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("A convertible note is a form of short-term debt.", 50);

        let state = state_with(llm.clone(), true, None).await;
        let response = chat(
            State(state),
            Json(chat_request("What is a convertible note?", false)),
        )
        .await
        .unwrap();

        assert!(!response.0.used_retrieval);
        assert!(!response.0.used_web_search);
        assert!(response.0.chunks.is_empty());

        // No context injection happened
        let calls = llm.calls();
        assert_eq!(calls[0].len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let llm = Arc::new(MockChatClient::new());
        let state = state_with(llm, true, None).await;
        let result = chat(State(state), Json(chat_request("", false))).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
