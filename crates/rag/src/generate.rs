//! Generation orchestration
//!
//! Builds the structured prompt for each mode, calls the language model with
//! mode-specific parameters, and validates the output. Dashboard output is
//! checked for its eight sections; the count is reported as observed, never
//! coerced. Both modes retry a transient generation failure exactly once.

use crate::context::ContextBlock;
use crate::prompts::{
    chat_context_message, dashboard_user_prompt, empty_dashboard, CHAT_SYSTEM_PROMPT,
    DASHBOARD_SECTIONS, DASHBOARD_SYSTEM_PROMPT, NOT_DISCLOSED,
};
use investiq_common::errors::Result;
use investiq_common::llm::{ChatClient, ChatCompletion, ChatMessage, GenerationParams};
use investiq_common::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Reference temperature for dashboard generation
pub const DASHBOARD_TEMPERATURE: f32 = 0.3;
/// Reference output ceiling for dashboard generation
pub const DASHBOARD_MAX_TOKENS: u32 = 4000;
/// Reference temperature for chat generation
pub const CHAT_TEMPERATURE: f32 = 0.7;
/// Reference output ceiling for chat generation
pub const CHAT_MAX_TOKENS: u32 = 1000;

/// Dashboard generation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub chunks_retrieved: usize,
    pub tokens_used: u32,
    /// Recognized section headings in the output, at most 8
    pub sections_present: usize,
    /// Literal "Not disclosed." occurrences - the disclosure-gap metric
    pub not_disclosed_count: usize,
    pub model: String,
    pub elapsed_ms: u64,
    pub status: String,
}

/// A generated dashboard with its validation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResult {
    pub company_name: String,
    pub dashboard: String,
    pub metadata: DashboardMetadata,
    pub context_sources: Vec<String>,
}

/// A generated chat answer
#[derive(Debug, Clone)]
pub struct ChatResult {
    pub message: String,
    pub tokens_used: u32,
    pub elapsed_ms: u64,
}

/// Count the recognized dashboard section headings in a generated output
pub fn count_sections(text: &str) -> usize {
    DASHBOARD_SECTIONS.iter().filter(|s| text.contains(**s)).count()
}

/// Count literal "Not disclosed." occurrences
pub fn count_not_disclosed(text: &str) -> usize {
    text.matches(NOT_DISCLOSED).count()
}

/// Generation orchestrator shared by both modes
pub struct GenerationOrchestrator {
    llm: Arc<dyn ChatClient>,
    history_window: usize,
}

impl GenerationOrchestrator {
    pub fn new(llm: Arc<dyn ChatClient>, history_window: usize) -> Self {
        Self {
            llm,
            history_window,
        }
    }

    /// Generate the 8-section investment dashboard from the assembled
    /// context.
    ///
    /// An empty context short-circuits to the fixed all-"Not disclosed."
    /// dashboard without a model call. A structurally incomplete output is
    /// not an error: `sections_present` carries the observed count and the
    /// caller decides whether to retry.
    pub async fn generate_dashboard(
        &self,
        company: &str,
        context: &ContextBlock,
        params: &GenerationParams,
    ) -> Result<DashboardResult> {
        let start = Instant::now();

        if context.is_empty() {
            info!(company = %company, "No context available, returning empty dashboard");
            let dashboard = empty_dashboard(company);
            return Ok(DashboardResult {
                company_name: company.to_string(),
                metadata: DashboardMetadata {
                    chunks_retrieved: 0,
                    tokens_used: 0,
                    sections_present: count_sections(&dashboard),
                    not_disclosed_count: count_not_disclosed(&dashboard),
                    model: params.model.clone(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    status: "no_context".to_string(),
                },
                context_sources: Vec::new(),
                dashboard,
            });
        }

        let messages = [
            ChatMessage::system(DASHBOARD_SYSTEM_PROMPT),
            ChatMessage::user(dashboard_user_prompt(
                company,
                &context.render_grouped(company),
            )),
        ];

        let completion = self.complete_with_retry(&messages, params).await?;
        let elapsed = start.elapsed();
        metrics::record_generation(elapsed.as_secs_f64(), "dashboard");

        let sections_present = count_sections(&completion.content);
        let not_disclosed_count = count_not_disclosed(&completion.content);
        if sections_present < DASHBOARD_SECTIONS.len() {
            warn!(
                company = %company,
                sections_present,
                "Dashboard output is missing sections"
            );
        }
        info!(
            company = %company,
            sections_present,
            not_disclosed_count,
            tokens_used = completion.total_tokens,
            "Dashboard generated"
        );

        Ok(DashboardResult {
            company_name: company.to_string(),
            dashboard: completion.content,
            metadata: DashboardMetadata {
                chunks_retrieved: context.len(),
                tokens_used: completion.total_tokens,
                sections_present,
                not_disclosed_count,
                model: params.model.clone(),
                elapsed_ms: elapsed.as_millis() as u64,
                status: "success".to_string(),
            },
            context_sources: context.source_types(),
        })
    }

    /// Generate a chat answer from the caller-supplied history, the new
    /// message, and whatever evidence the router produced.
    pub async fn generate_chat(
        &self,
        message: &str,
        history: &[ChatMessage],
        context: Option<&ContextBlock>,
        params: &GenerationParams,
    ) -> Result<ChatResult> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(CHAT_SYSTEM_PROMPT));

        // Bounded window: only the last N caller-supplied turns
        let skip = history.len().saturating_sub(self.history_window);
        messages.extend_from_slice(&history[skip..]);

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            messages.push(ChatMessage::system(chat_context_message(&context.render())));
        }
        messages.push(ChatMessage::user(message));

        let completion = self.complete_with_retry(&messages, params).await?;
        let elapsed = start.elapsed();
        metrics::record_generation(elapsed.as_secs_f64(), "chat");

        Ok(ChatResult {
            message: completion.content,
            tokens_used: completion.total_tokens,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    /// Call the model, retrying exactly once on a transient service error
    async fn complete_with_retry(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion> {
        match self.llm.complete(messages, params).await {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Generation call failed, retrying once");
                self.llm.complete(messages, params).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{build_context, SourceFragment};
    use investiq_common::errors::AppError;
    use investiq_common::llm::MockChatClient;

    fn params() -> GenerationParams {
        GenerationParams {
            model: "gpt-4o".to_string(),
            temperature: DASHBOARD_TEMPERATURE,
            max_tokens: DASHBOARD_MAX_TOKENS,
        }
    }

    fn some_context() -> ContextBlock {
        build_context(
            vec![SourceFragment {
                text: "Acme builds clinical AI for hospital systems.".to_string(),
                source_url: "https://acme.com/".to_string(),
                source_type: "homepage".to_string(),
            }],
            1000,
        )
    }

    #[tokio::test]
    async fn test_sections_counted_from_output_not_coerced() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply(
            "## Company Overview\nAcme builds clinical AI.\n\n\
             ## Outlook\nNot disclosed.\n\n\
             ## Disclosure Gaps\nNot disclosed. Not disclosed.",
            321,
        );

        let orchestrator = GenerationOrchestrator::new(llm, 10);
        let result = orchestrator
            .generate_dashboard("acme", &some_context(), &params())
            .await
            .unwrap();

        assert_eq!(result.metadata.sections_present, 3);
        assert_eq!(result.metadata.not_disclosed_count, 3);
        assert_eq!(result.metadata.tokens_used, 321);
        assert_eq!(result.metadata.status, "success");
        assert_eq!(result.context_sources, vec!["homepage"]);
    }

    #[tokio::test]
    async fn test_empty_context_short_circuits_without_model_call() {
        let llm = Arc::new(MockChatClient::new());
        let orchestrator = GenerationOrchestrator::new(llm.clone(), 10);

        let result = orchestrator
            .generate_dashboard("acme", &ContextBlock::default(), &params())
            .await
            .unwrap();

        assert!(llm.calls().is_empty());
        assert_eq!(result.metadata.status, "no_context");
        assert_eq!(result.metadata.chunks_retrieved, 0);
        // Computed from the fixed template, not hardcoded
        assert_eq!(result.metadata.sections_present, 8);
        assert_eq!(result.metadata.not_disclosed_count, 7);
    }

    #[tokio::test]
    async fn test_dashboard_prompt_structure() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("## Company Overview\nText.", 10);

        let orchestrator = GenerationOrchestrator::new(llm.clone(), 10);
        orchestrator
            .generate_dashboard("acme", &some_context(), &params())
            .await
            .unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][0].content.contains("## Disclosure Gaps"));
        assert_eq!(calls[0][1].role, "user");
        assert!(calls[0][1].content.contains("# Company Data: acme"));
        assert!(calls[0][1].content.contains("Use ONLY the data below"));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_transient_failure("upstream timeout");
        llm.push_reply("## Company Overview\nText.", 55);

        let orchestrator = GenerationOrchestrator::new(llm.clone(), 10);
        let result = orchestrator
            .generate_dashboard("acme", &some_context(), &params())
            .await
            .unwrap();

        assert_eq!(llm.calls().len(), 2);
        assert_eq!(result.metadata.tokens_used, 55);
    }

    #[tokio::test]
    async fn test_second_transient_failure_fails_request() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_transient_failure("upstream timeout");
        llm.push_transient_failure("still down");

        let orchestrator = GenerationOrchestrator::new(llm.clone(), 10);
        let result = orchestrator
            .generate_dashboard("acme", &some_context(), &params())
            .await;

        assert!(matches!(
            result,
            Err(AppError::GenerationUnavailable { .. })
        ));
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_chat_history_window_and_context_injection() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("Acme sells to hospitals.", 40);

        let orchestrator = GenerationOrchestrator::new(llm.clone(), 4);
        let history: Vec<ChatMessage> = (0..9)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("question {}", i))
                } else {
                    ChatMessage::assistant(format!("answer {}", i))
                }
            })
            .collect();

        let context = some_context();
        let result = orchestrator
            .generate_chat(
                "Who are their customers?",
                &history,
                Some(&context),
                &GenerationParams {
                    model: "gpt-4o".to_string(),
                    temperature: CHAT_TEMPERATURE,
                    max_tokens: CHAT_MAX_TOKENS,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.message, "Acme sells to hospitals.");

        let calls = llm.calls();
        // system + 4 history turns + context injection + user message
        assert_eq!(calls[0].len(), 7);
        assert_eq!(calls[0][0].role, "system");
        assert_eq!(calls[0][1].content, "answer 5");
        assert!(calls[0][5].content.contains("--- Chunk 1 ---"));
        assert_eq!(calls[0][6].content, "Who are their customers?");
    }

    #[tokio::test]
    async fn test_chat_without_evidence_has_no_injection() {
        let llm = Arc::new(MockChatClient::new());
        llm.push_reply("A convertible note is a loan.", 30);

        let orchestrator = GenerationOrchestrator::new(llm.clone(), 10);
        orchestrator
            .generate_chat(
                "What is a convertible note?",
                &[],
                None,
                &GenerationParams {
                    model: "gpt-4o".to_string(),
                    temperature: CHAT_TEMPERATURE,
                    max_tokens: CHAT_MAX_TOKENS,
                },
            )
            .await
            .unwrap();

        let calls = llm.calls();
        // system + user only
        assert_eq!(calls[0].len(), 2);
    }
}
