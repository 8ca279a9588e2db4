//! Chat routing
//!
//! Decides, once per conversational turn, whether to ground the answer in
//! internal retrieval, fall back to external web search, or answer with no
//! external grounding. The router never calls the language model, and empty
//! evidence is a valid outcome, not an error.

use crate::retrieval::{RetrievalClient, RetrievedResult, GOOD_MAX_DISTANCE};
use investiq_common::errors::Result;
use investiq_common::metrics;
use investiq_common::websearch::{WebSearchClient, WebSnippet};
use std::sync::Arc;
use tracing::{debug, warn};

/// The routing outcome for one turn, with the evidence it produced
#[derive(Debug, Clone)]
pub enum RouteDecision {
    /// Answer from the model alone
    NoContext,
    /// Ground the answer in retrieved chunks
    Rag(Vec<RetrievedResult>),
    /// Ground the answer in web snippets (possibly empty)
    Web(Vec<WebSnippet>),
}

impl RouteDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDecision::NoContext => "no_context",
            RouteDecision::Rag(_) => "rag",
            RouteDecision::Web(_) => "web",
        }
    }
}

/// Keyword groups marking company-data intent. A closed set so the
/// classifier stays testable.
const INTENT_KEYWORDS: &[&str] = &[
    // funding
    "funding",
    "investor",
    "raise",
    "raised",
    "valuation",
    "series",
    "capital",
    "revenue",
    // product
    "product",
    "platform",
    "feature",
    "technology",
    "service",
    "offer",
    "pricing",
    // team
    "team",
    "founder",
    "ceo",
    "leadership",
    "executive",
    "hiring",
    "employee",
    // customers
    "customer",
    "client",
    "partner",
    "market",
];

/// True when the message asks about company data (funding, product, team,
/// customers) and is therefore worth an internal retrieval attempt.
pub fn matches_company_intent(message: &str) -> bool {
    let lowered = message.to_lowercase();
    INTENT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Per-turn router over internal retrieval and optional web search
pub struct Router {
    retrieval: Arc<RetrievalClient>,
    web: Option<Arc<dyn WebSearchClient>>,
    top_k: usize,
}

impl Router {
    pub fn new(
        retrieval: Arc<RetrievalClient>,
        web: Option<Arc<dyn WebSearchClient>>,
        top_k: usize,
    ) -> Self {
        Self {
            retrieval,
            web,
            top_k,
        }
    }

    /// Evaluate the routing state machine once for this turn.
    ///
    /// Retrieval-infrastructure failures propagate; a web search failure
    /// does not back the turn out of the web state - it degrades to empty
    /// web evidence.
    pub async fn route(
        &self,
        company: &str,
        message: &str,
        enable_web_search: bool,
    ) -> Result<RouteDecision> {
        if matches_company_intent(message) {
            let results = self
                .retrieval
                .search(company, message, self.top_k, None)
                .await?;
            let sufficient = results
                .first()
                .map(|best| best.distance < GOOD_MAX_DISTANCE)
                .unwrap_or(false);
            if sufficient {
                metrics::record_router_decision("rag");
                return Ok(RouteDecision::Rag(results));
            }
            debug!(
                company = %company,
                results = results.len(),
                "Retrieval insufficient for grounding"
            );
        }

        if enable_web_search {
            if let Some(web) = &self.web {
                let query = format!("{} {}", company, message);
                let snippets = match web.search(&query).await {
                    Ok(snippets) => snippets,
                    Err(e) => {
                        warn!(error = %e, "Web search failed, continuing without snippets");
                        Vec::new()
                    }
                };
                metrics::record_router_decision("web");
                return Ok(RouteDecision::Web(snippets));
            }
            warn!("Web search requested but no search client is configured");
        }

        metrics::record_router_decision("no_context");
        Ok(RouteDecision::NoContext)
    }
}
