//! Context assembly
//!
//! Merges ranked chunks (or web snippets) into a token-budgeted,
//! source-attributed context block for the generation call. The same
//! assembler serves both paths; web snippets carry the source type "web".

use crate::retrieval::RetrievedResult;
use investiq_common::websearch::WebSnippet;
use std::collections::BTreeMap;

/// Rough token cost of a text: one token per four characters
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// An attributable piece of text offered to the assembler
#[derive(Debug, Clone)]
pub struct SourceFragment {
    pub text: String,
    pub source_url: String,
    pub source_type: String,
}

impl From<&RetrievedResult> for SourceFragment {
    fn from(result: &RetrievedResult) -> Self {
        Self {
            text: result.text.clone(),
            source_url: result.source_url.clone(),
            source_type: result.source_type.clone(),
        }
    }
}

impl From<&WebSnippet> for SourceFragment {
    fn from(snippet: &WebSnippet) -> Self {
        Self {
            text: snippet.snippet.clone(),
            source_url: snippet.url.clone(),
            source_type: "web".to_string(),
        }
    }
}

/// A fragment admitted into the context block
#[derive(Debug, Clone)]
pub struct ContextFragment {
    /// 1-based position among the included fragments
    pub ordinal: usize,
    pub source_url: String,
    pub source_type: String,
    pub text: String,
    pub estimated_tokens: usize,
}

impl ContextFragment {
    fn render(&self) -> String {
        format!(
            "--- Chunk {} ---\nSource: {}\nType: {}\nContent:\n{}",
            self.ordinal, self.source_url, self.source_type, self.text
        )
    }
}

/// The assembled, budget-bounded context. Created per request and discarded
/// after generation.
#[derive(Debug, Clone, Default)]
pub struct ContextBlock {
    fragments: Vec<ContextFragment>,
    estimated_tokens: usize,
}

impl ContextBlock {
    pub fn fragments(&self) -> &[ContextFragment] {
        &self.fragments
    }

    pub fn estimated_tokens(&self) -> usize {
        self.estimated_tokens
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Distinct source types of the included fragments, sorted
    pub fn source_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .fragments
            .iter()
            .map(|f| f.source_type.clone())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Flat rendering: each fragment under the fixed chunk template
    pub fn render(&self) -> String {
        self.fragments
            .iter()
            .map(ContextFragment::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Dashboard rendering: fragments grouped per source type under a
    /// company data header
    pub fn render_grouped(&self, company: &str) -> String {
        let mut by_source: BTreeMap<&str, Vec<&ContextFragment>> = BTreeMap::new();
        for fragment in &self.fragments {
            by_source
                .entry(fragment.source_type.as_str())
                .or_default()
                .push(fragment);
        }

        let mut out = format!(
            "# Company Data: {}\n\n**Retrieved Chunks**: {}\n**Source Types**: {}\n",
            company,
            self.fragments.len(),
            self.source_types().join(", ")
        );
        for (source_type, fragments) in by_source {
            out.push_str(&format!("\n## {} PAGE\n\n", source_type.to_uppercase()));
            for fragment in fragments {
                out.push_str(&fragment.render());
                out.push_str("\n\n");
            }
            out.push_str("---\n");
        }
        out
    }
}

/// Greedily assemble fragments, in their given order, into a block whose
/// estimated token total never exceeds `token_budget`.
///
/// A fragment is never truncated: one that would not fit in the remaining
/// budget is skipped entirely, and later, smaller fragments may still be
/// admitted.
pub fn build_context<I>(fragments: I, token_budget: usize) -> ContextBlock
where
    I: IntoIterator<Item = SourceFragment>,
{
    let mut block = ContextBlock::default();
    for fragment in fragments {
        if fragment.text.trim().is_empty() {
            continue;
        }
        let cost = estimate_tokens(&fragment.text);
        if block.estimated_tokens + cost > token_budget {
            continue;
        }
        block.estimated_tokens += cost;
        block.fragments.push(ContextFragment {
            ordinal: block.fragments.len() + 1,
            source_url: fragment.source_url,
            source_type: fragment.source_type,
            text: fragment.text,
            estimated_tokens: cost,
        });
    }
    block
}
