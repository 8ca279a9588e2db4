//! Dashboard context retrieval
//!
//! Fans a fixed set of probe queries across a company's index so the
//! dashboard sees funding, product, team, and traction material even when a
//! single query would miss some of it. Results are de-duplicated, merged by
//! ascending distance, and truncated to the caller's budget.

use crate::retrieval::{RetrievalClient, RetrievedResult};
use investiq_common::errors::Result;
use std::collections::HashSet;
use tracing::debug;

/// Probe queries covering the dashboard sections. The first is completed
/// with the company name.
const PROBE_QUERIES: [&str; 8] = [
    "{company} company overview mission",
    "funding investors series round capital valuation",
    "business model revenue pricing customers GTM",
    "founders CEO leadership team executives",
    "hiring jobs positions growth expansion",
    "product platform features technology AI",
    "customers clients partnerships enterprise",
    "awards press recognition",
];

/// Retrieve a merged, de-duplicated context set for dashboard generation.
///
/// Each probe contributes at most `max(2, top_k / 8)` results; duplicates
/// are dropped by `(source_type, chunk_index)`, and the merged set is
/// returned ascending by distance, truncated to `top_k`.
pub async fn retrieve_dashboard_context(
    retrieval: &RetrievalClient,
    company: &str,
    top_k: usize,
) -> Result<Vec<RetrievedResult>> {
    let per_query = (top_k / PROBE_QUERIES.len()).max(2);

    let mut merged: Vec<RetrievedResult> = Vec::new();
    let mut seen: HashSet<(String, usize)> = HashSet::new();

    for probe in PROBE_QUERIES {
        let query = probe.replace("{company}", company);
        let results = retrieval.search(company, &query, per_query, None).await?;
        for result in results {
            let key = (result.source_type.clone(), result.chunk_index);
            if seen.insert(key) {
                merged.push(result);
            }
        }
    }

    merged.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    merged.truncate(top_k);

    debug!(
        company = %company,
        retrieved = merged.len(),
        "Dashboard context retrieved"
    );
    Ok(merged)
}
