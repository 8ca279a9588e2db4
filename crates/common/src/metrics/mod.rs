//! Metrics and observability utilities
//!
//! Prometheus-style metrics with standardized naming for the search,
//! ingestion, and generation paths.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all InvestIQ metrics
pub const METRICS_PREFIX: &str = "investiq";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of retrieval queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval query latency in seconds"
    );

    describe_histogram!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Results returned per retrieval query"
    );

    describe_counter!(
        format!("{}_chunks_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total chunks stored by ingestion"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Company ingestion latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation API calls"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation latency in seconds"
    );

    describe_counter!(
        format!("{}_router_decisions_total", METRICS_PREFIX),
        Unit::Count,
        "Chat router decisions by outcome"
    );
}

/// Record a retrieval query
pub fn record_search(duration_secs: f64, results: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    histogram!(format!("{}_search_results_count", METRICS_PREFIX)).record(results as f64);
}

/// Record a completed company ingestion
pub fn record_ingestion(duration_secs: f64, chunks_stored: usize) {
    counter!(format!("{}_chunks_ingested_total", METRICS_PREFIX)).increment(chunks_stored as u64);
    histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a generation call
pub fn record_generation(duration_secs: f64, mode: &'static str) {
    counter!(format!("{}_generation_requests_total", METRICS_PREFIX), "mode" => mode).increment(1);
    histogram!(format!("{}_generation_duration_seconds", METRICS_PREFIX), "mode" => mode)
        .record(duration_secs);
}

/// Record a router decision
pub fn record_router_decision(outcome: &'static str) {
    counter!(format!("{}_router_decisions_total", METRICS_PREFIX), "outcome" => outcome)
        .increment(1);
}
