//! Chunk identity
//!
//! Derives the stable-but-refreshable identifier under which a chunk is
//! stored. The digest repeats exactly within one ingestion run, so a
//! partial-failure retry of the same run overwrites instead of duplicating,
//! while a forced refresh at a new timestamp produces fresh identifiers that
//! coexist with the old ones until those are pruned by company and source
//! type. Callers must guarantee the timestamp is distinct per run.

use sha2::{Digest, Sha256};

/// Deterministic identifier for a chunk: SHA-256 over the identifying tuple,
/// hex-encoded.
pub fn chunk_id(company: &str, source_type: &str, chunk_index: usize, crawled_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(company.as_bytes());
    hasher.update(b"_");
    hasher.update(source_type.as_bytes());
    hasher.update(b"_");
    hasher.update(chunk_index.to_string().as_bytes());
    hasher.update(b"_");
    hasher.update(crawled_at.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2026-01-15T08:30:00+00:00";

    #[test]
    fn test_deterministic() {
        let a = chunk_id("acme", "homepage", 0, TS);
        let b = chunk_id("acme", "homepage", 0, TS);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_distinct_within_batch() {
        let ids: Vec<String> = (0..10).map(|i| chunk_id("acme", "homepage", i, TS)).collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_distinct_across_runs() {
        let first = chunk_id("acme", "homepage", 0, TS);
        let second = chunk_id("acme", "homepage", 0, "2026-02-20T10:00:00+00:00");
        assert_ne!(first, second);
    }

    #[test]
    fn test_distinct_across_sources_and_companies() {
        assert_ne!(
            chunk_id("acme", "homepage", 0, TS),
            chunk_id("acme", "about", 0, TS)
        );
        assert_ne!(
            chunk_id("acme", "homepage", 0, TS),
            chunk_id("zenith", "homepage", 0, TS)
        );
    }
}
