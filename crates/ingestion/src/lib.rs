//! InvestIQ ingestion pipeline
//!
//! Turns scraped per-source company text into embedded, retrievable chunks:
//! deterministic boundary-aware chunking, stable-but-refreshable chunk
//! identity, and a batched embed-and-store processor.

pub mod chunker;
pub mod identity;
pub mod processor;

pub use chunker::chunk;
pub use identity::chunk_id;
pub use processor::{IngestStats, IngestionProcessor, SourceDocument};
