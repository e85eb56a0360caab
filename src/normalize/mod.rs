// file: src/normalize/mod.rs
// description: row normalization and deduplication module exports
// reference: internal module structure

pub mod dedup;
pub mod normalizer;

pub use dedup::{DedupOutcome, Deduplicator, DuplicateStrategy};
pub use normalizer::{
    NormalizationStats, NormalizedTable, ParsedScore, RowNormalizer, normalize_email, parse_score,
};
