// file: src/merge/mod.rs
// description: merge and reconciliation module exports
// reference: internal module structure

pub mod engine;
pub mod reconcile;

pub use engine::{MergeEngine, MergeOutcome, SlotRows};
pub use reconcile::{check_header, check_retention};
