// file: src/discovery/mod.rs
// description: input file discovery module exports
// reference: internal module structure

pub mod classifier;
pub mod scanner;

pub use classifier::SlotClassifier;
pub use scanner::{DiscoveredFile, Discovery, FileDiscovery};
