// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod discovery;
pub mod error;
pub mod exporter;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod resolver;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use config::{
    ColumnsConfig, CompileConfig, Config, ConfigSource, DiscoveryConfig, OutputConfig,
};
pub use discovery::{DiscoveredFile, Discovery, FileDiscovery, SlotClassifier};
pub use error::{CompileError, FileFailure, Result};
pub use exporter::{JsonExporter, ReportManifest, WorkbookExporter};
pub use merge::{MergeEngine, MergeOutcome, SlotRows};
pub use models::{
    CellValue, ColumnRoles, CompilationReport, DeduplicationReport, MergedRecord, MergedTable,
    NormalizedRow, RawTable, Role,
};
pub use normalize::{Deduplicator, DuplicateStrategy, RowNormalizer};
pub use pipeline::{CompileOutcome, Compiler, FileProcessor, PipelineStats, ProgressTracker};
pub use resolver::ColumnResolver;
pub use utils::OperationTimer;
pub use validation::{BatchValidation, InputValidator, ValidationCheck, ValidationOutcome};
