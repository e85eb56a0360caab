// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod record;
pub mod report;
pub mod table;

pub use record::{
    ColumnRoles, EMAIL_HEADER, MergedRecord, MergedTable, NAME_HEADER, NormalizedRow,
    ResolvedColumn, Role, expected_header, score_label,
};
pub use report::{
    CompilationReport, DeduplicationReport, DuplicateRecord, FileDeduplicationReport,
    InputFileSummary, OutputShape, StageTiming,
};
pub use table::{CellValue, RawTable};
