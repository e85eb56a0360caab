// file: src/models/report.rs
// description: compilation and deduplication report records
// reference: machine-parsable json reports emitted next to the workbook

use crate::models::record::ColumnRoles;
use crate::normalize::DuplicateStrategy;
use serde::Serialize;
use std::path::PathBuf;

/// One row that took part in a duplicate group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateRecord {
    pub email: String,
    pub full_name: String,
    pub score: Option<f64>,
    pub source_row: usize,
    pub kept: bool,
}

/// Per-file outcome of duplicate resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDeduplicationReport {
    pub test: u32,
    pub file: PathBuf,
    pub before: usize,
    pub after: usize,
    pub removed: usize,
    pub flagged: usize,
    pub duplicate_groups: usize,
    pub duplicate_records: Vec<DuplicateRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeduplicationReport {
    pub strategy: DuplicateStrategy,
    pub total_removed: usize,
    pub total_flagged: usize,
    pub files: Vec<FileDeduplicationReport>,
}

impl DeduplicationReport {
    pub fn new(strategy: DuplicateStrategy) -> Self {
        Self {
            strategy,
            total_removed: 0,
            total_flagged: 0,
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, file: FileDeduplicationReport) {
        self.total_removed += file.removed;
        self.total_flagged += file.flagged;
        self.files.push(file);
    }
}

/// Row accounting for one input file through stages 2-4.
#[derive(Debug, Clone, Serialize)]
pub struct InputFileSummary {
    pub test: u32,
    pub file: PathBuf,
    pub sha256: Option<String>,
    pub raw_rows: usize,
    pub blank_rows_dropped: usize,
    pub missing_email_dropped: usize,
    pub normalized_rows: usize,
    pub rows_after_dedup: usize,
    pub null_scores: usize,
    pub score_parse_failures: usize,
    pub all_scores_null: bool,
    pub columns: ColumnRoles,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputShape {
    pub rows: usize,
    pub columns: usize,
    pub header: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompilationReport {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
    pub duplicate_strategy: DuplicateStrategy,
    pub min_retention_ratio: f64,
    pub stages: Vec<StageTiming>,
    pub inputs: Vec<InputFileSummary>,
    pub expected_identities: usize,
    pub merged_identities: usize,
    pub fanout_rows_removed: usize,
    pub duplicates_removed_total: usize,
    pub output: OutputShape,
    pub output_path: Option<PathBuf>,
    pub verified: bool,
}
