// file: src/error.rs
// description: Compilation error taxonomy and result type alias
// reference: https://docs.rs/thiserror

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing input files for test slot(s) {}", join_slots(.missing))]
    IncompleteInput { missing: Vec<u32> },

    #[error("No test files available to compile")]
    NoInput,

    #[error("Invalid test slot set: {0}")]
    SlotBinding(String),

    #[error("Validation failed for {}: {reason}", .file.display())]
    Validation { file: PathBuf, reason: String },

    #[error(
        "Could not detect {} column(s) in {}. Available headers: [{}]",
        .unresolved.join(", "),
        .file.display(),
        .available.join(", ")
    )]
    ColumnDetection {
        file: PathBuf,
        unresolved: Vec<String>,
        available: Vec<String>,
    },

    #[error("{} contains {duplicates} duplicate email row(s) and the duplicate strategy is 'error'", .file.display())]
    DuplicateEmails { file: PathBuf, duplicates: usize },

    #[error("{count} input file(s) rejected:\n{summary}")]
    InputRejected {
        count: usize,
        summary: String,
        failures: Vec<FileFailure>,
    },

    #[error(
        "Data loss detected: merged table holds {merged} of {expected} participants ({missing} missing, minimum retention {min_retention})"
    )]
    DataLoss {
        expected: usize,
        merged: usize,
        missing: usize,
        min_retention: f64,
    },

    #[error("Output columns do not match the expected header. Expected [{}], found [{}]", .expected.join(", "), .actual.join(", "))]
    ColumnOrder {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Export verification failed: {0}")]
    ExportVerification(String),

    #[error("Processing {} exceeded the {secs}s timeout", .file.display())]
    Timeout { file: PathBuf, secs: u64 },

    #[error("Processing task for {} stopped unexpectedly: {reason}", .file.display())]
    TaskFailed { file: PathBuf, reason: String },

    #[error("File operation failed for {}: {source}", .path.display())]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("Spreadsheet write error: {0}")]
    Writer(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompileError {
    /// Short stage label used when a per-file error is folded into a batch failure.
    pub fn stage(&self) -> &'static str {
        match self {
            CompileError::Validation { .. } => "validation",
            CompileError::ColumnDetection { .. } => "column_detection",
            CompileError::DuplicateEmails { .. } => "deduplication",
            CompileError::Timeout { .. } => "timeout",
            CompileError::Spreadsheet(_) => "read",
            _ => "unexpected",
        }
    }
}

/// One file's failure, recorded so the batch can report every problem at once.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub slot: u32,
    pub file: PathBuf,
    pub stage: String,
    pub message: String,
}

impl FileFailure {
    pub fn new(slot: u32, file: PathBuf, error: &CompileError) -> Self {
        Self {
            slot,
            file,
            stage: error.stage().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  [test {}] {} ({}): {}",
            self.slot,
            self.file.display(),
            self.stage,
            self.message
        )
    }
}

impl CompileError {
    pub fn rejected(failures: Vec<FileFailure>) -> Self {
        let summary = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        CompileError::InputRejected {
            count: failures.len(),
            summary,
            failures,
        }
    }
}

fn join_slots(slots: &[u32]) -> String {
    slots
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_input_lists_slots() {
        let err = CompileError::IncompleteInput {
            missing: vec![2, 5],
        };
        assert_eq!(err.to_string(), "Missing input files for test slot(s) 2, 5");
    }

    #[test]
    fn test_data_loss_names_missing_count() {
        let err = CompileError::DataLoss {
            expected: 50,
            merged: 40,
            missing: 10,
            min_retention: 0.95,
        };
        assert!(err.to_string().contains("10 missing"));
    }

    #[test]
    fn test_rejected_summarises_every_failure() {
        let failures = vec![
            FileFailure::new(
                1,
                PathBuf::from("a.xlsx"),
                &CompileError::Validation {
                    file: PathBuf::from("a.xlsx"),
                    reason: "no data rows".to_string(),
                },
            ),
            FileFailure::new(
                3,
                PathBuf::from("c.xlsx"),
                &CompileError::DuplicateEmails {
                    file: PathBuf::from("c.xlsx"),
                    duplicates: 1,
                },
            ),
        ];

        let err = CompileError::rejected(failures);
        let message = err.to_string();
        assert!(message.starts_with("2 input file(s) rejected"));
        assert!(message.contains("[test 1]"));
        assert!(message.contains("deduplication"));
    }

    #[test]
    fn test_task_failure_is_not_a_validation_stage() {
        let err = CompileError::TaskFailed {
            file: PathBuf::from("test_2.xlsx"),
            reason: "task panicked".to_string(),
        };
        assert_eq!(err.stage(), "unexpected");
        assert_eq!(
            FileFailure::new(2, PathBuf::from("test_2.xlsx"), &err).stage,
            "unexpected"
        );
    }
}
