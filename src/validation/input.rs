// file: src/validation/input.rs
// description: ordered structural checks for one input spreadsheet
// reference: validation failure is data, returned rather than raised

use crate::discovery::DiscoveredFile;
use crate::error::CompileError;
use crate::models::{RawTable, Role};
use crate::reader;
use crate::resolver::ColumnResolver;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCheck {
    Exists,
    Extension,
    Readable,
    HasDataRows,
    NameColumn,
    EmailColumn,
    ScoreColumn,
}

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValidationCheck::Exists => "exists",
            ValidationCheck::Extension => "extension",
            ValidationCheck::Readable => "readable",
            ValidationCheck::HasDataRows => "has_data_rows",
            ValidationCheck::NameColumn => "name_column",
            ValidationCheck::EmailColumn => "email_column",
            ValidationCheck::ScoreColumn => "score_column",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub file: PathBuf,
    pub passed: bool,
    pub failed_check: Option<ValidationCheck>,
    pub reason: String,
}

impl ValidationOutcome {
    fn pass(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
            passed: true,
            failed_check: None,
            reason: "all checks passed".to_string(),
        }
    }

    fn fail(file: &Path, check: ValidationCheck, reason: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            passed: false,
            failed_check: Some(check),
            reason: reason.into(),
        }
    }

    pub fn to_error(&self) -> CompileError {
        CompileError::Validation {
            file: self.file.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Validation verdict plus the table read along the way, so later stages need not re-read.
#[derive(Debug)]
pub struct FileInspection {
    pub outcome: ValidationOutcome,
    pub table: Option<RawTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchValidation {
    pub all_passed: bool,
    pub outcomes: Vec<(u32, ValidationOutcome)>,
    /// Slots discovery left unbound. These do not affect `all_passed`.
    pub missing: Vec<u32>,
}

pub struct InputValidator {
    extension: String,
    resolver: ColumnResolver,
}

impl InputValidator {
    pub fn new(extension: &str, resolver: ColumnResolver) -> Self {
        Self {
            extension: extension.to_lowercase(),
            resolver,
        }
    }

    pub fn inspect(&self, path: &Path) -> FileInspection {
        if !path.is_file() {
            return rejected(ValidationOutcome::fail(
                path,
                ValidationCheck::Exists,
                "file does not exist",
            ));
        }

        if let Some(outcome) = self.check_extension(path) {
            return rejected(outcome);
        }

        match reader::read_path(path) {
            Ok(table) => self.inspect_table(path, table),
            Err(e) => rejected(ValidationOutcome::fail(
                path,
                ValidationCheck::Readable,
                format!("file could not be opened as a spreadsheet: {}", e),
            )),
        }
    }

    /// Same checks for an in-memory upload; `label` names it in reports.
    pub fn inspect_bytes(&self, label: &Path, bytes: &[u8]) -> FileInspection {
        if let Some(outcome) = self.check_extension(label) {
            return rejected(outcome);
        }

        match reader::read_bytes(bytes) {
            Ok(table) => self.inspect_table(label, table),
            Err(e) => rejected(ValidationOutcome::fail(
                label,
                ValidationCheck::Readable,
                format!("upload could not be opened as a spreadsheet: {}", e),
            )),
        }
    }

    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    pub fn validate(&self, path: &Path) -> ValidationOutcome {
        self.inspect(path).outcome
    }

    /// Validates every file; one failure makes the batch fail but all are evaluated.
    pub fn validate_batch(&self, files: &[DiscoveredFile]) -> BatchValidation {
        let outcomes: Vec<(u32, ValidationOutcome)> = files
            .iter()
            .map(|file| {
                let outcome = self.validate(&file.path);
                log_outcome(file.slot, &outcome);
                (file.slot, outcome)
            })
            .collect();

        BatchValidation {
            all_passed: outcomes.iter().all(|(_, o)| o.passed),
            outcomes,
            missing: Vec::new(),
        }
    }

    fn check_extension(&self, path: &Path) -> Option<ValidationOutcome> {
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));

        (!matches).then(|| {
            ValidationOutcome::fail(
                path,
                ValidationCheck::Extension,
                format!("expected a .{} file", self.extension),
            )
        })
    }

    /// Row and column checks for a table that has already been read.
    pub fn inspect_table(&self, path: &Path, table: RawTable) -> FileInspection {
        if table.data_row_count() == 0 {
            return rejected(ValidationOutcome::fail(
                path,
                ValidationCheck::HasDataRows,
                "sheet has no data rows below the header",
            ));
        }

        let column_checks = [
            (Role::Name, ValidationCheck::NameColumn),
            (Role::Email, ValidationCheck::EmailColumn),
            (Role::Score, ValidationCheck::ScoreColumn),
        ];

        for (role, check) in column_checks {
            if !self.resolver.has_role(&table.headers, role) {
                return rejected(ValidationOutcome::fail(
                    path,
                    check,
                    format!(
                        "no {} column found among headers [{}]",
                        role,
                        table.headers.join(", ")
                    ),
                ));
            }
        }

        FileInspection {
            outcome: ValidationOutcome::pass(path),
            table: Some(table),
        }
    }
}

pub fn log_outcome(slot: u32, outcome: &ValidationOutcome) {
    if outcome.passed {
        info!("Test {} passed validation: {}", slot, outcome.file.display());
    } else {
        error!(
            "Test {} failed validation ({}): {} - {}",
            slot,
            outcome
                .failed_check
                .map(|c| c.to_string())
                .unwrap_or_default(),
            outcome.file.display(),
            outcome.reason
        );
    }
}

fn rejected(outcome: ValidationOutcome) -> FileInspection {
    FileInspection {
        outcome,
        table: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use crate::test_support::{write_scores, write_workbook};
    use std::fs;
    use tempfile::TempDir;

    fn validator() -> InputValidator {
        InputValidator::new("xlsx", ColumnResolver::default())
    }

    #[test]
    fn test_valid_file_passes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test_1.xlsx");
        write_scores(&path, &[("Alice", "a@x.com", 85.0)]);

        let inspection = validator().inspect(&path);
        assert!(inspection.outcome.passed);
        assert!(inspection.table.is_some());
    }

    #[test]
    fn test_missing_file_fails_first_check() {
        let outcome = validator().validate(Path::new("/nonexistent/test_1.xlsx"));
        assert!(!outcome.passed);
        assert_eq!(outcome.failed_check, Some(ValidationCheck::Exists));
    }

    #[test]
    fn test_wrong_extension() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test_1.csv");
        fs::write(&path, "Name,Email,Score\n").unwrap();

        let outcome = validator().validate(&path);
        assert_eq!(outcome.failed_check, Some(ValidationCheck::Extension));
    }

    #[test]
    fn test_corrupt_workbook_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test_1.xlsx");
        fs::write(&path, "not a workbook").unwrap();

        let outcome = validator().validate(&path);
        assert_eq!(outcome.failed_check, Some(ValidationCheck::Readable));
    }

    #[test]
    fn test_header_only_sheet_has_no_data() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test_1.xlsx");
        write_workbook(&path, &["Name", "Email", "Score"], &[]);

        let outcome = validator().validate(&path);
        assert_eq!(outcome.failed_check, Some(ValidationCheck::HasDataRows));
    }

    #[test]
    fn test_column_checks_run_in_role_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test_1.xlsx");
        write_workbook(
            &path,
            &["Department", "Cohort"],
            &[vec![CellValue::text("Ops"), CellValue::text("A")]],
        );
        assert_eq!(
            validator().validate(&path).failed_check,
            Some(ValidationCheck::NameColumn)
        );

        write_workbook(
            &path,
            &["Name", "Cohort", "Score"],
            &[vec!["Alice".into(), "A".into(), 90.0.into()]],
        );
        assert_eq!(
            validator().validate(&path).failed_check,
            Some(ValidationCheck::EmailColumn)
        );

        write_workbook(
            &path,
            &["Name", "Email"],
            &[vec!["Alice".into(), "a@x.com".into()]],
        );
        assert_eq!(
            validator().validate(&path).failed_check,
            Some(ValidationCheck::ScoreColumn)
        );
    }

    #[test]
    fn test_batch_fails_if_any_file_fails() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("test_1.xlsx");
        write_scores(&good, &[("Alice", "a@x.com", 85.0)]);
        let bad = temp.path().join("test_2.xlsx");

        let batch = validator().validate_batch(&[
            DiscoveredFile {
                slot: 1,
                path: good,
            },
            DiscoveredFile { slot: 2, path: bad },
        ]);

        assert!(!batch.all_passed);
        assert_eq!(batch.outcomes.len(), 2);
        assert!(batch.outcomes[0].1.passed);
        assert!(!batch.outcomes[1].1.passed);
    }

    #[test]
    fn test_inspect_bytes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload.xlsx");
        write_scores(&path, &[("Bob", "b@x.com", 92.0)]);
        let bytes = fs::read(&path).unwrap();

        let inspection = validator().inspect_bytes(Path::new("upload.xlsx"), &bytes);
        assert!(inspection.outcome.passed);

        let garbage = validator().inspect_bytes(Path::new("upload.xlsx"), b"garbage");
        assert_eq!(garbage.outcome.failed_check, Some(ValidationCheck::Readable));
    }
}
