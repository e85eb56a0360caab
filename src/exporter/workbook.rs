// file: src/exporter/workbook.rs
// description: writes the merged table to xlsx and verifies it by re-reading
// reference: https://docs.rs/rust_xlsxwriter

use crate::error::{CompileError, Result};
use crate::exporter::staging::{StagedOutput, staging_path};
use crate::models::{CellValue, MergedTable};
use crate::reader;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

const SCORE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct WorkbookExporter {
    output_dir: PathBuf,
    file_name: String,
    sheet_name: String,
}

impl WorkbookExporter {
    pub fn new(output_dir: impl Into<PathBuf>, file_name: &str, sheet_name: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_name: file_name.to_string(),
            sheet_name: sheet_name.to_string(),
        }
    }

    pub fn target(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }

    /// Writes to a temporary sibling, verifies it, then moves it into place.
    /// Nothing is left behind when verification fails.
    pub fn export(&self, table: &MergedTable) -> Result<PathBuf> {
        let mut output = StagedOutput::new();
        self.stage(table, &mut output)?;
        output.commit()?;

        let target = self.target();
        info!(
            "Exported {} row(s) to {}",
            table.row_count(),
            target.display()
        );
        Ok(target)
    }

    /// Writes and verifies the staged workbook, leaving the rename to `output`.
    pub fn stage(&self, table: &MergedTable, output: &mut StagedOutput) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).map_err(|source| CompileError::FileOperation {
            path: self.output_dir.clone(),
            source,
        })?;

        let target = self.target();
        let staging = staging_path(&target);

        self.write(table, &staging)?;

        if let Err(e) = verify(table, &staging) {
            error!("Discarding unverified workbook {}: {}", staging.display(), e);
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        output.push(staging, target.clone());
        Ok(target)
    }

    pub fn write(&self, table: &MergedTable, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;

        let bold = Format::new().set_bold();
        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &bold)?;
        }
        sheet.set_freeze_panes(1, 0)?;

        for (i, record) in table.records.iter().enumerate() {
            let row = (i + 1) as u32;
            if !record.full_name.is_empty() {
                sheet.write_string(row, 0, &record.full_name)?;
            }
            sheet.write_string(row, 1, &record.email)?;
            for (offset, score) in record.scores.iter().enumerate() {
                if let Some(value) = score {
                    sheet.write_number(row, (offset + 2) as u16, *value)?;
                }
            }
        }

        workbook.save(path)?;
        debug!("Wrote workbook {}", path.display());
        Ok(())
    }
}

/// Re-reads `path` and compares header, row count and every cell with `table`.
pub fn verify(table: &MergedTable, path: &Path) -> Result<()> {
    let written = reader::read_path(path)?;

    if written.headers != table.headers {
        return Err(CompileError::ExportVerification(format!(
            "header mismatch: wrote [{}], read back [{}]",
            table.headers.join(", "),
            written.headers.join(", ")
        )));
    }

    if written.row_count() != table.row_count() {
        return Err(CompileError::ExportVerification(format!(
            "row count mismatch: wrote {}, read back {}",
            table.row_count(),
            written.row_count()
        )));
    }

    for (i, record) in table.records.iter().enumerate() {
        let sheet_row = i + 2;
        if written.cell(i, 0).to_text() != record.full_name {
            return Err(mismatch(sheet_row, "Full Name"));
        }
        if written.cell(i, 1).to_text() != record.email {
            return Err(mismatch(sheet_row, "Email"));
        }
        for (offset, expected) in record.scores.iter().enumerate() {
            let actual = written.cell(i, offset + 2);
            let same = match (expected, actual) {
                (None, cell) => cell.is_blank(),
                (Some(v), CellValue::Number(n)) => (v - n).abs() <= SCORE_TOLERANCE,
                _ => false,
            };
            if !same {
                return Err(mismatch(sheet_row, &table.headers[offset + 2]));
            }
        }
    }

    debug!("Verified {} against in-memory table", path.display());
    Ok(())
}

fn mismatch(row: usize, column: &str) -> CompileError {
    CompileError::ExportVerification(format!(
        "cell mismatch at row {} column '{}'",
        row, column
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MergedRecord, expected_header};
    use tempfile::TempDir;

    fn table() -> MergedTable {
        MergedTable {
            headers: expected_header(&[1, 2]),
            slots: vec![1, 2],
            records: vec![
                MergedRecord {
                    full_name: "Alice".to_string(),
                    email: "a@x.com".to_string(),
                    scores: vec![Some(85.0), Some(88.25)],
                },
                MergedRecord {
                    full_name: "Bob".to_string(),
                    email: "b@x.com".to_string(),
                    scores: vec![Some(92.0), None],
                },
            ],
        }
    }

    #[test]
    fn test_export_round_trip() {
        let temp = TempDir::new().unwrap();
        let exporter = WorkbookExporter::new(temp.path(), "compiled.xlsx", "Results");

        let path = exporter.export(&table()).unwrap();
        assert_eq!(path, temp.path().join("compiled.xlsx"));

        let read_back = reader::read_path(&path).unwrap();
        assert_eq!(read_back.headers, table().headers);
        assert_eq!(read_back.row_count(), 2);
        assert!(!temp.path().join(".compiled.xlsx.partial").exists());
    }

    #[test]
    fn test_staged_workbook_waits_for_commit() {
        let temp = TempDir::new().unwrap();
        let exporter = WorkbookExporter::new(temp.path(), "compiled.xlsx", "Results");

        let mut output = StagedOutput::new();
        let target = exporter.stage(&table(), &mut output).unwrap();
        assert!(!target.exists());
        assert!(temp.path().join(".compiled.xlsx.partial").exists());

        output.commit().unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_verify_detects_divergence() {
        let temp = TempDir::new().unwrap();
        let exporter = WorkbookExporter::new(temp.path(), "compiled.xlsx", "Results");
        let path = exporter.export(&table()).unwrap();

        let mut altered = table();
        altered.records[1].scores[1] = Some(50.0);
        assert!(matches!(
            verify(&altered, &path),
            Err(CompileError::ExportVerification(_))
        ));

        let mut shorter = table();
        shorter.records.pop();
        assert!(verify(&shorter, &path).is_err());
    }

    #[test]
    fn test_empty_table_exports_header_only() {
        let temp = TempDir::new().unwrap();
        let empty = MergedTable {
            headers: expected_header(&[1]),
            slots: vec![1],
            records: vec![],
        };

        let path = WorkbookExporter::new(temp.path(), "empty.xlsx", "Results")
            .export(&empty)
            .unwrap();
        let read_back = reader::read_path(&path).unwrap();
        assert_eq!(read_back.headers, vec!["Full Name", "Email", "Test 1 (%)"]);
        assert_eq!(read_back.row_count(), 0);
    }
}
