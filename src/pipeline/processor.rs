// file: src/pipeline/processor.rs
// description: runs one input file through validation, column resolution,
//              normalization and deduplication
// reference: stages 2-4 for a single test slot

use crate::config::Config;
use crate::discovery::DiscoveredFile;
use crate::error::{CompileError, Result};
use crate::models::{FileDeduplicationReport, InputFileSummary, NormalizedRow, RawTable};
use crate::normalize::{Deduplicator, RowNormalizer};
use crate::resolver::ColumnResolver;
use crate::validation::{FileInspection, InputValidator, log_outcome};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Deduplicated rows for one slot plus everything the reports need about it.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub slot: u32,
    pub rows: Vec<NormalizedRow>,
    pub summary: InputFileSummary,
    pub dedup: FileDeduplicationReport,
}

pub struct FileProcessor {
    validator: InputValidator,
    normalizer: RowNormalizer,
    deduplicator: Deduplicator,
}

impl FileProcessor {
    pub fn new(config: &Config) -> Self {
        let resolver = ColumnResolver::from_config(&config.columns);

        Self {
            validator: InputValidator::new(&config.discovery.extension, resolver),
            normalizer: RowNormalizer::new(),
            deduplicator: Deduplicator::new(config.compile.duplicate_strategy),
        }
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn process(&self, file: &DiscoveredFile) -> Result<ProcessedFile> {
        info!("Processing test {}: {}", file.slot, file.path.display());

        let inspection = self.validator.inspect(&file.path);
        log_outcome(file.slot, &inspection.outcome);
        let table = accepted(inspection)?;

        let fingerprint = compute_file_hash(&file.path).map_err(|source| {
            CompileError::FileOperation {
                path: file.path.clone(),
                source,
            }
        })?;

        let mut processed = self.process_table(file.slot, &file.path, &table)?;
        processed.summary.sha256 = Some(fingerprint);
        Ok(processed)
    }

    /// Same as [`process`](Self::process) for an upload held in memory.
    pub fn process_bytes(&self, slot: u32, label: &Path, bytes: &[u8]) -> Result<ProcessedFile> {
        info!("Processing test {} upload: {}", slot, label.display());

        let inspection = self.validator.inspect_bytes(label, bytes);
        log_outcome(slot, &inspection.outcome);
        let table = accepted(inspection)?;

        let mut processed = self.process_table(slot, label, &table)?;
        processed.summary.sha256 = Some(format!("{:x}", Sha256::digest(bytes)));
        Ok(processed)
    }

    /// Table-level checks then stages 3-4 for a table read elsewhere.
    pub fn process_raw(&self, slot: u32, label: &Path, table: RawTable) -> Result<ProcessedFile> {
        let inspection = self.validator.inspect_table(label, table);
        log_outcome(slot, &inspection.outcome);
        let table = accepted(inspection)?;
        self.process_table(slot, label, &table)
    }

    fn process_table(&self, slot: u32, file: &Path, table: &RawTable) -> Result<ProcessedFile> {
        let roles = self.validator.resolver().resolve(file, &table.headers)?;
        let normalized = self.normalizer.normalize(file, slot, table, &roles);
        let normalized_rows = normalized.rows.len();
        let stats = normalized.stats;

        let outcome = self.deduplicator.apply(file, slot, normalized.rows)?;
        debug!(
            "Test {}: {} raw row(s), {} normalized, {} after deduplication",
            slot,
            stats.raw_rows,
            normalized_rows,
            outcome.rows.len()
        );

        let summary = InputFileSummary {
            test: slot,
            file: file.to_path_buf(),
            sha256: None,
            raw_rows: stats.raw_rows,
            blank_rows_dropped: stats.blank_rows_dropped,
            missing_email_dropped: stats.missing_email_dropped,
            normalized_rows,
            rows_after_dedup: outcome.rows.len(),
            null_scores: stats.null_scores,
            score_parse_failures: stats.score_parse_failures,
            all_scores_null: stats.all_scores_null,
            columns: roles,
        };

        Ok(ProcessedFile {
            slot,
            rows: outcome.rows,
            summary,
            dedup: outcome.report,
        })
    }
}

fn accepted(inspection: FileInspection) -> Result<RawTable> {
    match inspection.table {
        Some(table) if inspection.outcome.passed => Ok(table),
        _ => Err(inspection.outcome.to_error()),
    }
}

fn compute_file_hash(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
