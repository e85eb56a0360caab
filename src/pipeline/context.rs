// file: src/pipeline/context.rs
// description: per-run state threaded through the stages and folded into the reports
// reference: replaces module-level logger and session globals with an owned value

use crate::merge::MergeOutcome;
use crate::models::{
    CompilationReport, DeduplicationReport, InputFileSummary, NormalizedRow, OutputShape,
    StageTiming,
};
use crate::normalize::DuplicateStrategy;
use crate::pipeline::processor::ProcessedFile;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
    min_retention: f64,
    stages: Vec<StageTiming>,
    inputs: Vec<InputFileSummary>,
    deduplication: DeduplicationReport,
}

impl RunContext {
    pub fn new(strategy: DuplicateStrategy, min_retention: f64) -> Self {
        let run_id = Uuid::new_v4();
        info!(
            "Run {} started (duplicate strategy: {}, minimum retention: {})",
            run_id, strategy, min_retention
        );

        Self {
            run_id,
            started_at: Utc::now(),
            clock: Instant::now(),
            min_retention,
            stages: Vec::new(),
            inputs: Vec::new(),
            deduplication: DeduplicationReport::new(strategy),
        }
    }

    pub fn record_stage(&mut self, timing: StageTiming) {
        self.stages.push(timing);
    }

    /// Takes a processed file's report data and hands back its rows for merging.
    pub fn absorb(&mut self, processed: ProcessedFile) -> (u32, Vec<NormalizedRow>) {
        self.inputs.push(processed.summary);
        self.deduplication.record(processed.dedup);
        (processed.slot, processed.rows)
    }

    pub fn finish(
        mut self,
        merge: &MergeOutcome,
        output_path: Option<PathBuf>,
    ) -> (CompilationReport, DeduplicationReport) {
        self.inputs.sort_by_key(|input| input.test);
        self.deduplication.files.sort_by_key(|file| file.test);

        let finished_at = Utc::now();
        let table = &merge.table;

        let report = CompilationReport {
            run_id: self.run_id.to_string(),
            started_at: self.started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            duration_ms: self.clock.elapsed().as_millis() as u64,
            duplicate_strategy: self.deduplication.strategy,
            min_retention_ratio: self.min_retention,
            stages: self.stages,
            inputs: self.inputs,
            expected_identities: merge.expected_identities,
            merged_identities: merge.merged_identities,
            fanout_rows_removed: merge.fanout_rows_removed,
            duplicates_removed_total: self.deduplication.total_removed,
            output: OutputShape {
                rows: table.row_count(),
                columns: table.column_count(),
                header: table.headers.clone(),
            },
            verified: output_path.is_some(),
            output_path,
        };

        (report, self.deduplication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ColumnRoles, FileDeduplicationReport, MergedTable, ResolvedColumn, expected_header,
    };
    use crate::test_support::row;
    use pretty_assertions::assert_eq;

    fn column(header: &str, index: usize) -> ResolvedColumn {
        ResolvedColumn {
            header: header.to_string(),
            index,
            confidence: 1.0,
        }
    }

    fn processed(slot: u32, removed: usize) -> ProcessedFile {
        let rows = vec![row("Alice", "a@x.com", Some(80.0), slot)];
        ProcessedFile {
            slot,
            summary: InputFileSummary {
                test: slot,
                file: PathBuf::from(format!("test_{}.xlsx", slot)),
                sha256: None,
                raw_rows: 1 + removed,
                blank_rows_dropped: 0,
                missing_email_dropped: 0,
                normalized_rows: 1 + removed,
                rows_after_dedup: 1,
                null_scores: 0,
                score_parse_failures: 0,
                all_scores_null: false,
                columns: ColumnRoles {
                    name: column("Full Name", 0),
                    email: column("Email", 1),
                    score: column("Score", 2),
                },
            },
            dedup: FileDeduplicationReport {
                test: slot,
                file: PathBuf::from(format!("test_{}.xlsx", slot)),
                before: 1 + removed,
                after: 1,
                removed,
                flagged: 0,
                duplicate_groups: removed.min(1),
                duplicate_records: vec![],
            },
            rows,
        }
    }

    #[test]
    fn test_finish_orders_inputs_and_totals_removals() {
        let mut context = RunContext::new(DuplicateStrategy::KeepFirst, 0.95);
        let (slot, rows) = context.absorb(processed(2, 1));
        assert_eq!(slot, 2);
        assert_eq!(rows.len(), 1);
        context.absorb(processed(1, 2));
        context.record_stage(StageTiming {
            stage: "merge".to_string(),
            duration_ms: 3,
        });

        let merge = MergeOutcome {
            table: MergedTable {
                headers: expected_header(&[1, 2]),
                slots: vec![1, 2],
                records: vec![],
            },
            expected_identities: 1,
            merged_identities: 1,
            fanout_rows_removed: 0,
        };

        let (report, dedup) = context.finish(&merge, None);

        assert!(Uuid::parse_str(&report.run_id).is_ok());
        assert_eq!(
            report.inputs.iter().map(|i| i.test).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(report.duplicates_removed_total, 3);
        assert_eq!(report.output.columns, 4);
        assert_eq!(report.stages.len(), 1);
        assert!(!report.verified);
        assert_eq!(dedup.total_removed, 3);
        assert_eq!(dedup.files[0].test, 1);
    }
}
