// file: src/pipeline/orchestrator.rs
// description: coordinates discovery, per-file processing, merging and export
// reference: orchestrates the five compilation stages for one run

use crate::config::Config;
use crate::discovery::{DiscoveredFile, Discovery, FileDiscovery};
use crate::error::{CompileError, FileFailure, Result};
use crate::exporter::{JsonExporter, ReportManifest, StagedOutput, WorkbookExporter};
use crate::merge::{MergeEngine, MergeOutcome, SlotRows};
use crate::models::{CompilationReport, DeduplicationReport, MergedTable, RawTable};
use crate::pipeline::context::RunContext;
use crate::pipeline::processor::{FileProcessor, ProcessedFile};
use crate::pipeline::progress::ProgressTracker;
use crate::utils::OperationTimer;
use crate::validation::BatchValidation;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub table: MergedTable,
    pub report: CompilationReport,
    pub deduplication: DeduplicationReport,
    pub reports: Option<ReportManifest>,
}

pub struct Compiler {
    config: Config,
    discovery: FileDiscovery,
    processor: Arc<FileProcessor>,
    max_concurrent_tasks: usize,
    colored: bool,
}

impl Compiler {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let discovery = FileDiscovery::new(&config.discovery);
        let processor = Arc::new(FileProcessor::new(&config));
        let max_concurrent_tasks = config.compile.parallel_workers.max(1);

        Ok(Self {
            config,
            discovery,
            processor,
            max_concurrent_tasks,
            colored: true,
        })
    }

    pub fn with_color(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn discover(&self, input_dir: &Path) -> Result<Discovery> {
        self.discovery.discover(input_dir)
    }

    /// Stages 1-2 over every bound file. Unbound slots are listed in the
    /// result instead of failing it; the caller decides whether to proceed.
    pub fn validate(&self, input_dir: &Path) -> Result<BatchValidation> {
        let discovery = self.discover(input_dir)?;
        let mut batch = self.processor.validator().validate_batch(&discovery.ordered());
        batch.missing = discovery.missing;
        Ok(batch)
    }

    pub async fn compile(&self, input_dir: &Path, output_dir: &Path) -> Result<CompileOutcome> {
        info!(
            "Compiling test results from {} into {}",
            input_dir.display(),
            output_dir.display()
        );
        let mut context = RunContext::new(
            self.config.compile.duplicate_strategy,
            self.config.compile.min_retention_ratio,
        );

        let timer = OperationTimer::new("discovery");
        let discovery = self.discover(input_dir)?;
        let files = self.select_files(&discovery)?;
        let bound: Vec<u32> = discovery.files.keys().copied().collect();
        context.record_stage(timer.finish_with_count(files.len()));

        let timer = OperationTimer::new("process_files");
        let processed = self.process_files(files).await?;
        context.record_stage(timer.finish_with_count(processed.len()));

        let merged = self.merge(&mut context, processed, self.contract(&bound))?;

        let timer = OperationTimer::new("export");
        let exporter = WorkbookExporter::new(
            output_dir,
            &self.config.output.filename,
            &self.config.output.sheet_name,
        );
        let table = merged.table.clone();
        let (mut output, output_path) = tokio::task::spawn_blocking(move || {
            let mut output = StagedOutput::new();
            let target = exporter.stage(&table, &mut output)?;
            Ok::<_, CompileError>((output, target))
        })
        .await
        .map_err(|e| CompileError::ExportVerification(format!("export task failed: {}", e)))??;
        context.record_stage(timer.finish());

        let (report, deduplication) = context.finish(&merged, Some(output_path));

        // Reports and workbook are published together; a failure here drops
        // every staged file.
        let json = JsonExporter::new(output_dir, self.config.output.pretty_reports)?;
        let manifest = json.stage_reports(
            &self.config.output.compilation_report,
            &report,
            &self.config.output.deduplication_report,
            &deduplication,
            &mut output,
        )?;
        output.commit()?;

        self.log_final_stats(&report);

        Ok(CompileOutcome {
            table: merged.table,
            report,
            deduplication,
            reports: Some(manifest),
        })
    }

    /// Stages 3-5 over tables already read by the caller. Nothing is written to disk.
    pub fn compile_tables(&self, tables: Vec<(u32, RawTable)>) -> Result<CompileOutcome> {
        let mut context = RunContext::new(
            self.config.compile.duplicate_strategy,
            self.config.compile.min_retention_ratio,
        );

        self.check_table_slots(&tables)?;
        let expected = self.config.discovery.expected_tests;
        let bound: Vec<u32> = tables.iter().map(|(slot, _)| *slot).collect();
        let missing: Vec<u32> = (1..=expected).filter(|slot| !bound.contains(slot)).collect();
        self.require_slots(&missing, tables.len())?;

        let timer = OperationTimer::new("process_tables");
        let mut processed = Vec::with_capacity(tables.len());
        let mut failures = Vec::new();
        for (slot, table) in tables {
            let label = PathBuf::from(format!("test_{}", slot));
            match self.processor.process_raw(slot, &label, table) {
                Ok(file) => processed.push(file),
                Err(e) => failures.push(FileFailure::new(slot, label, &e)),
            }
        }
        reject_failures(failures)?;
        context.record_stage(timer.finish_with_count(processed.len()));

        let merged = self.merge(&mut context, processed, self.contract(&bound))?;
        let (report, deduplication) = context.finish(&merged, None);

        Ok(CompileOutcome {
            table: merged.table,
            report,
            deduplication,
            reports: None,
        })
    }

    fn select_files(&self, discovery: &Discovery) -> Result<Vec<DiscoveredFile>> {
        self.require_slots(&discovery.missing, discovery.files.len())?;
        Ok(discovery.ordered())
    }

    fn require_slots(&self, missing: &[u32], found: usize) -> Result<()> {
        if missing.is_empty() {
            return Ok(());
        }
        if !self.config.compile.allow_partial {
            return Err(CompileError::IncompleteInput {
                missing: missing.to_vec(),
            });
        }
        if found == 0 {
            return Err(CompileError::NoInput);
        }

        warn!(
            "Proceeding without test slot(s) {:?}; their columns are omitted",
            missing
        );
        Ok(())
    }

    /// Every slot must be in `1..=expected_tests` and appear at most once.
    fn check_table_slots(&self, tables: &[(u32, RawTable)]) -> Result<()> {
        let expected = self.config.discovery.expected_tests;
        let mut seen = HashSet::new();
        let mut repeated = BTreeSet::new();
        let mut outside = BTreeSet::new();

        for (slot, _) in tables {
            if !(1..=expected).contains(slot) {
                outside.insert(*slot);
            } else if !seen.insert(*slot) {
                repeated.insert(*slot);
            }
        }

        let mut problems = Vec::new();
        if !repeated.is_empty() {
            problems.push(format!("slot(s) {:?} given more than once", repeated));
        }
        if !outside.is_empty() {
            problems.push(format!("slot(s) {:?} outside 1..={}", outside, expected));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CompileError::SlotBinding(problems.join("; ")))
        }
    }

    /// Slots the output header must carry: all expected slots, or only the
    /// bound ones when partial runs are allowed.
    fn contract(&self, bound: &[u32]) -> Vec<u32> {
        if self.config.compile.allow_partial {
            let mut slots = bound.to_vec();
            slots.sort_unstable();
            slots.dedup();
            slots
        } else {
            (1..=self.config.discovery.expected_tests).collect()
        }
    }

    async fn process_files(&self, files: Vec<DiscoveredFile>) -> Result<Vec<ProcessedFile>> {
        let processor = self.processor.clone();
        self.run_per_file(files, move |file| processor.process(file)).await
    }

    /// Runs `work` once per file on the blocking pool, bounded by the worker
    /// count and the per-file timeout. Every failure is collected before the
    /// batch is rejected.
    async fn run_per_file<F>(
        &self,
        files: Vec<DiscoveredFile>,
        work: F,
    ) -> Result<Vec<ProcessedFile>>
    where
        F: Fn(&DiscoveredFile) -> Result<ProcessedFile> + Send + Sync + 'static,
    {
        let progress = Arc::new(ProgressTracker::with_options(
            files.len(),
            self.colored,
            self.config.output.show_progress,
        ));
        let timeout_secs = self.config.compile.file_timeout_secs;
        let work = Arc::new(work);

        info!(
            "Processing {} file(s) with {} concurrent tasks...",
            files.len(),
            self.max_concurrent_tasks
        );

        let tasks = files.into_iter().map(|file| {
            let work = work.clone();
            let progress = progress.clone();

            async move {
                let slot = file.slot;
                let path = file.path.clone();
                let task = tokio::task::spawn_blocking(move || (*work)(&file));

                let result = match timeout(Duration::from_secs(timeout_secs), task).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => Err(CompileError::TaskFailed {
                        file: path.clone(),
                        reason: e.to_string(),
                    }),
                    Err(_) => Err(CompileError::Timeout {
                        file: path.clone(),
                        secs: timeout_secs,
                    }),
                };

                match &result {
                    Ok(processed) => progress.inc_files_processed(processed.rows.len()),
                    Err(e) => {
                        progress.inc_files_failed();
                        warn!("Test {} rejected: {}", slot, e);
                    }
                }

                (slot, path, result)
            }
        });

        let results: Vec<(u32, PathBuf, Result<ProcessedFile>)> = stream::iter(tasks)
            .buffer_unordered(self.max_concurrent_tasks)
            .collect()
            .await;

        progress.finish();
        let stats = progress.get_stats();
        info!(
            "Processed {} file(s), {} failed, {} row(s) collected ({:.1}% success)",
            stats.files_processed,
            stats.files_failed,
            stats.rows_collected,
            stats.success_rate()
        );

        let mut processed = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (slot, path, result) in results {
            match result {
                Ok(file) => processed.push(file),
                Err(e) => failures.push(FileFailure::new(slot, path, &e)),
            }
        }
        reject_failures(failures)?;

        processed.sort_by_key(|file| file.slot);
        Ok(processed)
    }

    fn merge(
        &self,
        context: &mut RunContext,
        processed: Vec<ProcessedFile>,
        contract: Vec<u32>,
    ) -> Result<MergeOutcome> {
        let timer = OperationTimer::new("merge");

        let inputs: Vec<SlotRows> = processed
            .into_iter()
            .map(|file| {
                let (slot, rows) = context.absorb(file);
                SlotRows { slot, rows }
            })
            .collect();

        let merged =
            MergeEngine::new(self.config.compile.min_retention_ratio, contract).merge(inputs)?;
        context.record_stage(timer.finish_with_count(merged.table.row_count()));
        Ok(merged)
    }

    fn log_final_stats(&self, report: &CompilationReport) {
        info!("=== Compilation Summary ===");
        info!("Run: {}", report.run_id);
        info!("Duration: {} ms", report.duration_ms);
        info!("Inputs: {}", report.inputs.len());
        info!("Participants: {}", report.merged_identities);
        info!("Duplicates removed: {}", report.duplicates_removed_total);
        if report.fanout_rows_removed > 0 {
            info!("Join fan-out rows removed: {}", report.fanout_rows_removed);
        }
        info!(
            "Output: {} row(s) x {} column(s)",
            report.output.rows, report.output.columns
        );
        info!("===========================");
    }
}

fn reject_failures(mut failures: Vec<FileFailure>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    failures.sort_by_key(|failure| failure.slot);
    for failure in &failures {
        error!("{}", failure);
    }
    Err(CompileError::rejected(failures))
}
