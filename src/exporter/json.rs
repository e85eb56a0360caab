// file: src/exporter/json.rs
// description: json export of compilation and deduplication reports

use crate::error::{CompileError, Result};
use crate::exporter::staging::{StagedOutput, staging_path};
use crate::models::{CompilationReport, DeduplicationReport};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
    pretty: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportManifest {
    pub compilation_report: PathBuf,
    pub deduplication_report: PathBuf,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|source| CompileError::FileOperation {
            path: output_dir.clone(),
            source,
        })?;
        Ok(Self { output_dir, pretty })
    }

    pub fn export<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let mut output = StagedOutput::new();
        let path = self.stage(file_name, value, &mut output)?;
        output.commit()?;
        Ok(path)
    }

    /// Serializes `value` next to its final path; `output` publishes it.
    pub fn stage<T: Serialize>(
        &self,
        file_name: &str,
        value: &T,
        output: &mut StagedOutput,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let staging = staging_path(&path);
        let contents = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        fs::write(&staging, contents).map_err(|source| CompileError::FileOperation {
            path: path.clone(),
            source,
        })?;
        output.push(staging, path.clone());

        info!("Staged report {}", path.display());
        Ok(path)
    }

    pub fn stage_reports(
        &self,
        compilation_name: &str,
        compilation: &CompilationReport,
        deduplication_name: &str,
        deduplication: &DeduplicationReport,
        output: &mut StagedOutput,
    ) -> Result<ReportManifest> {
        Ok(ReportManifest {
            compilation_report: self.stage(compilation_name, compilation, output)?,
            deduplication_report: self.stage(deduplication_name, deduplication, output)?,
        })
    }
}
