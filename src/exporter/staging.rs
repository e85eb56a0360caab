// file: src/exporter/staging.rs
// description: groups staged output files so a run publishes all of them or none
// reference: write-to-sibling then rename

use crate::error::{CompileError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Hidden sibling used while a file is being written.
pub fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.partial", name))
}

#[derive(Debug, Default)]
pub struct StagedOutput {
    files: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, staging: PathBuf, target: PathBuf) {
        self.files.push((staging, target));
    }

    /// Renames every staged file into place in push order. If one rename
    /// fails, targets already moved are removed along with the remaining
    /// staged files.
    pub fn commit(mut self) -> Result<Vec<PathBuf>> {
        let files = std::mem::take(&mut self.files);
        let mut committed: Vec<PathBuf> = Vec::with_capacity(files.len());

        for (position, (staging, target)) in files.iter().enumerate() {
            if let Err(source) = fs::rename(staging, target) {
                error!(
                    "Could not move {} into place; discarding this run's output",
                    target.display()
                );
                for path in &committed {
                    let _ = fs::remove_file(path);
                }
                for (pending, _) in &files[position..] {
                    let _ = fs::remove_file(pending);
                }
                return Err(CompileError::FileOperation {
                    path: target.clone(),
                    source,
                });
            }
            debug!("Committed {}", target.display());
            committed.push(target.clone());
        }

        Ok(committed)
    }
}

/// Uncommitted output is removed when dropped.
impl Drop for StagedOutput {
    fn drop(&mut self) {
        for (staging, _) in self.files.drain(..) {
            let _ = fs::remove_file(&staging);
        }
    }
}
