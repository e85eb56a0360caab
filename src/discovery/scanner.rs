// file: src/discovery/scanner.rs
// description: binds spreadsheet files in an input directory to test slots
// reference: https://docs.rs/walkdir

use crate::config::DiscoveryConfig;
use crate::discovery::classifier::SlotClassifier;
use crate::error::{CompileError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct FileDiscovery {
    classifier: SlotClassifier,
    extension: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredFile {
    pub slot: u32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub expected: u32,
    pub files: BTreeMap<u32, PathBuf>,
    pub missing: Vec<u32>,
}

impl Discovery {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fails with the missing slot numbers unless every slot resolved.
    pub fn require_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(CompileError::IncompleteInput {
                missing: self.missing.clone(),
            })
        }
    }

    /// Bound files ordered by slot.
    pub fn ordered(&self) -> Vec<DiscoveredFile> {
        self.files
            .iter()
            .map(|(&slot, path)| DiscoveredFile {
                slot,
                path: path.clone(),
            })
            .collect()
    }
}

impl FileDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            classifier: SlotClassifier::new(config.expected_tests, config.slot_patterns.clone()),
            extension: config.extension.to_lowercase(),
        }
    }

    pub fn discover(&self, root: &Path) -> Result<Discovery> {
        info!("Scanning directory: {}", root.display());

        if !root.is_dir() {
            return Err(CompileError::Validation {
                file: root.to_path_buf(),
                reason: "input path is not a directory".to_string(),
            });
        }

        let candidates = self.candidates(root);
        for path in &candidates {
            let slots = self.classifier.classify(path);
            if slots.len() > 1 {
                warn!(
                    "{} matches test slots {:?}; it is bound to the first free one only",
                    path.display(),
                    slots
                );
            }
        }

        let mut files: BTreeMap<u32, PathBuf> = BTreeMap::new();

        for slot in 1..=self.classifier.expected() {
            let matching: Vec<&PathBuf> = candidates
                .iter()
                .filter(|path| self.classifier.matches_slot(path, slot))
                .filter(|path| !files.values().any(|bound| bound == *path))
                .collect();

            match matching.as_slice() {
                [] => debug!("No file matched test slot {}", slot),
                [chosen, rest @ ..] => {
                    if !rest.is_empty() {
                        warn!(
                            "Test slot {} matched {} files; using {} and ignoring {}",
                            slot,
                            matching.len(),
                            chosen.display(),
                            rest.iter()
                                .map(|p| p.display().to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                    }
                    info!("Test slot {} -> {}", slot, chosen.display());
                    files.insert(slot, (*chosen).clone());
                }
            }
        }

        let missing: Vec<u32> = (1..=self.classifier.expected())
            .filter(|slot| !files.contains_key(slot))
            .collect();

        if missing.is_empty() {
            info!("All {} test slots resolved", self.classifier.expected());
        } else {
            warn!(
                "Resolved {} of {} test slots; missing {:?}",
                files.len(),
                self.classifier.expected(),
                missing
            );
        }

        Ok(Discovery {
            expected: self.classifier.expected(),
            files,
            missing,
        })
    }

    fn candidates(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                if self.classifier.is_ignored(path) {
                    debug!("Skipping file: {}", path.display());
                    return false;
                }
                path.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
            })
            .collect()
    }
}
