// file: src/normalize/dedup.rs
// description: per-file duplicate email resolution under one run-wide policy
// reference: exhaustive policy enum with one handler per case

use crate::error::{CompileError, Result};
use crate::models::{DuplicateRecord, FileDeduplicationReport, NormalizedRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DuplicateStrategy {
    KeepFirst,
    KeepLast,
    Error,
    Flag,
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DuplicateStrategy::KeepFirst => "keep_first",
            DuplicateStrategy::KeepLast => "keep_last",
            DuplicateStrategy::Error => "error",
            DuplicateStrategy::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// Emails seen more than once, in order of first appearance, with their row indices.
type DuplicateGroups = Vec<(String, Vec<usize>)>;

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub rows: Vec<NormalizedRow>,
    pub report: FileDeduplicationReport,
}

pub struct Deduplicator {
    strategy: DuplicateStrategy,
}

impl Deduplicator {
    pub fn new(strategy: DuplicateStrategy) -> Self {
        Self { strategy }
    }

    /// Resolves duplicate groups in `rows`. Under `Error` any group fails the file.
    pub fn apply(
        &self,
        file: &Path,
        test: u32,
        mut rows: Vec<NormalizedRow>,
    ) -> Result<DedupOutcome> {
        let before = rows.len();
        let groups = duplicate_groups(&rows);
        let extra_rows: usize = groups.iter().map(|(_, members)| members.len() - 1).sum();

        let keep = match self.strategy {
            DuplicateStrategy::KeepFirst => survivors(before, &groups, |members| members[0]),
            DuplicateStrategy::KeepLast => {
                survivors(before, &groups, |members| members[members.len() - 1])
            }
            DuplicateStrategy::Error => {
                if extra_rows > 0 {
                    warn!(
                        "{} has {} duplicate row(s) across {} email(s)",
                        file.display(),
                        extra_rows,
                        groups.len()
                    );
                    return Err(CompileError::DuplicateEmails {
                        file: file.to_path_buf(),
                        duplicates: extra_rows,
                    });
                }
                vec![true; before]
            }
            DuplicateStrategy::Flag => {
                for (_, members) in &groups {
                    for &i in members {
                        rows[i].is_duplicate = true;
                    }
                }
                vec![true; before]
            }
        };

        let duplicate_records = audit_records(&rows, &groups, &keep);
        let flagged = if self.strategy == DuplicateStrategy::Flag {
            duplicate_records.len()
        } else {
            0
        };

        let rows: Vec<NormalizedRow> = rows
            .into_iter()
            .zip(keep)
            .filter_map(|(row, kept)| kept.then_some(row))
            .collect();

        let report = FileDeduplicationReport {
            test,
            file: file.to_path_buf(),
            before,
            after: rows.len(),
            removed: before - rows.len(),
            flagged,
            duplicate_groups: groups.len(),
            duplicate_records,
        };

        if !groups.is_empty() {
            info!(
                "{}: {} duplicate group(s), {} row(s) removed, {} flagged ({})",
                file.display(),
                report.duplicate_groups,
                report.removed,
                report.flagged,
                self.strategy
            );
        }

        Ok(DedupOutcome { rows, report })
    }
}

fn duplicate_groups(rows: &[NormalizedRow]) -> DuplicateGroups {
    let mut order: Vec<&str> = Vec::new();
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let entry = members.entry(row.email.as_str()).or_default();
        if entry.is_empty() {
            order.push(row.email.as_str());
        }
        entry.push(i);
    }

    order
        .into_iter()
        .filter_map(|email| {
            let indices = members.remove(email)?;
            (indices.len() > 1).then(|| (email.to_string(), indices))
        })
        .collect()
}

fn survivors(len: usize, groups: &DuplicateGroups, pick: impl Fn(&[usize]) -> usize) -> Vec<bool> {
    let mut keep = vec![true; len];
    for (_, members) in groups {
        let winner = pick(members);
        for &i in members {
            keep[i] = i == winner;
        }
    }
    keep
}

fn audit_records(
    rows: &[NormalizedRow],
    groups: &DuplicateGroups,
    keep: &[bool],
) -> Vec<DuplicateRecord> {
    groups
        .iter()
        .flat_map(|(_, members)| members.iter())
        .map(|&i| DuplicateRecord {
            email: rows[i].email.clone(),
            full_name: rows[i].full_name.clone(),
            score: rows[i].score,
            source_row: rows[i].source_row,
            kept: keep[i],
        })
        .collect()
}
