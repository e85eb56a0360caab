// file: src/models/record.rs
// description: resolved column roles, normalized rows and merged output records
// reference: internal data structures

use serde::{Deserialize, Serialize};
use std::fmt;

pub const NAME_HEADER: &str = "Full Name";
pub const EMAIL_HEADER: &str = "Email";

/// Semantic column a file must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Name,
    Email,
    Score,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Name, Role::Email, Role::Score];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Name => "name",
            Role::Email => "email",
            Role::Score => "score",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    pub header: String,
    pub index: usize,
    pub confidence: f64,
}

/// Mapping of the three roles to distinct headers of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub name: ResolvedColumn,
    pub email: ResolvedColumn,
    pub score: ResolvedColumn,
}

impl ColumnRoles {
    pub fn get(&self, role: Role) -> &ResolvedColumn {
        match role {
            Role::Name => &self.name,
            Role::Email => &self.email,
            Role::Score => &self.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub full_name: String,
    /// Lowercased and trimmed; never empty.
    pub email: String,
    pub score: Option<f64>,
    pub source_test: u32,
    /// 1-based spreadsheet row number, header being row 1.
    pub source_row: usize,
    /// Set only under the `flag` duplicate strategy.
    pub is_duplicate: bool,
}

/// Column label for a test slot in the output workbook.
pub fn score_label(slot: u32) -> String {
    format!("Test {} (%)", slot)
}

/// The fixed output header for the given ordered slots.
pub fn expected_header(slots: &[u32]) -> Vec<String> {
    let mut header = vec![NAME_HEADER.to_string(), EMAIL_HEADER.to_string()];
    header.extend(slots.iter().map(|&slot| score_label(slot)));
    header
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub full_name: String,
    pub email: String,
    /// One entry per slot, aligned with `MergedTable::slots`.
    pub scores: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTable {
    pub headers: Vec<String>,
    pub slots: Vec<u32>,
    pub records: Vec<MergedRecord>,
}

impl MergedTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn find(&self, email: &str) -> Option<&MergedRecord> {
        self.records.iter().find(|r| r.email == email)
    }
}
