// file: src/normalize/normalizer.rs
// description: projects a raw table onto normalized name, email and score rows
// reference: explicit nullable scores with per-file parse failure accounting

use crate::models::{CellValue, ColumnRoles, NormalizedRow, RawTable};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of reading one score cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedScore {
    Value(f64),
    Blank,
    Invalid,
}

impl ParsedScore {
    pub fn value(self) -> Option<f64> {
        match self {
            ParsedScore::Value(v) => Some(v),
            _ => None,
        }
    }
}

pub fn normalize_email(cell: &CellValue) -> String {
    cell.to_text().to_lowercase()
}

/// Accepts numbers directly; text loses a trailing `%` and surrounding whitespace.
pub fn parse_score(cell: &CellValue) -> ParsedScore {
    match cell {
        CellValue::Empty => ParsedScore::Blank,
        CellValue::Number(n) if n.is_finite() => ParsedScore::Value(*n),
        CellValue::Number(_) | CellValue::Bool(_) => ParsedScore::Invalid,
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return ParsedScore::Blank;
            }
            let stripped = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
            match stripped.parse::<f64>() {
                Ok(v) if v.is_finite() => ParsedScore::Value(v),
                _ => ParsedScore::Invalid,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationStats {
    pub raw_rows: usize,
    pub blank_rows_dropped: usize,
    pub missing_email_dropped: usize,
    pub null_scores: usize,
    pub score_parse_failures: usize,
    pub all_scores_null: bool,
}

#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub test: u32,
    pub rows: Vec<NormalizedRow>,
    pub stats: NormalizationStats,
}

pub struct RowNormalizer;

impl RowNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        file: &Path,
        test: u32,
        table: &RawTable,
        roles: &ColumnRoles,
    ) -> NormalizedTable {
        let mut stats = NormalizationStats {
            raw_rows: table.row_count(),
            ..NormalizationStats::default()
        };
        let mut rows = Vec::with_capacity(table.row_count());

        for row_index in 0..table.row_count() {
            // Header occupies spreadsheet row 1.
            let source_row = row_index + 2;
            let full_name = table.cell(row_index, roles.name.index).to_text();
            let email = normalize_email(table.cell(row_index, roles.email.index));

            if full_name.is_empty() && email.is_empty() {
                stats.blank_rows_dropped += 1;
                continue;
            }

            if email.is_empty() {
                warn!(
                    "Dropping row {} of {} ('{}'): email is empty",
                    source_row,
                    file.display(),
                    full_name
                );
                stats.missing_email_dropped += 1;
                continue;
            }

            let parsed = parse_score(table.cell(row_index, roles.score.index));
            match parsed {
                ParsedScore::Value(_) => {}
                ParsedScore::Blank => stats.null_scores += 1,
                ParsedScore::Invalid => {
                    debug!(
                        "Unparseable score '{}' at row {} of {}; recorded as null",
                        table.cell(row_index, roles.score.index),
                        source_row,
                        file.display()
                    );
                    stats.null_scores += 1;
                    stats.score_parse_failures += 1;
                }
            }

            rows.push(NormalizedRow {
                full_name,
                email,
                score: parsed.value(),
                source_test: test,
                source_row,
                is_duplicate: false,
            });
        }

        stats.all_scores_null = !rows.is_empty() && stats.null_scores == rows.len();

        if stats.score_parse_failures > 0 {
            warn!(
                "{} score value(s) in {} could not be parsed and were recorded as null",
                stats.score_parse_failures,
                file.display()
            );
        }

        if stats.all_scores_null {
            warn!(
                "Every score in {} is null after parsing ({} unparseable); the score column '{}' may be wrong or corrupted",
                file.display(),
                stats.score_parse_failures,
                roles.score.header
            );
        }

        NormalizedTable { test, rows, stats }
    }
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResolvedColumn;
    use pretty_assertions::assert_eq;

    fn roles() -> ColumnRoles {
        let column = |header: &str, index| ResolvedColumn {
            header: header.to_string(),
            index,
            confidence: 1.0,
        };
        ColumnRoles {
            name: column("Name", 0),
            email: column("Email", 1),
            score: column("Score", 3),
        }
    }

    fn table(rows: Vec<Vec<CellValue>>) -> RawTable {
        RawTable::new(
            vec!["Name".into(), "Email".into(), "Dept".into(), "Score".into()],
            rows,
        )
    }

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score(&CellValue::text("92%")), ParsedScore::Value(92.0));
        assert_eq!(parse_score(&CellValue::text(" 87.5 % ")), ParsedScore::Value(87.5));
        assert_eq!(parse_score(&CellValue::Number(71.0)), ParsedScore::Value(71.0));
        assert_eq!(parse_score(&CellValue::text("N/A")), ParsedScore::Invalid);
        assert_eq!(parse_score(&CellValue::text("  ")), ParsedScore::Blank);
        assert_eq!(parse_score(&CellValue::Empty), ParsedScore::Blank);
        assert_eq!(parse_score(&CellValue::text("NaN")), ParsedScore::Invalid);
        assert_eq!(parse_score(&CellValue::text("N/A")).value(), None);
    }

    #[test]
    fn test_email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email(&CellValue::text("  Alice@X.com ")), "alice@x.com");
    }

    #[test]
    fn test_extracts_mapped_columns_only() {
        let table = table(vec![vec![
            "Alice".into(),
            "Alice@X.com".into(),
            "Ops".into(),
            "85%".into(),
        ]]);

        let normalized = RowNormalizer::new().normalize(Path::new("t.xlsx"), 1, &table, &roles());
        assert_eq!(normalized.rows.len(), 1);
        let row = &normalized.rows[0];
        assert_eq!(row.full_name, "Alice");
        assert_eq!(row.email, "alice@x.com");
        assert_eq!(row.score, Some(85.0));
        assert_eq!(row.source_test, 1);
        assert_eq!(row.source_row, 2);
    }

    #[test]
    fn test_drops_blank_and_emailless_rows() {
        let table = table(vec![
            vec!["Alice".into(), "a@x.com".into(), CellValue::Empty, 80.0.into()],
            vec![CellValue::Empty, CellValue::Empty, "Ops".into(), CellValue::Empty],
            vec!["Bob".into(), CellValue::Empty, CellValue::Empty, 70.0.into()],
        ]);

        let normalized = RowNormalizer::new().normalize(Path::new("t.xlsx"), 2, &table, &roles());
        assert_eq!(normalized.rows.len(), 1);
        assert_eq!(normalized.stats.blank_rows_dropped, 1);
        assert_eq!(normalized.stats.missing_email_dropped, 1);
        assert_eq!(normalized.stats.raw_rows, 3);
    }

    #[test]
    fn test_flags_file_where_every_score_fails() {
        let table = table(vec![
            vec!["Alice".into(), "a@x.com".into(), CellValue::Empty, "N/A".into()],
            vec!["Bob".into(), "b@x.com".into(), CellValue::Empty, "absent".into()],
        ]);

        let normalized = RowNormalizer::new().normalize(Path::new("t.xlsx"), 1, &table, &roles());
        assert_eq!(normalized.stats.null_scores, 2);
        assert_eq!(normalized.stats.score_parse_failures, 2);
        assert!(normalized.stats.all_scores_null);
    }

    #[test]
    fn test_blank_scores_are_not_parse_failures() {
        let table = table(vec![
            vec!["Alice".into(), "a@x.com".into(), CellValue::Empty, CellValue::Empty],
            vec!["Bob".into(), "b@x.com".into(), CellValue::Empty, 64.0.into()],
        ]);

        let normalized = RowNormalizer::new().normalize(Path::new("t.xlsx"), 1, &table, &roles());
        assert_eq!(normalized.stats.null_scores, 1);
        assert_eq!(normalized.stats.score_parse_failures, 0);
        assert!(!normalized.stats.all_scores_null);
    }
}
