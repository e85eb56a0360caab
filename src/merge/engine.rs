// file: src/merge/engine.rs
// description: outer-joins per-test tables on normalized email into one result table
// reference: seed from the first test, join the rest, reconcile, sort, check header

use crate::error::{CompileError, Result};
use crate::merge::reconcile::{check_header, check_retention};
use crate::models::{MergedRecord, MergedTable, NormalizedRow, expected_header};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Cleaned rows of one test slot, ready to merge.
#[derive(Debug, Clone)]
pub struct SlotRows {
    pub slot: u32,
    pub rows: Vec<NormalizedRow>,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: MergedTable,
    pub expected_identities: usize,
    pub merged_identities: usize,
    pub fanout_rows_removed: usize,
}

pub struct MergeEngine {
    min_retention: f64,
    contract: Vec<u32>,
}

impl MergeEngine {
    /// `contract` is the ordered set of slots the output header must carry.
    pub fn new(min_retention: f64, contract: Vec<u32>) -> Self {
        Self {
            min_retention,
            contract,
        }
    }

    pub fn merge(&self, mut inputs: Vec<SlotRows>) -> Result<MergeOutcome> {
        if inputs.is_empty() {
            return Err(CompileError::NoInput);
        }
        inputs.sort_by_key(|input| input.slot);

        let slots: Vec<u32> = inputs.iter().map(|input| input.slot).collect();
        let expected_identities = union_size(&inputs);
        info!(
            "Merging {} test table(s) covering {} unique participant(s)",
            inputs.len(),
            expected_identities
        );

        let mut records = seed(&inputs[0], slots.len());
        for (position, input) in inputs.iter().enumerate().skip(1) {
            records = outer_join(records, &input.rows, position, slots.len());
            debug!(
                "After joining test {}: {} merged row(s)",
                input.slot,
                records.len()
            );
        }

        let merged_identities = records
            .iter()
            .map(|r| r.email.as_str())
            .collect::<HashSet<_>>()
            .len();
        check_retention(expected_identities, merged_identities, self.min_retention)?;

        let (records, fanout_rows_removed) = drop_fanout(records);
        if fanout_rows_removed > 0 {
            warn!(
                "Removed {} repeated email row(s) introduced by the join",
                fanout_rows_removed
            );
        }

        let records = sort_by_name(records);

        let table = MergedTable {
            headers: expected_header(&slots),
            slots,
            records,
        };
        check_header(&table, &self.contract)?;

        info!(
            "Merged table: {} row(s) x {} column(s)",
            table.row_count(),
            table.column_count()
        );

        Ok(MergeOutcome {
            table,
            expected_identities,
            merged_identities,
            fanout_rows_removed,
        })
    }
}

fn union_size(inputs: &[SlotRows]) -> usize {
    inputs
        .iter()
        .flat_map(|input| input.rows.iter().map(|r| r.email.as_str()))
        .collect::<HashSet<_>>()
        .len()
}

fn seed(first: &SlotRows, width: usize) -> Vec<MergedRecord> {
    first
        .rows
        .iter()
        .map(|row| {
            let mut scores = vec![None; width];
            scores[0] = row.score;
            MergedRecord {
                full_name: row.full_name.clone(),
                email: row.email.clone(),
                scores,
            }
        })
        .collect()
}

/// Full outer join on email. Left rows keep their order; right-only emails
/// follow in their own order. Repeated right emails fan out.
fn outer_join(
    left: Vec<MergedRecord>,
    right: &[NormalizedRow],
    position: usize,
    width: usize,
) -> Vec<MergedRecord> {
    let mut by_email: HashMap<&str, Vec<&NormalizedRow>> = HashMap::new();
    for row in right {
        by_email.entry(row.email.as_str()).or_default().push(row);
    }

    let left_emails: HashSet<String> = left.iter().map(|r| r.email.clone()).collect();
    let mut joined = Vec::with_capacity(left.len() + right.len());

    for record in left {
        match by_email.get(record.email.as_str()) {
            Some(matches) => {
                for row in matches {
                    let mut combined = record.clone();
                    combined.scores[position] = row.score;
                    if combined.full_name.is_empty() && !row.full_name.is_empty() {
                        combined.full_name = row.full_name.clone();
                    }
                    joined.push(combined);
                }
            }
            None => joined.push(record),
        }
    }

    for row in right.iter().filter(|r| !left_emails.contains(&r.email)) {
        let mut scores = vec![None; width];
        scores[position] = row.score;
        joined.push(MergedRecord {
            full_name: row.full_name.clone(),
            email: row.email.clone(),
            scores,
        });
    }

    joined
}

/// Keeps the first row per email.
fn drop_fanout(records: Vec<MergedRecord>) -> (Vec<MergedRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let records: Vec<MergedRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.email.clone()))
        .collect();
    let removed = before - records.len();
    (records, removed)
}

/// Case-insensitive ascending by name; the stable sort keeps email order on ties.
fn sort_by_name(mut records: Vec<MergedRecord>) -> Vec<MergedRecord> {
    records.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::row;
    use pretty_assertions::assert_eq;

    fn slot(slot: u32, rows: Vec<NormalizedRow>) -> SlotRows {
        SlotRows { slot, rows }
    }

    fn engine(min_retention: f64, contract: &[u32]) -> MergeEngine {
        MergeEngine::new(min_retention, contract.to_vec())
    }

    #[test]
    fn test_two_file_outer_join() {
        let a = slot(
            1,
            vec![
                row("Alice", "a@x.com", Some(85.0), 1),
                row("Bob", "b@x.com", Some(92.0), 1),
            ],
        );
        let b = slot(
            2,
            vec![
                row("Alice", "a@x.com", Some(88.0), 2),
                row("Carol", "c@x.com", Some(95.0), 2),
            ],
        );

        let outcome = engine(0.95, &[1, 2]).merge(vec![a, b]).unwrap();
        let table = outcome.table;

        assert_eq!(
            table.headers,
            vec!["Full Name", "Email", "Test 1 (%)", "Test 2 (%)"]
        );
        assert_eq!(
            table
                .records
                .iter()
                .map(|r| (r.full_name.as_str(), r.scores.clone()))
                .collect::<Vec<_>>(),
            vec![
                ("Alice", vec![Some(85.0), Some(88.0)]),
                ("Bob", vec![Some(92.0), None]),
                ("Carol", vec![None, Some(95.0)]),
            ]
        );
        assert_eq!(outcome.expected_identities, 3);
        assert_eq!(outcome.merged_identities, 3);
    }

    #[test]
    fn test_name_backfilled_from_later_test() {
        let a = slot(1, vec![row("", "late@x.com", Some(50.0), 1)]);
        let b = slot(2, vec![row("Late Starter", "late@x.com", Some(60.0), 2)]);

        let table = engine(0.95, &[1, 2]).merge(vec![a, b]).unwrap().table;
        assert_eq!(table.records[0].full_name, "Late Starter");
    }

    #[test]
    fn test_first_non_empty_name_wins() {
        let a = slot(1, vec![row("Dana", "d@x.com", Some(50.0), 1)]);
        let b = slot(2, vec![row("Dana Smith", "d@x.com", Some(60.0), 2)]);

        let table = engine(0.95, &[1, 2]).merge(vec![a, b]).unwrap().table;
        assert_eq!(table.records[0].full_name, "Dana");
    }

    #[test]
    fn test_sort_is_case_insensitive_and_stable() {
        let a = slot(
            1,
            vec![
                row("bob", "b2@x.com", None, 1),
                row("Alice", "a@x.com", None, 1),
                row("Bob", "b1@x.com", None, 1),
            ],
        );

        let table = engine(0.95, &[1]).merge(vec![a]).unwrap().table;
        assert_eq!(
            table.records.iter().map(|r| r.email.as_str()).collect::<Vec<_>>(),
            vec!["a@x.com", "b2@x.com", "b1@x.com"]
        );
    }

    #[test]
    fn test_flagged_duplicates_fan_out_then_collapse() {
        let mut first = row("Jane", "j@x.com", Some(70.0), 1);
        first.is_duplicate = true;
        let mut second = row("Jane", "j@x.com", Some(75.0), 1);
        second.is_duplicate = true;

        let a = slot(1, vec![first, second]);
        let b = slot(2, vec![row("Jane", "j@x.com", Some(80.0), 2)]);

        let outcome = engine(0.95, &[1, 2]).merge(vec![a, b]).unwrap();
        assert_eq!(outcome.fanout_rows_removed, 1);
        assert_eq!(outcome.table.records.len(), 1);
        assert_eq!(outcome.table.records[0].scores, vec![Some(70.0), Some(80.0)]);
    }

    #[test]
    fn test_inputs_are_ordered_by_slot() {
        let later = slot(3, vec![row("Eve", "e@x.com", Some(30.0), 3)]);
        let earlier = slot(1, vec![row("Eve", "e@x.com", Some(10.0), 1)]);

        let table = engine(0.95, &[1, 3]).merge(vec![later, earlier]).unwrap().table;
        assert_eq!(table.headers, vec!["Full Name", "Email", "Test 1 (%)", "Test 3 (%)"]);
        assert_eq!(table.records[0].scores, vec![Some(10.0), Some(30.0)]);
    }

    #[test]
    fn test_every_identity_survives_five_tests() {
        let inputs: Vec<SlotRows> = (1..=5)
            .map(|s| {
                slot(
                    s,
                    (0..10)
                        .filter(|i| (i + s as usize) % 3 != 0)
                        .map(|i| row(&format!("P{}", i), &format!("p{}@x.com", i), Some(s as f64), s))
                        .collect(),
                )
            })
            .collect();

        let outcome = engine(1.0, &[1, 2, 3, 4, 5]).merge(inputs).unwrap();
        assert_eq!(outcome.expected_identities, 10);
        assert_eq!(outcome.table.row_count(), 10);
        assert_eq!(outcome.table.column_count(), 7);
    }

    #[test]
    fn test_empty_first_test_still_merges() {
        let a = slot(1, vec![]);
        let b = slot(2, vec![row("Fay", "f@x.com", Some(40.0), 2)]);
        let c = slot(3, vec![row("Fay", "f@x.com", Some(45.0), 3)]);

        let table = engine(0.95, &[1, 2, 3]).merge(vec![a, b, c]).unwrap().table;
        assert_eq!(table.records[0].scores, vec![None, Some(40.0), Some(45.0)]);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            engine(0.95, &[1]).merge(vec![]),
            Err(CompileError::NoInput)
        ));
    }

    #[test]
    fn test_repeated_slot_breaks_header_contract() {
        let a = slot(1, vec![row("Gus", "g@x.com", Some(10.0), 1)]);
        let again = slot(1, vec![row("Gus", "g@x.com", Some(11.0), 1)]);
        let b = slot(2, vec![row("Gus", "g@x.com", Some(20.0), 2)]);

        match engine(0.95, &[1, 2]).merge(vec![a, again, b]) {
            Err(CompileError::ColumnOrder { expected, actual }) => {
                assert_eq!(expected, expected_header(&[1, 2]));
                assert_eq!(actual, expected_header(&[1, 1, 2]));
            }
            other => panic!("expected ColumnOrder, got {:?}", other),
        }
    }

    #[test]
    fn test_slot_outside_contract_breaks_header() {
        let a = slot(1, vec![row("Hal", "h@x.com", Some(10.0), 1)]);
        let b = slot(9, vec![row("Hal", "h@x.com", Some(90.0), 9)]);

        assert!(matches!(
            engine(0.95, &[1, 2]).merge(vec![a, b]),
            Err(CompileError::ColumnOrder { .. })
        ));
    }

    #[test]
    fn test_missing_contract_slot_breaks_header() {
        let a = slot(1, vec![row("Ida", "i@x.com", Some(10.0), 1)]);

        assert!(matches!(
            engine(0.95, &[1, 2]).merge(vec![a]),
            Err(CompileError::ColumnOrder { .. })
        ));
    }

    #[test]
    fn test_strict_retention_holds_through_fanout() {
        let mut first = row("Kim", "k@x.com", Some(70.0), 1);
        first.is_duplicate = true;
        let mut second = row("Kim", "k@x.com", Some(71.0), 1);
        second.is_duplicate = true;

        let a = slot(1, vec![first, second, row("Lee", "l@x.com", Some(60.0), 1)]);
        let b = slot(
            2,
            vec![
                row("Kim", "k@x.com", Some(80.0), 2),
                row("Mo", "m@x.com", Some(50.0), 2),
            ],
        );

        let outcome = engine(1.0, &[1, 2]).merge(vec![a, b]).unwrap();
        assert_eq!(outcome.expected_identities, 3);
        assert_eq!(outcome.merged_identities, 3);
        assert_eq!(outcome.fanout_rows_removed, 1);
        assert_eq!(outcome.table.row_count(), 3);
    }
}
