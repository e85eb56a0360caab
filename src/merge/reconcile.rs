// file: src/merge/reconcile.rs
// description: identity-loss trip-wire and output header contract
// reference: fatal checks run before anything is exported

use crate::error::{CompileError, Result};
use crate::models::{MergedTable, expected_header};
use tracing::warn;

/// Fails when fewer than `min_retention` of the expected identities survived.
///
/// The margin only absorbs legitimate in-file deduplication; it is a loose
/// trip-wire rather than a correctness proof. `min_retention = 1.0` makes any
/// loss fatal.
pub fn check_retention(expected: usize, merged: usize, min_retention: f64) -> Result<()> {
    let missing = expected.saturating_sub(merged);

    if (merged as f64) < (expected as f64) * min_retention {
        return Err(CompileError::DataLoss {
            expected,
            merged,
            missing,
            min_retention,
        });
    }

    if missing > 0 {
        warn!(
            "Merged table holds {} of {} expected participants ({} missing, within tolerance {})",
            merged, expected, missing, min_retention
        );
    }

    Ok(())
}

/// The header must equal the run's contract exactly, and every record must
/// carry one score per contracted slot.
pub fn check_header(table: &MergedTable, contract: &[u32]) -> Result<()> {
    let expected = expected_header(contract);

    if table.headers != expected || table.slots != contract {
        return Err(CompileError::ColumnOrder {
            expected,
            actual: table.headers.clone(),
        });
    }

    if let Some(record) = table
        .records
        .iter()
        .find(|r| r.scores.len() != contract.len())
    {
        return Err(CompileError::ColumnOrder {
            expected,
            actual: vec![format!(
                "row for '{}' has {} score cells",
                record.email,
                record.scores.len()
            )],
        });
    }

    Ok(())
}
