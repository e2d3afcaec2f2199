//! Change ordering: which changes are still pending for a recorded version.
//!
//! Ordinals are positional. The change at index `i` of the declared list is
//! version `i + 1`, so a database recorded at version `v` has applied exactly
//! the first `v` declared changes.

use crate::schema::Change;
use thiserror::Error;

/// A change that still has to be applied, paired with the version it will
/// record once committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChange<'a> {
    pub version: i64,
    pub change: &'a Change,
}

/// Recorded history disagrees with the declared change list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    /// V004: The id applied at `version` is not the id declared there
    #[error(
        "[V004] History mismatch at version {version}: applied '{recorded}', schema declares '{declared}'"
    )]
    HistoryMismatch {
        version: i64,
        recorded: String,
        declared: String,
    },
}

/// Return the changes after `current_version`, numbered from `current_version + 1`.
///
/// Declared order is preserved as-is. A version at or beyond the end of the
/// list yields an empty plan; a negative version is treated as zero.
pub fn pending_changes(current_version: i64, changes: &[Change]) -> Vec<PendingChange<'_>> {
    let start = usize::try_from(current_version.max(0)).unwrap_or(usize::MAX);
    let base = start as i64;
    changes
        .iter()
        .skip(start)
        .enumerate()
        .map(|(offset, change)| PendingChange {
            version: base + offset as i64 + 1,
            change,
        })
        .collect()
}

/// Check that the ids recorded in history match the declared changes at the
/// same versions.
///
/// `applied` is `(version, id)` pairs read from the history table. Versions
/// beyond the declared list are ignored; the database being ahead of the
/// caller's schema is not an ordering problem.
pub fn verify_applied_prefix(
    applied: &[(i64, String)],
    changes: &[Change],
) -> Result<(), OrderingError> {
    for (version, recorded) in applied {
        let Some(idx) = usize::try_from(*version - 1).ok() else {
            continue;
        };
        let Some(declared) = changes.get(idx) else {
            continue;
        };
        if declared.id != *recorded {
            return Err(OrderingError::HistoryMismatch {
                version: *version,
                recorded: recorded.clone(),
                declared: declared.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "ordering_test.rs"]
mod tests;
