//! Structural validation of a [`Schema`] before any database work.

use crate::schema::Schema;
use std::collections::HashSet;
use thiserror::Error;

/// A schema that cannot be applied as written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// V001: Schema name is empty
    #[error("[V001] Schema name not set")]
    MissingName,

    /// V002: A change has no id (`position` is 1-based)
    #[error("[V002] Change {position} has no id")]
    EmptyChangeId { position: usize },

    /// V003: A change id appears more than once
    #[error("[V003] Change id '{id}' already in use")]
    DuplicateChangeId { id: String },
}

/// Check a schema for a name and for non-empty, unique change ids.
///
/// Reports the first violation in declaration order, name first.
pub fn validate_schema(schema: &Schema) -> Result<(), ValidationError> {
    if schema.name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(schema.changes.len());
    for (idx, change) in schema.changes.iter().enumerate() {
        if change.id.is_empty() {
            return Err(ValidationError::EmptyChangeId { position: idx + 1 });
        }
        if !seen.insert(change.id.as_str()) {
            return Err(ValidationError::DuplicateChangeId {
                id: change.id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
