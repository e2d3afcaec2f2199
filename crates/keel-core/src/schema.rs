//! Schema and change definitions.
//!
//! A [`Schema`] is the caller-owned description of a namespace: its name and
//! the ordered list of [`Change`]s that build it. Order is positional, so the
//! list must only ever grow at the end once any change has been applied.

use serde::{Deserialize, Serialize};

/// A single forward-only schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Stable identifier, unique within its schema and never reused.
    pub id: String,

    /// SQL to execute. May contain several `;`-separated statements.
    pub statement: String,
}

impl Change {
    /// Create a change from an id and its SQL text.
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
        }
    }
}

/// A named namespace and the ordered changes that build it.
///
/// Fields are plain strings so that malformed input can be represented and
/// reported by [`crate::validate_schema`] rather than rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Namespace name (database schema) managed by this definition.
    pub name: String,

    /// Changes in application order.
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl Schema {
    /// Create an empty schema with the given namespace name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changes: Vec::new(),
        }
    }

    /// Append a change, builder style.
    pub fn with_change(mut self, id: impl Into<String>, statement: impl Into<String>) -> Self {
        self.changes.push(Change::new(id, statement));
        self
    }

    /// Append a change in place.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Number of declared changes, i.e. the version a fully applied schema reaches.
    pub fn target_version(&self) -> i64 {
        self.changes.len() as i64
    }
}
