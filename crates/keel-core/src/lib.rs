//! keel-core - Core library for Keel
//!
//! This crate provides the schema data model, the schema validator, the
//! change orderer, and YAML configuration loading shared by every Keel
//! component. It performs no database I/O.

pub mod config;
pub mod error;
pub mod ordering;
pub mod schema;
pub mod sql_utils;
pub mod validation;

pub use config::{load_schema, ProjectConfig, DEFAULT_LOCK_KEY};
pub use error::{CoreError, CoreResult};
pub use ordering::{pending_changes, verify_applied_prefix, OrderingError, PendingChange};
pub use schema::{Change, Schema};
pub use validation::{validate_schema, ValidationError};
