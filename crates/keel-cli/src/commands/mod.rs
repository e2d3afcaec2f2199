//! CLI command implementations

pub(crate) mod apply;
pub(crate) mod common;
pub(crate) mod reset;
pub(crate) mod status;
pub(crate) mod validate;
