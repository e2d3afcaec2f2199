//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Keel - apply forward-only schema changes under an advisory lock
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to keel.yml (default: ./keel.yml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL (postgres://..., duckdb:<path>, :memory:)
    #[arg(short = 'd', long, global = true, env = "KEEL_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Advisory lock key shared by every applier of the database
    #[arg(long, global = true, env = "KEEL_LOCK_KEY", allow_negative_numbers = true)]
    pub lock_key: Option<i64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a schema file without touching the database
    Validate(ValidateArgs),

    /// Apply pending changes
    ///
    /// Waits while another applier holds the advisory lock; Ctrl-C stops the
    /// wait. A DuckDB file that another process has open is refused instead
    /// of waited for: retry once that process exits.
    Apply(ApplyArgs),

    /// Drop the namespace and apply every change from scratch
    ///
    /// Takes the same advisory lock as `apply`. A DuckDB file that another
    /// process has open is refused: retry once that process exits.
    Reset(ResetArgs),

    /// Show the recorded version, dirty flag, and history of a namespace
    Status(StatusArgs),
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Arguments for the validate command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Schema file (overrides `schema` in keel.yml)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

/// Arguments for the apply command
#[derive(Args, Debug, Default)]
pub struct ApplyArgs {
    /// Schema file (overrides `schema` in keel.yml)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the reset command
#[derive(Args, Debug, Default)]
pub struct ResetArgs {
    /// Schema file (overrides `schema` in keel.yml)
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Confirm that the namespace and all of its data will be dropped
    #[arg(long)]
    pub yes: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the status command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Namespace to inspect (default: the schema file's name)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Schema file used to find the namespace when --namespace is not given
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
