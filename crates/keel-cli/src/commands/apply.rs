//! Apply command implementation

use anyhow::Result;
use keel_db::{ApplyReport, Backend};

use crate::cli::{ApplyArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{
    load_config, load_valid_schema, migrate_failure, open, print_json, run_blocking, schema_path,
};

/// Execute the apply command
pub async fn execute(args: &ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let schema = load_valid_schema(&schema_path(&config, args.schema.as_deref()))?;
    let applier = open(global, &config)?;
    log::debug!(
        "Applying '{}' with {} backend",
        schema.name,
        applier.backend_name()
    );

    let report = run_blocking(move |ctx| applier.apply(ctx, &schema))
        .await?
        .map_err(migrate_failure)?;
    print_report(&report, args.output)
}

/// Print an apply or reset outcome.
pub(crate) fn print_report(report: &ApplyReport, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        return print_json(report);
    }

    if report.destroyed {
        println!("Dropped namespace '{}'", report.namespace);
    }
    if report.applied.is_empty() {
        println!(
            "'{}' is up to date at version {}",
            report.namespace, report.to_version
        );
        return Ok(());
    }

    println!(
        "Applied {} change(s) to '{}' (version {} -> {})",
        report.applied.len(),
        report.namespace,
        report.from_version,
        report.to_version
    );
    for (offset, id) in report.applied.iter().enumerate() {
        println!("  {:>4}  {}", report.from_version + offset as i64 + 1, id);
    }
    Ok(())
}
