//! Reset command implementation

use anyhow::Result;
use keel_db::Backend;

use crate::cli::{GlobalArgs, ResetArgs};
use crate::commands::apply::print_report;
use crate::commands::common::{
    load_config, load_valid_schema, migrate_failure, open, run_blocking, schema_path, ExitCode,
};

/// Execute the reset command
pub async fn execute(args: &ResetArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let schema = load_valid_schema(&schema_path(&config, args.schema.as_deref()))?;

    if !args.yes {
        eprintln!(
            "Refusing to drop namespace '{}' and all of its data without --yes",
            schema.name
        );
        return Err(ExitCode(1).into());
    }

    let applier = open(global, &config)?;
    log::warn!("Dropping namespace '{}' before applying", schema.name);

    let report = run_blocking(move |ctx| applier.destroy_and_apply(ctx, &schema))
        .await?
        .map_err(migrate_failure)?;
    print_report(&report, args.output)
}
