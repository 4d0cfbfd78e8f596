//! Apply command implementation

use anyhow::{Context, Result};
use ordo_apply::ApplyReport;

use crate::cli::{ApplyArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{ExitCode, Project};

/// Execute the apply command
pub(crate) async fn execute(args: &ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let graph = project.graph()?;
    let engine = project.engine().await?;

    log::info!(
        "Applying {} migrations to {} ({})",
        graph.len(),
        project.resolved.database.db_type,
        project.resolved.database.schema
    );
    let report = engine.apply(&graph).await.context("Apply failed")?;

    match args.output {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.failed.is_empty() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_report(report: &ApplyReport) {
    if report.is_noop() {
        println!("Database is up to date ({} migrations skipped)", report.skipped.len());
        return;
    }
    for name in &report.executed {
        println!("  ✓ {name}");
    }
    for failed in &report.failed {
        println!("  ✗ {} - {}", failed.name, failed.error);
    }
    println!();
    println!(
        "Executed: {}, skipped: {}, failed: {}",
        report.executed.len(),
        report.skipped.len(),
        report.failed.len()
    );
}
