//! Plan command implementation

use anyhow::{Context, Result};
use ordo_apply::PlanEntry;

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::Project;

/// Execute the plan command
pub(crate) async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let graph = project.graph()?;
    let engine = project.engine().await?;

    let plan = engine.plan(&graph).await.context("Failed to build plan")?;

    match args.output {
        OutputFormat::Table => print_table(&plan),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

fn print_table(plan: &[PlanEntry]) {
    let name_width = plan.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    let author_width = plan.iter().map(|p| p.author.len()).max().unwrap_or(6).max(6);
    let status_width = 12;

    println!(
        "{:>5}  {:<name_width$}  {:<author_width$}  {:<status_width$}  DECISION",
        "ORDER", "NAME", "AUTHOR", "STATUS",
    );
    println!(
        "{:->5}  {:-<name_width$}  {:-<author_width$}  {:-<status_width$}  {}",
        "",
        "",
        "",
        "",
        "-".repeat(8),
    );
    for entry in plan {
        println!(
            "{:>5}  {:<name_width$}  {:<author_width$}  {:<status_width$}  {}",
            entry.actual_order,
            entry.name,
            entry.author,
            entry.run_status.to_string(),
            entry.decision,
        );
    }
}
