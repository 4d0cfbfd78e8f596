//! List command implementation

use anyhow::Result;
use ordo_core::MigrationGraph;
use serde_json::json;

use crate::cli::{GlobalArgs, LsArgs, LsOutput};
use crate::commands::common::Project;

/// Execute the ls command
pub(crate) async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let graph = project.graph()?;

    match args.output {
        LsOutput::Table => print_table(&graph),
        LsOutput::Json => print_json(&graph)?,
        LsOutput::Clusters => print_clusters(&graph),
    }
    Ok(())
}

fn print_table(graph: &MigrationGraph) {
    let migrations = graph.ordered_migrations();
    let name_width = migrations
        .iter()
        .map(|m| m.name().len())
        .max()
        .unwrap_or(4)
        .max(4);
    let file_width = migrations
        .iter()
        .map(|m| m.filename().len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<name_width$}  {:<file_width$}  {:<8}  RUN_AFTER",
        "NAME", "FILE", "RUN"
    );
    println!(
        "{:-<name_width$}  {:-<file_width$}  {:-<8}  {}",
        "",
        "",
        "",
        "-".repeat(20)
    );
    for m in migrations {
        let previous: Vec<&str> = graph
            .previous(m.name().as_str())
            .iter()
            .map(|p| p.name().as_str())
            .collect();
        println!(
            "{:<name_width$}  {:<file_width$}  {:<8}  {}",
            m.name().as_str(),
            m.filename(),
            m.run_modifier().as_str(),
            if previous.is_empty() {
                "-".to_string()
            } else {
                previous.join(", ")
            }
        );
    }
}

fn print_json(graph: &MigrationGraph) -> Result<()> {
    let migrations: Vec<_> = graph
        .ordered_migrations()
        .into_iter()
        .map(|m| {
            json!({
                "name": m.name().as_str(),
                "author": m.author(),
                "path": m.path().display().to_string(),
                "run": m.run_modifier(),
                "hash": m.hash(),
                "previous": graph
                    .previous(m.name().as_str())
                    .iter()
                    .map(|p| p.name().as_str())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&migrations)?);
    Ok(())
}

fn print_clusters(graph: &MigrationGraph) {
    for cluster in graph.clusters() {
        let roots: Vec<&str> = cluster.roots().iter().map(|r| r.as_str()).collect();
        println!("cluster {} (roots: {})", cluster.key(), roots.join(", "));
        for member in cluster.members() {
            println!("  {}", member.as_str());
        }
    }
}
