//! Unlock command implementation

use anyhow::{Context, Result};

use crate::cli::GlobalArgs;
use crate::commands::common::Project;

/// Execute the unlock command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.engine().await?;

    if engine.unlock().await.context("Failed to release lock")? {
        println!("Released migration lock in schema {}", engine.schema());
    } else {
        println!("Migration lock was not held");
    }
    Ok(())
}
