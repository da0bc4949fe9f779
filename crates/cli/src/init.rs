//! `forksync init`: write a starter configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Confirm;

use forksync_core::SyncConfig;

use crate::style::Status;

pub fn run_init(output: &Path) -> Result<()> {
    if output.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!(
                "{}",
                Status::Attention.line("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    std::fs::write(output, SyncConfig::default_template())
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}",
        Status::Done.line(&format!("Configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Set [template] url to the repository this project was generated from");
    println!("  2. Preview pending updates: forksync check");
    println!("  3. Apply them: forksync pull");
    Ok(())
}
