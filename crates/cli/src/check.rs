//! `forksync check`: report pending template updates without applying them.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use forksync_core::bump::DependencyBump;
use forksync_core::models::UpdateSet;
use forksync_core::TemplateSync;

use crate::prompt::{new_spinner, suspect_fork_point};
use crate::style::{self, Status};

pub async fn run_check(sync: TemplateSync, json: bool) -> Result<()> {
    if json {
        let updates = sync.check().await?;
        let rendered =
            serde_json::to_string_pretty(&updates).context("failed to serialize updates")?;
        println!("{}", rendered);
        return Ok(());
    }

    let spinner = new_spinner(format!(
        "Fetching template {}...",
        sync.options().template_url
    ));
    let result = sync.check().await;
    spinner.finish_and_clear();
    let updates = result?;

    print_updates(&updates);
    Ok(())
}

fn print_updates(updates: &UpdateSet) {
    if updates.fork_point.is_suspect() {
        println!(
            "{}",
            Status::Attention.line(&suspect_fork_point(&updates.fork_point))
        );
    }
    if updates.is_empty() {
        println!("{}", Status::Done.line("No new updates from the template."));
        return;
    }

    println!();
    println!(
        "{}",
        style::heading(&format!(
            "{} update(s) pending for {}",
            updates.commits.len(),
            updates.current_branch
        ))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Date", "Subject", "Applied via"]);

    for commit in &updates.commits {
        let date = commit
            .authored_at()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "—".to_string());
        let via = match DependencyBump::parse(&commit.message) {
            Some(bump) => Cell::new(format!("package manager ({})", bump.pinned_spec()))
                .fg(comfy_table::Color::Cyan),
            None => Cell::new("cherry-pick"),
        };
        table.add_row(vec![
            Cell::new(&commit.hash).fg(comfy_table::Color::Yellow),
            Cell::new(date),
            Cell::new(&commit.message),
            via,
        ]);
    }

    println!("{}", table);
    println!();
    println!("Run 'forksync pull' to choose and apply them.");
}
