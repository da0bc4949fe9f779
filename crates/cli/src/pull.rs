//! `forksync pull`: select and apply template updates interactively.

use std::sync::Arc;

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use forksync_core::models::{ApplyPath, ApplyReport, CommitOutcome, StashOutcome, SyncOutcome};
use forksync_core::TemplateSync;

use crate::prompt::TerminalOperator;
use crate::style::{self, Status};

pub async fn run_pull(sync: TemplateSync, echo_failures: bool) -> Result<()> {
    let operator = Arc::new(TerminalOperator::new(echo_failures));
    let result = sync.run(operator.clone()).await;
    operator.clear_spinner();

    match result? {
        SyncOutcome::UpToDate { .. } => {
            println!("{}", Status::Done.line("No new updates from the template."));
        }
        SyncOutcome::NothingSelected { candidates } => {
            println!(
                "{}",
                style::muted(&format!("No updates selected ({} available).", candidates))
            );
        }
        SyncOutcome::Applied { reports, .. } => print_summary(&reports),
    }
    Ok(())
}

fn print_summary(reports: &[ApplyReport]) {
    println!();
    println!("{}", style::heading("Summary"));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Subject", "Applied via", "Result", "Notes"]);

    for report in reports {
        let via = match &report.path {
            ApplyPath::DependencyBump(bump) => format!("package manager ({})", bump),
            ApplyPath::CherryPick => "cherry-pick".to_string(),
        };
        let result = match report.commit_outcome {
            CommitOutcome::Created => Cell::new("✓ committed").fg(comfy_table::Color::Green),
            CommitOutcome::NothingToCommit => {
                Cell::new("– nothing to commit").fg(comfy_table::Color::DarkGrey)
            }
        };
        let notes = report_notes(report);
        let notes_cell = if notes.is_empty() {
            Cell::new("")
        } else {
            Cell::new(notes.join("; ")).fg(comfy_table::Color::Yellow)
        };

        table.add_row(vec![
            Cell::new(&report.commit.hash),
            Cell::new(&report.commit.message),
            Cell::new(via),
            result,
            notes_cell,
        ]);
    }

    println!("{}", table);

    let created = reports
        .iter()
        .filter(|r| r.commit_outcome == CommitOutcome::Created)
        .count();
    println!();
    println!(
        "{}",
        Status::Done.line(&format!(
            "{} of {} update(s) committed.",
            created,
            reports.len()
        ))
    );
    if reports.iter().any(|r| matches!(r.stash, StashOutcome::RestoreFailed(_))) {
        println!(
            "{}",
            Status::Attention
                .line("Some local changes could not be restored; see 'git stash list'.")
        );
    }
}

fn report_notes(report: &ApplyReport) -> Vec<String> {
    let mut notes = Vec::new();
    if report.apply.is_failure() {
        notes.push(match report.path {
            ApplyPath::DependencyBump(_) => "package manager failed".to_string(),
            ApplyPath::CherryPick => "cherry-pick conflicted".to_string(),
        });
    }
    if report.stage.as_ref().is_some_and(|s| s.is_failure()) {
        notes.push("staging failed".into());
    }
    if marker_may_be_empty(report) {
        notes.push("marker commit may be empty; re-apply by hand if needed".into());
    }
    if report.retries > 0 {
        let plural = if report.retries == 1 { "y" } else { "ies" };
        notes.push(format!("{} retr{}", report.retries, plural));
    }
    match report.stash {
        StashOutcome::SaveFailed(_) => notes.push("stash failed".into()),
        StashOutcome::RestoreFailed(_) => notes.push("stash kept".into()),
        StashOutcome::NotNeeded | StashOutcome::Restored => {}
    }
    notes
}

/// The apply step failed yet the first commit attempt went through. Commits
/// are made with `--allow-empty`, so nothing of the update may have landed
/// and its marker now hides it from later pulls.
fn marker_may_be_empty(report: &ApplyReport) -> bool {
    report.apply.is_failure()
        && report.commit_outcome == CommitOutcome::Created
        && report.retries == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use forksync_core::bump::DependencyBump;
    use forksync_core::models::{Commit, StepOutcome};

    fn report(apply: StepOutcome, retries: u32) -> ApplyReport {
        ApplyReport {
            commit: Commit::new("abc1234", "Add CI workflow", 1_700_000_000),
            path: ApplyPath::CherryPick,
            apply,
            stage: None,
            commit_outcome: CommitOutcome::Created,
            retries,
            stash: StashOutcome::NotNeeded,
        }
    }

    #[test]
    fn test_clean_apply_has_no_notes() {
        assert!(report_notes(&report(StepOutcome::Succeeded, 0)).is_empty());
    }

    #[test]
    fn test_failed_apply_committed_first_try_is_flagged() {
        let notes = report_notes(&report(StepOutcome::Failed("untracked file".into()), 0));
        assert_eq!(notes[0], "cherry-pick conflicted");
        assert!(notes[1].starts_with("marker commit may be empty"));
    }

    #[test]
    fn test_resolved_conflict_is_not_flagged() {
        let notes = report_notes(&report(StepOutcome::Failed("conflict".into()), 2));
        assert_eq!(notes, vec!["cherry-pick conflicted", "2 retries"]);
    }

    #[test]
    fn test_nothing_to_commit_is_not_flagged() {
        let mut r = report(StepOutcome::Failed("conflict".into()), 0);
        r.commit_outcome = CommitOutcome::NothingToCommit;
        assert!(!marker_may_be_empty(&r));
    }

    #[test]
    fn test_failed_bump_with_kept_stash() {
        let mut r = report(StepOutcome::Failed("registry unreachable".into()), 0);
        r.path = ApplyPath::DependencyBump(DependencyBump {
            package: "lodash".into(),
            version: "4.17.21".into(),
        });
        r.stage = Some(StepOutcome::Succeeded);
        r.stash = StashOutcome::RestoreFailed("conflict".into());

        let notes = report_notes(&r);
        assert_eq!(notes[0], "package manager failed");
        assert!(notes.contains(&"stash kept".to_string()));
    }
}
