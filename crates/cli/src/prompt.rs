//! Terminal operator: prompts for selection and conflict handling, and
//! reports progress while a pull runs.

use std::sync::Mutex;
use std::time::Duration;

use dialoguer::{MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};

use forksync_core::bump::DependencyBump;
use forksync_core::errors::SyncError;
use forksync_core::models::{ApplyReport, Commit, CommitOutcome, ForkPoint};
use forksync_core::operator::{candidate_label, ConflictNotice, Operator, Resolution, SyncEvent};

use crate::style::{self, Status};

const RESOLUTIONS: [&str; 2] = ["Retry commit", "Abort"];

pub struct TerminalOperator {
    spinner: Mutex<Option<ProgressBar>>,
    /// Print git's output on a failed commit; it was not streamed live.
    echo_failures: bool,
}

impl TerminalOperator {
    pub fn new(echo_failures: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            echo_failures,
        }
    }

    fn start_spinner(&self, message: String) {
        let spinner = new_spinner(message);
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(spinner) {
                old.finish_and_clear();
            }
        }
    }

    /// Stop the spinner if one is still running.
    pub fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

impl Operator for TerminalOperator {
    fn choose_updates(&self, candidates: &[Commit]) -> Result<Vec<Commit>, SyncError> {
        let labels: Vec<String> = candidates.iter().map(candidate_label).collect();
        let chosen = MultiSelect::new()
            .with_prompt("Select updates to apply (space to toggle, enter to confirm)")
            .items(&labels)
            .interact()
            .map_err(|e| SyncError::Operator(format!("selection prompt failed: {}", e)))?;
        Ok(chosen.into_iter().map(|i| candidates[i].clone()).collect())
    }

    fn resolve_conflict(&self, notice: &ConflictNotice) -> Result<Resolution, SyncError> {
        println!();
        if self.echo_failures {
            println!("{}", style::muted(notice.output.trim()));
        }
        println!(
            "{}",
            Status::Attention.line(&format!(
                "Could not commit {} (attempt {}). Resolve the conflicts, stage the result, then retry.",
                notice.commit.hash, notice.attempt
            ))
        );
        let choice = Select::new()
            .with_prompt("How do you want to continue?")
            .items(&RESOLUTIONS)
            .default(0)
            .interact()
            .map_err(|e| SyncError::Operator(format!("acknowledgment prompt failed: {}", e)))?;
        Ok(if choice == 0 {
            Resolution::Retry
        } else {
            Resolution::Abort
        })
    }

    fn notify(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::FetchingTemplate { url, .. } => {
                self.start_spinner(format!("Fetching template {}...", url));
            }
            SyncEvent::TemplateFetched { .. } => {
                self.clear_spinner();
                println!("{}", Status::Done.line("Template fetched"));
            }
            SyncEvent::UpdatesFound { count, fork_point } => {
                println!("Found {} update(s) since the project was generated.", count);
                if fork_point.is_suspect() {
                    println!(
                        "{}",
                        Status::Attention.line(&suspect_fork_point(fork_point))
                    );
                }
                println!();
            }
            SyncEvent::Applying {
                index,
                total,
                commit,
            } => {
                println!();
                let mut line = format!(
                    "{} {} {}",
                    style::progress(index, total),
                    style::hash(&commit.hash),
                    commit.message
                );
                if let Some(bump) = DependencyBump::parse(&commit.message) {
                    line = format!("{}  {}", line, style::bump(&bump));
                }
                println!("{}", line);
            }
            SyncEvent::Applied { report } => println!("{}", applied_line(report)),
        }
    }
}

pub fn new_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(
            template.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn suspect_fork_point(fork_point: &ForkPoint) -> String {
    if fork_point.shallow {
        "This is a shallow clone; the fork point may be wrong and old template commits may be offered.".into()
    } else {
        "The branch has a single commit (squashed?); the fork point may be wrong.".into()
    }
}

fn applied_line(report: &ApplyReport) -> String {
    let label = style::marker(&report.commit);
    match report.commit_outcome {
        CommitOutcome::Created if report.had_absorbed_failures() => {
            Status::Attention.line(&format!("{} (committed after absorbed failures)", label))
        }
        CommitOutcome::Created => Status::Done.line(&label),
        CommitOutcome::NothingToCommit => {
            Status::Skipped.line(&format!(
                "{}: {} (nothing to commit)",
                report.commit.hash, report.commit.message
            ))
        }
    }
}
