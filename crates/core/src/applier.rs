//! Replays one upstream commit onto the working tree.
//!
//! State machine per commit:
//! `Stash → Classify → Apply (package manager | cherry-pick) → Commit ⟲ operator → Unstash`
//!
//! Stash, apply and unstash failures are absorbed: they are logged, recorded
//! in the [`ApplyReport`], and the run moves on to the commit step. A commit
//! failure that is not a clean tree is handed to the operator until the
//! commit goes through or the operator aborts.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::bump::{DependencyBump, PackageManager};
use crate::command::{CommandOutcome, Echo};
use crate::errors::{CommandError, SyncError};
use crate::git::parser::{is_clean_tree, stash_created};
use crate::git::GitClient;
use crate::models::{ApplyPath, ApplyReport, Commit, CommitOutcome, StashOutcome, StepOutcome};
use crate::operator::{self, ConflictNotice, Operator, Resolution};
use crate::provenance::format_marker;

/// Prefix of the stash message saved before each update.
pub const STASH_MESSAGE_PREFIX: &str = "Before applying upstream-template update";

/// Whether local changes were set aside before applying.
enum Stash {
    Saved(String),
    NothingToSave,
    Failed(String),
}

/// Applies selected upstream commits one at a time.
pub struct UpdateApplier<'a> {
    git: &'a GitClient,
    package_manager: PackageManager,
    operator: Arc<dyn Operator>,
}

impl<'a> UpdateApplier<'a> {
    pub fn new(
        git: &'a GitClient,
        package_manager: PackageManager,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            git,
            package_manager,
            operator,
        }
    }

    /// Run the full stash → apply → commit → unstash cycle for `commit`.
    #[instrument(skip(self, commit), fields(hash = %commit.hash))]
    pub async fn apply(&self, commit: &Commit) -> Result<ApplyReport, SyncError> {
        let stash = self.stash(commit).await;

        let (path, apply, stage) = match DependencyBump::parse(&commit.message) {
            Some(bump) => {
                info!(package = %bump.package, version = %bump.version, "replaying dependency bump through package manager");
                let upgrade = self.upgrade(&bump).await;
                let stage = absorb("stage", self.git.stage_tracked().await);
                (ApplyPath::DependencyBump(bump), upgrade, Some(stage))
            }
            None => {
                info!("cherry-picking");
                let pick = absorb("cherry-pick", self.git.cherry_pick_no_commit(&commit.hash).await);
                (ApplyPath::CherryPick, pick, None)
            }
        };

        let (commit_outcome, retries) = match self.commit(commit).await {
            Ok(done) => done,
            Err(SyncError::Aborted { hash, .. }) => {
                let stash_kept = match stash {
                    Stash::Saved(message) => Some(message),
                    _ => None,
                };
                return Err(SyncError::Aborted { hash, stash_kept });
            }
            Err(e) => return Err(e),
        };

        let stash = self.unstash(stash).await;

        Ok(ApplyReport {
            commit: commit.clone(),
            path,
            apply,
            stage,
            commit_outcome,
            retries,
            stash,
        })
    }

    async fn stash(&self, commit: &Commit) -> Stash {
        let message = format!("{} {}", STASH_MESSAGE_PREFIX, commit.hash);
        match self.git.stash_save(&message).await {
            Ok(outcome) if outcome.success() => {
                if stash_created(&outcome.output) {
                    info!(%message, "stashed local changes");
                    Stash::Saved(message)
                } else {
                    Stash::NothingToSave
                }
            }
            Ok(outcome) => {
                warn!(output = %outcome.output.trim(), "stash failed; applying on top of local changes");
                Stash::Failed(outcome.output)
            }
            Err(e) => {
                warn!(error = %e, "stash could not run; applying on top of local changes");
                Stash::Failed(e.to_string())
            }
        }
    }

    async fn upgrade(&self, bump: &DependencyBump) -> StepOutcome {
        let program = self.package_manager.program();
        let args = self.package_manager.upgrade_args(bump);
        absorb(
            program,
            self.git.runner().run(program, &args, Echo::Live).await,
        )
    }

    /// Commit with the provenance marker, escalating to the operator on
    /// anything other than success or a clean tree. No retry limit.
    async fn commit(&self, commit: &Commit) -> Result<(CommitOutcome, u32), SyncError> {
        let message = format_marker(commit);
        let mut retries = 0;

        loop {
            let outcome = self.git.commit_allow_empty(&message).await?;
            if outcome.success() {
                info!(retries, "created provenance commit");
                return Ok((CommitOutcome::Created, retries));
            }
            if is_clean_tree(&outcome.output) {
                info!("working tree clean; nothing to apply");
                return Ok((CommitOutcome::NothingToCommit, retries));
            }

            retries += 1;
            warn!(attempt = retries, output = %outcome.output.trim(), "commit failed; waiting for operator");
            let notice = ConflictNotice {
                commit: commit.clone(),
                attempt: retries,
                output: outcome.output,
            };
            match operator::resolve_conflict(&self.operator, notice).await? {
                Resolution::Retry => continue,
                Resolution::Abort => {
                    warn!("operator aborted");
                    return Err(SyncError::Aborted {
                        hash: commit.hash.clone(),
                        stash_kept: None,
                    });
                }
            }
        }
    }

    async fn unstash(&self, stash: Stash) -> StashOutcome {
        match stash {
            Stash::NothingToSave => StashOutcome::NotNeeded,
            Stash::Failed(detail) => StashOutcome::SaveFailed(detail),
            Stash::Saved(message) => match self.git.stash_pop().await {
                Ok(outcome) if outcome.success() => StashOutcome::Restored,
                Ok(outcome) => {
                    warn!(%message, output = %outcome.output.trim(), "stash pop failed; entry kept on the stash list");
                    StashOutcome::RestoreFailed(outcome.output)
                }
                Err(e) => {
                    warn!(%message, error = %e, "stash pop could not run");
                    StashOutcome::RestoreFailed(e.to_string())
                }
            },
        }
    }
}

/// Reduce a best-effort step to its outcome, logging failures.
fn absorb(step: &str, result: Result<CommandOutcome, CommandError>) -> StepOutcome {
    match result {
        Ok(outcome) if outcome.success() => StepOutcome::Succeeded,
        Ok(outcome) => {
            warn!(step, exit_code = ?outcome.exit_code, output = %outcome.output.trim(), "step failed; continuing");
            StepOutcome::Failed(outcome.output)
        }
        Err(e) => {
            warn!(step, error = %e, "step could not run; continuing");
            StepOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(exit_code: i32, output: &str) -> CommandOutcome {
        CommandOutcome {
            program: "git".into(),
            args: vec![],
            output: output.into(),
            exit_code: Some(exit_code),
        }
    }

    #[test]
    fn test_absorb_success() {
        assert_eq!(absorb("x", Ok(outcome(0, ""))), StepOutcome::Succeeded);
    }

    #[test]
    fn test_absorb_keeps_failure_detail() {
        assert_eq!(
            absorb("cherry-pick", Ok(outcome(1, "CONFLICT (content)\n"))),
            StepOutcome::Failed("CONFLICT (content)\n".into())
        );
        let missing = absorb("yarn", Err(CommandError::BinaryNotFound("yarn".into())));
        assert_eq!(missing, StepOutcome::Failed("binary not found: yarn".into()));
    }
}
