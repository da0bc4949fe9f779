//! Asynchronous git CLI client.
//!
//! Every invocation passes an explicit argument vector; nothing is spliced
//! into a shell string.

use tracing::{debug, info, instrument, warn};

use super::parser::{parse_current_branch, parse_log, LOG_FORMAT};
use crate::command::{CommandOutcome, CommandRunner, Echo};
use crate::errors::{CommandError, GitError};
use crate::models::Commit;

/// Client for the `git` binary, operating on the runner's working directory.
#[derive(Debug, Clone)]
pub struct GitClient {
    runner: CommandRunner,
}

impl GitClient {
    /// Wrap `runner`. Output is forced to the C locale so status sentinels
    /// can be matched.
    pub fn new(runner: CommandRunner) -> Self {
        let runner = runner.with_env("LC_ALL", "C").with_env("LANGUAGE", "C");
        Self { runner }
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    // -----------------------------------------------------------------------
    // Remotes
    // -----------------------------------------------------------------------

    /// `git remote add -f <name> <url>`; fetches immediately.
    #[instrument(skip(self))]
    pub async fn add_remote(&self, name: &str, url: &str) -> Result<CommandOutcome, CommandError> {
        let outcome = self
            .git(&["remote", "add", "-f", name, url], Echo::Captured)
            .await?;
        if outcome.success() {
            info!(remote = name, "added and fetched remote");
        }
        Ok(outcome)
    }

    /// `git remote remove <name>`; returns whether it succeeded.
    #[instrument(skip(self))]
    pub async fn remove_remote(&self, name: &str) -> bool {
        match self.git(&["remote", "remove", name], Echo::Captured).await {
            Ok(outcome) if outcome.success() => {
                debug!(remote = name, "removed remote");
                true
            }
            Ok(outcome) => {
                debug!(remote = name, output = %outcome.output.trim(), "remote not removed");
                false
            }
            Err(e) => {
                warn!(remote = name, error = %e, "could not run git remote remove");
                false
            }
        }
    }

    /// Names of all configured remotes.
    pub async fn list_remotes(&self) -> Result<Vec<String>, GitError> {
        let output = self.check(&["remote"]).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Name of the checked-out branch, from `git branch`.
    pub async fn current_branch(&self) -> Result<String, GitError> {
        let output = self.check(&["branch"]).await?;
        parse_current_branch(&output)
    }

    /// Commits reachable from `reference`, newest first.
    #[instrument(skip(self))]
    pub async fn log(&self, reference: &str) -> Result<Vec<Commit>, GitError> {
        let output = self.check(&["log", reference, LOG_FORMAT, "--"]).await?;
        let commits = parse_log(&output)?;
        debug!(reference, count = commits.len(), "read log");
        Ok(commits)
    }

    /// Whether the repository is a shallow clone.
    pub async fn is_shallow(&self) -> Result<bool, GitError> {
        let output = self
            .check(&["rev-parse", "--is-shallow-repository"])
            .await?;
        Ok(output.trim() == "true")
    }

    // -----------------------------------------------------------------------
    // Working-tree mutations
    //
    // These return the raw outcome: callers decide whether a failure matters.
    // -----------------------------------------------------------------------

    /// `git stash push -m <message>`.
    pub async fn stash_save(&self, message: &str) -> Result<CommandOutcome, CommandError> {
        self.git(&["stash", "push", "-m", message], Echo::Live).await
    }

    /// `git stash pop`.
    pub async fn stash_pop(&self) -> Result<CommandOutcome, CommandError> {
        self.git(&["stash", "pop"], Echo::Live).await
    }

    /// Whitespace-insensitive cherry-pick that leaves the result uncommitted.
    pub async fn cherry_pick_no_commit(&self, hash: &str) -> Result<CommandOutcome, CommandError> {
        self.git(
            &[
                "cherry-pick",
                "--no-commit",
                "--strategy-option=ignore-all-space",
                hash,
            ],
            Echo::Live,
        )
        .await
    }

    /// Stage modifications and deletions of tracked files.
    pub async fn stage_tracked(&self) -> Result<CommandOutcome, CommandError> {
        self.git(&["add", "--update"], Echo::Captured).await
    }

    /// `git commit --allow-empty -m <message>`.
    pub async fn commit_allow_empty(&self, message: &str) -> Result<CommandOutcome, CommandError> {
        self.git(&["commit", "--allow-empty", "-m", message], Echo::Live)
            .await
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    async fn git(&self, args: &[&str], echo: Echo) -> Result<CommandOutcome, CommandError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("--no-pager");
        full.extend_from_slice(args);
        self.runner.run("git", &full, echo).await
    }

    async fn check(&self, args: &[&str]) -> Result<String, GitError> {
        Ok(self.git(args, Echo::Captured).await?.into_result()?)
    }
}
