//! The human in the loop.
//!
//! Selection and conflict acknowledgment are blocking interactions owned by
//! the caller (a terminal UI, a test script). The library awaits them on the
//! blocking thread pool so the suspension is explicit.

use std::sync::Arc;

use crate::errors::SyncError;
use crate::models::{ApplyReport, Commit, ForkPoint};

/// The operator's answer after a provenance commit could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The conflict has been resolved and staged; try the commit again.
    Retry,
    /// Stop the run, leaving the working tree as it is.
    Abort,
}

/// Context handed to the operator when a commit attempt fails.
#[derive(Debug, Clone)]
pub struct ConflictNotice {
    pub commit: Commit,
    /// 1 for the first failed attempt.
    pub attempt: u32,
    /// Captured output of the failed `git commit`.
    pub output: String,
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    FetchingTemplate { remote: &'a str, url: &'a str },
    TemplateFetched { remote: &'a str },
    UpdatesFound { count: usize, fork_point: &'a ForkPoint },
    Applying { index: usize, total: usize, commit: &'a Commit },
    Applied { report: &'a ApplyReport },
}

/// Interactive collaborator driving a sync run.
pub trait Operator: Send + Sync {
    /// Pick zero or more of `candidates` (newest first). Order of the
    /// returned commits does not matter.
    fn choose_updates(&self, candidates: &[Commit]) -> Result<Vec<Commit>, SyncError>;

    /// Block until the operator has dealt with a failed commit.
    fn resolve_conflict(&self, notice: &ConflictNotice) -> Result<Resolution, SyncError>;

    /// Observe progress. Must not block.
    fn notify(&self, _event: SyncEvent<'_>) {}
}

/// Label shown for a candidate commit.
pub fn candidate_label(commit: &Commit) -> String {
    let date = commit
        .authored_at()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "????-??-??".to_string());
    format!("{} {} {}", commit.hash, date, commit.message)
}

pub(crate) async fn choose_updates(
    operator: &Arc<dyn Operator>,
    candidates: Vec<Commit>,
) -> Result<Vec<Commit>, SyncError> {
    let operator = Arc::clone(operator);
    tokio::task::spawn_blocking(move || operator.choose_updates(&candidates))
        .await
        .map_err(|e| SyncError::Operator(format!("selection prompt panicked: {}", e)))?
}

pub(crate) async fn resolve_conflict(
    operator: &Arc<dyn Operator>,
    notice: ConflictNotice,
) -> Result<Resolution, SyncError> {
    let operator = Arc::clone(operator);
    tokio::task::spawn_blocking(move || operator.resolve_conflict(&notice))
        .await
        .map_err(|e| SyncError::Operator(format!("acknowledgment prompt panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PickAll;

    impl Operator for PickAll {
        fn choose_updates(&self, candidates: &[Commit]) -> Result<Vec<Commit>, SyncError> {
            Ok(candidates.to_vec())
        }

        fn resolve_conflict(&self, _notice: &ConflictNotice) -> Result<Resolution, SyncError> {
            Ok(Resolution::Abort)
        }
    }

    #[test]
    fn test_candidate_label() {
        let commit = Commit::new("abc1234", "Fix bug", 1_700_000_000);
        assert_eq!(candidate_label(&commit), "abc1234 2023-11-14 Fix bug");
    }

    #[tokio::test]
    async fn test_prompts_run_off_the_async_thread() {
        let operator: Arc<dyn Operator> = Arc::new(PickAll);
        let commits = vec![Commit::new("abc1234", "Fix bug", 1)];
        assert_eq!(
            choose_updates(&operator, commits.clone()).await.unwrap(),
            commits
        );

        let notice = ConflictNotice {
            commit: commits[0].clone(),
            attempt: 1,
            output: String::new(),
        };
        assert_eq!(
            resolve_conflict(&operator, notice).await.unwrap(),
            Resolution::Abort
        );
    }
}
