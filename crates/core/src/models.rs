//! Domain model types used throughout forksync.
//!
//! Everything here is derived fresh from git queries on each run; nothing is
//! persisted outside the repository itself.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::bump::DependencyBump;

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// One entry of a `git log` query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commit {
    /// Abbreviated hash, unique within the log it came from.
    pub hash: String,
    /// Subject line.
    pub message: String,
    /// Author timestamp, seconds since the epoch.
    pub timestamp: i64,
}

impl Commit {
    pub fn new(hash: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            timestamp,
        }
    }

    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

// ---------------------------------------------------------------------------
// History diff results
// ---------------------------------------------------------------------------

/// Approximate divergence point between the fork and its template.
///
/// The timestamp is that of the oldest commit reachable from the current
/// branch, which stops being meaningful once history is squashed or cloned
/// shallowly. [`ForkPoint::is_suspect`] reports those cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkPoint {
    pub timestamp: i64,
    /// Number of commits on the current branch.
    pub history_len: usize,
    /// Whether the repository is a shallow clone.
    pub shallow: bool,
}

impl ForkPoint {
    pub fn is_suspect(&self) -> bool {
        self.shallow || self.history_len <= 1
    }
}

/// Unapplied upstream commits, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSet {
    pub current_branch: String,
    pub fork_point: ForkPoint,
    pub commits: Vec<Commit>,
}

impl UpdateSet {
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Apply results
// ---------------------------------------------------------------------------

/// Which strategy replayed a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ApplyPath {
    /// Re-resolved through the package manager.
    DependencyBump(DependencyBump),
    /// Replayed with `git cherry-pick --no-commit`.
    CherryPick,
}

/// Result of a best-effort mutation step whose failure does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// How the provenance commit step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    /// A commit carrying the provenance marker was created.
    Created,
    /// The working tree was clean; nothing needed applying.
    NothingToCommit,
}

/// What happened to local changes saved before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StashOutcome {
    /// There was nothing to stash.
    NotNeeded,
    /// Stashed and popped back.
    Restored,
    /// The stash step itself failed; local changes were left in place.
    SaveFailed(String),
    /// Stashed but the pop failed; the entry is still on the stash list.
    RestoreFailed(String),
}

/// Per-commit summary of one update application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub commit: Commit,
    pub path: ApplyPath,
    /// Package-manager upgrade or cherry-pick result.
    pub apply: StepOutcome,
    /// Staging result after a dependency bump.
    pub stage: Option<StepOutcome>,
    pub commit_outcome: CommitOutcome,
    /// Commit attempts that failed before the operator's fix went through.
    pub retries: u32,
    pub stash: StashOutcome,
}

impl ApplyReport {
    /// Whether any absorbed step failed along the way.
    pub fn had_absorbed_failures(&self) -> bool {
        self.apply.is_failure()
            || self.stage.as_ref().is_some_and(StepOutcome::is_failure)
            || matches!(
                self.stash,
                StashOutcome::SaveFailed(_) | StashOutcome::RestoreFailed(_)
            )
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Result of a full orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SyncOutcome {
    /// No unapplied upstream commits were found.
    UpToDate { fork_point: ForkPoint },
    /// Candidates existed but the operator chose none.
    NothingSelected { candidates: usize },
    /// Selected commits were applied oldest first.
    Applied {
        candidates: usize,
        reports: Vec<ApplyReport>,
    },
}
