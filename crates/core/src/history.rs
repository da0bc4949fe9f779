//! Upstream history diffing.
//!
//! Compares the current branch's log with the template branch's log and
//! keeps the upstream commits that are newer than the fork point, not
//! excluded by subject, and not already replayed.

use std::collections::HashSet;

use regex_lite::Regex;
use tracing::{info, instrument, warn};

use crate::errors::{GitError, SyncError};
use crate::git::GitClient;
use crate::models::{Commit, ForkPoint, UpdateSet};
use crate::provenance::{hashes_match, marker_hashes};

// ---------------------------------------------------------------------------
// Exclusion pattern
// ---------------------------------------------------------------------------

/// Regular expression over commit subjects; an empty pattern excludes nothing.
#[derive(Debug, Clone, Default)]
pub struct ExcludePattern(Option<Regex>);

impl ExcludePattern {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn parse(pattern: &str) -> Result<Self, SyncError> {
        if pattern.is_empty() {
            return Ok(Self(None));
        }
        Regex::new(pattern)
            .map(|re| Self(Some(re)))
            .map_err(|e| SyncError::InvalidPattern {
                pattern: pattern.to_string(),
                detail: e.to_string(),
            })
    }

    pub fn excludes(&self, subject: &str) -> bool {
        self.0.as_ref().is_some_and(|re| re.is_match(subject))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_ref().map(Regex::as_str)
    }
}

// ---------------------------------------------------------------------------
// Pure diffing
// ---------------------------------------------------------------------------

/// Fork point of a newest-first history: the timestamp of its oldest entry.
pub fn fork_point(current: &[Commit], shallow: bool) -> Option<ForkPoint> {
    current.last().map(|oldest| ForkPoint {
        timestamp: oldest.timestamp,
        history_len: current.len(),
        shallow,
    })
}

/// Upstream commits still to apply, in the order they appear in `upstream`.
pub fn unapplied_updates(
    current: &[Commit],
    upstream: &[Commit],
    fork_timestamp: i64,
    exclude: &ExcludePattern,
) -> Vec<Commit> {
    let current_hashes: HashSet<&str> = current.iter().map(|c| c.hash.as_str()).collect();
    let recorded: Vec<&str> = current
        .iter()
        .flat_map(|c| marker_hashes(&c.message))
        .collect();

    let is_applied = |commit: &Commit| {
        current_hashes.contains(commit.hash.as_str())
            || recorded.iter().any(|r| hashes_match(r, &commit.hash))
    };

    upstream
        .iter()
        .filter(|c| !exclude.excludes(&c.message))
        .filter(|c| !is_applied(c))
        .filter(|c| c.timestamp >= fork_timestamp)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Git-backed differ
// ---------------------------------------------------------------------------

/// Computes the unapplied upstream commits for the checked-out branch.
pub struct HistoryDiffer<'a> {
    git: &'a GitClient,
}

impl<'a> HistoryDiffer<'a> {
    pub fn new(git: &'a GitClient) -> Self {
        Self { git }
    }

    #[instrument(skip(self, exclude), fields(exclude = exclude.as_str().unwrap_or("")))]
    pub async fn find_updates(
        &self,
        upstream_ref: &str,
        exclude: &ExcludePattern,
    ) -> Result<UpdateSet, GitError> {
        let current_branch = self.git.current_branch().await?;
        let current = self.git.log(&current_branch).await?;
        let upstream = self.git.log(upstream_ref).await?;
        let shallow = self.git.is_shallow().await?;

        let fork_point = fork_point(&current, shallow).ok_or_else(|| GitError::EmptyHistory {
            reference: current_branch.clone(),
        })?;
        if fork_point.is_suspect() {
            warn!(
                history_len = fork_point.history_len,
                shallow = fork_point.shallow,
                "fork point taken from a squashed or shallow history; updates may be misclassified"
            );
        }

        let commits = unapplied_updates(&current, &upstream, fork_point.timestamp, exclude);
        info!(
            branch = %current_branch,
            upstream = upstream.len(),
            updates = commits.len(),
            fork_timestamp = fork_point.timestamp,
            "computed unapplied updates"
        );

        Ok(UpdateSet {
            current_branch,
            fork_point,
            commits,
        })
    }
}
