//! Parsers for git CLI output.
//!
//! Anything that does not have the expected shape becomes a typed
//! [`GitError`] rather than a panic.

use crate::errors::GitError;
use crate::models::Commit;

/// Field separator used in [`LOG_FORMAT`] (ASCII unit separator).
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// `git log --format` producing `hash<US>timestamp<US>subject` lines.
pub const LOG_FORMAT: &str = "--format=%h%x1f%at%x1f%s";

/// Printed by `git stash` when the working tree has nothing to save.
pub const NOTHING_TO_STASH: &str = "No local changes to save";

/// Parse the output of `git log` run with [`LOG_FORMAT`], preserving order.
pub fn parse_log(output: &str) -> Result<Vec<Commit>, GitError> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(parse_log_line)
        .collect()
}

fn parse_log_line(line: &str) -> Result<Commit, GitError> {
    let malformed = || GitError::MalformedLog {
        line: line.to_string(),
    };

    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let hash = fields.next().map(str::trim).filter(|h| !h.is_empty());
    let timestamp = fields.next().and_then(|t| t.trim().parse::<i64>().ok());
    let subject = fields.next();

    match (hash, timestamp, subject) {
        (Some(hash), Some(timestamp), Some(subject)) => Ok(Commit::new(hash, subject, timestamp)),
        _ => Err(malformed()),
    }
}

/// Extract the current branch from `git branch` output (`* <name>`).
pub fn parse_current_branch(output: &str) -> Result<String, GitError> {
    let current = output
        .lines()
        .find_map(|line| line.strip_prefix("* "))
        .ok_or_else(|| GitError::BranchNotFound(output.trim().to_string()))?;

    if current.starts_with('(') {
        return Err(GitError::DetachedHead);
    }
    current
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| GitError::BranchNotFound(output.trim().to_string()))
}

/// Whether `git stash push` actually saved something.
pub fn stash_created(output: &str) -> bool {
    !output.contains(NOTHING_TO_STASH)
}

/// Whether a failed `git commit` failed only because there was nothing to commit.
pub fn is_clean_tree(output: &str) -> bool {
    output.contains("nothing to commit")
        || output.contains("working tree clean")
        || output.contains("nothing added to commit")
}
