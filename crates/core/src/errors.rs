//! Error types for the forksync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Tokenizer errors
// ---------------------------------------------------------------------------

/// Errors from splitting a command line into program and arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenizeError {
    /// The line contained no tokens at all.
    #[error("command line is empty")]
    Empty,

    /// A quoted span was opened but never closed.
    #[error("unterminated {quote} quote starting at byte {position}")]
    UnterminatedQuote { quote: char, position: usize },

    /// An unquoted character outside the allowed set.
    #[error("character {ch:?} at byte {position} is not allowed outside quotes")]
    DisallowedCharacter { ch: char, position: usize },
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command line could not be tokenized.
    #[error("invalid command line: {0}")]
    Tokenize(#[from] TokenizeError),

    /// The binary was not found on `$PATH`.
    #[error("binary not found: {0}")]
    BinaryNotFound(String),

    /// The command exited with a non-zero status.
    #[error("`{program}` failed (exit {}): {}", .exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()), .output.trim())]
    Failed {
        program: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// Spawning or reading from the child process failed.
    #[error("command I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CommandError {
    /// Captured stdout+stderr for a failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from git CLI queries, including malformed output.
#[derive(Debug, Error)]
pub enum GitError {
    /// Underlying command failure.
    #[error("git command error: {0}")]
    Command(#[from] CommandError),

    /// A `git log` line did not have the expected `hash/timestamp/subject` shape.
    #[error("unexpected git log line: {line:?}")]
    MalformedLog { line: String },

    /// HEAD is not on a branch.
    #[error("HEAD is detached; check out a branch before syncing")]
    DetachedHead,

    /// `git branch` output did not mark a current branch.
    #[error("could not determine the current branch from: {0:?}")]
    BranchNotFound(String),

    /// A log query returned no commits.
    #[error("no commits found on '{reference}'")]
    EmptyHistory { reference: String },
}

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Errors from the orchestration and update-application flow.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The temporary template remote could not be added or fetched.
    #[error("unable to add remote '{remote}' with url {url}: {detail}")]
    RemoteSetup {
        remote: String,
        url: String,
        detail: String,
    },

    /// The operator abandoned conflict resolution.
    #[error("update {hash} aborted by operator{}", .stash_kept.as_deref().map(|m| format!("; local changes remain stashed as \"{m}\"")).unwrap_or_default())]
    Aborted {
        hash: String,
        stash_kept: Option<String>,
    },

    /// A selection or acknowledgment collaborator failed.
    #[error("operator prompt failed: {0}")]
    Operator(String),

    /// The exclusion pattern is not a valid regular expression.
    #[error("invalid exclusion pattern {pattern:?}: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// Underlying git error.
    #[error("sync git error: {0}")]
    GitError(#[from] GitError),
}

impl From<CommandError> for SyncError {
    fn from(err: CommandError) -> Self {
        Self::GitError(GitError::Command(err))
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
