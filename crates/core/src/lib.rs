//! forksync core library.
//!
//! Pulls commits from an upstream template repository into a project that
//! was generated from it: command execution, history diffing, per-commit
//! replay with provenance markers, and the orchestrated sync run.

pub mod applier;
pub mod bump;
pub mod command;
pub mod config;
pub mod errors;
pub mod git;
pub mod history;
pub mod models;
pub mod operator;
pub mod orchestrator;
pub mod provenance;

// Re-exports for convenience.
pub use applier::UpdateApplier;
pub use command::{CommandRunner, Echo, Verbosity};
pub use config::SyncConfig;
pub use git::GitClient;
pub use history::{ExcludePattern, HistoryDiffer};
pub use operator::{ConflictNotice, Operator, Resolution, SyncEvent};
pub use orchestrator::{SyncOptions, TemplateSync};
