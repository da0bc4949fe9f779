//! External command execution for forksync.

pub mod runner;
pub mod tokenize;

pub use runner::{CommandOutcome, CommandRunner, Echo, Verbosity};
pub use tokenize::{quote, split_command, tokenize};
