//! Git CLI operations for forksync.

pub mod client;
pub mod parser;

pub use client::GitClient;
