//! Tooling
//!
//! Command-line entry points over the query tree.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
