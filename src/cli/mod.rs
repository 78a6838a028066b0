//! CLI command implementations
//!
//! Read-only views over a local catalog:
//! - status: Show document counts
//! - search: Search subjects and notes
//! - trending: List the most downloaded notes

mod commands;
mod db_utils;

pub use commands::*;
pub use db_utils::*;
