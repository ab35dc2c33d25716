//! CLI commands for graph-affected
//!
//! - **affected**: compare two revisions and report changed, affected and
//!   excluded projects
//!
//! Commands accept `&AffectedContext` so the repository, config and revision
//! views are loaded once.

pub mod affected;

pub use affected::{OutputFormat, run_affected};
