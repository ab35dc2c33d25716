//! Core engine for graph-affected
//!
//! - **config**: affected.toml parsing and validation
//! - **context**: one comparison's repository, revisions and file views
//! - **error**: error types with contextual help messages
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
