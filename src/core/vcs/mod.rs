//! Version control access via system git
//!
//! Only read-side plumbing is needed: resolving revision names, listing a
//! commit's tree, reading blobs and diffing two endpoints.

pub mod system_git;
mod system_git_ops;

use std::fmt;

pub use system_git::SystemGit;

/// One endpoint of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
  /// No commit: read straight from disk
  WorkingTree,
  /// A resolved commit; `name` is what the user asked for
  Commit { name: String, sha: String },
}

impl Revision {
  /// Resolved commit SHA, if this is a commit revision
  pub fn sha(&self) -> Option<&str> {
    match self {
      Revision::WorkingTree => None,
      Revision::Commit { sha, .. } => Some(sha),
    }
  }

  pub fn is_working_tree(&self) -> bool {
    matches!(self, Revision::WorkingTree)
  }
}

impl fmt::Display for Revision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Revision::WorkingTree => write!(f, "working tree"),
      Revision::Commit { name, sha } if name == sha => write!(f, "{}", short_sha(sha)),
      Revision::Commit { name, sha } => write!(f, "{} ({})", name, short_sha(sha)),
    }
  }
}

fn short_sha(sha: &str) -> &str {
  &sha[..sha.len().min(10)]
}

/// Kind of an entry in a commit tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEntryKind {
  Blob,
  Tree,
  /// Submodule commit pointer; reported as a directory with no contents
  Commit,
}

/// An entry from `git ls-tree`
#[derive(Debug, Clone)]
pub struct TreeEntry {
  /// Repo-relative path, forward slashes
  pub path: String,
  pub kind: TreeEntryKind,
  pub object: String,
}
