//! System git backend - zero dependencies
//!
//! Uses git plumbing commands for all operations, executed in an isolated
//! environment so user configuration cannot change output formats.

use super::Revision;
use crate::core::error::{AffectedError, AffectedResult, GitError, ResultExt, RevisionError};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Git backend using system git (zero crate dependencies)
#[derive(Debug, Clone)]
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to get the repository metadata.
  pub fn open(path: &Path) -> AffectedResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(AffectedError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(AffectedError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = PathBuf::from(stdout.trim());

    // Every later command runs from the top level so reported paths are
    // repo-relative
    Ok(Self {
      repo_path: work_tree.clone(),
      work_tree,
    })
  }

  /// Working tree root as reported by git
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Resolve a user-supplied name (SHA, branch, tag, `HEAD`) to a commit.
  ///
  /// Names that match neither a commit nor a branch are fatal.
  pub fn resolve_revision(&self, name: &str) -> AffectedResult<Revision> {
    if name.is_empty() || name.starts_with('-') {
      return Err(AffectedError::Revision(RevisionError::NotFound { name: name.to_string() }));
    }

    let spec = format!("{}^{{commit}}", name);
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", &spec])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      return Err(AffectedError::Revision(RevisionError::NotFound { name: name.to_string() }));
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(name, sha = %sha, "resolved revision");
    Ok(Revision::Commit {
      name: name.to_string(),
      sha,
    })
  }

  /// Run a git command and return stdout, failing on non-zero exit
  pub(crate) fn run(&self, args: &[&str]) -> AffectedResult<Vec<u8>> {
    let output: Output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      return Err(AffectedError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(output.stdout)
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("core.quotePath=false");
    cmd.arg("-c").arg("diff.renames=false");

    cmd
  }
}
