//! Tree, blob and diff operations for SystemGit

use super::system_git::SystemGit;
use super::{TreeEntry, TreeEntryKind};
use crate::core::error::{AffectedError, AffectedResult, GitError};
use tracing::{debug, trace};

impl SystemGit {
  /// List every entry (blobs, trees, submodules) in a commit's tree
  ///
  /// Uses `ls-tree -r -t` so directories are reported alongside files.
  pub fn list_tree(&self, commit_sha: &str) -> AffectedResult<Vec<TreeEntry>> {
    let stdout = self.run(&["ls-tree", "-r", "-t", "-z", "--full-tree", commit_sha])?;
    let entries = parse_ls_tree(&stdout)?;
    debug!(commit = commit_sha, entries = entries.len(), "listed commit tree");
    Ok(entries)
  }

  /// Read a blob by object id
  pub fn read_blob(&self, object: &str) -> AffectedResult<Vec<u8>> {
    self.run(&["cat-file", "blob", object]).map_err(|err| match err {
      AffectedError::Git(GitError::CommandFailed { .. }) => AffectedError::Git(GitError::ObjectMissing {
        object: object.to_string(),
      }),
      other => other,
    })
  }

  /// Files that differ between two commits (repo-relative, forward slashes)
  pub fn diff_commits(&self, base: &str, target: &str) -> AffectedResult<Vec<String>> {
    let stdout = self.run(&["diff", "--name-only", "--no-renames", "-z", base, target])?;
    Ok(split_nul(&stdout))
  }

  /// Files that differ between a commit and the working tree
  ///
  /// Covers staged and unstaged edits; untracked (non-ignored) files are
  /// appended when `include_untracked` is set.
  pub fn diff_worktree(&self, base: &str, include_untracked: bool) -> AffectedResult<Vec<String>> {
    let stdout = self.run(&["diff", "--name-only", "--no-renames", "-z", base])?;
    let mut files = split_nul(&stdout);

    if include_untracked {
      let untracked = self.run(&["ls-files", "--others", "--exclude-standard", "-z"])?;
      let untracked = split_nul(&untracked);
      trace!(count = untracked.len(), "untracked files");
      files.extend(untracked);
    }

    Ok(files)
  }
}

fn split_nul(data: &[u8]) -> Vec<String> {
  data
    .split(|b| *b == 0)
    .filter(|chunk| !chunk.is_empty())
    .map(|chunk| String::from_utf8_lossy(chunk).to_string())
    .collect()
}

/// Parse `git ls-tree -z` output
///
/// Each record is `<mode> SP <type> SP <object> TAB <path>`, NUL terminated.
fn parse_ls_tree(data: &[u8]) -> AffectedResult<Vec<TreeEntry>> {
  let mut entries = Vec::new();

  for record in data.split(|b| *b == 0).filter(|r| !r.is_empty()) {
    let record = String::from_utf8_lossy(record);
    let (meta, path) = record
      .split_once('\t')
      .ok_or_else(|| AffectedError::message(format!("Malformed ls-tree record: {}", record)))?;

    let mut fields = meta.split(' ');
    let _mode = fields.next();
    let kind = match fields.next() {
      Some("blob") => TreeEntryKind::Blob,
      Some("tree") => TreeEntryKind::Tree,
      Some("commit") => TreeEntryKind::Commit,
      other => {
        return Err(AffectedError::message(format!(
          "Unknown ls-tree entry type {:?} for {}",
          other, path
        )));
      }
    };
    let object = fields
      .next()
      .ok_or_else(|| AffectedError::message(format!("Missing object id in ls-tree record for {}", path)))?;

    entries.push(TreeEntry {
      path: path.to_string(),
      kind,
      object: object.to_string(),
    });
  }

  Ok(entries)
}
