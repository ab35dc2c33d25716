//! Changed files between two revisions

use crate::core::error::AffectedResult;
use crate::core::vcs::Revision;
use crate::core::vcs::system_git::SystemGit;
use crate::utils::{git_path_to_native, normalize_path, path_to_git_format};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Absolute, normalized paths changed between base and target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
  root: PathBuf,
  files: BTreeSet<PathBuf>,
}

impl ChangeSet {
  /// Build from repo-relative git paths
  pub fn from_git_paths<'a>(root: &Path, paths: impl IntoIterator<Item = &'a str>) -> Self {
    let files = paths
      .into_iter()
      .map(|p| normalize_path(root, &git_path_to_native(root, p)))
      .collect();
    Self {
      root: root.to_path_buf(),
      files,
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn contains(&self, path: &Path) -> bool {
    self.files.contains(path)
  }

  pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
    self.files.iter()
  }

  /// Changed files whose file name equals `file_name`
  pub fn named<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a PathBuf> {
    self.files.iter().filter(move |f| has_file_name(f, file_name))
  }

  /// Repo-relative forward-slash form, sorted
  pub fn relative_paths(&self) -> Vec<String> {
    self
      .files
      .iter()
      .map(|f| path_to_git_format(f.strip_prefix(&self.root).unwrap_or(f)))
      .collect()
  }
}

pub(crate) fn has_file_name(path: &Path, file_name: &str) -> bool {
  path.file_name().is_some_and(|name| {
    if cfg!(any(windows, target_os = "macos")) {
      name.to_string_lossy().eq_ignore_ascii_case(file_name)
    } else {
      name == file_name
    }
  })
}

/// Obtains the change set through the version-control diff primitive
pub struct ChangeSetResolver<'a> {
  git: &'a SystemGit,
  root: &'a Path,
  include_untracked: bool,
}

impl<'a> ChangeSetResolver<'a> {
  pub fn new(git: &'a SystemGit, root: &'a Path, include_untracked: bool) -> Self {
    Self {
      git,
      root,
      include_untracked,
    }
  }

  /// Files changed between `base` and `target`.
  ///
  /// Either side may be the working tree; comparing the working tree with
  /// itself yields an empty set.
  pub fn resolve(&self, base: &Revision, target: &Revision) -> AffectedResult<ChangeSet> {
    let paths = match (base.sha(), target.sha()) {
      (Some(base), Some(target)) => self.git.diff_commits(base, target)?,
      (Some(commit), None) | (None, Some(commit)) => self.git.diff_worktree(commit, self.include_untracked)?,
      (None, None) => Vec::new(),
    };

    let changes = ChangeSet::from_git_paths(self.root, paths.iter().map(String::as_str));
    debug!(base = %base, target = %target, files = changes.len(), "resolved change set");
    Ok(changes)
  }
}
