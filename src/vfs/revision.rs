//! File system view at a revision
//!
//! Working tree revisions delegate to disk. Commit revisions index the
//! commit's tree once (`ls-tree -r -t`) and serve existence and enumeration
//! from that index; blob contents are read on demand and memoized by object
//! id. Paths outside the repository root always come from disk since they
//! cannot have existed inside a commit.

use super::{Backing, DirEntry, EntryKind, FileAccessor};
use crate::core::error::{AffectedError, AffectedResult, ResultExt};
use crate::core::vcs::{Revision, SystemGit, TreeEntryKind};
use crate::utils::{git_path_to_native, normalize_path};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Indexed commit tree
#[derive(Debug, Default)]
struct CommitTree {
  /// Absolute path → (kind, object id)
  entries: HashMap<PathBuf, (EntryKind, String)>,
  /// Absolute directory → direct children
  children: HashMap<PathBuf, Vec<PathBuf>>,
}

/// Read-only file view rooted at the working tree or a commit
pub struct RevisionFileAccessor {
  root: PathBuf,
  revision: Revision,
  git: Option<SystemGit>,
  tree: Option<CommitTree>,
  blobs: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl RevisionFileAccessor {
  /// View of the working tree (plain disk access)
  pub fn working_tree(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
      revision: Revision::WorkingTree,
      git: None,
      tree: None,
      blobs: RwLock::new(HashMap::new()),
    }
  }

  /// View of a revision. Commit revisions index their tree up front.
  pub fn open(git: &SystemGit, root: &Path, revision: Revision) -> AffectedResult<Self> {
    let Some(sha) = revision.sha() else {
      return Ok(Self::working_tree(root));
    };

    let mut tree = CommitTree::default();
    for entry in git.list_tree(sha)? {
      let path = git_path_to_native(root, &entry.path);
      let kind = match entry.kind {
        TreeEntryKind::Blob => EntryKind::File,
        TreeEntryKind::Tree | TreeEntryKind::Commit => EntryKind::Directory,
      };
      let parent = path.parent().unwrap_or(root).to_path_buf();
      tree.children.entry(parent).or_default().push(path.clone());
      tree.entries.insert(path, (kind, entry.object));
    }

    Ok(Self {
      root: root.to_path_buf(),
      revision,
      git: Some(git.clone()),
      tree: Some(tree),
      blobs: RwLock::new(HashMap::new()),
    })
  }

  fn normalize(&self, path: &Path) -> PathBuf {
    normalize_path(&self.root, path)
  }

  /// Commit tree to consult for `path`, or None when disk answers
  fn tree_for(&self, path: &Path) -> Option<&CommitTree> {
    match &self.tree {
      Some(tree) if path.starts_with(&self.root) => Some(tree),
      _ => None,
    }
  }

  fn read_object(&self, object: &str) -> AffectedResult<Arc<Vec<u8>>> {
    if let Some(data) = self.blobs.read().unwrap_or_else(PoisonError::into_inner).get(object) {
      return Ok(Arc::clone(data));
    }

    let git = self
      .git
      .as_ref()
      .ok_or_else(|| AffectedError::message("Commit view has no git backend"))?;
    let data = Arc::new(git.read_blob(object)?);
    self
      .blobs
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(object.to_string(), Arc::clone(&data));
    Ok(data)
  }
}

fn not_found(path: &Path) -> AffectedError {
  AffectedError::Io(io::Error::new(
    io::ErrorKind::NotFound,
    format!("{} does not exist", path.display()),
  ))
}

impl FileAccessor for RevisionFileAccessor {
  fn root(&self) -> &Path {
    &self.root
  }

  fn revision(&self) -> &Revision {
    &self.revision
  }

  fn backing(&self, path: &Path) -> Backing {
    let path = self.normalize(path);
    if self.tree_for(&path).is_some() {
      Backing::Commit
    } else {
      Backing::Disk
    }
  }

  fn exists(&self, path: &Path) -> AffectedResult<bool> {
    let path = self.normalize(path);
    match self.tree_for(&path) {
      Some(tree) => Ok(path == self.root || tree.entries.contains_key(&path)),
      None => Ok(path.exists()),
    }
  }

  fn is_dir(&self, path: &Path) -> AffectedResult<bool> {
    let path = self.normalize(path);
    match self.tree_for(&path) {
      Some(tree) => Ok(path == self.root || matches!(tree.entries.get(&path), Some((EntryKind::Directory, _)))),
      None => Ok(path.is_dir()),
    }
  }

  fn read(&self, path: &Path) -> AffectedResult<Vec<u8>> {
    let path = self.normalize(path);
    match self.tree_for(&path) {
      Some(tree) => match tree.entries.get(&path) {
        Some((EntryKind::File, object)) => {
          trace!(path = %path.display(), revision = %self.revision, "reading blob");
          Ok(self.read_object(object)?.as_ref().clone())
        }
        Some((EntryKind::Directory, _)) => Err(AffectedError::message(format!(
          "{} is a directory at {}",
          path.display(),
          self.revision
        ))),
        None => Err(not_found(&path)),
      },
      None => fs::read(&path).with_context(|| format!("Failed to read {}", path.display())),
    }
  }

  fn list_dir(&self, path: &Path) -> AffectedResult<Vec<DirEntry>> {
    let path = self.normalize(path);
    match self.tree_for(&path) {
      Some(tree) => {
        let mut entries: Vec<DirEntry> = tree
          .children
          .get(&path)
          .map(|children| {
            children
              .iter()
              .filter_map(|child| {
                tree.entries.get(child).map(|(kind, _)| DirEntry {
                  path: child.clone(),
                  kind: *kind,
                })
              })
              .collect()
          })
          .unwrap_or_default();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
      }
      None => list_disk_dir(&path, path.starts_with(&self.root)),
    }
  }

  fn open_write(&self, path: &Path) -> AffectedResult<File> {
    let path = self.normalize(path);
    if self.tree_for(&path).is_some() {
      return Err(AffectedError::ReadOnly { path });
    }

    OpenOptions::new()
      .write(true)
      .create(true)
      .truncate(true)
      .open(&path)
      .with_context(|| format!("Failed to open {} for writing", path.display()))
  }
}

/// Single-level disk enumeration. `.git` is never reported; inside the
/// repository, gitignored entries are skipped too, so the working tree lists
/// what a commit of it could contain.
fn list_disk_dir(path: &Path, in_repository: bool) -> AffectedResult<Vec<DirEntry>> {
  if !path.is_dir() {
    return Ok(Vec::new());
  }

  let walker = WalkBuilder::new(path)
    .max_depth(Some(1))
    .hidden(false)
    .ignore(false)
    .parents(in_repository)
    .git_ignore(in_repository)
    .git_exclude(in_repository)
    .git_global(false)
    .require_git(false)
    .filter_entry(|entry| entry.file_name() != ".git")
    .build();

  let mut entries = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|err| AffectedError::message(format!("Failed to list {}: {}", path.display(), err)))?;
    if entry.depth() == 0 {
      continue;
    }
    let kind = if entry.file_type().is_some_and(|t| t.is_dir()) {
      EntryKind::Directory
    } else {
      EntryKind::File
    };
    entries.push(DirEntry {
      path: normalize_path(path, Path::new(entry.file_name())),
      kind,
    });
  }

  entries.sort_by(|a, b| a.path.cmp(&b.path));
  Ok(entries)
}
