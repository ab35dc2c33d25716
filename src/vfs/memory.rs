//! In-memory file view for unit tests

use super::{Backing, DirEntry, EntryKind, FileAccessor};
use crate::core::error::{AffectedError, AffectedResult};
use crate::core::vcs::Revision;
use crate::utils::normalize_path;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A commit-like view whose files live in a map
pub struct MemoryFileAccessor {
  root: PathBuf,
  revision: Revision,
  files: BTreeMap<PathBuf, String>,
  dirs: BTreeSet<PathBuf>,
  pub reads: AtomicUsize,
}

impl MemoryFileAccessor {
  pub fn new(root: &str, revision: &str, files: &[(&str, &str)]) -> Self {
    let root = PathBuf::from(root);
    let mut map = BTreeMap::new();
    let mut dirs = BTreeSet::new();
    dirs.insert(root.clone());

    for (rel, content) in files {
      let path = normalize_path(&root, Path::new(rel));
      let mut parent = path.parent();
      while let Some(dir) = parent {
        if !dir.starts_with(&root) {
          break;
        }
        dirs.insert(dir.to_path_buf());
        parent = dir.parent();
      }
      map.insert(path, content.to_string());
    }

    Self {
      root,
      revision: Revision::Commit {
        name: revision.to_string(),
        sha: revision.to_string(),
      },
      files: map,
      dirs,
      reads: AtomicUsize::new(0),
    }
  }
}

impl FileAccessor for MemoryFileAccessor {
  fn root(&self) -> &Path {
    &self.root
  }

  fn revision(&self) -> &Revision {
    &self.revision
  }

  fn backing(&self, path: &Path) -> Backing {
    if normalize_path(&self.root, path).starts_with(&self.root) {
      Backing::Commit
    } else {
      Backing::Disk
    }
  }

  fn exists(&self, path: &Path) -> AffectedResult<bool> {
    let path = normalize_path(&self.root, path);
    Ok(self.files.contains_key(&path) || self.dirs.contains(&path))
  }

  fn is_dir(&self, path: &Path) -> AffectedResult<bool> {
    Ok(self.dirs.contains(&normalize_path(&self.root, path)))
  }

  fn read(&self, path: &Path) -> AffectedResult<Vec<u8>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    let path = normalize_path(&self.root, path);
    self
      .files
      .get(&path)
      .map(|content| content.clone().into_bytes())
      .ok_or_else(|| AffectedError::Io(io::Error::new(io::ErrorKind::NotFound, path.display().to_string())))
  }

  fn list_dir(&self, path: &Path) -> AffectedResult<Vec<DirEntry>> {
    let path = normalize_path(&self.root, path);
    let mut out: Vec<DirEntry> = self
      .dirs
      .iter()
      .filter(|d| d.parent() == Some(path.as_path()))
      .map(|d| DirEntry {
        path: d.clone(),
        kind: EntryKind::Directory,
      })
      .chain(self.files.keys().filter(|f| f.parent() == Some(path.as_path())).map(|f| DirEntry {
        path: f.clone(),
        kind: EntryKind::File,
      }))
      .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
  }

  fn open_write(&self, path: &Path) -> AffectedResult<File> {
    Err(AffectedError::ReadOnly {
      path: normalize_path(&self.root, path),
    })
  }
}
