//! Read-only file system views rooted at a revision
//!
//! Project evaluation resolves imports and references while it parses. Giving
//! it a file system that answers "as of revision R" lets that resolution run
//! exactly as it would have on disk at R, without a second checkout.
//!
//! - **FileAccessor**: the exists/read/enumerate contract every view honours
//! - **RevisionFileAccessor**: working tree (disk) or commit tree (git objects)

pub mod revision;

#[cfg(test)]
pub mod memory;

use crate::core::error::AffectedResult;
use crate::core::vcs::Revision;
use std::fs::File;
use std::path::{Path, PathBuf};

pub use revision::RevisionFileAccessor;

/// Directory/file classification of an enumerated entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
  File,
  Directory,
}

/// One entry returned by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
  pub path: PathBuf,
  pub kind: EntryKind,
}

/// Where a given path is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
  Disk,
  Commit,
}

/// Uniform read-only file access, rooted at the working tree or a commit.
///
/// Paths are absolute; relative paths are resolved against [`root`](Self::root).
pub trait FileAccessor: Send + Sync {
  /// Repository root (canonical)
  fn root(&self) -> &Path;

  /// Revision this view reads from
  fn revision(&self) -> &Revision;

  /// Whether `path` is answered from disk or from the commit tree
  fn backing(&self, path: &Path) -> Backing;

  fn exists(&self, path: &Path) -> AffectedResult<bool>;

  fn is_dir(&self, path: &Path) -> AffectedResult<bool>;

  fn read(&self, path: &Path) -> AffectedResult<Vec<u8>>;

  fn read_to_string(&self, path: &Path) -> AffectedResult<String> {
    Ok(String::from_utf8(self.read(path)?)?)
  }

  /// Single-level enumeration. Missing directories enumerate as empty.
  fn list_dir(&self, path: &Path) -> AffectedResult<Vec<DirEntry>>;

  /// Recursive enumeration, composed from [`list_dir`](Self::list_dir)
  fn list_recursive(&self, path: &Path) -> AffectedResult<Vec<DirEntry>> {
    let mut out = Vec::new();
    let mut pending = vec![path.to_path_buf()];

    while let Some(dir) = pending.pop() {
      for entry in self.list_dir(&dir)? {
        if entry.kind == EntryKind::Directory {
          pending.push(entry.path.clone());
        }
        out.push(entry);
      }
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
  }

  /// Open a file for writing. Always fails for commit-backed paths.
  ///
  /// The analysis pipeline never writes; this is the read-only contract
  /// offered to evaluators.
  #[allow(dead_code)]
  fn open_write(&self, path: &Path) -> AffectedResult<File>;
}

/// All files (not directories) below `dir`
pub fn list_files(fs: &dyn FileAccessor, dir: &Path) -> AffectedResult<Vec<PathBuf>> {
  Ok(
    fs.list_recursive(dir)?
      .into_iter()
      .filter(|entry| entry.kind == EntryKind::File)
      .map(|entry| entry.path)
      .collect(),
  )
}
