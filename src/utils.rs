//! Utility functions for cross-platform path handling
//!
//! Paths coming from git, from project references and from the file system
//! are compared against each other, so every path is brought into one
//! canonical shape first: absolute, lexically normalized (`.`/`..` folded),
//! and case-folded on platforms with case-insensitive file systems.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path, resolving it against `base` when relative.
///
/// Does not touch the file system: historical-revision paths need not exist
/// on disk.
pub fn normalize_path(base: &Path, path: &Path) -> PathBuf {
  let joined = if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  };

  let mut out = PathBuf::new();
  for component in joined.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        // Never pop past the root
        if !matches!(out.components().next_back(), None | Some(Component::RootDir | Component::Prefix(_))) {
          out.pop();
        }
      }
      other => out.push(other.as_os_str()),
    }
  }

  fold_case(out)
}

#[cfg(any(target_os = "windows", target_os = "macos"))]
fn fold_case(path: PathBuf) -> PathBuf {
  PathBuf::from(path.to_string_lossy().to_lowercase())
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn fold_case(path: PathBuf) -> PathBuf {
  path
}

/// Canonicalize a directory that exists on disk (the repository root).
///
/// Falls back to lexical normalization when the directory cannot be resolved.
pub fn canonical_dir(path: &Path) -> PathBuf {
  match path.canonicalize() {
    Ok(resolved) => fold_case(resolved),
    Err(_) => {
      let cwd = std::env::current_dir().unwrap_or_default();
      normalize_path(&cwd, path)
    }
  }
}

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Convert a git-reported (forward slash, repo-relative) path to a native path.
pub fn git_path_to_native(root: &Path, git_path: &str) -> PathBuf {
  let mut out = root.to_path_buf();
  for segment in git_path.split('/').filter(|s| !s.is_empty()) {
    out.push(segment);
  }
  fold_case(out)
}
