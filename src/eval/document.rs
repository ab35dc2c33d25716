//! Parsed TOML documents and the loader that builds them
//!
//! The loader keeps documents in a cache keyed by path that holds only weak
//! references: a document survives only as long as someone else holds it.
//! See [`EagerImportCache`](super::eager::EagerImportCache) for why that
//! matters during a root load.

use crate::core::error::{AffectedError, AffectedResult};
use crate::core::vcs::Revision;
use crate::utils::normalize_path;
use crate::vfs::FileAccessor;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use toml_edit::DocumentMut;
use tracing::trace;

/// A parsed document as it existed at one revision
#[derive(Debug)]
pub struct Document {
  pub path: PathBuf,
  pub revision: Revision,
  pub toml: DocumentMut,
}

impl Document {
  /// Directory containing the document; relative paths resolve against it
  pub fn dir(&self) -> &Path {
    self.path.parent().unwrap_or(Path::new("/"))
  }

  /// Resolve a path written inside this document
  pub fn resolve(&self, relative: &str) -> PathBuf {
    normalize_path(self.dir(), Path::new(relative))
  }
}

/// Builds documents through a file view and remembers live ones by path
pub struct DocumentLoader {
  fs: Arc<dyn FileAccessor>,
  cache: Mutex<HashMap<PathBuf, Weak<Document>>>,
  parses: AtomicUsize,
}

impl DocumentLoader {
  pub fn new(fs: Arc<dyn FileAccessor>) -> Self {
    Self {
      fs,
      cache: Mutex::new(HashMap::new()),
      parses: AtomicUsize::new(0),
    }
  }

  /// File view this loader reads through
  pub fn fs(&self) -> &Arc<dyn FileAccessor> {
    &self.fs
  }

  /// Return the live cached document for `path`, if any
  pub fn cached(&self, path: &Path) -> Option<Arc<Document>> {
    let path = normalize_path(self.fs.root(), path);
    self
      .cache
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&path)
      .and_then(Weak::upgrade)
  }

  /// Load and parse `path`, reusing a live cached document when possible
  pub fn load(&self, path: &Path) -> AffectedResult<Arc<Document>> {
    let path = normalize_path(self.fs.root(), path);
    if let Some(doc) = self.cached(&path) {
      return Ok(doc);
    }

    let content = self.fs.read_to_string(&path)?;
    let toml = content
      .parse::<DocumentMut>()
      .map_err(|err| AffectedError::message(format!("{}: {}", path.display(), err)))?;
    self.parses.fetch_add(1, Ordering::Relaxed);
    trace!(path = %path.display(), revision = %self.fs.revision(), "parsed document");

    let doc = Arc::new(Document {
      path: path.clone(),
      revision: self.fs.revision().clone(),
      toml,
    });

    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
    cache.retain(|_, weak| weak.strong_count() > 0);
    cache.insert(path, Arc::downgrade(&doc));
    Ok(doc)
  }

  /// Number of documents parsed so far (cache misses)
  #[cfg(test)]
  pub fn parse_count(&self) -> usize {
    self.parses.load(Ordering::Relaxed)
  }
}
