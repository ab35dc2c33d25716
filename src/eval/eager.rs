//! Eager import construction for historical revisions
//!
//! The document loader only remembers documents that are still alive. An
//! evaluator that first asks "does this import exist?" and loads it later can
//! find the cache entry gone and rebuild the document from a different source
//! than the revision view. Wrapping the view so every existence check on a
//! commit-backed document eagerly builds it through the loader, and pinning
//! those documents for the duration of one root load, closes that gap.
//!
//! Evaluators without the weak cache can simply be built without this shim.

use super::document::{Document, DocumentLoader};
use crate::core::error::AffectedResult;
use crate::core::vcs::Revision;
use crate::vfs::{Backing, DirEntry, FileAccessor};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

/// File view wrapper that pins eagerly built documents per root load
pub struct EagerImportCache {
  loader: Arc<DocumentLoader>,
  pinned: Mutex<Vec<Arc<Document>>>,
  active_scopes: AtomicUsize,
}

/// Guard for one root load. Pinned documents are released when the last
/// guard drops.
pub struct EagerScope<'a> {
  cache: &'a EagerImportCache,
}

impl EagerImportCache {
  pub fn new(loader: Arc<DocumentLoader>) -> Self {
    Self {
      loader,
      pinned: Mutex::new(Vec::new()),
      active_scopes: AtomicUsize::new(0),
    }
  }

  /// Begin a root load
  pub fn scope(&self) -> EagerScope<'_> {
    self.active_scopes.fetch_add(1, Ordering::SeqCst);
    EagerScope { cache: self }
  }

  /// Documents currently kept alive
  #[cfg(test)]
  pub fn pinned_count(&self) -> usize {
    self.pinned.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  fn inner(&self) -> &dyn FileAccessor {
    self.loader.fs().as_ref()
  }

  fn should_construct(&self, path: &Path) -> AffectedResult<bool> {
    Ok(
      self.active_scopes.load(Ordering::SeqCst) > 0
        && self.inner().backing(path) == Backing::Commit
        && path.extension().is_some_and(|ext| ext == "toml")
        && !self.inner().is_dir(path)?,
    )
  }
}

impl Drop for EagerScope<'_> {
  fn drop(&mut self) {
    if self.cache.active_scopes.fetch_sub(1, Ordering::SeqCst) == 1 {
      let released = std::mem::take(&mut *self.cache.pinned.lock().unwrap_or_else(PoisonError::into_inner));
      trace!(count = released.len(), "released eagerly built imports");
    }
  }
}

impl FileAccessor for EagerImportCache {
  fn root(&self) -> &Path {
    self.inner().root()
  }

  fn revision(&self) -> &Revision {
    self.inner().revision()
  }

  fn backing(&self, path: &Path) -> Backing {
    self.inner().backing(path)
  }

  fn exists(&self, path: &Path) -> AffectedResult<bool> {
    let exists = self.inner().exists(path)?;
    if exists && self.should_construct(path)? {
      let doc = self.loader.load(path)?;
      trace!(path = %doc.path.display(), revision = %doc.revision, "eagerly built import");
      self.pinned.lock().unwrap_or_else(PoisonError::into_inner).push(doc);
    }
    Ok(exists)
  }

  fn is_dir(&self, path: &Path) -> AffectedResult<bool> {
    self.inner().is_dir(path)
  }

  fn read(&self, path: &Path) -> AffectedResult<Vec<u8>> {
    self.inner().read(path)
  }

  fn list_dir(&self, path: &Path) -> AffectedResult<Vec<DirEntry>> {
    self.inner().list_dir(path)
  }

  fn open_write(&self, path: &Path) -> AffectedResult<File> {
    self.inner().open_write(path)
  }
}
