//! Unified comparison context - build once, pass everywhere
//!
//! # Architecture
//!
//! ```text
//! main.rs:
//!   AffectedContext::build() -> &AffectedContext
//!   |
//!   v
//! commands/affected.rs:
//!   fn run_affected(ctx: &AffectedContext, ..)
//! ```
//!
//! The context resolves both revisions up front, so an unknown revision name
//! fails before any project is evaluated.

use crate::core::config::{AffectedConfig, ConfigOverrides};
use crate::core::error::AffectedResult;
use crate::core::vcs::Revision;
use crate::core::vcs::system_git::SystemGit;
use crate::utils::canonical_dir;
use crate::vfs::{FileAccessor, RevisionFileAccessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Everything one comparison needs: repository, config, both revisions and
/// a file view at each.
#[derive(Clone)]
pub struct AffectedContext {
  /// Repository root (canonical)
  pub root: PathBuf,

  pub git: SystemGit,

  /// Effective config (file plus command-line overrides)
  pub config: Arc<AffectedConfig>,

  pub base: Revision,
  pub target: Revision,

  /// File view at the base revision
  pub base_fs: Arc<dyn FileAccessor>,

  /// File view at the target revision
  pub target_fs: Arc<dyn FileAccessor>,
}

impl AffectedContext {
  /// Build the context for comparing `from` (default `HEAD`) with `to`
  /// (default: the working tree).
  pub fn build(
    repository_path: &Path,
    from: Option<&str>,
    to: Option<&str>,
    overrides: ConfigOverrides,
  ) -> AffectedResult<Self> {
    let git = SystemGit::open(repository_path)?;
    let root = canonical_dir(git.work_tree());
    let config = AffectedConfig::load(&root)?.with_overrides(overrides)?;

    let base = git.resolve_revision(from.unwrap_or("HEAD"))?;
    let target = match to {
      Some(name) => git.resolve_revision(name)?,
      None => Revision::WorkingTree,
    };
    info!(root = %root.display(), base = %base, target = %target, "comparing revisions");

    let base_fs: Arc<dyn FileAccessor> = Arc::new(RevisionFileAccessor::open(&git, &root, base.clone())?);
    let target_fs: Arc<dyn FileAccessor> = Arc::new(RevisionFileAccessor::open(&git, &root, target.clone())?);

    Ok(Self {
      root,
      git,
      config: Arc::new(config),
      base,
      target,
      base_fs,
      target_fs,
    })
  }
}
