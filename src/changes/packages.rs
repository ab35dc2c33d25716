//! Package-version manifest diffing across revisions
//!
//! A changed manifest is never diffed as text. Manifests import each other and
//! declare versions conditionally, so every project under a changed manifest
//! has its fully evaluated manifest compared at base and target instead.

use super::change_set::{ChangeSet, has_file_name};
use crate::core::error::{AffectedResult, ResultExt};
use crate::eval::{ManifestEvaluator, PackageVersionManifest};
use crate::graph::{ProjectGraph, ProjectNode};
use crate::vfs::FileAccessor;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One package whose version set differs between base and target
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageChange {
  pub name: String,
  /// Versions at base (empty when the package was added)
  pub old_versions: BTreeSet<String>,
  /// Versions at target (empty when the package was removed)
  pub new_versions: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageChangeKind {
  Added,
  Removed,
  Updated,
}

/// Direction of an update, when every version involved is valid semver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionDirection {
  Upgrade,
  Downgrade,
  Mixed,
}

impl PackageChange {
  pub fn kind(&self) -> PackageChangeKind {
    match (self.old_versions.is_empty(), self.new_versions.is_empty()) {
      (true, _) => PackageChangeKind::Added,
      (_, true) => PackageChangeKind::Removed,
      _ => PackageChangeKind::Updated,
    }
  }

  /// Compares the highest version on each side
  pub fn direction(&self) -> Option<VersionDirection> {
    if self.kind() != PackageChangeKind::Updated {
      return None;
    }
    let old = max_semver(&self.old_versions)?;
    let new = max_semver(&self.new_versions)?;
    Some(match new.cmp(&old) {
      Ordering::Greater => VersionDirection::Upgrade,
      Ordering::Less => VersionDirection::Downgrade,
      Ordering::Equal => VersionDirection::Mixed,
    })
  }
}

fn max_semver(versions: &BTreeSet<String>) -> Option<semver::Version> {
  versions
    .iter()
    .map(|v| semver::Version::parse(v).ok())
    .collect::<Option<Vec<_>>>()?
    .into_iter()
    .max()
}

impl fmt::Display for PackageChange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
    match self.kind() {
      PackageChangeKind::Added => write!(f, "{} added ({})", self.name, join(&self.new_versions)),
      PackageChangeKind::Removed => write!(f, "{} removed ({})", self.name, join(&self.old_versions)),
      PackageChangeKind::Updated => write!(
        f,
        "{} {} -> {}",
        self.name,
        join(&self.old_versions),
        join(&self.new_versions)
      ),
    }
  }
}

/// Diff two evaluated manifests per package name.
///
/// Identical version sets produce nothing; a package present on only one
/// side is an addition or removal.
pub fn diff_manifests(base: &PackageVersionManifest, target: &PackageVersionManifest) -> Vec<PackageChange> {
  let old = base.versions_by_name();
  let new = target.versions_by_name();
  let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

  names
    .into_iter()
    .filter_map(|name| {
      let old_versions = old.get(name).cloned().unwrap_or_default();
      let new_versions = new.get(name).cloned().unwrap_or_default();
      (old_versions != new_versions).then(|| PackageChange {
        name: name.clone(),
        old_versions,
        new_versions,
      })
    })
    .collect()
}

/// Package changes plus the projects they impact directly
#[derive(Debug, Clone, Default)]
pub struct PackageDiff {
  pub changes: BTreeSet<PackageChange>,
  /// Projects whose own package references name a changed package
  pub impacted: BTreeSet<PathBuf>,
  /// Changed manifests that were diffed (after ancestor subsumption)
  pub manifests: Vec<PathBuf>,
}

/// Finds package-driven impact from changed manifests
pub struct PackageManifestDiffEngine<'a> {
  evaluator: &'a dyn ManifestEvaluator,
  base: &'a dyn FileAccessor,
  target: &'a dyn FileAccessor,
}

impl<'a> PackageManifestDiffEngine<'a> {
  pub fn new(evaluator: &'a dyn ManifestEvaluator, base: &'a dyn FileAccessor, target: &'a dyn FileAccessor) -> Self {
    Self {
      evaluator,
      base,
      target,
    }
  }

  pub fn diff(&self, changes: &ChangeSet, graph: &ProjectGraph) -> AffectedResult<PackageDiff> {
    let mut changed: Vec<PathBuf> = changes.named(self.evaluator.file_name()).cloned().collect();
    changed.extend(self.importers_of_changes(changes, graph));
    let manifests = subsume_nested(&changed);
    if manifests.is_empty() {
      return Ok(PackageDiff::default());
    }
    debug!(changed = changed.len(), diffed = manifests.len(), "changed package manifests");

    let mut out = PackageDiff {
      manifests: manifests.clone(),
      ..PackageDiff::default()
    };

    let mut projects: BTreeMap<&Path, &ProjectNode> = BTreeMap::new();
    for manifest in &manifests {
      let dir = manifest.parent().unwrap_or(changes.root());
      let owned: Vec<_> = graph
        .projects_under(dir)
        .into_iter()
        .filter(|node| node.central_packages)
        .collect();
      if owned.is_empty() {
        debug!(manifest = %manifest.display(), "changed manifest owns no projects");
      }
      for node in owned {
        projects.entry(node.path.as_path()).or_insert(node);
      }
    }

    for (project, node) in projects {
      let project_changes = self.diff_project(project)?;
      if project_changes.iter().any(|change| node.references_package(&change.name)) {
        out.impacted.insert(project.to_path_buf());
      }
      out.changes.extend(project_changes);
    }

    info!(
      package_changes = out.changes.len(),
      impacted = out.impacted.len(),
      "diffed package manifests"
    );
    Ok(out)
  }

  /// Manifests in use by some project whose evaluation reads a changed
  /// non-manifest file (an imported fragment), at either revision
  fn importers_of_changes(&self, changes: &ChangeSet, graph: &ProjectGraph) -> BTreeSet<PathBuf> {
    let file_name = self.evaluator.file_name();
    let mut importers = BTreeSet::new();
    if changes.iter().all(|f| has_file_name(f, file_name)) {
      return importers;
    }

    for fs in [self.base, self.target] {
      let mut seen = BTreeSet::new();
      for node in graph.nodes().filter(|node| node.central_packages) {
        let manifest = match self.evaluator.manifest_for(&node.path, fs) {
          Ok(Some(manifest)) => manifest,
          Ok(None) => continue,
          Err(err) => {
            warn!(project = %node.path.display(), revision = %fs.revision(), error = %err, "manifest lookup failed");
            continue;
          }
        };
        if !seen.insert(manifest.clone()) {
          continue;
        }

        // Only a changed manifest failing to evaluate is fatal
        match self.evaluator.manifest_files(&manifest, fs) {
          Ok(files) => {
            if files.iter().any(|f| *f != manifest && changes.contains(f)) {
              debug!(manifest = %manifest.display(), revision = %fs.revision(), "imported manifest fragment changed");
              importers.insert(manifest);
            }
          }
          Err(err) => {
            warn!(manifest = %manifest.display(), revision = %fs.revision(), error = %err, "skipping manifest import scan");
          }
        }
      }
    }

    importers
  }

  fn diff_project(&self, project: &Path) -> AffectedResult<Vec<PackageChange>> {
    let base = self
      .evaluator
      .evaluate(project, self.base)
      .with_context(|| format!("evaluating packages of {} at {}", project.display(), self.base.revision()))?;
    let target = self
      .evaluator
      .evaluate(project, self.target)
      .with_context(|| format!("evaluating packages of {} at {}", project.display(), self.target.revision()))?;
    Ok(diff_manifests(&base, &target))
  }
}

/// Drop every manifest whose directory lies strictly below another changed
/// manifest's directory: evaluation walks upward, so the ancestor already
/// covers that subtree.
fn subsume_nested(manifests: &[PathBuf]) -> Vec<PathBuf> {
  let dirs: Vec<&Path> = manifests.iter().filter_map(|m| m.parent()).collect();
  let mut kept: Vec<PathBuf> = manifests
    .iter()
    .filter(|manifest| {
      let Some(dir) = manifest.parent() else {
        return true;
      };
      !dirs.iter().any(|other| *other != dir && dir.starts_with(other))
    })
    .cloned()
    .collect();
  kept.sort();
  kept.dedup();
  kept
}
