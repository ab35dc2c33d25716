//! Attribute changed files to the projects that consume them

use super::change_set::{ChangeSet, has_file_name};
use crate::core::error::AffectedResult;
use crate::eval::InputPredictor;
use crate::graph::ProjectGraph;
use crate::utils::normalize_path;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Projects that own at least one changed file
#[derive(Debug, Clone, Default)]
pub struct Ownership {
  /// Project path → changed files it consumes
  pub owners: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
  /// Changed files no project consumes
  pub unowned: BTreeSet<PathBuf>,
}

impl Ownership {
  pub fn changed_projects(&self) -> BTreeSet<PathBuf> {
    self.owners.keys().cloned().collect()
  }
}

/// Maps a change set onto projects through input prediction.
///
/// Manifest files are left to the package diff engine and never attributed
/// here. Files outside the repository root cannot be attributed.
pub struct ProjectOwnershipMapper<'a> {
  predictor: &'a dyn InputPredictor,
  manifest_file_name: &'a str,
}

impl<'a> ProjectOwnershipMapper<'a> {
  pub fn new(predictor: &'a dyn InputPredictor, manifest_file_name: &'a str) -> Self {
    Self {
      predictor,
      manifest_file_name,
    }
  }

  pub fn map(&self, graph: &ProjectGraph, changes: &ChangeSet) -> AffectedResult<Ownership> {
    let root = changes.root();
    let relevant: BTreeSet<&PathBuf> = changes
      .iter()
      .filter(|f| f.starts_with(root) && !has_file_name(f, self.manifest_file_name))
      .collect();

    let mut ownership = Ownership::default();
    if relevant.is_empty() {
      return Ok(ownership);
    }

    let predicted = self.predictor.predict_inputs(graph, root)?;
    let mut attributed = BTreeSet::new();

    for (project, inputs) in &predicted {
      let hits: BTreeSet<PathBuf> = inputs
        .iter()
        .map(|input| normalize_path(root, input))
        .filter(|input| relevant.contains(input))
        .collect();
      if hits.is_empty() {
        continue;
      }
      trace!(project = %project.display(), files = hits.len(), "project owns changed files");
      attributed.extend(hits.iter().cloned());
      ownership.owners.insert(normalize_path(root, project), hits);
    }

    ownership.unowned = relevant
      .into_iter()
      .filter(|f| !attributed.contains(*f))
      .cloned()
      .collect();

    debug!(
      changed_projects = ownership.owners.len(),
      unowned_files = ownership.unowned.len(),
      "mapped changed files to projects"
    );
    Ok(ownership)
  }
}
