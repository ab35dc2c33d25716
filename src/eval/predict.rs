//! Input prediction: which files does each project consume?

use crate::core::error::AffectedResult;
use crate::graph::ProjectGraph;
use crate::utils::path_to_git_format;
use crate::vfs::{FileAccessor, list_files};
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Project path → files it consumes
pub type PredictedInputs = HashMap<PathBuf, HashSet<PathBuf>>;

/// Enumerates the files each project consumes
pub trait InputPredictor: Send + Sync {
  /// Predicted inputs for every project, capped to files under `repo_root`
  fn predict_inputs(&self, graph: &ProjectGraph, repo_root: &Path) -> AffectedResult<PredictedInputs>;
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

/// Predicts inputs from directory layout:
///
/// - the project file and every import it evaluated
/// - every file under the project directory
/// - every file matching the project's `inputs` globs
///
/// Each view is enumerated, so passing both the target and the base revision
/// attributes files that exist at only one side (deletions and additions).
pub struct DirectoryInputPredictor {
  views: Vec<Arc<dyn FileAccessor>>,
}

impl DirectoryInputPredictor {
  pub fn new(views: Vec<Arc<dyn FileAccessor>>) -> Self {
    Self { views }
  }
}

impl InputPredictor for DirectoryInputPredictor {
  fn predict_inputs(&self, graph: &ProjectGraph, repo_root: &Path) -> AffectedResult<PredictedInputs> {
    // Repository listings are only needed when some project declares globs
    let needs_listing = graph.nodes().any(|node| !node.input_globs.is_empty());
    let mut repo_files: Vec<PathBuf> = Vec::new();
    if needs_listing {
      for view in &self.views {
        repo_files.extend(list_files(view.as_ref(), repo_root)?);
      }
      repo_files.sort();
      repo_files.dedup();
    }

    let nodes: Vec<_> = graph.nodes().collect();
    let predicted: AffectedResult<Vec<(PathBuf, HashSet<PathBuf>)>> = nodes
      .par_iter()
      .map(|node| -> AffectedResult<(PathBuf, HashSet<PathBuf>)> {
        let mut inputs = HashSet::new();
        inputs.insert(node.path.clone());
        inputs.extend(node.imports.iter().cloned());

        for view in &self.views {
          inputs.extend(list_files(view.as_ref(), node.dir())?);
        }

        if !node.input_globs.is_empty() {
          let patterns = node
            .input_globs
            .iter()
            .map(|glob| Pattern::new(glob))
            .collect::<Result<Vec<_>, _>>()?;
          inputs.extend(
            repo_files
              .iter()
              .filter(|file| {
                let file = path_to_git_format(file);
                patterns.iter().any(|p| p.matches_with(&file, MATCH_OPTIONS))
              })
              .cloned(),
          );
        }

        inputs.retain(|path| path.starts_with(repo_root));
        Ok((node.path.clone(), inputs))
      })
      .collect();

    let predicted: PredictedInputs = predicted?.into_iter().collect();
    debug!(
      projects = predicted.len(),
      files = predicted.values().map(HashSet::len).sum::<usize>(),
      "predicted project inputs"
    );
    Ok(predicted)
  }
}
