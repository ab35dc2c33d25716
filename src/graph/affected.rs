//! Affected project propagation
//!
//! Given directly changed projects and package-impacted projects, determine:
//! - Which projects transitively reference them (the affected set)
//! - Which candidates an exclusion pattern moves aside

use super::project_graph::{ProjectGraph, ProjectNode};
use crate::core::error::AffectedResult;
use crate::utils::path_to_git_format;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of propagation, by canonical project path.
///
/// The three sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
  /// Projects owning a changed file
  pub changed: BTreeSet<PathBuf>,
  /// Projects reached through referenced-by edges or a changed package
  pub affected: BTreeSet<PathBuf>,
  /// Candidates matched by the exclusion pattern
  pub excluded: BTreeSet<PathBuf>,
}

/// Walks referenced-by edges from the seeds
pub struct AffectedSetPropagator<'a> {
  graph: &'a ProjectGraph,
  exclude: Option<&'a Regex>,
}

impl<'a> AffectedSetPropagator<'a> {
  pub fn new(graph: &'a ProjectGraph, exclude: Option<&'a Regex>) -> Self {
    Self { graph, exclude }
  }

  /// Algorithm:
  /// 1. Seed = changed ∪ package-impacted
  /// 2. Candidates = referenced-by closure of every seed, plus the
  ///    package-impacted seeds themselves
  /// 3. Affected = candidates \ changed
  /// 4. Exclusion last: matches leave changed/affected for excluded
  pub fn propagate(
    &self,
    changed: &BTreeSet<PathBuf>,
    package_impacted: &BTreeSet<PathBuf>,
  ) -> AffectedResult<Propagation> {
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();
    let mut expanded = 0usize;

    for seed in changed.iter().chain(package_impacted) {
      // A seed already reached brought its whole closure along
      if candidates.contains(seed) {
        continue;
      }
      candidates.extend(self.graph.referenced_by_closure(seed)?.iter().cloned());
      expanded += 1;
    }
    candidates.extend(package_impacted.iter().cloned());

    let mut result = Propagation {
      changed: changed.clone(),
      affected: candidates.difference(changed).cloned().collect(),
      excluded: BTreeSet::new(),
    };
    debug!(
      seeds = changed.len() + package_impacted.len(),
      expanded,
      affected = result.affected.len(),
      "propagated through referenced-by edges"
    );

    if let Some(pattern) = self.exclude {
      for set in [&mut result.changed, &mut result.affected] {
        let (excluded, kept): (BTreeSet<_>, BTreeSet<_>) = std::mem::take(set)
          .into_iter()
          .partition(|path| self.graph.node(path).is_some_and(|node| self.is_excluded(pattern, node)));
        *set = kept;
        result.excluded.extend(excluded);
      }
      if !result.excluded.is_empty() {
        info!(count = result.excluded.len(), pattern = %pattern, "excluded projects");
      }
    }

    Ok(result)
  }

  /// Matches the repo-relative project path or the project name
  fn is_excluded(&self, pattern: &Regex, node: &ProjectNode) -> bool {
    let relative = node.path.strip_prefix(self.graph.root()).unwrap_or(&node.path);
    pattern.is_match(&path_to_git_format(relative)) || pattern.is_match(&node.name)
  }
}
