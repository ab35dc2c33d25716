//! Immutable result of one affected analysis

use crate::changes::PackageChange;
use crate::graph::ProjectGraph;
use crate::utils::path_to_git_format;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Per-project classification for presentation and grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
  Changed,
  Affected,
  Excluded,
}

/// A project as reported in the summary
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SummaryProject {
  /// Repo-relative project file path, forward slashes
  pub path: String,
  pub name: String,
}

/// Result of comparing two revisions. Built once; every list is sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedSummary {
  base: String,
  target: String,
  changed_files: Vec<String>,
  changed_projects: Vec<SummaryProject>,
  affected_projects: Vec<SummaryProject>,
  excluded_projects: Vec<SummaryProject>,
  package_changes: Vec<PackageChange>,
}

/// Inputs to [`AffectedSummary::new`], by canonical project path
pub struct SummaryParts<'a> {
  pub base: String,
  pub target: String,
  pub changed_files: Vec<String>,
  pub changed: &'a BTreeSet<PathBuf>,
  pub affected: &'a BTreeSet<PathBuf>,
  pub excluded: &'a BTreeSet<PathBuf>,
  pub package_changes: BTreeSet<PackageChange>,
}

impl AffectedSummary {
  pub fn new(graph: &ProjectGraph, parts: SummaryParts<'_>) -> Self {
    let describe = |paths: &BTreeSet<PathBuf>| {
      let mut out: Vec<SummaryProject> = paths.iter().map(|p| summary_project(graph, p)).collect();
      out.sort();
      out
    };

    let mut changed_files = parts.changed_files;
    changed_files.sort();
    changed_files.dedup();

    Self {
      base: parts.base,
      target: parts.target,
      changed_files,
      changed_projects: describe(parts.changed),
      affected_projects: describe(parts.affected),
      excluded_projects: describe(parts.excluded),
      package_changes: parts.package_changes.into_iter().collect(),
    }
  }

  pub fn base(&self) -> &str {
    &self.base
  }

  pub fn target(&self) -> &str {
    &self.target
  }

  pub fn changed_files(&self) -> &[String] {
    &self.changed_files
  }

  pub fn changed_projects(&self) -> &[SummaryProject] {
    &self.changed_projects
  }

  pub fn affected_projects(&self) -> &[SummaryProject] {
    &self.affected_projects
  }

  pub fn excluded_projects(&self) -> &[SummaryProject] {
    &self.excluded_projects
  }

  pub fn package_changes(&self) -> &[PackageChange] {
    &self.package_changes
  }

  /// True when no project is changed or affected ("nothing changed")
  pub fn is_empty(&self) -> bool {
    self.changed_projects.is_empty() && self.affected_projects.is_empty()
  }

  /// Every reported project with its status, sorted by path
  pub fn statuses(&self) -> Vec<(&SummaryProject, ProjectStatus)> {
    let mut out: Vec<_> = self
      .changed_projects
      .iter()
      .map(|p| (p, ProjectStatus::Changed))
      .chain(self.affected_projects.iter().map(|p| (p, ProjectStatus::Affected)))
      .chain(self.excluded_projects.iter().map(|p| (p, ProjectStatus::Excluded)))
      .collect();
    out.sort();
    out
  }

  /// Projects needing a rebuild (changed and affected), sorted by path
  pub fn rebuild_set(&self) -> Vec<&SummaryProject> {
    let mut out: Vec<_> = self.changed_projects.iter().chain(&self.affected_projects).collect();
    out.sort();
    out
  }

  /// SHA-256 over the result content (revision names excluded)
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    let sections: [(&str, Vec<String>); 5] = [
      ("files", self.changed_files.clone()),
      ("changed", self.changed_projects.iter().map(|p| p.path.clone()).collect()),
      ("affected", self.affected_projects.iter().map(|p| p.path.clone()).collect()),
      ("excluded", self.excluded_projects.iter().map(|p| p.path.clone()).collect()),
      ("packages", self.package_changes.iter().map(package_key).collect()),
    ];
    for (label, lines) in sections {
      hasher.update(label.as_bytes());
      hasher.update([0u8]);
      for line in lines {
        hasher.update(line.as_bytes());
        hasher.update([0u8]);
      }
      hasher.update([1u8]);
    }
    format!("{:x}", hasher.finalize())
  }
}

fn package_key(change: &PackageChange) -> String {
  let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(",");
  format!("{}:{}:{}", change.name, join(&change.old_versions), join(&change.new_versions))
}

fn summary_project(graph: &ProjectGraph, path: &Path) -> SummaryProject {
  let relative = path.strip_prefix(graph.root()).unwrap_or(path);
  SummaryProject {
    path: path_to_git_format(relative),
    name: graph
      .node(path)
      .map(|node| node.name.clone())
      .unwrap_or_else(|| relative.display().to_string()),
  }
}
