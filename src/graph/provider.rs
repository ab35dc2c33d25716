//! Project graph construction from discovered entry points

use super::project_graph::{ProjectGraph, ProjectNode};
use crate::core::error::{AffectedError, AffectedResult, GraphError};
use crate::eval::ProjectEvaluator;
use crate::utils::{normalize_path, path_to_git_format};
use crate::vfs::{FileAccessor, list_files};
use glob::{MatchOptions, Pattern};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds the full project graph as seen through a file view
pub trait ProjectGraphProvider: Send + Sync {
  fn build_graph(&self, entry_points: &[PathBuf], fs: Arc<dyn FileAccessor>) -> AffectedResult<ProjectGraph>;
}

/// Graph provider for TOML project files.
///
/// Starts at the entry points and follows `references` breadth-first, so a
/// project reachable from several entry points is evaluated once.
pub struct TomlGraphProvider {
  eager_imports: bool,
}

impl TomlGraphProvider {
  /// `eager_imports` routes import existence checks through the eager cache
  pub fn new(eager_imports: bool) -> Self {
    Self { eager_imports }
  }
}

impl Default for TomlGraphProvider {
  fn default() -> Self {
    Self::new(true)
  }
}

impl ProjectGraphProvider for TomlGraphProvider {
  fn build_graph(&self, entry_points: &[PathBuf], fs: Arc<dyn FileAccessor>) -> AffectedResult<ProjectGraph> {
    let root = fs.root().to_path_buf();
    let evaluator = if self.eager_imports {
      ProjectEvaluator::with_eager_imports(Arc::clone(&fs))
    } else {
      ProjectEvaluator::new(Arc::clone(&fs))
    };

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    for entry in entry_points {
      let entry = normalize_path(&root, entry);
      if !fs.exists(&entry)? {
        return Err(AffectedError::Graph(GraphError::InvalidProject {
          path: entry,
          reason: format!("entry point does not exist at {}", fs.revision()),
        }));
      }
      if seen.insert(entry.clone()) {
        queue.push_back(entry);
      }
    }

    let mut nodes = Vec::new();
    while let Some(path) = queue.pop_front() {
      let project = evaluator.load_root(&path)?;
      for reference in &project.references {
        // Dangling references are reported by graph construction
        if !seen.contains(reference) && fs.exists(reference)? {
          seen.insert(reference.clone());
          queue.push_back(reference.clone());
        }
      }
      nodes.push(ProjectNode::from(project));
    }

    let graph = ProjectGraph::from_projects(&root, nodes)?;
    info!(
      projects = graph.len(),
      entry_points = entry_points.len(),
      revision = %fs.revision(),
      "built project graph"
    );
    Ok(graph)
  }
}

const DISCOVERY_OPTIONS: MatchOptions = MatchOptions {
  case_sensitive: true,
  require_literal_separator: true,
  require_literal_leading_dot: false,
};

/// Every file under the repository root whose repo-relative path matches one
/// of `patterns`, sorted
pub fn discover_entry_points(fs: &dyn FileAccessor, patterns: &[String]) -> AffectedResult<Vec<PathBuf>> {
  let patterns = patterns
    .iter()
    .map(|p| Pattern::new(p))
    .collect::<Result<Vec<_>, _>>()?;

  let root = fs.root();
  let mut found: Vec<PathBuf> = list_files(fs, root)?
    .into_iter()
    .filter(|file| {
      file.strip_prefix(root).is_ok_and(|relative| {
        let relative = path_to_git_format(relative);
        patterns.iter().any(|p| p.matches_with(&relative, DISCOVERY_OPTIONS))
      })
    })
    .collect();
  found.sort();

  debug!(count = found.len(), revision = %fs.revision(), "discovered entry points");
  Ok(found)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vfs::memory::MemoryFileAccessor;
  use std::path::Path;

  fn fs(files: &[(&str, &str)]) -> Arc<dyn FileAccessor> {
    Arc::new(MemoryFileAccessor::new("/repo", "target", files))
  }

  #[test]
  fn test_discovery_matches_patterns() {
    let fs = fs(&[
      ("project.toml", ""),
      ("src/a/project.toml", ""),
      ("src/a/notes.toml", ""),
      ("tools/b/project.toml", ""),
    ]);

    let all = discover_entry_points(fs.as_ref(), &["**/project.toml".to_string()]).unwrap();
    assert_eq!(all.len(), 3);

    let src_only = discover_entry_points(fs.as_ref(), &["src/**/project.toml".to_string()]).unwrap();
    assert_eq!(src_only, vec![PathBuf::from("/repo/src/a/project.toml")]);
  }

  #[test]
  fn test_build_follows_references_from_entry_points() {
    let fs = fs(&[
      ("app/project.toml", "[project]\nreferences = [\"../lib/project.toml\"]\n"),
      ("lib/project.toml", "[project]\nreferences = [\"../core/project.toml\"]\n"),
      ("core/project.toml", ""),
      ("unrelated/project.toml", ""),
    ]);

    let graph = TomlGraphProvider::default()
      .build_graph(&[PathBuf::from("/repo/app/project.toml")], fs)
      .unwrap();
    assert_eq!(graph.len(), 3);
    assert!(graph.contains(Path::new("/repo/core/project.toml")));
    assert!(!graph.contains(Path::new("/repo/unrelated/project.toml")));

    let closure = graph.referenced_by_closure(Path::new("/repo/core/project.toml")).unwrap();
    assert_eq!(closure.len(), 2);
  }

  #[test]
  fn test_shared_reference_evaluated_once() {
    let fs = fs(&[
      ("a/project.toml", "[project]\nreferences = [\"../c/project.toml\"]\n"),
      ("b/project.toml", "[project]\nreferences = [\"../c/project.toml\"]\n"),
      ("c/project.toml", ""),
    ]);
    let entries = [
      PathBuf::from("/repo/a/project.toml"),
      PathBuf::from("/repo/b/project.toml"),
      PathBuf::from("/repo/c/project.toml"),
    ];
    let graph = TomlGraphProvider::new(false).build_graph(&entries, fs).unwrap();
    assert_eq!(graph.len(), 3);
  }

  #[test]
  fn test_dangling_reference_is_an_error() {
    let fs = fs(&[("a/project.toml", "[project]\nreferences = [\"../gone/project.toml\"]\n")]);
    let err = TomlGraphProvider::default()
      .build_graph(&[PathBuf::from("/repo/a/project.toml")], fs)
      .unwrap_err();
    assert!(matches!(err, AffectedError::Graph(GraphError::MissingReference { .. })));
  }

  #[test]
  fn test_missing_entry_point_is_an_error() {
    let fs = fs(&[]);
    let err = TomlGraphProvider::default()
      .build_graph(&[PathBuf::from("/repo/nope/project.toml")], fs)
      .unwrap_err();
    assert!(matches!(err, AffectedError::Graph(GraphError::InvalidProject { .. })));
  }
}
