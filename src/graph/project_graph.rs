//! Project dependency graph built on petgraph
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "A references B"
//! - **Nodes**: evaluated projects, identified by canonical project file path
//! - **Referenced-by**: incoming edges; never stored separately, so it cannot
//!   drift from the forward edges
//! - **Closure cache**: per-node transitive referenced-by sets, memoized for the
//!   lifetime of the graph (the graph is immutable once built)

use crate::core::error::{AffectedError, AffectedResult, GraphError};
use crate::eval::{EvaluatedProject, PackageReference};
use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// A project node in the dependency graph.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectNode {
  /// Canonical project file path (identity)
  pub path: PathBuf,
  pub name: String,
  /// Projects this one references (outgoing edges)
  pub references: Vec<PathBuf>,
  pub packages: Vec<PackageReference>,
  /// False when the project opted out of centrally managed versions
  pub central_packages: bool,
  #[serde(skip)]
  pub imports: Vec<PathBuf>,
  #[serde(skip)]
  pub input_globs: Vec<String>,
}

impl ProjectNode {
  /// Directory containing the project file
  pub fn dir(&self) -> &Path {
    self.path.parent().unwrap_or(Path::new("/"))
  }

  pub fn references_package(&self, name: &str) -> bool {
    self.packages.iter().any(|p| p.name == name)
  }
}

impl From<EvaluatedProject> for ProjectNode {
  fn from(project: EvaluatedProject) -> Self {
    Self {
      path: project.path,
      name: project.name,
      references: project.references,
      packages: project.packages,
      central_packages: project.central_packages,
      imports: project.imports,
      input_globs: project.input_globs,
    }
  }
}

/// Project dependency graph.
#[derive(Debug)]
pub struct ProjectGraph {
  root: PathBuf,

  /// Nodes: ProjectNode, edges: "references"
  graph: DiGraph<ProjectNode, ()>,

  /// Index: canonical path → node index
  path_to_node: HashMap<PathBuf, NodeIndex>,

  /// Memoized referenced-by closures, keyed by canonical path
  referenced_by: RwLock<HashMap<PathBuf, Arc<BTreeSet<PathBuf>>>>,
}

impl ProjectGraph {
  /// Build the graph from evaluated projects.
  ///
  /// Every referenced project must be present. Duplicate paths collapse to the
  /// first occurrence. Cycles are rejected.
  pub fn from_projects(root: &Path, projects: impl IntoIterator<Item = ProjectNode>) -> AffectedResult<Self> {
    let mut graph = DiGraph::new();
    let mut path_to_node = HashMap::new();

    for project in projects {
      if path_to_node.contains_key(&project.path) {
        continue;
      }
      let path = project.path.clone();
      let idx = graph.add_node(project);
      path_to_node.insert(path, idx);
    }

    let mut edges = Vec::new();
    for from_idx in graph.node_indices() {
      let node = &graph[from_idx];
      for reference in &node.references {
        let to_idx = path_to_node.get(reference).ok_or_else(|| {
          AffectedError::Graph(GraphError::MissingReference {
            from: node.path.clone(),
            to: reference.clone(),
          })
        })?;
        edges.push((from_idx, *to_idx));
      }
    }
    for (from_idx, to_idx) in edges {
      graph.update_edge(from_idx, to_idx, ());
    }

    algo::toposort(&graph, None).map_err(|cycle| {
      AffectedError::Graph(GraphError::Cycle {
        path: graph[cycle.node_id()].path.clone(),
      })
    })?;

    Ok(Self {
      root: root.to_path_buf(),
      graph,
      path_to_node,
      referenced_by: RwLock::new(HashMap::new()),
    })
  }

  /// Repository root the graph was built for
  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// All nodes, in construction order
  pub fn nodes(&self) -> impl Iterator<Item = &ProjectNode> {
    self.graph.node_weights()
  }

  pub fn node(&self, path: &Path) -> Option<&ProjectNode> {
    self.path_to_node.get(path).map(|idx| &self.graph[*idx])
  }

  #[cfg(test)]
  pub fn contains(&self, path: &Path) -> bool {
    self.path_to_node.contains_key(path)
  }

  /// Projects whose file lives inside `dir` (any depth)
  pub fn projects_under(&self, dir: &Path) -> Vec<&ProjectNode> {
    self.graph.node_weights().filter(|node| node.path.starts_with(dir)).collect()
  }

  /// Direct referenced-by neighbours (projects that reference `path`)
  #[cfg(test)]
  pub fn referenced_by(&self, path: &Path) -> AffectedResult<Vec<&ProjectNode>> {
    let idx = self.find_node(path)?;
    let mut dependents: Vec<&ProjectNode> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|i| &self.graph[i])
      .collect();
    dependents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(dependents)
  }

  /// Transitive referenced-by closure of `path`, excluding `path` itself.
  ///
  /// Memoized per node; safe to call from several threads.
  pub fn referenced_by_closure(&self, path: &Path) -> AffectedResult<Arc<BTreeSet<PathBuf>>> {
    let idx = self.find_node(path)?;
    Ok(self.closure_of(idx))
  }

  fn closure_of(&self, idx: NodeIndex) -> Arc<BTreeSet<PathBuf>> {
    let key = &self.graph[idx].path;
    if let Some(hit) = self.referenced_by.read().unwrap_or_else(PoisonError::into_inner).get(key) {
      return Arc::clone(hit);
    }

    let mut closure = BTreeSet::new();
    for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
      // A dependent already collected brought its own closure with it
      if closure.insert(self.graph[dependent].path.clone()) {
        closure.extend(self.closure_of(dependent).iter().cloned());
      }
    }

    let closure = Arc::new(closure);
    self
      .referenced_by
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key.clone(), Arc::clone(&closure));
    closure
  }

  /// Number of memoized closures
  #[cfg(test)]
  pub fn cached_closures(&self) -> usize {
    self.referenced_by.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  fn find_node(&self, path: &Path) -> AffectedResult<NodeIndex> {
    self.path_to_node.get(path).copied().ok_or_else(|| {
      AffectedError::message(format!("Project '{}' is not part of the project graph", path.display()))
    })
  }

  #[cfg(test)]
  pub fn node_mut(&mut self, path: &Path) -> Option<&mut ProjectNode> {
    let idx = *self.path_to_node.get(path)?;
    Some(&mut self.graph[idx])
  }
}
