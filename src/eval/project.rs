//! Project file evaluation
//!
//! A project file declares its dependency edges, package references and extra
//! inputs, and may import shared fragments with the same schema:
//!
//! ```toml
//! [project]
//! name = "app"
//! references = ["../lib/project.toml"]
//! imports = ["../../build/common.toml"]
//! central-packages = true
//! inputs = ["assets/**/*.json"]
//!
//! [packages]
//! serde = {}
//! tokio = "1.40.0"
//! ```
//!
//! Imports are resolved relative to the importing file. An import whose target
//! does not exist at the revision is skipped; existence is always checked
//! before the import is loaded.

use super::document::{Document, DocumentLoader};
use super::eager::EagerImportCache;
use crate::core::error::{AffectedError, AffectedResult, GraphError};
use crate::utils::{normalize_path, path_to_git_format};
use crate::vfs::FileAccessor;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml_edit::Item;
use tracing::debug;

/// A package referenced by a project
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageReference {
  pub name: String,
  /// Exact version pinned by the project itself, if any
  pub version: Option<String>,
}

/// Fully evaluated project (root file plus imports)
#[derive(Debug, Clone)]
pub struct EvaluatedProject {
  pub path: PathBuf,
  pub name: String,
  pub references: Vec<PathBuf>,
  pub packages: Vec<PackageReference>,
  /// False when the project opted out of centrally managed versions
  pub central_packages: bool,
  /// Every imported file that contributed to the evaluation
  pub imports: Vec<PathBuf>,
  /// Absolute glob patterns of additional inputs
  pub input_globs: Vec<String>,
}

/// Evaluates project files as of the revision of its file view
pub struct ProjectEvaluator {
  loader: Arc<DocumentLoader>,
  eager: Option<Arc<EagerImportCache>>,
}

impl ProjectEvaluator {
  /// Evaluator reading through `fs` directly
  pub fn new(fs: Arc<dyn FileAccessor>) -> Self {
    Self {
      loader: Arc::new(DocumentLoader::new(fs)),
      eager: None,
    }
  }

  /// Evaluator whose import existence checks go through an [`EagerImportCache`]
  pub fn with_eager_imports(fs: Arc<dyn FileAccessor>) -> Self {
    let loader = Arc::new(DocumentLoader::new(fs));
    let eager = Arc::new(EagerImportCache::new(Arc::clone(&loader)));
    Self {
      loader,
      eager: Some(eager),
    }
  }

  pub fn fs(&self) -> &Arc<dyn FileAccessor> {
    self.loader.fs()
  }

  /// View used for existence checks (the eager wrapper when enabled)
  fn probe(&self) -> &dyn FileAccessor {
    match &self.eager {
      Some(eager) => eager.as_ref(),
      None => self.loader.fs().as_ref(),
    }
  }

  /// Evaluate one root project file
  pub fn load_root(&self, path: &Path) -> AffectedResult<EvaluatedProject> {
    let path = normalize_path(self.fs().root(), path);
    let _scope = self.eager.as_ref().map(|eager| eager.scope());

    let invalid = |reason: String| {
      AffectedError::Graph(GraphError::InvalidProject {
        path: path.clone(),
        reason,
      })
    };

    let root = self.loader.load(&path).map_err(|err| invalid(err.to_string()))?;

    let mut acc = Accumulator::default();
    let mut seen = HashSet::from([path.clone()]);
    self.evaluate_document(&root, &mut acc, &mut seen).map_err(|err| match err {
      AffectedError::Graph(_) => err,
      other => invalid(other.to_string()),
    })?;

    let name = acc.name.clone().unwrap_or_else(|| default_name(&path));
    debug!(
      project = %name,
      references = acc.references.len(),
      packages = acc.packages.len(),
      imports = acc.imports.len(),
      "evaluated project"
    );

    Ok(EvaluatedProject {
      path,
      name,
      references: acc.references,
      packages: acc.packages,
      central_packages: acc.central_packages.unwrap_or(true),
      imports: acc.imports,
      input_globs: acc.input_globs,
    })
  }

  /// Merge `doc` into the accumulator, then recurse into its imports.
  ///
  /// Earlier declarations win, so the root file takes precedence over imports.
  fn evaluate_document(&self, doc: &Document, acc: &mut Accumulator, seen: &mut HashSet<PathBuf>) -> AffectedResult<()> {
    let project = doc.toml.get("project");

    if let Some(project) = project {
      if acc.name.is_none() {
        acc.name = project.get("name").and_then(Item::as_str).map(str::to_string);
      }
      if acc.central_packages.is_none() {
        acc.central_packages = project.get("central-packages").and_then(Item::as_bool);
      }
      for reference in string_list(doc, project, "references")? {
        let reference = doc.resolve(&reference);
        if !acc.references.contains(&reference) {
          acc.references.push(reference);
        }
      }
      for pattern in string_list(doc, project, "inputs")? {
        let absolute = path_to_git_format(&doc.resolve(&pattern));
        if !acc.input_globs.contains(&absolute) {
          acc.input_globs.push(absolute);
        }
      }
    }

    if let Some(packages) = doc.toml.get("packages") {
      let table = packages
        .as_table_like()
        .ok_or_else(|| AffectedError::message(format!("{}: [packages] must be a table", doc.path.display())))?;
      for (name, value) in table.iter() {
        if acc.packages.iter().any(|p| p.name == name) {
          continue;
        }
        acc.packages.push(PackageReference {
          name: name.to_string(),
          version: package_version(doc, name, value)?,
        });
      }
    }

    let imports = match project {
      Some(project) => string_list(doc, project, "imports")?,
      None => Vec::new(),
    };
    for import in imports {
      let import = doc.resolve(&import);
      if !seen.insert(import.clone()) {
        continue;
      }
      if !self.probe().exists(&import)? {
        debug!(import = %import.display(), "skipping missing import");
        continue;
      }
      let imported = self.loader.load(&import)?;
      acc.imports.push(import);
      self.evaluate_document(&imported, acc, seen)?;
    }

    Ok(())
  }
}

#[derive(Default)]
struct Accumulator {
  name: Option<String>,
  central_packages: Option<bool>,
  references: Vec<PathBuf>,
  packages: Vec<PackageReference>,
  imports: Vec<PathBuf>,
  input_globs: Vec<String>,
}

/// Display name when the project does not declare one: its directory name
fn default_name(path: &Path) -> String {
  path
    .parent()
    .and_then(Path::file_name)
    .or_else(|| path.file_stem())
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| path.display().to_string())
}

fn string_list(doc: &Document, table: &Item, key: &str) -> AffectedResult<Vec<String>> {
  let Some(item) = table.get(key) else {
    return Ok(Vec::new());
  };

  let array = item
    .as_array()
    .ok_or_else(|| AffectedError::message(format!("{}: `{}` must be an array of strings", doc.path.display(), key)))?;

  array
    .iter()
    .map(|value| {
      value.as_str().map(str::to_string).ok_or_else(|| {
        AffectedError::message(format!("{}: `{}` must contain only strings", doc.path.display(), key))
      })
    })
    .collect()
}

/// `name = "1.0"`, `name = {}`, `name = { version = "1.0" }` or `name = true`
fn package_version(doc: &Document, name: &str, value: &Item) -> AffectedResult<Option<String>> {
  if let Some(version) = value.as_str() {
    return Ok(Some(version.to_string()));
  }
  if value.as_bool() == Some(true) {
    return Ok(None);
  }
  if let Some(table) = value.as_table_like() {
    return match table.get("version") {
      None => Ok(None),
      Some(version) => version.as_str().map(|v| Some(v.to_string())).ok_or_else(|| {
        AffectedError::message(format!("{}: version of package '{}' must be a string", doc.path.display(), name))
      }),
    };
  }
  Err(AffectedError::message(format!(
    "{}: unsupported declaration for package '{}'",
    doc.path.display(),
    name
  )))
}
