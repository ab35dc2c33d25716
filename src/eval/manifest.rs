//! Centrally managed package-version manifests
//!
//! A project's manifest is the nearest manifest file found walking upward from
//! the project directory to the repository root. Manifests can nest:
//!
//! ```toml
//! import-parent = true          # start from the next manifest up the tree
//! imports = ["eng/Versions.toml"]
//!
//! [packages]
//! serde = "1.0.200"
//!
//! [conditions.debug.packages]   # conditional declaration
//! serde = "1.0.201"
//! ```
//!
//! Declarations in a manifest replace, per package name, whatever it inherited
//! from its parent or imports. Conditional sections all contribute, so the
//! evaluated result is a multiset of (name, version) pairs.

use super::document::Document;
use crate::core::error::{AffectedError, AffectedResult, ManifestError};
use crate::utils::normalize_path;
use crate::vfs::FileAccessor;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item};
use tracing::debug;

/// One (name, version) declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageVersion {
  pub name: String,
  pub version: String,
}

/// Evaluated package versions visible to one project at one revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersionManifest {
  /// Manifest the evaluation started from (None when no manifest applies)
  pub source: Option<PathBuf>,
  pub entries: Vec<PackageVersion>,
}

impl PackageVersionManifest {
  /// Collapse the multiset into name → version set
  pub fn versions_by_name(&self) -> BTreeMap<String, BTreeSet<String>> {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in &self.entries {
      map.entry(entry.name.clone()).or_default().insert(entry.version.clone());
    }
    map
  }
}

/// Evaluates the package-version manifest that applies to a project
pub trait ManifestEvaluator: Send + Sync {
  /// File name that identifies a manifest (e.g. `Packages.toml`)
  fn file_name(&self) -> &str;

  fn evaluate(&self, project_path: &Path, fs: &dyn FileAccessor) -> AffectedResult<PackageVersionManifest>;

  /// Manifest an evaluation for `project_path` starts from, if any
  fn manifest_for(&self, project_path: &Path, fs: &dyn FileAccessor) -> AffectedResult<Option<PathBuf>>;

  /// Every file evaluating `manifest` reads: itself, its imports and any
  /// parent it pulls in
  fn manifest_files(&self, manifest: &Path, fs: &dyn FileAccessor) -> AffectedResult<BTreeSet<PathBuf>>;
}

/// Manifest evaluator for the TOML manifest format
pub struct TomlManifestEvaluator {
  file_name: String,
}

impl TomlManifestEvaluator {
  pub fn new(file_name: impl Into<String>) -> Self {
    Self {
      file_name: file_name.into(),
    }
  }

  /// Nearest manifest at or above `dir`, stopping at the repository root
  pub fn find_manifest(&self, dir: &Path, fs: &dyn FileAccessor) -> AffectedResult<Option<PathBuf>> {
    let root = fs.root();
    let mut current = Some(dir);

    while let Some(candidate_dir) = current {
      if !candidate_dir.starts_with(root) {
        break;
      }
      let candidate = candidate_dir.join(&self.file_name);
      if fs.exists(&candidate)? && !fs.is_dir(&candidate)? {
        return Ok(Some(candidate));
      }
      current = candidate_dir.parent();
    }

    Ok(None)
  }

  fn evaluate_file(
    &self,
    path: &Path,
    fs: &dyn FileAccessor,
    stack: &mut HashSet<PathBuf>,
    read: &mut BTreeSet<PathBuf>,
  ) -> AffectedResult<Vec<PackageVersion>> {
    if !stack.insert(path.to_path_buf()) {
      return Err(AffectedError::Manifest(ManifestError::ImportCycle {
        path: path.to_path_buf(),
      }));
    }
    read.insert(path.to_path_buf());

    let invalid = |reason: String| {
      AffectedError::Manifest(ManifestError::Invalid {
        path: path.to_path_buf(),
        revision: fs.revision().to_string(),
        reason,
      })
    };

    let content = fs.read_to_string(path).map_err(|err| invalid(err.to_string()))?;
    let toml = content.parse::<DocumentMut>().map_err(|err| invalid(err.to_string()))?;
    let doc = Document {
      path: path.to_path_buf(),
      revision: fs.revision().clone(),
      toml,
    };

    let mut entries = Vec::new();

    if let Some(flag) = doc.toml.get("import-parent") {
      let import_parent = flag
        .as_bool()
        .ok_or_else(|| invalid("`import-parent` must be a boolean".to_string()))?;
      if import_parent
        && let Some(parent_dir) = doc.dir().parent()
        && let Some(parent) = self.find_manifest(parent_dir, fs)?
      {
        entries = self.evaluate_file(&parent, fs, stack, read)?;
      }
    }

    for import in import_list(&doc).map_err(invalid)? {
      let import = doc.resolve(&import);
      if !fs.exists(&import)? {
        return Err(invalid(format!("imported manifest {} does not exist", import.display())));
      }
      let imported = self.evaluate_file(&import, fs, stack, read)?;
      override_entries(&mut entries, imported);
    }

    let own = declared_versions(&doc).map_err(invalid)?;
    override_entries(&mut entries, own);

    stack.remove(path);
    Ok(entries)
  }
}

impl ManifestEvaluator for TomlManifestEvaluator {
  fn file_name(&self) -> &str {
    &self.file_name
  }

  fn evaluate(&self, project_path: &Path, fs: &dyn FileAccessor) -> AffectedResult<PackageVersionManifest> {
    let project_path = normalize_path(fs.root(), project_path);
    let Some(source) = self.manifest_for(&project_path, fs)? else {
      return Ok(PackageVersionManifest::default());
    };

    let entries = self.evaluate_file(&source, fs, &mut HashSet::new(), &mut BTreeSet::new())?;
    debug!(
      project = %project_path.display(),
      manifest = %source.display(),
      revision = %fs.revision(),
      entries = entries.len(),
      "evaluated package manifest"
    );

    Ok(PackageVersionManifest {
      source: Some(source),
      entries,
    })
  }

  fn manifest_for(&self, project_path: &Path, fs: &dyn FileAccessor) -> AffectedResult<Option<PathBuf>> {
    let project_path = normalize_path(fs.root(), project_path);
    self.find_manifest(project_path.parent().unwrap_or(fs.root()), fs)
  }

  fn manifest_files(&self, manifest: &Path, fs: &dyn FileAccessor) -> AffectedResult<BTreeSet<PathBuf>> {
    let mut read = BTreeSet::new();
    self.evaluate_file(&normalize_path(fs.root(), manifest), fs, &mut HashSet::new(), &mut read)?;
    Ok(read)
  }
}

/// Replace every inherited entry whose name `overriding` declares
fn override_entries(entries: &mut Vec<PackageVersion>, overriding: Vec<PackageVersion>) {
  let names: HashSet<&str> = overriding.iter().map(|e| e.name.as_str()).collect();
  entries.retain(|e| !names.contains(e.name.as_str()));
  entries.extend(overriding);
}

fn import_list(doc: &Document) -> Result<Vec<String>, String> {
  let Some(item) = doc.toml.get("imports") else {
    return Ok(Vec::new());
  };
  let array = item.as_array().ok_or("`imports` must be an array of strings")?;
  array
    .iter()
    .map(|v| v.as_str().map(str::to_string).ok_or_else(|| "`imports` must contain only strings".to_string()))
    .collect()
}

/// Unconditional `[packages]` plus every `[conditions.<label>.packages]`
fn declared_versions(doc: &Document) -> Result<Vec<PackageVersion>, String> {
  let mut out = Vec::new();

  if let Some(packages) = doc.toml.get("packages") {
    collect_packages(packages, "packages", &mut out)?;
  }

  if let Some(conditions) = doc.toml.get("conditions") {
    let conditions = conditions.as_table_like().ok_or("`conditions` must be a table")?;
    for (label, section) in conditions.iter() {
      if let Some(packages) = section.get("packages") {
        collect_packages(packages, &format!("conditions.{}.packages", label), &mut out)?;
      }
    }
  }

  Ok(out)
}

fn collect_packages(item: &Item, section: &str, out: &mut Vec<PackageVersion>) -> Result<(), String> {
  let table = item
    .as_table_like()
    .ok_or_else(|| format!("[{}] must be a table", section))?;

  for (name, value) in table.iter() {
    let version = value
      .as_str()
      .or_else(|| value.get("version").and_then(Item::as_str))
      .ok_or_else(|| format!("[{}] '{}' must map to a version string", section, name))?;
    out.push(PackageVersion {
      name: name.to_string(),
      version: version.to_string(),
    });
  }

  Ok(())
}
