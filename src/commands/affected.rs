//! `graph-affected` - Show which projects are affected by changes
//!
//! This command compares two revisions and determines:
//! - Which projects own changed files
//! - Which projects reference a package whose managed version changed
//! - Which projects transitively reference any of those

use crate::changes::{ChangeSetResolver, PackageManifestDiffEngine, ProjectOwnershipMapper};
use crate::core::context::AffectedContext;
use crate::core::error::{AffectedError, AffectedResult};
use crate::eval::{DirectoryInputPredictor, TomlManifestEvaluator};
use crate::graph::{
  AffectedSetPropagator, ProjectGraphProvider, Propagation, TomlGraphProvider, discover_entry_points,
};
use crate::summary::{AffectedSummary, SummaryParts};
use crate::utils::normalize_path;
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Output format for affected command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Text,
  Json,
  Names,
}

impl FromStr for OutputFormat {
  type Err = AffectedError;

  fn from_str(s: &str) -> AffectedResult<Self> {
    match s.to_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "names" | "names-only" => Ok(Self::Names),
      _ => Err(AffectedError::with_help(
        format!("Unknown format '{}'", s),
        "Valid formats: text, json, names",
      )),
    }
  }
}

/// Run the affected command. Returns the summary so the caller can pick the
/// exit code.
pub fn run_affected(ctx: &AffectedContext, format: OutputFormat) -> AffectedResult<AffectedSummary> {
  let summary = analyze(ctx)?;
  display_results(&summary, format)?;
  Ok(summary)
}

/// Full pipeline: graph, change set, ownership, package diff, propagation.
///
/// Either the whole summary is computed or the call fails.
pub fn analyze(ctx: &AffectedContext) -> AffectedResult<AffectedSummary> {
  let config = &ctx.config;

  let entry_points: Vec<PathBuf> = if config.entry_points.is_empty() {
    discover_entry_points(ctx.target_fs.as_ref(), &config.project_patterns)?
  } else {
    config
      .entry_points
      .iter()
      .map(|entry| normalize_path(&ctx.root, entry))
      .collect()
  };

  // Working-tree documents need no eager import construction
  let provider = TomlGraphProvider::new(!ctx.target.is_working_tree());
  let graph = provider.build_graph(&entry_points, ctx.target_fs.clone())?;
  if graph.is_empty() {
    warn!(patterns = ?config.project_patterns, "no projects found");
  }

  let changes = ChangeSetResolver::new(&ctx.git, &ctx.root, config.include_untracked).resolve(&ctx.base, &ctx.target)?;

  let (propagation, package_changes) = if changes.is_empty() {
    debug!("no files changed");
    (Propagation::default(), BTreeSet::new())
  } else {
    let predictor = DirectoryInputPredictor::new(vec![ctx.target_fs.clone(), ctx.base_fs.clone()]);
    let ownership = ProjectOwnershipMapper::new(&predictor, &config.manifest_file_name).map(&graph, &changes)?;

    let evaluator = TomlManifestEvaluator::new(config.manifest_file_name.clone());
    let packages =
      PackageManifestDiffEngine::new(&evaluator, ctx.base_fs.as_ref(), ctx.target_fs.as_ref()).diff(&changes, &graph)?;
    if !packages.manifests.is_empty() {
      debug!(manifests = ?packages.manifests, "diffed manifests");
    }

    let exclude = config.exclude_regex()?;
    let propagation =
      AffectedSetPropagator::new(&graph, exclude.as_ref()).propagate(&ownership.changed_projects(), &packages.impacted)?;
    (propagation, packages.changes)
  };

  let summary = AffectedSummary::new(
    &graph,
    SummaryParts {
      base: ctx.base.to_string(),
      target: ctx.target.to_string(),
      changed_files: changes.relative_paths(),
      changed: &propagation.changed,
      affected: &propagation.affected,
      excluded: &propagation.excluded,
      package_changes,
    },
  );

  info!(
    files = summary.changed_files().len(),
    changed = summary.changed_projects().len(),
    affected = summary.affected_projects().len(),
    excluded = summary.excluded_projects().len(),
    packages = summary.package_changes().len(),
    "affected analysis complete"
  );
  Ok(summary)
}

/// Display affected analysis results
fn display_results(summary: &AffectedSummary, format: OutputFormat) -> AffectedResult<()> {
  match format {
    OutputFormat::Text => display_text(summary),
    OutputFormat::Json => display_json(summary),
    OutputFormat::Names => display_names(summary),
  }
}

/// Display results in human-readable text format
fn display_text(summary: &AffectedSummary) -> AffectedResult<()> {
  println!("Affected Analysis ({} -> {})", summary.base(), summary.target());
  println!("=================");
  println!();

  let files = summary.changed_files();
  println!("Changed files: {}", files.len());
  if !files.is_empty() && files.len() <= 20 {
    for file in files {
      println!("  {}", file);
    }
  }
  println!();

  if !summary.package_changes().is_empty() {
    println!("Package changes: {}", summary.package_changes().len());
    for change in summary.package_changes() {
      match change.direction() {
        Some(direction) => println!("  {} ({:?})", change, direction),
        None => println!("  {}", change),
      }
    }
    println!();
  }

  println!("Changed projects: {}", summary.changed_projects().len());
  for project in summary.changed_projects() {
    println!("  📦 {} ({})", project.name, project.path);
  }
  println!();

  println!("Affected projects: {}", summary.affected_projects().len());
  for project in summary.affected_projects() {
    println!("  ⬆  {} ({})", project.name, project.path);
  }

  if !summary.excluded_projects().is_empty() {
    println!();
    println!("Excluded projects: {}", summary.excluded_projects().len());
    for project in summary.excluded_projects() {
      println!("  ✂  {} ({})", project.name, project.path);
    }
  }

  if summary.is_empty() {
    println!();
    println!("Nothing to rebuild.");
  }

  Ok(())
}

/// Display results in JSON format
fn display_json(summary: &AffectedSummary) -> AffectedResult<()> {
  let packages: Vec<_> = summary
    .package_changes()
    .iter()
    .map(|change| {
      json!({
          "name": change.name,
          "old_versions": change.old_versions,
          "new_versions": change.new_versions,
          "kind": change.kind(),
          "direction": change.direction(),
      })
    })
    .collect();

  let statuses: Vec<_> = summary
    .statuses()
    .into_iter()
    .map(|(project, status)| {
      json!({
          "path": project.path,
          "name": project.name,
          "status": status,
      })
    })
    .collect();

  let output = json!({
      "base": summary.base(),
      "target": summary.target(),
      "changed_files": summary.changed_files(),
      "changed_projects": summary.changed_projects(),
      "affected_projects": summary.affected_projects(),
      "excluded_projects": summary.excluded_projects(),
      "package_changes": packages,
      "projects": statuses,
      "summary": {
          "changed_files_count": summary.changed_files().len(),
          "changed_count": summary.changed_projects().len(),
          "affected_count": summary.affected_projects().len(),
          "excluded_count": summary.excluded_projects().len(),
          "nothing_changed": summary.is_empty(),
          "fingerprint": summary.fingerprint(),
      }
  });

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

/// Display only project names that need a rebuild (changed + affected)
fn display_names(summary: &AffectedSummary) -> AffectedResult<()> {
  let names: BTreeSet<&str> = summary.rebuild_set().into_iter().map(|p| p.name.as_str()).collect();

  for name in names {
    println!("{}", name);
  }

  Ok(())
}
