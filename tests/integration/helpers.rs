//! Test helpers for integration tests

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Exit code for "no project changed or affected"
pub const NOTHING_CHANGED: i32 = 166;

/// A throwaway git repository holding TOML projects
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create an empty repository with one initial commit
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(path.join("README.md"), "# test repo\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Write a file (creating parent directories)
  pub fn write(&self, relative: &str, content: &str) -> Result<()> {
    let file = self.path.join(relative);
    if let Some(parent) = file.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, content).with_context(|| format!("Failed to write {}", file.display()))?;
    Ok(())
  }

  pub fn remove(&self, relative: &str) -> Result<()> {
    std::fs::remove_file(self.path.join(relative))?;
    Ok(())
  }

  /// Add a project in `dir` referencing other project directories and
  /// packages, with one source file
  pub fn add_project(&self, dir: &str, references: &[&str], packages: &[&str]) -> Result<()> {
    let depth = dir.split('/').count();
    let up = "../".repeat(depth);

    let mut content = String::from("[project]\n");
    let references: Vec<String> = references
      .iter()
      .map(|r| format!("\"{}{}/project.toml\"", up, r))
      .collect();
    content.push_str(&format!("references = [{}]\n", references.join(", ")));

    if !packages.is_empty() {
      content.push_str("\n[packages]\n");
      for package in packages {
        content.push_str(&format!("{} = {{}}\n", package));
      }
    }

    self.write(&format!("{}/project.toml", dir), &content)?;
    self.write(&format!("{}/src/lib.rs", dir), &format!("// {}\n", dir))
  }

  /// Commit everything, returning the new SHA
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "-A"])?;
    git(&self.path, &["commit", "-m", message])?;
    self.head()
  }

  /// SHA of the current HEAD commit
  pub fn head(&self) -> Result<String> {
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run the binary against this repository; never fails on exit status
  pub fn run(&self, args: &[&str]) -> Result<Output> {
    let bin = env!("CARGO_BIN_EXE_graph-affected");
    let path = self.path.to_string_lossy().to_string();

    Command::new(bin)
      .args(["--repository-path", &path])
      .args(args)
      .env_remove("RUST_LOG")
      .output()
      .context("Failed to run graph-affected")
  }

  /// Run with `--format json`, returning exit code and parsed stdout
  pub fn run_json(&self, args: &[&str]) -> Result<(i32, Value)> {
    let mut all = vec!["--format", "json"];
    all.extend_from_slice(args);
    let output = self.run(&all)?;

    let code = output.status.code().context("graph-affected killed by signal")?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(&stdout).with_context(|| {
      format!(
        "stdout is not JSON (exit {})\nstdout: {}\nstderr: {}",
        code,
        stdout,
        String::from_utf8_lossy(&output.stderr)
      )
    })?;
    Ok((code, json))
  }
}

/// Project names listed under `key` (`changed_projects`, `affected_projects`, ...)
pub fn names(json: &Value, key: &str) -> Vec<String> {
  let mut out: Vec<String> = json[key]
    .as_array()
    .map(|projects| {
      projects
        .iter()
        .filter_map(|p| p["name"].as_str().map(str::to_string))
        .collect()
    })
    .unwrap_or_default();
  out.sort();
  out
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}
