//! Integration tests for file-driven affected detection

use crate::helpers::{NOTHING_CHANGED, TestRepo, names};
use anyhow::Result;

/// a (no deps) ← b ← c
fn chain_repo() -> Result<TestRepo> {
  let repo = TestRepo::new()?;
  repo.add_project("a", &[], &[])?;
  repo.add_project("b", &["a"], &[])?;
  repo.add_project("c", &["b"], &[])?;
  repo.commit("Add projects")?;
  Ok(repo)
}

#[test]
fn test_working_tree_change_propagates_through_chain() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("a/src/lib.rs", "// edited\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0, "{}", json);
  assert_eq!(names(&json, "changed_projects"), vec!["a"]);
  assert_eq!(names(&json, "affected_projects"), vec!["b", "c"]);
  assert!(names(&json, "excluded_projects").is_empty());
  assert_eq!(json["changed_files"], serde_json::json!(["a/src/lib.rs"]));
  assert_eq!(json["target"], "working tree");

  Ok(())
}

#[test]
fn test_clean_tree_is_nothing_changed() -> Result<()> {
  let repo = chain_repo()?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, NOTHING_CHANGED);
  assert_eq!(json["summary"]["nothing_changed"], true);

  Ok(())
}

#[test]
fn test_unowned_change_is_nothing_changed() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("README.md", "# edited\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, NOTHING_CHANGED);
  assert_eq!(json["changed_files"], serde_json::json!(["README.md"]));

  Ok(())
}

#[test]
fn test_middle_change_only_affects_dependents() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("b/src/lib.rs", "// edited\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0);
  assert_eq!(names(&json, "changed_projects"), vec!["b"]);
  assert_eq!(names(&json, "affected_projects"), vec!["c"]);

  Ok(())
}

#[test]
fn test_diamond_reports_each_dependent_once() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_project("core", &[], &[])?;
  repo.add_project("left", &["core"], &[])?;
  repo.add_project("right", &["core"], &[])?;
  repo.add_project("top", &["left", "right"], &[])?;
  repo.commit("Diamond")?;
  repo.write("core/src/lib.rs", "// edited\n")?;

  let (_, json) = repo.run_json(&[])?;
  assert_eq!(names(&json, "affected_projects"), vec!["left", "right", "top"]);
  assert_eq!(json["summary"]["affected_count"], 3);

  Ok(())
}

#[test]
fn test_commit_range() -> Result<()> {
  let repo = chain_repo()?;
  let base = repo.head()?;
  repo.write("b/src/lib.rs", "// committed edit\n")?;
  let target = repo.commit("Edit b")?;
  // Uncommitted edits must not leak into a commit-to-commit comparison
  repo.write("a/src/lib.rs", "// uncommitted\n")?;

  let (code, json) = repo.run_json(&["--from", &base, "--to", &target])?;
  assert_eq!(code, 0);
  assert_eq!(names(&json, "changed_projects"), vec!["b"]);
  assert_eq!(names(&json, "affected_projects"), vec!["c"]);

  Ok(())
}

#[test]
fn test_deleted_and_untracked_files_are_attributed() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("a/src/extra.rs", "// extra\n")?;
  repo.commit("Add extra")?;

  repo.remove("a/src/extra.rs")?;
  let (_, json) = repo.run_json(&[])?;
  assert_eq!(names(&json, "changed_projects"), vec!["a"]);

  repo.write("c/src/new.rs", "// untracked\n")?;
  let (_, json) = repo.run_json(&[])?;
  assert_eq!(names(&json, "changed_projects"), vec!["a", "c"]);
  assert_eq!(names(&json, "affected_projects"), vec!["b"]);

  Ok(())
}

#[test]
fn test_exclusion_is_reported_and_reversible() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("a/src/lib.rs", "// edited\n")?;

  let (_, excluded) = repo.run_json(&["--exclude", "^c/"])?;
  assert_eq!(names(&excluded, "affected_projects"), vec!["b"]);
  assert_eq!(names(&excluded, "excluded_projects"), vec!["c"]);

  let (_, included) = repo.run_json(&[])?;
  assert_eq!(names(&included, "affected_projects"), vec!["b", "c"]);
  assert!(names(&included, "excluded_projects").is_empty());

  Ok(())
}

#[test]
fn test_config_file_exclusion_and_cli_override() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("affected.toml", "exclude = \"^b$\"\n")?;
  repo.commit("Add config")?;
  repo.write("a/src/lib.rs", "// edited\n")?;

  let (_, json) = repo.run_json(&[])?;
  assert_eq!(names(&json, "excluded_projects"), vec!["b"]);
  assert_eq!(names(&json, "affected_projects"), vec!["c"]);

  let (_, json) = repo.run_json(&["--exclude", "^c$"])?;
  assert_eq!(names(&json, "excluded_projects"), vec!["c"]);
  assert_eq!(names(&json, "affected_projects"), vec!["b"]);

  Ok(())
}

#[test]
fn test_identical_runs_share_a_fingerprint() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("a/src/lib.rs", "// edited\n")?;
  repo.write("c/src/lib.rs", "// edited\n")?;

  let (_, first) = repo.run_json(&[])?;
  let (_, second) = repo.run_json(&[])?;
  assert_eq!(first["summary"]["fingerprint"], second["summary"]["fingerprint"]);
  assert_eq!(first, second);

  Ok(())
}

#[test]
fn test_historical_view_reads_imports_from_the_commit() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_project("core", &[], &[])?;
  repo.write("app/project.toml", "[project]\nimports = [\"../build/common.toml\"]\n")?;
  repo.write("build/common.toml", "[project]\nreferences = [\"../core/project.toml\"]\n")?;
  let base = repo.commit("App imports core reference")?;
  repo.write("core/src/lib.rs", "// edited\n")?;
  let target = repo.commit("Edit core")?;

  // Only the working tree loses the import
  repo.remove("build/common.toml")?;

  let (code, json) = repo.run_json(&["--from", &base, "--to", &target])?;
  assert_eq!(code, 0);
  assert_eq!(names(&json, "changed_projects"), vec!["core"]);
  assert_eq!(names(&json, "affected_projects"), vec!["app"]);

  Ok(())
}

#[test]
fn test_unknown_revision_is_a_user_error() -> Result<()> {
  let repo = chain_repo()?;

  let output = repo.run(&["--from", "no-such-branch"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("no-such-branch"), "stderr: {}", stderr);

  Ok(())
}

#[test]
fn test_names_format_lists_rebuild_set() -> Result<()> {
  let repo = chain_repo()?;
  repo.write("b/src/lib.rs", "// edited\n")?;

  let output = repo.run(&["--format", "names"])?;
  assert_eq!(output.status.code(), Some(0));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["b", "c"]);

  Ok(())
}

#[test]
fn test_outside_repository_fails() -> Result<()> {
  let dir = tempfile::TempDir::new()?;
  let path = dir.path().to_string_lossy().to_string();
  let output = std::process::Command::new(env!("CARGO_BIN_EXE_graph-affected"))
    .args(["--repository-path", &path])
    .env("GIT_CEILING_DIRECTORIES", dir.path().parent().unwrap_or(dir.path()))
    .output()?;
  assert_ne!(output.status.code(), Some(0));
  assert_ne!(output.status.code(), Some(NOTHING_CHANGED));

  Ok(())
}

#[test]
fn test_gitignored_projects_are_not_discovered() -> Result<()> {
  let repo = chain_repo()?;
  repo.write(".gitignore", "out/\n")?;
  repo.commit("Ignore build output")?;
  repo.add_project("out/gen", &["a"], &[])?;
  repo.add_project("out/broken", &["missing"], &[])?;
  repo.write("a/src/lib.rs", "// edited\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0, "{}", json);
  assert_eq!(names(&json, "changed_projects"), vec!["a"]);
  assert_eq!(names(&json, "affected_projects"), vec!["b", "c"]);

  Ok(())
}
