//! Integration tests for package-manifest driven impact

use crate::helpers::{NOTHING_CHANGED, TestRepo, names};
use anyhow::Result;
use serde_json::json;

#[test]
fn test_root_manifest_bump_affects_referencing_project() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\nq = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.add_project("y", &[], &["q"])?;
  repo.add_project("z", &["x"], &[])?;
  let base = repo.commit("Pin p")?;

  repo.write("Packages.toml", "[packages]\np = \"2.0.0\"\nq = \"1.0.0\"\n")?;
  let target = repo.commit("Bump p")?;

  let (code, json) = repo.run_json(&["--from", &base, "--to", &target])?;
  assert_eq!(code, 0, "{}", json);
  assert!(names(&json, "changed_projects").is_empty());
  assert_eq!(names(&json, "affected_projects"), vec!["x", "z"]);
  assert_eq!(
    json["package_changes"],
    json!([{
      "name": "p",
      "old_versions": ["1.0.0"],
      "new_versions": ["2.0.0"],
      "kind": "updated",
      "direction": "upgrade",
    }])
  );

  Ok(())
}

#[test]
fn test_nested_manifest_only_affects_its_subtree() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.write("legacy/Packages.toml", "[packages]\np = \"0.9.0\"\n")?;
  repo.add_project("legacy/old", &[], &["p"])?;
  repo.add_project("modern", &[], &["p"])?;
  repo.commit("Nested manifests")?;

  repo.write("legacy/Packages.toml", "[packages]\np = \"0.9.5\"\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0);
  assert_eq!(names(&json, "affected_projects"), vec!["old"]);
  assert_eq!(json["package_changes"][0]["old_versions"], json!(["0.9.0"]));

  Ok(())
}

#[test]
fn test_parent_change_reaches_nested_importer() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\nq = \"1.0.0\"\n")?;
  repo.write("sub/Packages.toml", "import-parent = true\n\n[packages]\nq = \"3.0.0\"\n")?;
  repo.add_project("sub/a", &[], &["p"])?;
  repo.add_project("sub/b", &[], &["q"])?;
  repo.commit("Nested importer")?;

  repo.write("Packages.toml", "[packages]\np = \"1.1.0\"\nq = \"1.1.0\"\n")?;

  let (_, json) = repo.run_json(&[])?;
  // q is overridden below the root, so only p reaches sub/
  assert_eq!(names(&json, "affected_projects"), vec!["a"]);
  assert_eq!(json["package_changes"].as_array().map(Vec::len), Some(1));

  Ok(())
}

#[test]
fn test_no_op_manifest_edit_changes_nothing() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.commit("Pin p")?;

  repo.write("Packages.toml", "# Central versions\n\n[packages]\np = \"1.0.0\"\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, NOTHING_CHANGED);
  assert_eq!(json["package_changes"], json!([]));
  assert_eq!(json["changed_files"], json!(["Packages.toml"]));

  Ok(())
}

#[test]
fn test_opted_out_project_ignores_manifest() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.write("pinned/project.toml", "[project]\ncentral-packages = false\n\n[packages]\np = \"1.0.0\"\n")?;
  repo.commit("Opt out")?;

  repo.write("Packages.toml", "[packages]\np = \"2.0.0\"\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0);
  assert_eq!(names(&json, "affected_projects"), vec!["x"]);

  Ok(())
}

#[test]
fn test_conditional_versions_are_sets() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write(
    "Packages.toml",
    "[packages]\np = \"1.0.0\"\n\n[conditions.debug.packages]\np = \"1.0.1\"\n",
  )?;
  repo.add_project("x", &[], &["p"])?;
  repo.commit("Conditional")?;

  repo.write(
    "Packages.toml",
    "[packages]\np = \"1.0.0\"\n\n[conditions.debug.packages]\np = \"1.0.2\"\n",
  )?;

  let (_, json) = repo.run_json(&[])?;
  assert_eq!(json["package_changes"][0]["old_versions"], json!(["1.0.0", "1.0.1"]));
  assert_eq!(json["package_changes"][0]["new_versions"], json!(["1.0.0", "1.0.2"]));
  assert_eq!(names(&json, "affected_projects"), vec!["x"]);

  Ok(())
}

#[test]
fn test_custom_manifest_file_name() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Versions.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.commit("Custom manifest")?;

  repo.write("Versions.toml", "[packages]\np = \"2.0.0\"\n")?;

  let (_, json) = repo.run_json(&["--manifest-file-name", "Versions.toml"])?;
  assert_eq!(names(&json, "affected_projects"), vec!["x"]);

  Ok(())
}

#[test]
fn test_broken_manifest_is_fatal() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.commit("Pin p")?;

  repo.write("Packages.toml", "[packages\np = \"2.0.0\"\n")?;

  let output = repo.run(&["--format", "json"])?;
  assert_eq!(output.status.code(), Some(3));
  assert!(output.stdout.is_empty(), "no partial summary may be printed");

  Ok(())
}

#[test]
fn test_imported_fragment_bump_affects_referencing_project() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("Packages.toml", "imports = [\"eng/Versions.toml\"]\n")?;
  repo.write("eng/Versions.toml", "[packages]\np = \"1.0.0\"\n")?;
  repo.add_project("x", &[], &["p"])?;
  repo.add_project("z", &["x"], &[])?;
  repo.commit("Pin p in a fragment")?;

  repo.write("eng/Versions.toml", "[packages]\np = \"2.0.0\"\n")?;

  let (code, json) = repo.run_json(&[])?;
  assert_eq!(code, 0, "{}", json);
  assert!(names(&json, "changed_projects").is_empty());
  assert_eq!(names(&json, "affected_projects"), vec!["x", "z"]);
  assert_eq!(json["package_changes"][0]["name"], "p");
  assert_eq!(json["package_changes"][0]["new_versions"], json!(["2.0.0"]));

  Ok(())
}
