use crate::core::error::{AffectedError, AffectedResult, ConfigError, ResultExt};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for graph-affected
/// Searched in order: affected.toml, .affected.toml, .config/affected.toml
///
/// Every key is optional; a repository without a config file uses defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedConfig {
  /// Globs (repo-relative) selecting project entry points
  #[serde(default = "default_project_patterns")]
  pub project_patterns: Vec<String>,

  /// Explicit entry points (repo-relative); replaces pattern discovery
  #[serde(default)]
  pub entry_points: Vec<PathBuf>,

  /// File name of centrally managed package-version manifests
  #[serde(default = "default_manifest_file_name")]
  pub manifest_file_name: String,

  /// Regex over project path or name; matches are reported as excluded
  #[serde(default)]
  pub exclude: Option<String>,

  /// Count untracked files as changed when the target is the working tree
  #[serde(default = "default_include_untracked")]
  pub include_untracked: bool,
}

fn default_project_patterns() -> Vec<String> {
  vec!["**/project.toml".to_string()]
}

fn default_manifest_file_name() -> String {
  "Packages.toml".to_string()
}

fn default_include_untracked() -> bool {
  true
}

impl Default for AffectedConfig {
  fn default() -> Self {
    Self {
      project_patterns: default_project_patterns(),
      entry_points: Vec::new(),
      manifest_file_name: default_manifest_file_name(),
      exclude: None,
      include_untracked: default_include_untracked(),
    }
  }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub exclude: Option<String>,
  pub manifest_file_name: Option<String>,
}

impl AffectedConfig {
  pub fn find_config_path(root: &Path) -> Option<PathBuf> {
    let candidates = [
      root.join("affected.toml"),
      root.join(".affected.toml"),
      root.join(".config").join("affected.toml"),
    ];

    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load the repository config, falling back to defaults when none exists
  pub fn load(root: &Path) -> AffectedResult<Self> {
    let Some(config_path) = Self::find_config_path(root) else {
      debug!(root = %root.display(), "no config file, using defaults");
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: AffectedConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;
    debug!(path = %config_path.display(), "loaded config");
    Ok(config)
  }

  /// Apply command-line overrides, then re-validate
  pub fn with_overrides(mut self, overrides: ConfigOverrides) -> AffectedResult<Self> {
    if let Some(exclude) = overrides.exclude {
      self.exclude = Some(exclude);
    }
    if let Some(name) = overrides.manifest_file_name {
      self.manifest_file_name = name;
    }
    self.validate()?;
    Ok(self)
  }

  pub fn validate(&self) -> AffectedResult<()> {
    if self.project_patterns.is_empty() && self.entry_points.is_empty() {
      return Err(AffectedError::Config(ConfigError::InvalidValue {
        field: "project_patterns".to_string(),
        reason: "at least one pattern is required when no entry_points are listed".to_string(),
      }));
    }

    for pattern in &self.project_patterns {
      Pattern::new(pattern).map_err(|err| {
        AffectedError::Config(ConfigError::InvalidPattern {
          field: "project_patterns".to_string(),
          pattern: pattern.clone(),
          reason: err.to_string(),
        })
      })?;
    }

    for entry in &self.entry_points {
      if entry.is_absolute() {
        return Err(AffectedError::Config(ConfigError::InvalidValue {
          field: "entry_points".to_string(),
          reason: format!("'{}' must be relative to the repository root", entry.display()),
        }));
      }
    }

    let name = &self.manifest_file_name;
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
      return Err(AffectedError::Config(ConfigError::InvalidValue {
        field: "manifest_file_name".to_string(),
        reason: format!("'{}' must be a bare file name", name),
      }));
    }

    self.exclude_regex()?;
    Ok(())
  }

  /// Compiled exclusion pattern, if configured
  pub fn exclude_regex(&self) -> AffectedResult<Option<Regex>> {
    self
      .exclude
      .as_deref()
      .map(|pattern| {
        Regex::new(pattern).map_err(|err| {
          AffectedError::Config(ConfigError::InvalidPattern {
            field: "exclude".to_string(),
            pattern: pattern.to_string(),
            reason: err.to_string(),
          })
        })
      })
      .transpose()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_missing_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = AffectedConfig::load(dir.path()).unwrap();
    assert_eq!(config, AffectedConfig::default());
    assert_eq!(config.manifest_file_name, "Packages.toml");
    assert!(config.include_untracked);
  }

  #[test]
  fn test_config_search_order() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".config")).unwrap();
    fs::write(dir.path().join(".config/affected.toml"), "exclude = \"^late\"\n").unwrap();
    fs::write(dir.path().join(".affected.toml"), "exclude = \"^early\"\n").unwrap();

    let config = AffectedConfig::load(dir.path()).unwrap();
    assert_eq!(config.exclude.as_deref(), Some("^early"));
  }

  #[test]
  fn test_partial_config_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("affected.toml"),
      "manifest_file_name = \"Versions.toml\"\ninclude_untracked = false\n",
    )
    .unwrap();

    let config = AffectedConfig::load(dir.path()).unwrap();
    assert_eq!(config.manifest_file_name, "Versions.toml");
    assert!(!config.include_untracked);
    assert_eq!(config.project_patterns, default_project_patterns());
  }

  #[test]
  fn test_invalid_exclude_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("affected.toml"), "exclude = \"(unclosed\"\n").unwrap();

    let err = AffectedConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, AffectedError::Config(ConfigError::InvalidPattern { .. })));
  }

  #[test]
  fn test_manifest_name_must_be_bare() {
    let config = AffectedConfig {
      manifest_file_name: "eng/Packages.toml".to_string(),
      ..AffectedConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_overrides_win() {
    let config = AffectedConfig {
      exclude: Some("^a".to_string()),
      ..AffectedConfig::default()
    }
    .with_overrides(ConfigOverrides {
      exclude: Some("^b".to_string()),
      manifest_file_name: Some("Deps.toml".to_string()),
    })
    .unwrap();

    assert_eq!(config.exclude.as_deref(), Some("^b"));
    assert_eq!(config.manifest_file_name, "Deps.toml");
    assert!(config.exclude_regex().unwrap().unwrap().is_match("b/x"));
  }

  #[test]
  fn test_override_validated() {
    let result = AffectedConfig::default().with_overrides(ConfigOverrides {
      exclude: Some("[".to_string()),
      manifest_file_name: None,
    });
    assert!(result.is_err());
  }
}
