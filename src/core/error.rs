//! Error types for graph-affected with contextual messages and exit codes
//!
//! Errors are grouped by the stage that produced them so the CLI can map each
//! category to an exit code and a help line. "Nothing changed" is not an
//! error: it is an empty summary, mapped to [`ExitCode::NothingChanged`] by
//! the CLI.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for graph-affected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, unknown revision)
  User = 1,
  /// System error (git, I/O)
  System = 2,
  /// Validation failure (malformed project or manifest, graph invariants)
  Validation = 3,
  /// The comparison produced no changed or affected projects
  NothingChanged = 166,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for graph-affected
#[derive(Debug)]
pub enum AffectedError {
  /// Configuration errors
  Config(ConfigError),

  /// Git subprocess errors
  Git(GitError),

  /// A revision name could not be resolved
  Revision(RevisionError),

  /// Project graph construction errors
  Graph(GraphError),

  /// Package manifest parse/evaluation errors
  Manifest(ManifestError),

  /// A write was attempted against a historical-revision view
  #[allow(dead_code)]
  ReadOnly { path: PathBuf },

  /// I/O errors
  Io(io::Error),

  /// A categorized error with added context; keeps its category
  Context {
    error: Box<AffectedError>,
    context: String,
  },

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl AffectedError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    AffectedError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    AffectedError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      AffectedError::Message { message, context, help } => AffectedError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      AffectedError::Io(err) => AffectedError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      AffectedError::Context { error, context } => AffectedError::Context {
        error,
        context: format!("{}\n{}", ctx_str, context),
      },
      error => AffectedError::Context {
        error: Box::new(error),
        context: ctx_str,
      },
    }
  }

  /// The error beneath any added context
  pub fn root(&self) -> &AffectedError {
    match self {
      AffectedError::Context { error, .. } => error.root(),
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      AffectedError::Config(_) => ExitCode::User,
      AffectedError::Git(_) => ExitCode::System,
      AffectedError::Revision(_) => ExitCode::User,
      AffectedError::Graph(_) => ExitCode::Validation,
      AffectedError::Manifest(_) => ExitCode::Validation,
      AffectedError::ReadOnly { .. } => ExitCode::System,
      AffectedError::Io(_) => ExitCode::System,
      AffectedError::Context { error, .. } => error.exit_code(),
      AffectedError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      AffectedError::Config(e) => e.help_message(),
      AffectedError::Git(e) => e.help_message(),
      AffectedError::Revision(e) => e.help_message(),
      AffectedError::Graph(e) => e.help_message(),
      AffectedError::Context { error, .. } => error.help_message(),
      AffectedError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for AffectedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AffectedError::Config(e) => write!(f, "{}", e),
      AffectedError::Git(e) => write!(f, "{}", e),
      AffectedError::Revision(e) => write!(f, "{}", e),
      AffectedError::Graph(e) => write!(f, "{}", e),
      AffectedError::Manifest(e) => write!(f, "{}", e),
      AffectedError::ReadOnly { path } => {
        write!(f, "Cannot open {} for writing: historical revisions are read-only", path.display())
      }
      AffectedError::Io(e) => write!(f, "I/O error: {}", e),
      AffectedError::Context { error, context } => write!(f, "{}\n{}", error, context),
      AffectedError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for AffectedError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      AffectedError::Io(e) => Some(e),
      AffectedError::Context { error, .. } => Some(error.as_ref()),
      _ => None,
    }
  }
}

impl From<io::Error> for AffectedError {
  fn from(err: io::Error) -> Self {
    AffectedError::Io(err)
  }
}

impl From<String> for AffectedError {
  fn from(msg: String) -> Self {
    AffectedError::message(msg)
  }
}

impl From<&str> for AffectedError {
  fn from(msg: &str) -> Self {
    AffectedError::message(msg)
  }
}

impl From<toml_edit::TomlError> for AffectedError {
  fn from(err: toml_edit::TomlError) -> Self {
    AffectedError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for AffectedError {
  fn from(err: toml_edit::de::Error) -> Self {
    AffectedError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for AffectedError {
  fn from(err: serde_json::Error) -> Self {
    AffectedError::message(format!("JSON error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for AffectedError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    AffectedError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<regex::Error> for AffectedError {
  fn from(err: regex::Error) -> Self {
    AffectedError::message(format!("Invalid regular expression: {}", err))
  }
}

impl From<glob::PatternError> for AffectedError {
  fn from(err: glob::PatternError) -> Self {
    AffectedError::message(format!("Invalid glob pattern: {}", err))
  }
}

/// Convert anyhow::Error to AffectedError
impl From<anyhow::Error> for AffectedError {
  fn from(err: anyhow::Error) -> Self {
    AffectedError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// A pattern in the config does not compile
  InvalidPattern { field: String, pattern: String, reason: String },

  /// A field holds a value of the right type but the wrong shape
  InvalidValue { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::InvalidPattern { field, .. } => Some(format!(
        "Fix `{}` in affected.toml or override it on the command line.",
        field
      )),
      ConfigError::InvalidValue { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::InvalidPattern { field, pattern, reason } => {
        write!(f, "Invalid pattern '{}' in `{}`: {}", pattern, field, reason)
      }
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid value for `{}`: {}", field, reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Object listed in a tree could not be read
  ObjectMissing { object: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run from inside a git repository or pass --repository-path (tried {}).",
        path.display()
      )),
      GitError::ObjectMissing { .. } => Some("The repository may be a shallow clone. Fetch more history.".to_string()),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::ObjectMissing { object } => {
        write!(f, "Git object not found: {}", object)
      }
    }
  }
}

/// Revision resolution errors
#[derive(Debug)]
pub enum RevisionError {
  /// Name matches neither a commit nor a branch
  NotFound { name: String },
}

impl RevisionError {
  fn help_message(&self) -> Option<String> {
    match self {
      RevisionError::NotFound { .. } => Some(
        "Pass a commit SHA or branch name that exists locally. In CI, fetch the base branch first.".to_string(),
      ),
    }
  }
}

impl fmt::Display for RevisionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RevisionError::NotFound { name } => {
        write!(f, "Revision '{}' matches neither a commit nor a branch", name)
      }
    }
  }
}

/// Project graph construction errors
#[derive(Debug)]
pub enum GraphError {
  /// A project file could not be parsed
  InvalidProject { path: PathBuf, reason: String },

  /// A project references a file that does not exist at the revision
  MissingReference { from: PathBuf, to: PathBuf },

  /// The "referenced-by" relation contains a cycle
  Cycle { path: PathBuf },
}

impl GraphError {
  fn help_message(&self) -> Option<String> {
    match self {
      GraphError::Cycle { .. } => Some("Project references must form an acyclic graph.".to_string()),
      GraphError::MissingReference { .. } => Some("Fix the reference or add the missing project.".to_string()),
      GraphError::InvalidProject { .. } => None,
    }
  }
}

impl fmt::Display for GraphError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GraphError::InvalidProject { path, reason } => {
        write!(f, "Invalid project file {}: {}", path.display(), reason)
      }
      GraphError::MissingReference { from, to } => {
        write!(f, "Project {} references missing project {}", from.display(), to.display())
      }
      GraphError::Cycle { path } => {
        write!(f, "Project reference cycle detected involving {}", path.display())
      }
    }
  }
}

/// Package manifest errors
#[derive(Debug)]
pub enum ManifestError {
  /// A manifest failed to parse or evaluate at a revision
  Invalid { path: PathBuf, revision: String, reason: String },

  /// Manifest imports form a loop
  ImportCycle { path: PathBuf },
}

impl fmt::Display for ManifestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestError::Invalid { path, revision, reason } => {
        write!(f, "Package manifest {} is invalid at {}: {}", path.display(), revision, reason)
      }
      ManifestError::ImportCycle { path } => {
        write!(f, "Package manifest import cycle detected at {}", path.display())
      }
    }
  }
}

/// Result type alias for graph-affected
pub type AffectedResult<T> = Result<T, AffectedError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> AffectedResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> AffectedResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<AffectedError>,
{
  fn context(self, ctx: impl Into<String>) -> AffectedResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> AffectedResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &AffectedError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
