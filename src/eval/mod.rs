//! Project and manifest evaluation
//!
//! Stands in for the build system's own evaluator: it turns project files and
//! package-version manifests, read through a revision view, into the facts the
//! affected engine consumes.
//!
//! - **document**: parsed documents and the weak-reference document cache
//! - **eager**: eager import construction shim for historical revisions
//! - **project**: project file evaluation (references, packages, imports)
//! - **manifest**: nested package-version manifest evaluation
//! - **predict**: input prediction (project → consumed files)

pub mod document;
pub mod eager;
pub mod manifest;
pub mod predict;
pub mod project;

pub use manifest::{ManifestEvaluator, PackageVersionManifest, TomlManifestEvaluator};
pub use predict::{DirectoryInputPredictor, InputPredictor};
pub use project::{EvaluatedProject, PackageReference, ProjectEvaluator};
