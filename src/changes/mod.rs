//! From raw version-control changes to directly changed projects
//!
//! - **change_set**: changed paths between two revisions
//! - **ownership**: changed files → projects consuming them
//! - **packages**: changed package manifests → package changes and the
//!   projects referencing those packages

pub mod change_set;
pub mod ownership;
pub mod packages;

pub use change_set::ChangeSetResolver;
pub use ownership::ProjectOwnershipMapper;
pub use packages::{PackageChange, PackageManifestDiffEngine};
