//! Project graph and affected-set analysis
//!
//! Built on petgraph for direct control and minimal abstraction.
//!
//! - **project_graph**: immutable project graph with memoized referenced-by closures
//! - **provider**: graph construction from entry points
//! - **affected**: propagation of change through referenced-by edges

pub mod affected;
pub mod project_graph;
pub mod provider;

pub use affected::{AffectedSetPropagator, Propagation};
pub use project_graph::{ProjectGraph, ProjectNode};
pub use provider::{ProjectGraphProvider, TomlGraphProvider, discover_entry_points};
