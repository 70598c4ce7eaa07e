//! # Compliance Graph
//!
//! License graph of build targets: who ships what, and whose notices must be
//! reproduced where.
//!
//! ## Architecture
//!
//! ```text
//! *.meta_lic files
//!     │
//!     ├──> read_license_graph (bounded concurrent reads, dep: closure)
//!     │
//!     ├──> LicenseGraph (petgraph)
//!     │      ├─ Nodes: targets (files, install maps, license texts)
//!     │      ├─ Edges: dependencies with annotations (static, dynamic, ...)
//!     │      ├─ walk_top_down
//!     │      └─ shipped_nodes
//!     │
//!     └──> resolve_notices
//!            └─ ResolutionSet (attaches_to -> acts_on targets)
//! ```

mod builder;
mod error;
mod graph;
mod readgraph;
mod resolution;
mod types;

pub use builder::LicenseGraphBuilder;
pub use error::{GraphError, Result};
pub use graph::LicenseGraph;
pub use readgraph::read_license_graph;
pub use resolution::{requires_notice, resolve_notices, ResolutionSet, NOTICE_CONDITIONS};
pub use types::{
    EdgeAnnotations, InstallMap, TargetEdge, TargetEdgePath, TargetId, TargetNode, TargetSet,
    META_LIC_SUFFIX,
};
