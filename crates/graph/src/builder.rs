use crate::error::{GraphError, Result};
use crate::graph::LicenseGraph;
use crate::types::{EdgeAnnotations, TargetId, TargetNode};
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// Assembles a [`LicenseGraph`] from targets, roots and named dependencies.
///
/// Dependencies may name targets that are added later; names are resolved
/// by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct LicenseGraphBuilder {
    graph: DiGraph<TargetNode, EdgeAnnotations>,
    by_name: HashMap<String, TargetId>,
    roots: Vec<String>,
    dependencies: Vec<(String, String, EdgeAnnotations)>,
}

impl LicenseGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, node: TargetNode) -> Result<TargetId> {
        if self.by_name.contains_key(node.name()) {
            return Err(GraphError::DuplicateTarget(node.name().to_string()));
        }
        let name = node.name().to_string();
        let id = self.graph.add_node(node);
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Adds a root, i.e. a top-level deliverable the walk starts from.
    pub fn add_root(&mut self, name: impl Into<String>) -> &mut Self {
        self.roots.push(name.into());
        self
    }

    pub fn add_dependency(
        &mut self,
        target: impl Into<String>,
        dependency: impl Into<String>,
        annotations: EdgeAnnotations,
    ) -> &mut Self {
        self.dependencies
            .push((target.into(), dependency.into(), annotations));
        self
    }

    pub fn build(self) -> Result<LicenseGraph> {
        let Self {
            mut graph,
            by_name,
            roots,
            dependencies,
        } = self;

        let lookup = |name: &str| {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| GraphError::UnknownTarget(name.to_string()))
        };

        for (target, dependency, annotations) in dependencies {
            let from = lookup(&target)?;
            let to = lookup(&dependency)?;
            graph.add_edge(from, to, annotations);
        }

        let mut root_ids = Vec::with_capacity(roots.len());
        for root in &roots {
            let id = lookup(root)?;
            if !root_ids.contains(&id) {
                root_ids.push(id);
            }
        }

        Ok(LicenseGraph::from_parts(graph, by_name, root_ids))
    }
}
