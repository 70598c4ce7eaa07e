use crate::types::{EdgeAnnotations, TargetEdge, TargetId, TargetNode, TargetSet};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Directed graph of build targets and their dependencies (read-only once built)
#[derive(Debug, Clone)]
pub struct LicenseGraph {
    graph: DiGraph<TargetNode, EdgeAnnotations>,
    by_name: HashMap<String, TargetId>,
    roots: Vec<TargetId>,
}

impl LicenseGraph {
    pub(crate) fn from_parts(
        graph: DiGraph<TargetNode, EdgeAnnotations>,
        by_name: HashMap<String, TargetId>,
        roots: Vec<TargetId>,
    ) -> Self {
        Self {
            graph,
            by_name,
            roots,
        }
    }

    pub fn roots(&self) -> &[TargetId] {
        &self.roots
    }

    /// Target data for an id handed out by this graph.
    pub fn target(&self, id: TargetId) -> &TargetNode {
        &self.graph[id]
    }

    pub fn find(&self, name: &str) -> Option<TargetId> {
        self.by_name.get(name).copied()
    }

    pub fn targets(&self) -> impl Iterator<Item = (TargetId, &TargetNode)> {
        self.graph
            .node_indices()
            .map(move |id| (id, &self.graph[id]))
    }

    pub fn target_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing edges of `target` in the order they were declared
    pub fn dependencies(&self, target: TargetId) -> Vec<TargetEdge> {
        let mut edges: Vec<TargetEdge> = self
            .graph
            .edges(target)
            .map(|e| TargetEdge {
                edge: e.id(),
                target: e.source(),
                dependency: e.target(),
            })
            .collect();
        edges.sort_by_key(|e| e.edge.index());
        edges
    }

    pub fn annotations(&self, edge: &TargetEdge) -> &EdgeAnnotations {
        &self.graph[edge.edge]
    }

    /// Top-down walk from every root.
    ///
    /// `visit` receives each reached target together with the edge path that
    /// led to it (empty for roots) and returns true to descend into its
    /// dependencies. A target reachable along several paths is visited once
    /// per path. Edges closing a cycle are not followed.
    pub fn walk_top_down<F>(&self, mut visit: F)
    where
        F: FnMut(&LicenseGraph, TargetId, &[TargetEdge]) -> bool,
    {
        let mut path = Vec::with_capacity(32);
        let mut on_path = HashSet::new();
        for &root in &self.roots {
            path.clear();
            on_path.clear();
            self.walk(root, &mut path, &mut on_path, &mut visit);
        }
    }

    fn walk<F>(
        &self,
        node: TargetId,
        path: &mut Vec<TargetEdge>,
        on_path: &mut HashSet<TargetId>,
        visit: &mut F,
    ) where
        F: FnMut(&LicenseGraph, TargetId, &[TargetEdge]) -> bool,
    {
        if !visit(self, node, path) {
            return;
        }
        on_path.insert(node);
        for edge in self.dependencies(node) {
            if on_path.contains(&edge.dependency) {
                log::debug!(
                    "Dependency cycle at {} -> {}",
                    self.target(node).name(),
                    self.target(edge.dependency).name()
                );
                continue;
            }
            path.push(edge);
            self.walk(edge.dependency, path, on_path, visit);
            path.pop();
        }
        on_path.remove(&node);
    }

    /// Targets reachable from the roots through derivation edges.
    ///
    /// These are the targets whose outputs end up in the distributed
    /// artifacts.
    pub fn shipped_nodes(&self) -> TargetSet {
        let mut shipped = TargetSet::new();
        let mut queue: VecDeque<TargetId> = self.roots.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !shipped.insert(node) {
                continue;
            }
            for edge in self.dependencies(node) {
                if self.annotations(&edge).is_derivation() && !shipped.contains(&edge.dependency) {
                    queue.push_back(edge.dependency);
                }
            }
        }
        shipped
    }
}
