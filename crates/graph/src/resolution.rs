use crate::graph::LicenseGraph;
use crate::types::{TargetId, TargetNode, TargetSet};
use std::collections::{BTreeMap, HashMap};

/// License conditions whose presence obliges the distributor to give notice.
pub const NOTICE_CONDITIONS: [&str; 7] = [
    "unencumbered",
    "permissive",
    "notice",
    "reciprocal",
    "restricted",
    "proprietary",
    "by_exception_only",
];

/// Whether `node` carries a license that has to be reproduced in notices.
pub fn requires_notice(node: &TargetNode) -> bool {
    !node.license_texts().is_empty()
        || node
            .license_conditions()
            .iter()
            .any(|condition| NOTICE_CONDITIONS.contains(&condition.as_str()))
}

/// Maps each attachment target to the targets whose notices it must display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSet {
    resolutions: BTreeMap<TargetId, TargetSet>,
}

impl ResolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attaches_to: TargetId, acts_on: TargetId) {
        self.resolutions
            .entry(attaches_to)
            .or_default()
            .insert(acts_on);
    }

    /// Targets whose notices attach to `attaches_to`
    pub fn resolutions(&self, attaches_to: TargetId) -> impl Iterator<Item = TargetId> + '_ {
        self.resolutions
            .get(&attaches_to)
            .into_iter()
            .flat_map(|acts_on| acts_on.iter().copied())
    }

    pub fn attaches_to(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.resolutions.keys().copied()
    }

    /// Whether a notice for `target` attaches anywhere.
    pub fn is_resolved(&self, target: TargetId) -> bool {
        self.resolutions
            .values()
            .any(|acts_on| acts_on.contains(&target))
    }

    /// Every target whose notice attaches somewhere
    pub fn resolved(&self) -> TargetSet {
        self.resolutions.values().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.resolutions.values().map(|acts_on| acts_on.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.resolutions.is_empty()
    }
}

/// Computes which shipped targets give notice for which.
///
/// Every shipped target requiring notice attaches its own notice. A shipped
/// target that is not a container also attaches the notices of the shipped
/// targets below it along derivation edges; containers only aggregate, so
/// their contents attach where the walk reaches them.
pub fn resolve_notices(graph: &LicenseGraph) -> ResolutionSet {
    let shipped = graph.shipped_nodes();
    let mut below: HashMap<TargetId, TargetSet> = HashMap::new();
    let mut rs = ResolutionSet::new();

    for &target in &shipped {
        let node = graph.target(target);
        if requires_notice(node) {
            rs.insert(target, target);
        }
        if node.is_container() {
            continue;
        }
        let mut stack = HashMap::new();
        let (acts_on_all, _) = notices_below(graph, &shipped, target, &mut below, &mut stack);
        for acts_on in acts_on_all {
            rs.insert(target, acts_on);
        }
    }

    log::debug!(
        "Resolved {} notices for {} shipped targets",
        rs.len(),
        shipped.len()
    );
    rs
}

/// Notice-bearing shipped targets reachable from `target` through derivation
/// edges.
///
/// `stack` maps the targets being descended to their depth. The second value
/// is the shallowest depth at which a cycle was cut; a set cut above its own
/// frame is incomplete and stays out of `memo`.
fn notices_below(
    graph: &LicenseGraph,
    shipped: &TargetSet,
    target: TargetId,
    memo: &mut HashMap<TargetId, TargetSet>,
    stack: &mut HashMap<TargetId, usize>,
) -> (TargetSet, Option<usize>) {
    if let Some(known) = memo.get(&target) {
        return (known.clone(), None);
    }
    if let Some(&depth) = stack.get(&target) {
        return (TargetSet::new(), Some(depth));
    }
    let depth = stack.len();
    stack.insert(target, depth);

    let mut found = TargetSet::new();
    let mut cut = None;
    for edge in graph.dependencies(target) {
        let dependency = edge.dependency;
        if !shipped.contains(&dependency) || !graph.annotations(&edge).is_derivation() {
            continue;
        }
        if requires_notice(graph.target(dependency)) {
            found.insert(dependency);
        }
        let (below, below_cut) = notices_below(graph, shipped, dependency, memo, stack);
        found.extend(below);
        cut = cut.into_iter().chain(below_cut).min();
    }

    stack.remove(&target);
    match cut {
        Some(cut) if cut < depth => (found, Some(cut)),
        _ => {
            memo.insert(target, found.clone());
            (found, None)
        }
    }
}
