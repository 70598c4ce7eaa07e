use compliance_graph::{LicenseGraph, TargetEdge, TargetId};

/// Paths under which the output of the last target on `path` is installed.
///
/// With an empty path these are the files of `target` itself. Otherwise each
/// file of the dependency is mapped through the install map of every
/// enclosing target on the way up, and placed under each of that target's
/// own files. Dependency files no install map entry covers are dropped.
pub fn install_paths(graph: &LicenseGraph, target: TargetId, path: &[TargetEdge]) -> Vec<String> {
    if path.is_empty() {
        graph.target(target).target_files()
    } else {
        installs_along(graph, path)
    }
}

fn installs_along(graph: &LicenseGraph, path: &[TargetEdge]) -> Vec<String> {
    let Some((edge, rest)) = path.split_first() else {
        return Vec::new();
    };
    let deps = if rest.is_empty() {
        graph.target(edge.dependency).target_files()
    } else {
        installs_along(graph, rest)
    };

    let enclosing = graph.target(edge.target);
    let prefixes = enclosing.target_files();
    let mut installs = Vec::new();
    for dep in &deps {
        let Some(entry) = enclosing
            .install_map()
            .iter()
            .find(|entry| dep.starts_with(&entry.from_path))
        else {
            continue;
        };
        let relative = &dep[entry.from_path.len()..];
        for prefix in &prefixes {
            installs.push(format!("{prefix}{}{relative}", entry.container_path));
        }
    }
    installs
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_graph::{EdgeAnnotations, LicenseGraphBuilder, TargetNode};
    use pretty_assertions::assert_eq;

    /// a (container, "/A/") -> b (`b_built`) -> c
    fn graph(b_built: &str) -> LicenseGraph {
        let mut builder = LicenseGraphBuilder::new();
        builder
            .add_target(
                TargetNode::new("a.meta_lic")
                    .container(true)
                    .with_built("/A/")
                    .with_install_map("bin/", "x/")
                    .with_install_map("bin/", "ignored/"),
            )
            .unwrap();
        builder
            .add_target(
                TargetNode::new("b.meta_lic")
                    .with_built(b_built)
                    .with_install_map("lib/", "")
                    .with_install_map("", "raw/"),
            )
            .unwrap();
        builder
            .add_target(
                TargetNode::new("c.meta_lic")
                    .with_built("lib/c.so")
                    .with_installed("etc/c.conf"),
            )
            .unwrap();
        builder
            .add_root("a.meta_lic")
            .add_dependency("a.meta_lic", "b.meta_lic", EdgeAnnotations::new())
            .add_dependency("b.meta_lic", "c.meta_lic", EdgeAnnotations::new());
        builder.build().unwrap()
    }

    fn path(graph: &LicenseGraph, hops: usize) -> Vec<TargetEdge> {
        let mut path = Vec::new();
        let mut node = graph.roots()[0];
        for _ in 0..hops {
            let edge = graph.dependencies(node)[0];
            node = edge.dependency;
            path.push(edge);
        }
        path
    }

    #[test]
    fn empty_path_yields_own_files() {
        let graph = graph("bin/f");
        let c = graph.find("c.meta_lic").unwrap();
        assert_eq!(install_paths(&graph, c, &[]), vec!["lib/c.so", "etc/c.conf"]);
    }

    #[test]
    fn single_hop_uses_first_matching_map_entry() {
        let graph = graph("bin/f");
        let a = graph.roots()[0];
        assert_eq!(install_paths(&graph, a, &path(&graph, 1)), vec!["/A/x/f"]);
    }

    #[test]
    fn two_hops_compose_install_maps() {
        let graph = graph("bin/b/");
        let a = graph.roots()[0];
        // lib/c.so -> bin/b/c.so and etc/c.conf -> bin/b/raw/etc/c.conf inside b,
        // then bin/ -> x/ inside a.
        assert_eq!(
            install_paths(&graph, a, &path(&graph, 2)),
            vec!["/A/x/b/c.so", "/A/x/b/raw/etc/c.conf"]
        );
    }
}
