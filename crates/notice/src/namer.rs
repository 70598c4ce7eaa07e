use compliance_graph::{TargetNode, META_LIC_SUFFIX};
use compliance_projectmetadata::Index;
use std::collections::BTreeMap;

/// Chooses display names for libraries, caching metadata lookups per project.
pub struct LibraryNamer {
    index: Index,
    project_names: BTreeMap<String, Option<String>>,
}

impl LibraryNamer {
    pub fn new(index: Index) -> Self {
        Self {
            index,
            project_names: BTreeMap::new(),
        }
    }

    /// Display name of `node`.
    ///
    /// The first declared project whose METADATA yields a name wins; then the
    /// package name; then the target name stripped to its last segment.
    pub async fn library_name(&mut self, node: &TargetNode) -> String {
        for project in node.projects() {
            if let Some(name) = self.project_name(project).await {
                return name;
            }
        }
        if !node.package_name().is_empty() {
            return node.package_name().to_string();
        }
        fallback_name(node.name()).to_string()
    }

    /// Reads the METADATA of all `projects` in one batch so that later
    /// lookups are served from the index cache.
    ///
    /// Failures are only logged; they surface again, per project, when the
    /// project is named.
    pub async fn prefetch<S: AsRef<str>>(&self, projects: &[S]) {
        if let Err(err) = self.index.metadata_for_projects(projects).await {
            log::debug!("Prefetching metadata of {} projects: {err}", projects.len());
        }
    }

    /// Name from the METADATA of `project`, looked up once.
    pub async fn project_name(&mut self, project: &str) -> Option<String> {
        if let Some(known) = self.project_names.get(project) {
            return known.clone();
        }

        let name = match self.index.metadata_for_projects(&[project]).await {
            Ok(records) => records.first().and_then(|metadata| {
                [metadata.versioned_name(), metadata.description().to_string()]
                    .into_iter()
                    .find(|name| !name.is_empty())
            }),
            Err(err) => {
                log::warn!("Ignoring metadata of project {project}: {err}");
                None
            }
        };
        self.project_names.insert(project.to_string(), name.clone());
        name
    }

    /// Every project looked up so far with its name, if it had one
    pub fn into_project_names(self) -> BTreeMap<String, Option<String>> {
        self.project_names
    }
}

/// Last path segment of a target name without its `.meta_lic` suffix
/// (or, for other names, without the extension of the last segment).
pub fn fallback_name(target_name: &str) -> &str {
    let stem = target_name
        .strip_suffix(META_LIC_SUFFIX)
        .unwrap_or_else(|| strip_extension(target_name));
    match stem.rfind('/') {
        Some(slash) if slash > 0 => &stem[slash + 1..],
        _ => stem,
    }
}

fn strip_extension(name: &str) -> &str {
    let segment_start = name.rfind('/').map_or(0, |slash| slash + 1);
    match name[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &name[..segment_start + dot],
        _ => name,
    }
}
