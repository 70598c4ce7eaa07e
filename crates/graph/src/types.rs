use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Suffix of license metadata file names, which double as target names.
pub const META_LIC_SUFFIX: &str = ".meta_lic";

/// Handle of a target inside one [`LicenseGraph`](crate::LicenseGraph).
pub type TargetId = NodeIndex;

/// Set of targets, ordered by graph insertion
pub type TargetSet = BTreeSet<TargetId>;

/// Chain of edges from an attachment point down to a target.
pub type TargetEdgePath = Vec<TargetEdge>;

/// Path substitution applied when a dependency's output moves into a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallMap {
    /// Prefix of the dependency's file path
    pub from_path: String,

    /// Replacement for `from_path` inside the container
    pub container_path: String,
}

/// Build target described by one license metadata file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNode {
    /// Path of the license metadata file
    pub(crate) name: String,
    pub(crate) package_name: String,
    pub(crate) module_types: Vec<String>,
    pub(crate) module_classes: Vec<String>,

    /// Source projects the target is declared in
    pub(crate) projects: Vec<String>,
    pub(crate) license_kinds: Vec<String>,
    pub(crate) license_conditions: BTreeSet<String>,

    /// Paths of license text files, relative to the source root
    pub(crate) license_texts: Vec<String>,

    /// True for targets that merely aggregate others (images, archives)
    pub(crate) is_container: bool,
    pub(crate) built: Vec<String>,
    pub(crate) installed: Vec<String>,
    pub(crate) install_map: Vec<InstallMap>,
    pub(crate) sources: Vec<String>,
}

impl TargetNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = package_name.into();
        self
    }

    pub fn with_module_type(mut self, module_type: impl Into<String>) -> Self {
        self.module_types.push(module_type.into());
        self
    }

    pub fn with_module_class(mut self, module_class: impl Into<String>) -> Self {
        self.module_classes.push(module_class.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.projects.push(project.into());
        self
    }

    pub fn with_license_kind(mut self, kind: impl Into<String>) -> Self {
        self.license_kinds.push(kind.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.license_conditions.insert(condition.into());
        self
    }

    pub fn with_license_text(mut self, path: impl Into<String>) -> Self {
        self.license_texts.push(path.into());
        self
    }

    pub fn container(mut self, is_container: bool) -> Self {
        self.is_container = is_container;
        self
    }

    pub fn with_built(mut self, path: impl Into<String>) -> Self {
        self.built.push(path.into());
        self
    }

    pub fn with_installed(mut self, path: impl Into<String>) -> Self {
        self.installed.push(path.into());
        self
    }

    pub fn with_install_map(
        mut self,
        from_path: impl Into<String>,
        container_path: impl Into<String>,
    ) -> Self {
        self.install_map.push(InstallMap {
            from_path: from_path.into(),
            container_path: container_path.into(),
        });
        self
    }

    pub fn with_source(mut self, path: impl Into<String>) -> Self {
        self.sources.push(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn module_types(&self) -> &[String] {
        &self.module_types
    }

    pub fn module_classes(&self) -> &[String] {
        &self.module_classes
    }

    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    pub fn license_kinds(&self) -> &[String] {
        &self.license_kinds
    }

    pub fn license_conditions(&self) -> &BTreeSet<String> {
        &self.license_conditions
    }

    pub fn license_texts(&self) -> &[String] {
        &self.license_texts
    }

    pub fn is_container(&self) -> bool {
        self.is_container
    }

    pub fn built(&self) -> &[String] {
        &self.built
    }

    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    pub fn install_map(&self) -> &[InstallMap] {
        &self.install_map
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Built files followed by installed files.
    pub fn target_files(&self) -> Vec<String> {
        self.built.iter().chain(&self.installed).cloned().collect()
    }
}

/// Free-form attributes of a dependency edge (e.g. `static`, `dynamic`, `toolchain`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeAnnotations(BTreeSet<String>);

impl EdgeAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, annotation: impl Into<String>) {
        self.0.insert(annotation.into());
    }

    pub fn contains(&self, annotation: &str) -> bool {
        self.0.contains(annotation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the dependency's output becomes part of the target's output.
    ///
    /// Dynamic links and build tools do not ship inside the target.
    pub fn is_derivation(&self) -> bool {
        !self.contains("dynamic") && !self.contains("toolchain")
    }
}

impl<S: Into<String>> FromIterator<S> for EdgeAnnotations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Edge from `target` to one of its `dependency` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetEdge {
    pub edge: EdgeIndex,
    pub target: TargetId,
    pub dependency: TargetId,
}
