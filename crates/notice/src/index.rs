use crate::digest::NoticeDigest;
use crate::error::{NoticeError, Result};
use crate::install::install_paths;
use crate::namer::LibraryNamer;
use compliance_graph::{
    resolve_notices, LicenseGraph, ResolutionSet, TargetEdge, TargetEdgePath, TargetId, TargetSet,
};
use compliance_projectmetadata::Index;
use compliance_vfs::{read_all, FileSystem};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Attribution of the notice of `notice_for` to the target displaying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeResolution {
    attaches_to: TargetId,
    path: TargetEdgePath,
    notice_for: TargetId,
}

impl NoticeResolution {
    pub fn attaches_to(&self) -> TargetId {
        self.attaches_to
    }

    /// Edges from `attaches_to` down to `notice_for` (empty when they coincide)
    pub fn path(&self) -> &[TargetEdge] {
        &self.path
    }

    pub fn notice_for(&self) -> TargetId {
        self.notice_for
    }
}

/// License texts of the shipped targets of a graph, deduplicated by content.
///
/// Populated once by [`build`](Self::build) and read-only afterwards.
pub struct NoticeIndex<'g> {
    graph: &'g LicenseGraph,
    rs: ResolutionSet,
    shipped: TargetSet,
    lib_name: HashMap<TargetId, String>,
    project_name: BTreeMap<String, Option<String>>,
    /// license text path -> digest
    hash: HashMap<String, NoticeDigest>,
    text: BTreeMap<NoticeDigest, Vec<u8>>,
    reverse: HashMap<NoticeDigest, Vec<NoticeResolution>>,
    lib_hash: BTreeMap<String, BTreeSet<NoticeDigest>>,
    hash_lib_install: HashMap<NoticeDigest, BTreeMap<String, BTreeSet<String>>>,
    install_lib_hash: BTreeMap<String, BTreeMap<String, BTreeSet<NoticeDigest>>>,
    rl: Vec<NoticeResolution>,
}

impl<'g> NoticeIndex<'g> {
    /// Indexes the notices of `graph`, reading license texts and project
    /// METADATA from `root_fs`. Without `rs` the notice resolutions are
    /// computed from the graph.
    pub async fn build(
        root_fs: Arc<dyn FileSystem>,
        graph: &'g LicenseGraph,
        rs: Option<ResolutionSet>,
    ) -> Result<Self> {
        Self::build_with_index(Index::new(root_fs), graph, rs).await
    }

    /// Like [`build`](Self::build), sharing an existing metadata index and
    /// its filesystem.
    pub async fn build_with_index(
        index: Index,
        graph: &'g LicenseGraph,
        rs: Option<ResolutionSet>,
    ) -> Result<Self> {
        let fs = index.file_system();
        let rs = rs.unwrap_or_else(|| resolve_notices(graph));
        let shipped = graph.shipped_nodes();
        log::info!("{} shipped targets", shipped.len());

        let mut visits: Vec<(TargetId, TargetEdgePath)> = Vec::new();
        graph.walk_top_down(|_, target, path| {
            if !shipped.contains(&target) {
                return false;
            }
            visits.push((target, path.to_vec()));
            true
        });

        let visited: TargetSet = visits.iter().map(|&(target, _)| target).collect();
        let projects: BTreeSet<&str> = visited
            .iter()
            .flat_map(|&target| graph.target(target).projects())
            .map(String::as_str)
            .collect();
        let projects: Vec<&str> = projects.into_iter().collect();

        let mut namer = LibraryNamer::new(index);
        namer.prefetch(&projects).await;
        let mut lib_name = HashMap::new();
        for &(target, _) in &visits {
            if !lib_name.contains_key(&target) {
                let name = namer.library_name(graph.target(target)).await;
                lib_name.insert(target, name);
            }
        }

        let mut ni = Self {
            graph,
            rs,
            shipped,
            lib_name,
            project_name: namer.into_project_names(),
            hash: HashMap::new(),
            text: BTreeMap::new(),
            reverse: HashMap::new(),
            lib_hash: BTreeMap::new(),
            hash_lib_install: HashMap::new(),
            install_lib_hash: BTreeMap::new(),
            rl: Vec::new(),
        };

        let resolved = ni.rs.resolved();
        for (target, path) in visits {
            if !resolved.contains(&target) {
                continue;
            }
            let nr = NoticeResolution {
                attaches_to: path.first().map_or(target, |edge| edge.target),
                path,
                notice_for: target,
            };
            ni.index_resolution(fs.as_ref(), nr).await?;
        }

        log::info!(
            "Indexed {} notice bodies for {} resolutions",
            ni.text.len(),
            ni.rl.len()
        );
        Ok(ni)
    }

    async fn index_resolution(&mut self, fs: &dyn FileSystem, nr: NoticeResolution) -> Result<()> {
        let graph = self.graph;
        let mut digests = BTreeSet::new();
        for url in graph.target(nr.notice_for).license_texts() {
            digests.insert(self.digest_of(fs, url).await?);
        }

        let lib = self.library_name(&nr).to_string();
        let installs = self.install_paths(&nr);
        for digest in digests {
            self.reverse
                .entry(digest.clone())
                .or_default()
                .push(nr.clone());
            self.lib_hash
                .entry(lib.clone())
                .or_default()
                .insert(digest.clone());
            let libs = self.hash_lib_install.entry(digest.clone()).or_default();
            for install in &installs {
                libs.entry(lib.clone())
                    .or_default()
                    .insert(install.clone());
                self.install_lib_hash
                    .entry(install.clone())
                    .or_default()
                    .entry(lib.clone())
                    .or_default()
                    .insert(digest.clone());
            }
        }

        self.rl.push(nr);
        Ok(())
    }

    async fn digest_of(&mut self, fs: &dyn FileSystem, url: &str) -> Result<NoticeDigest> {
        if let Some(digest) = self.hash.get(url) {
            return Ok(digest.clone());
        }
        let body = read_all(fs, url)
            .await
            .map_err(|source| NoticeError::LicenseText {
                path: url.to_string(),
                source,
            })?;
        let digest = NoticeDigest::of(&body);
        self.text.entry(digest.clone()).or_insert(body);
        self.hash.insert(url.to_string(), digest.clone());
        Ok(digest)
    }

    pub fn graph(&self) -> &'g LicenseGraph {
        self.graph
    }

    pub fn resolution_set(&self) -> &ResolutionSet {
        &self.rs
    }

    pub fn shipped(&self) -> &TargetSet {
        &self.shipped
    }

    /// Every notice resolution, in walk order
    pub fn resolutions(&self) -> Vec<NoticeResolution> {
        self.rl.clone()
    }

    pub fn library_name(&self, nr: &NoticeResolution) -> &str {
        self.lib_name
            .get(&nr.notice_for)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn install_paths(&self, nr: &NoticeResolution) -> Vec<String> {
        install_paths(self.graph, nr.attaches_to, &nr.path)
    }

    /// Digest of the license text at `path`, if any shipped target uses it
    pub fn hash(&self, path: &str) -> Option<&NoticeDigest> {
        self.hash.get(path)
    }

    pub fn hash_text(&self, digest: &NoticeDigest) -> Option<&[u8]> {
        self.text.get(digest).map(Vec::as_slice)
    }

    /// Distinct license bodies in digest order
    pub fn texts(&self) -> impl Iterator<Item = (&NoticeDigest, &[u8])> {
        self.text.iter().map(|(digest, body)| (digest, body.as_slice()))
    }

    /// Resolutions whose notice is the body with `digest`
    pub fn reverse(&self, digest: &NoticeDigest) -> &[NoticeResolution] {
        self.reverse
            .get(digest)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Digests grouped by library name, each reported once
    pub fn hashes(&self) -> Vec<NoticeDigest> {
        let mut seen = BTreeSet::new();
        let mut hashes = Vec::new();
        for digests in self.lib_hash.values() {
            for digest in digests {
                if seen.insert(digest) {
                    hashes.push(digest.clone());
                }
            }
        }
        hashes
    }

    /// Installed libraries using the body with `digest`, sorted
    pub fn hash_libs(&self, digest: &NoticeDigest) -> Vec<String> {
        self.hash_lib_install
            .get(digest)
            .map(|libs| libs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Install paths of `lib` carrying the body with `digest`, sorted
    pub fn hash_lib_installs(&self, digest: &NoticeDigest, lib: &str) -> Vec<String> {
        self.hash_lib_install
            .get(digest)
            .and_then(|libs| libs.get(lib))
            .map(|installs| installs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Install paths that carry notices of `lib`, sorted
    pub fn install_paths_for(&self, lib: &str) -> Vec<String> {
        self.install_lib_hash
            .iter()
            .filter(|(_, libs)| libs.contains_key(lib))
            .map(|(install, _)| install.clone())
            .collect()
    }

    /// Name found in the METADATA of `project`, if it was consulted and had one
    pub fn project_name(&self, project: &str) -> Option<&str> {
        self.project_name.get(project)?.as_deref()
    }
}
