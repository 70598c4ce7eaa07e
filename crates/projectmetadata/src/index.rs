use crate::error::{MetadataError, Result};
use crate::metadata::ProjectMetadata;
use compliance_vfs::{join, FileSystem, PoolSnapshot, ReaderPool};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

/// Files looked up in each project root, in order.
pub const METADATA_FILE_NAMES: [&str; 2] = ["METADATA.android", "METADATA"];

/// Ready state of an entry: `Ok(None)` means the project has no METADATA file.
type Outcome = std::result::Result<Option<Arc<ProjectMetadata>>, Arc<MetadataError>>;

/// `None` while the reader task is pending.
type Slot = watch::Receiver<Option<Outcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub concurrent_readers: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            concurrent_readers: compliance_vfs::concurrent_readers(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub projects: usize,
    pub pending: usize,
    pub with_metadata: usize,
    pub without_metadata: usize,
    pub failed: usize,
    pub pool: PoolSnapshot,
}

/// Reads and caches project METADATA (thread safe).
///
/// Each project is read at most once per index; concurrent callers asking
/// for the same project share one reader task. Cloning is cheap and clones
/// share the cache.
#[derive(Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
}

struct IndexInner {
    fs: Arc<dyn FileSystem>,
    pool: ReaderPool,
    entries: Mutex<HashMap<String, Slot>>,
}

impl Index {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::with_config(fs, IndexConfig::default())
    }

    pub fn with_config(fs: Arc<dyn FileSystem>, config: IndexConfig) -> Self {
        Self {
            inner: Arc::new(IndexInner {
                fs,
                pool: ReaderPool::new(config.concurrent_readers),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        self.inner.fs.clone()
    }

    /// Returns 0..n records for n `projects`, or an aggregate error.
    ///
    /// Projects with neither METADATA.android nor METADATA are skipped, so an
    /// empty result without error means none of them has a metadata file. When
    /// any requested project failed, only the errors are reported.
    pub async fn metadata_for_projects<S: AsRef<str>>(
        &self,
        projects: &[S],
    ) -> Result<Vec<Arc<ProjectMetadata>>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        self.inner.pool.check()?;

        let mut waiting = Vec::with_capacity(projects.len());
        let mut to_read = Vec::new();
        {
            let mut entries = self.inner.lock_entries();
            for project in projects {
                let project = project.as_ref();
                let slot = match entries.entry(project.to_string()) {
                    Entry::Occupied(existing) => existing.get().clone(),
                    Entry::Vacant(vacant) => {
                        let (tx, rx) = watch::channel(None);
                        vacant.insert(rx.clone());
                        to_read.push((project.to_string(), tx));
                        rx
                    }
                };
                waiting.push((project, slot));
            }
        }

        for (project, tx) in to_read {
            let inner = self.inner.clone();
            log::debug!("Dispatching metadata reader for project {project}");
            tokio::spawn(async move {
                let outcome = inner.read_project(&project).await;
                if let Err(err) = &outcome {
                    log::warn!("{err}");
                }
                tx.send_replace(Some(outcome));
            });
        }

        let mut failures = Vec::new();
        let mut result = Vec::with_capacity(projects.len());
        for (project, mut slot) in waiting {
            let outcome = slot
                .wait_for(Option::is_some)
                .await
                .map(|ready| ready.clone())
                .ok()
                .flatten()
                .unwrap_or_else(|| {
                    Err(Arc::new(MetadataError::ReaderAborted {
                        project: project.to_string(),
                    }))
                });
            match outcome {
                Ok(Some(metadata)) => result.push(metadata),
                Ok(None) => {}
                Err(err) => failures.push(err),
            }
        }

        if !failures.is_empty() {
            return Err(MetadataError::Projects { failures });
        }
        Ok(result)
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let entries = self.inner.lock_entries();
        let mut snapshot = IndexSnapshot {
            projects: entries.len(),
            pending: 0,
            with_metadata: 0,
            without_metadata: 0,
            failed: 0,
            pool: self.inner.pool.snapshot(),
        };
        for slot in entries.values() {
            match &*slot.borrow() {
                None => snapshot.pending += 1,
                Some(Ok(Some(_))) => snapshot.with_metadata += 1,
                Some(Ok(None)) => snapshot.without_metadata += 1,
                Some(Err(_)) => snapshot.failed += 1,
            }
        }
        snapshot
    }
}

impl IndexInner {
    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Probes the metadata files of `project` under one pool permit.
    async fn read_project(&self, project: &str) -> Outcome {
        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|err| Arc::new(MetadataError::from(err)))?;

        for file_name in METADATA_FILE_NAMES {
            let path = join(project, file_name);
            match self.fs.stat(&path).await {
                Ok(stat) if stat.is_regular() => {
                    return self
                        .read_metadata_file(project, &path)
                        .await
                        .map(|metadata| Some(Arc::new(metadata)))
                        .map_err(Arc::new);
                }
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => log::debug!("Skipping {path}: {err}"),
            }
        }

        log::debug!("No METADATA file in project {project}");
        Ok(None)
    }

    async fn read_metadata_file(&self, project: &str, path: &str) -> Result<ProjectMetadata> {
        let mut reader = self.fs.open(path).await.map_err(|source| MetadataError::Open {
            project: project.to_string(),
            path: path.to_string(),
            source,
        })?;

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|source| MetadataError::Read {
                project: project.to_string(),
                path: path.to_string(),
                source,
            })?;

        ProjectMetadata::parse(project, &data).map_err(|source| MetadataError::Parse {
            project: project.to_string(),
            path: path.to_string(),
            source,
        })
    }
}
