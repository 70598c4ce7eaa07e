use crate::fs::{FileReader, FileStat, FileSystem};
use crate::path::clean;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

/// In-memory filesystem.
///
/// Directories are implied by the files stored below them.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemFs::insert`]
    pub fn with_file(mut self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: &str, contents: impl AsRef<[u8]>) {
        self.files
            .insert(clean(path), Arc::from(contents.as_ref()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_dir(&self, path: &str) -> bool {
        if path == "." {
            return !self.files.is_empty();
        }
        let prefix = format!("{path}/");
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(name, _)| name.starts_with(&prefix))
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path}: file does not exist"))
}

#[async_trait]
impl FileSystem for MemFs {
    async fn stat(&self, path: &str) -> io::Result<FileStat> {
        let path = clean(path);
        if let Some(contents) = self.files.get(&path) {
            return Ok(FileStat::regular(contents.len() as u64));
        }
        if self.is_dir(&path) {
            return Ok(FileStat::directory());
        }
        Err(not_found(&path))
    }

    async fn open(&self, path: &str) -> io::Result<FileReader> {
        let path = clean(path);
        match self.files.get(&path) {
            Some(contents) => Ok(Box::pin(io::Cursor::new(contents.clone()))),
            None if self.is_dir(&path) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{path}: is a directory"),
            )),
            None => Err(not_found(&path)),
        }
    }
}
