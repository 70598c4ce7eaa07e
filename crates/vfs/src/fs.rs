use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Stream returned by [`FileSystem::open`]
pub type FileReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Other,
}

/// Result of [`FileSystem::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub len: u64,
}

impl FileStat {
    pub fn regular(len: u64) -> Self {
        Self {
            kind: FileKind::Regular,
            len,
        }
    }

    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            len: 0,
        }
    }

    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// Read-only filesystem injected into the indexes.
///
/// Paths are slash-separated and relative to the filesystem root.
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn stat(&self, path: &str) -> io::Result<FileStat>;

    async fn open(&self, path: &str) -> io::Result<FileReader>;
}

/// Opens `path` and drains it into memory.
pub async fn read_all(fs: &dyn FileSystem, path: &str) -> io::Result<Vec<u8>> {
    let mut reader = fs.open(path).await?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await?;
    Ok(data)
}

/// Filesystem backed by a directory on the host
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(name) => resolved.push(name),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    log::debug!("Rejecting path {path:?} outside {}", self.root.display());
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("invalid path {path:?}: must be relative to the filesystem root"),
                    ));
                }
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileSystem for OsFs {
    async fn stat(&self, path: &str) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(self.resolve(path)?).await?;
        let kind = if metadata.is_file() {
            FileKind::Regular
        } else if metadata.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        };
        Ok(FileStat {
            kind,
            len: metadata.len(),
        })
    }

    async fn open(&self, path: &str) -> io::Result<FileReader> {
        let file = tokio::fs::File::open(self.resolve(path)?).await?;
        Ok(Box::pin(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn os_fs_stats_and_reads_relative_paths() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("external/zlib")).unwrap();
        std::fs::write(temp.path().join("external/zlib/METADATA"), b"name: \"zlib\"\n").unwrap();

        let fs = OsFs::new(temp.path());

        assert!(fs.stat("external/zlib").await.unwrap().is_dir());
        let stat = fs.stat("external/zlib/METADATA").await.unwrap();
        assert!(stat.is_regular());
        assert_eq!(stat.len, 13);

        let body = read_all(&fs, "external/zlib/./METADATA").await.unwrap();
        assert_eq!(body, b"name: \"zlib\"\n".to_vec());

        let missing = fs.stat("external/zlib/METADATA.android").await.unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn os_fs_rejects_paths_outside_root() {
        let temp = tempdir().unwrap();
        let fs = OsFs::new(temp.path().join("root"));

        let err = fs.open("../secret").await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = fs.stat("/etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
