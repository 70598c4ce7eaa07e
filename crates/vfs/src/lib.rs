//! # Compliance VFS
//!
//! Read-only virtual filesystem and bounded reader pool shared by the
//! metadata index, the license graph reader and the notice index.
//!
//! ## Layout
//!
//! ```text
//! FileSystem (stat / open)
//!     │
//!     ├──> OsFs   rooted at a host directory
//!     ├──> MemFs  in-memory tree (tests, synthesized inputs)
//!     │
//! ReaderPool (ConcurrentReaders permits)
//!     └──> ReaderPermit held across one unit of file work
//! ```
//!
//! ## Example
//!
//! ```rust
//! use compliance_vfs::{read_all, FileSystem, MemFs, ReaderPool};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> std::io::Result<()> {
//! let fs: Arc<dyn FileSystem> = Arc::new(MemFs::new().with_file("p1/METADATA", "name: \"lib1\""));
//! let pool = ReaderPool::new(2);
//!
//! let permit = pool.acquire().await.expect("pool capacity is valid");
//! let body = read_all(fs.as_ref(), "p1/METADATA").await?;
//! permit.release();
//!
//! assert_eq!(body, b"name: \"lib1\"");
//! # Ok(())
//! # }
//! ```

mod error;
mod fs;
mod limits;
mod mem;
mod path;

pub use error::{PoolError, Result};
pub use fs::{read_all, FileKind, FileReader, FileStat, FileSystem, OsFs};
pub use limits::{
    concurrent_readers, set_concurrent_readers, PoolSnapshot, ReaderPermit, ReaderPool,
    CONCURRENT_READERS_ENV, DEFAULT_CONCURRENT_READERS, MAX_CONCURRENT_READERS,
};
pub use mem::MemFs;
pub use path::{clean, join};
