//! # Compliance Project Metadata
//!
//! Concurrent, memoizing index over the METADATA files of source projects.
//!
//! ## Pipeline
//!
//! ```text
//! metadata_for_projects(p1..pn)
//!     │
//!     ├──> Entry map (insert pending slot once per project)
//!     │
//!     ├──> Reader tasks (one per newly inserted project)
//!     │      ├─ ReaderPool permit
//!     │      ├─ stat METADATA.android, then METADATA
//!     │      └─ open + drain + text-format parse
//!     │
//!     └──> Await every requested slot
//!            └─> records, or one aggregate error
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use compliance_projectmetadata::Index;
//! use compliance_vfs::OsFs;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = Index::new(Arc::new(OsFs::new("/path/to/aosp")));
//!     for metadata in index.metadata_for_projects(&["external/zlib"]).await? {
//!         println!("{}", metadata.versioned_name());
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod index;
mod metadata;
pub mod textproto;

pub use error::{MetadataError, ParseError, Result};
pub use index::{Index, IndexConfig, IndexSnapshot, METADATA_FILE_NAMES};
pub use metadata::{ProjectMetadata, ThirdParty};
