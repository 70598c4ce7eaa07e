//! # Compliance Notice
//!
//! Collects the license texts that shipped targets must reproduce, names the
//! libraries they belong to, and records where each library is installed.
//!
//! ```text
//! LicenseGraph + ResolutionSet
//!     │
//!     ├──> walk shipped targets (edge path per visit)
//!     │
//!     ├──> LibraryNamer (project METADATA, package name, target name)
//!     │
//!     └──> NoticeIndex
//!            ├─ license text path -> digest -> body
//!            ├─ digest -> resolutions
//!            └─ library/install attribution
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use compliance_graph::read_license_graph;
//! use compliance_notice::NoticeIndex;
//! use compliance_vfs::{OsFs, ReaderPool};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fs = Arc::new(OsFs::new("/path/to/aosp"));
//!     let graph = read_license_graph(fs.clone(), &ReaderPool::from_knob(), &["out/system.img"]).await?;
//!     let notices = NoticeIndex::build(fs, &graph, None).await?;
//!     for digest in notices.hashes() {
//!         println!("{digest}: {:?}", notices.hash_libs(&digest));
//!     }
//!     Ok(())
//! }
//! ```

mod digest;
mod error;
mod index;
mod install;
mod namer;

pub use digest::NoticeDigest;
pub use error::{NoticeError, Result};
pub use index::{NoticeIndex, NoticeResolution};
pub use install::install_paths;
pub use namer::{fallback_name, LibraryNamer};
