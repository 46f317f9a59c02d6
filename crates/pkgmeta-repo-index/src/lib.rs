//! Native package repository indices for RPM- and Debian-family distros.
//!
//! Each index is downloaded once per repository coordinate, parsed into a
//! name-keyed map and kept in memory, so a lookup never costs one request
//! per package.
//!
//! # Example
//!
//! ```ignore
//! use pkgmeta_repo_index::{HttpFetcher, deb::{AptArchive, AptLayout}};
//!
//! let archive = AptArchive::new(AptLayout::ubuntu(), HttpFetcher::default());
//! if let Some(hit) = archive.find("curl", "jammy", "amd64") {
//!     println!("{} {} ({})", hit.record.name, hit.record.version, hit.suite);
//! }
//! ```

pub mod cache;
pub mod deb;
pub mod fetch;
pub mod record;
pub mod rpm;

pub use cache::IndexCache;
pub use fetch::{DEFAULT_USER_AGENT, Fetch, FetchError, HttpFetcher, get_json, maybe_gunzip};
pub use record::{PackageRecord, RepositoryIndex};

/// Errors while loading a repository index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("xml error in {url}: {message}")]
    Xml { url: String, message: String },
    #[error("no primary metadata listed in {0}")]
    MissingPrimary(String),
    #[error("no usable mirror in {0}")]
    NoMirror(String),
}
