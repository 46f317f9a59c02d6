//! Core types for package metadata resolution.
//!
//! - [`PackageIdentifier`]: a parsed `pkg:` identifier.
//! - [`MetadataRecord`]: normalized metadata with per-field attribution, and
//!   the left-biased [`merge`](MetadataRecord::merge) used to combine sources.
//! - [`license`]: conservative license string to SPDX normalization.
//! - [`sanitize`]: cleaning of untrusted strings, URLs and emails.
//! - [`vcs`]: repository URL canonicalization.
//!
//! # Example
//!
//! ```ignore
//! use pkgmeta_core::{PackageIdentifier, RecordBuilder};
//!
//! let id: PackageIdentifier = "pkg:pypi/requests@2.31.0".parse()?;
//! let record = RecordBuilder::new("pypi")
//!     .description(Some("HTTP for Humans."))
//!     .licenses(&["Apache License 2.0"])
//!     .build();
//! assert_eq!(record.licenses, vec!["Apache-2.0"]);
//! ```

pub mod identifier;
pub mod license;
pub mod record;
pub mod sanitize;
pub mod vcs;

pub use identifier::{IdentifierError, PackageIdentifier};
pub use license::{NormalizedLicense, normalize_license, normalize_license_list};
pub use record::{Field, MetadataRecord, RecordBuilder, parse_contact};
pub use vcs::normalize_vcs_url;
