//! Package metadata resolution across registries and distro indices.
//!
//! A [`Resolver`] holds an ordered set of [`Provider`]s. For each package
//! identifier it asks every supporting provider in priority order, folds the
//! answers into one [`MetadataRecord`] with per-field attribution, and stops
//! early once description, licenses and supplier are known.
//!
//! - [`provider`]: the provider contract and its per-provider lookup cache.
//! - [`providers`]: the built-in sources, from language registries to
//!   distro package indices and pre-computed license databases.
//! - [`config`]: TOML and environment configuration.
//! - [`stats`]: coverage counts over a resolved batch.
//!
//! # Example
//!
//! ```ignore
//! use pkgmeta::{Resolver, ResolverConfig};
//!
//! let config = ResolverConfig::load()?;
//! let resolver = Resolver::from_config(&config);
//! if let Some(record) = resolver.resolve_str("pkg:pypi/requests@2.31.0") {
//!     println!("{:?} from {:?}", record.licenses, record.merged_sources());
//! }
//! ```

pub mod config;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod stats;

pub use config::{ConfigError, LicenseDbConfig, ResolverConfig};
pub use pkgmeta_core::{
    Field, IdentifierError, MetadataRecord, PackageIdentifier, RecordBuilder, normalize_license,
    normalize_vcs_url,
};
pub use provider::{
    Lookup, LookupCache, Miss, Provider, ProviderError, ProviderInfo, SharedFetch,
};
pub use resolver::{MergeMode, Resolver};
pub use stats::ResolutionStats;
