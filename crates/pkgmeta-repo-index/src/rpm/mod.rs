//! RPM-family repository metadata (`repomd.xml` + `primary.xml.gz`).
//!
//! ```ignore
//! use pkgmeta_repo_index::{HttpFetcher, rpm::{RpmDistro, RpmRepositories}};
//!
//! let repos = RpmRepositories::new(HttpFetcher::default());
//! let hit = repos.find("bash", RpmDistro::Rocky, Some("9"), "x86_64");
//! ```

pub mod distro;
pub mod primary;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::IndexCache;
use crate::fetch::{Fetch, maybe_gunzip};
use crate::record::{PackageRecord, RepositoryIndex, join_url};
use crate::IndexError;

pub use distro::{DEFAULT_ARCH, RepoSource, RpmDistro, parse_distro_qualifier, repository_arch};

/// Timeout for `repomd.xml` and mirror lists.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for `primary.xml.gz`.
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(120);

/// One repository of one distro release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RpmCoordinate {
    pub distro: RpmDistro,
    pub version: String,
    pub repo: String,
    pub arch: String,
}

/// A package found in a repository.
#[derive(Debug, Clone)]
pub struct RpmHit {
    pub record: PackageRecord,
    pub coordinate: RpmCoordinate,
    /// Repository base URL, ending in `/`.
    pub base_url: String,
}

impl RpmHit {
    pub fn download_url(&self) -> Option<String> {
        self.record.download_url(&self.base_url)
    }
}

/// Lazily loaded RPM repositories.
pub struct RpmRepositories<F> {
    fetch: F,
    indices: IndexCache<RpmCoordinate>,
    mirrors: RwLock<HashMap<String, Option<String>>>,
    metadata_timeout: Duration,
    index_timeout: Duration,
}

fn with_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

impl<F: Fetch> RpmRepositories<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            indices: IndexCache::new(),
            mirrors: RwLock::new(HashMap::new()),
            metadata_timeout: METADATA_TIMEOUT,
            index_timeout: INDEX_TIMEOUT,
        }
    }

    /// Override the metadata and bulk index timeouts.
    pub fn with_timeouts(mut self, metadata: Duration, index: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.index_timeout = index;
        self
    }

    /// Find `name` in the repositories of `distro`.
    ///
    /// With no `version`, every supported version is tried in order.
    /// Repositories are loaded only when earlier ones miss.
    pub fn find(
        &self,
        name: &str,
        distro: RpmDistro,
        version: Option<&str>,
        arch: &str,
    ) -> Option<RpmHit> {
        let versions: Vec<&str> = match version {
            Some(version) => vec![version],
            None => distro.versions().to_vec(),
        };

        for version in versions {
            if !distro.supports_version(version) {
                debug!(distro = %distro, version = %version, "unsupported rpm distro version");
                continue;
            }
            for repo in distro.repositories() {
                let Some(base_url) = self.base_url(distro, version, repo, arch) else {
                    continue;
                };
                let coordinate = RpmCoordinate {
                    distro,
                    version: version.to_string(),
                    repo: repo.to_string(),
                    arch: arch.to_string(),
                };
                let index = self
                    .indices
                    .get_or_load(&coordinate, || self.load(&base_url));
                if let Some(record) = index.get(name) {
                    debug!(package = %name, repository = %base_url, "found rpm package");
                    return Some(RpmHit {
                        record: record.clone(),
                        coordinate,
                        base_url,
                    });
                }
            }
        }

        debug!(package = %name, distro = %distro, "rpm package not found");
        None
    }

    fn base_url(&self, distro: RpmDistro, version: &str, repo: &str, arch: &str) -> Option<String> {
        match distro.source(version, repo, arch)? {
            RepoSource::Base(url) => Some(with_trailing_slash(&url)),
            RepoSource::MirrorList(url) => self.resolve_mirror(&url),
        }
    }

    /// First `http` line of a mirror list. Failures are remembered.
    fn resolve_mirror(&self, url: &str) -> Option<String> {
        if let Ok(mirrors) = self.mirrors.read() {
            if let Some(resolved) = mirrors.get(url) {
                return resolved.clone();
            }
        }

        let resolved = match self.fetch_mirror(url) {
            Ok(mirror) => Some(mirror),
            Err(e) => {
                warn!(url = %url, error = %e, "failed to resolve mirror list");
                None
            }
        };

        if let Ok(mut mirrors) = self.mirrors.write() {
            mirrors.insert(url.to_string(), resolved.clone());
        }
        resolved
    }

    fn fetch_mirror(&self, url: &str) -> Result<String, IndexError> {
        let body = self.fetch.get(url, self.metadata_timeout)?;
        String::from_utf8_lossy(&body)
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("http"))
            .map(with_trailing_slash)
            .ok_or_else(|| IndexError::NoMirror(url.to_string()))
    }

    /// Download and index one repository.
    pub fn load(&self, base_url: &str) -> Result<RepositoryIndex, IndexError> {
        info!(repository = %base_url, "loading rpm repository metadata");

        let repomd_url = join_url(base_url, "repodata/repomd.xml");
        let repomd = self.fetch.get(&repomd_url, self.metadata_timeout)?;
        let href = primary::primary_location(&repomd)
            .map_err(|e| IndexError::Xml {
                url: repomd_url.clone(),
                message: e.to_string(),
            })?
            .ok_or_else(|| IndexError::MissingPrimary(repomd_url.clone()))?;

        let primary_url = join_url(base_url, &href);
        let data = maybe_gunzip(self.fetch.get(&primary_url, self.index_timeout)?)?;
        let packages = primary::parse_primary(&data).map_err(|e| IndexError::Xml {
            url: primary_url.clone(),
            message: e.to_string(),
        })?;

        let index: RepositoryIndex = packages
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        info!(repository = %base_url, packages = index.len(), "loaded rpm repository");
        Ok(index)
    }

    /// Number of loaded repository coordinates.
    pub fn loaded(&self) -> usize {
        self.indices.len()
    }

    pub fn clear(&self) {
        self.indices.clear();
        if let Ok(mut mirrors) = self.mirrors.write() {
            mirrors.clear();
        }
    }
}
