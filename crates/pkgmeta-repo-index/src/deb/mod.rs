//! Debian-family APT archives (`Packages.gz`).
//!
//! Lookups walk components in order and, within a component, pockets in
//! order, loading each `Packages` index only when everything before it has
//! missed. Common packages resolve from `main` without touching the much
//! larger `universe` index.

pub mod control;

use std::time::Duration;

use tracing::{debug, info};

use crate::IndexError;
use crate::cache::IndexCache;
use crate::fetch::{Fetch, maybe_gunzip};
use crate::record::{PackageRecord, RepositoryIndex, join_url};

pub use control::{Stanza, parse_stanzas, stanza_to_record};

/// Architecture used when an identifier does not name one.
pub const DEFAULT_ARCH: &str = "amd64";

/// Timeout for one `Packages.gz` download.
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(120);

/// Where an archive lives and how it is searched.
#[derive(Debug, Clone)]
pub struct AptLayout {
    /// Distro name used in `distro` qualifiers, e.g. `ubuntu`.
    pub distro: &'static str,
    pub base_url: String,
    /// Components in search order.
    pub components: Vec<&'static str>,
    /// Suite suffixes in search order; `""` is the release pocket.
    pub pockets: Vec<&'static str>,
    /// Release version to codename.
    pub releases: Vec<(&'static str, &'static str)>,
    pub default_codename: &'static str,
    /// Package browser base, e.g. `https://packages.ubuntu.com`.
    pub registry_base: &'static str,
}

impl AptLayout {
    pub fn ubuntu() -> Self {
        Self {
            distro: "ubuntu",
            base_url: "https://archive.ubuntu.com/ubuntu".to_string(),
            components: vec!["main", "universe", "restricted", "multiverse"],
            pockets: vec!["-security", "-updates", ""],
            releases: vec![
                ("18.04", "bionic"),
                ("20.04", "focal"),
                ("22.04", "jammy"),
                ("24.04", "noble"),
                ("24.10", "oracular"),
            ],
            default_codename: "jammy",
            registry_base: "https://packages.ubuntu.com",
        }
    }

    pub fn debian() -> Self {
        Self {
            distro: "debian",
            base_url: "https://deb.debian.org/debian".to_string(),
            components: vec!["main", "contrib", "non-free", "non-free-firmware"],
            pockets: vec!["-updates", ""],
            releases: vec![("11", "bullseye"), ("12", "bookworm"), ("13", "trixie")],
            default_codename: "bookworm",
            registry_base: "https://packages.debian.org",
        }
    }

    /// Point the layout at another mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Codename for a `distro` qualifier: `ubuntu-22.04`, `ubuntu-jammy`,
    /// `22.04` and `jammy` all give `jammy`.
    pub fn codename_for(&self, distro: &str) -> Option<&'static str> {
        let distro = distro.trim().to_ascii_lowercase();
        let value = distro
            .strip_prefix(self.distro)
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(distro.as_str());

        self.releases.iter().find_map(|(version, codename)| {
            (*version == value || *codename == value).then_some(*codename)
        })
    }

    pub fn packages_url(&self, suite: &str, component: &str, arch: &str) -> String {
        join_url(
            &self.base_url,
            &format!("dists/{suite}/{component}/binary-{arch}/Packages.gz"),
        )
    }

    pub fn registry_url(&self, suite: &str, name: &str) -> String {
        format!("{}/{suite}/{name}", self.registry_base)
    }
}

/// One `Packages` index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AptCoordinate {
    pub codename: String,
    pub component: String,
    pub pocket: String,
    pub arch: String,
}

impl AptCoordinate {
    pub fn suite(&self) -> String {
        format!("{}{}", self.codename, self.pocket)
    }
}

/// A package found in an archive.
#[derive(Debug, Clone)]
pub struct AptHit {
    pub record: PackageRecord,
    pub coordinate: AptCoordinate,
}

impl AptHit {
    pub fn suite(&self) -> String {
        self.coordinate.suite()
    }
}

/// Lazily loaded `Packages` indices of one archive.
pub struct AptArchive<F> {
    layout: AptLayout,
    fetch: F,
    indices: IndexCache<AptCoordinate>,
    timeout: Duration,
}

impl<F: Fetch> AptArchive<F> {
    pub fn new(layout: AptLayout, fetch: F) -> Self {
        Self {
            layout,
            fetch,
            indices: IndexCache::new(),
            timeout: INDEX_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn layout(&self) -> &AptLayout {
        &self.layout
    }

    /// Find `name` for `codename`/`arch`, searching components then pockets.
    pub fn find(&self, name: &str, codename: &str, arch: &str) -> Option<AptHit> {
        for component in &self.layout.components {
            for pocket in &self.layout.pockets {
                let coordinate = AptCoordinate {
                    codename: codename.to_string(),
                    component: component.to_string(),
                    pocket: pocket.to_string(),
                    arch: arch.to_string(),
                };
                let index = self
                    .indices
                    .get_or_load(&coordinate, || self.load(&coordinate));
                if let Some(record) = index.get(name) {
                    debug!(
                        package = %name,
                        distro = self.layout.distro,
                        suite = %coordinate.suite(),
                        component = %component,
                        "found apt package"
                    );
                    return Some(AptHit {
                        record: record.clone(),
                        coordinate,
                    });
                }
            }
        }
        debug!(
            package = %name,
            distro = self.layout.distro,
            codename = %codename,
            "apt package not found"
        );
        None
    }

    /// Download and index one `Packages.gz`.
    pub fn load(&self, coordinate: &AptCoordinate) -> Result<RepositoryIndex, IndexError> {
        let suite = coordinate.suite();
        let url = self
            .layout
            .packages_url(&suite, &coordinate.component, &coordinate.arch);
        info!(
            distro = self.layout.distro,
            suite = %suite,
            component = %coordinate.component,
            arch = %coordinate.arch,
            "loading apt packages index"
        );

        let data = maybe_gunzip(self.fetch.get(&url, self.timeout)?)?;
        let text = String::from_utf8_lossy(&data);
        let index: RepositoryIndex = parse_stanzas(&text)
            .iter()
            .filter_map(|stanza| stanza_to_record(stanza, &coordinate.arch))
            .map(|record| (record.name.clone(), record))
            .collect();

        info!(
            distro = self.layout.distro,
            suite = %suite,
            component = %coordinate.component,
            packages = index.len(),
            "loaded apt packages index"
        );
        Ok(index)
    }

    /// Absolute URL of the `.deb` for a hit.
    pub fn download_url(&self, hit: &AptHit) -> Option<String> {
        hit.record.download_url(&self.layout.base_url)
    }

    /// Number of loaded indices.
    pub fn loaded(&self) -> usize {
        self.indices.len()
    }

    pub fn clear(&self) {
        self.indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codename_for() {
        let ubuntu = AptLayout::ubuntu();
        assert_eq!(ubuntu.codename_for("ubuntu-22.04"), Some("jammy"));
        assert_eq!(ubuntu.codename_for("ubuntu-noble"), Some("noble"));
        assert_eq!(ubuntu.codename_for("20.04"), Some("focal"));
        assert_eq!(ubuntu.codename_for("ubuntu-9.10"), None);

        let debian = AptLayout::debian();
        assert_eq!(debian.codename_for("debian-12"), Some("bookworm"));
        assert_eq!(debian.codename_for("trixie"), Some("trixie"));
        assert_eq!(debian.codename_for("ubuntu-22.04"), None);
    }

    #[test]
    fn test_urls() {
        let ubuntu = AptLayout::ubuntu();
        assert_eq!(
            ubuntu.packages_url("jammy-security", "main", "amd64"),
            "https://archive.ubuntu.com/ubuntu/dists/jammy-security/main/binary-amd64/Packages.gz"
        );
        assert_eq!(
            ubuntu.registry_url("jammy-updates", "curl"),
            "https://packages.ubuntu.com/jammy-updates/curl"
        );
    }
}
