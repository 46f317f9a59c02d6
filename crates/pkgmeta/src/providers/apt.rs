//! Ubuntu and Debian packages from APT `Packages.gz` indices.
//!
//! APT metadata carries no license; that comes from other providers.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder, parse_contact};
use pkgmeta_repo_index::deb::{AptArchive, AptHit, AptLayout, DEFAULT_ARCH};

use crate::provider::{Lookup, LookupCache, Miss, Provider, ProviderError, SharedFetch};

/// One APT archive exposed as a provider.
pub struct AptProvider {
    name: &'static str,
    priority: u8,
    archive: AptArchive<SharedFetch>,
    cache: LookupCache<(String, &'static str, String)>,
}

impl AptProvider {
    pub fn new(name: &'static str, priority: u8, layout: AptLayout, fetch: SharedFetch) -> Self {
        Self {
            name,
            priority,
            archive: AptArchive::new(layout, fetch),
            cache: LookupCache::new(),
        }
    }

    /// `ubuntu-apt` over `archive.ubuntu.com`.
    pub fn ubuntu(fetch: SharedFetch) -> Self {
        Self::new("ubuntu-apt", 12, AptLayout::ubuntu(), fetch)
    }

    /// `debian-apt` over `deb.debian.org`.
    pub fn debian(fetch: SharedFetch) -> Self {
        Self::new("debian-apt", 16, AptLayout::debian(), fetch)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.archive = self.archive.with_timeout(timeout);
        self
    }

    pub fn archive(&self) -> &AptArchive<SharedFetch> {
        &self.archive
    }

    /// Codename from the `distro` qualifier, or the layout default when
    /// there is none. An unrecognized qualifier gives `None`.
    fn codename(&self, id: &PackageIdentifier) -> Option<&'static str> {
        let layout = self.archive.layout();
        match id.qualifier("distro") {
            Some(distro) => layout.codename_for(distro),
            None => Some(layout.default_codename),
        }
    }

    fn to_record(&self, hit: &AptHit) -> MetadataRecord {
        let package = &hit.record;
        let (maintainer, email) = package
            .maintainer
            .as_deref()
            .map(parse_contact)
            .unwrap_or_default();
        let download_url = self.archive.download_url(hit);
        let registry_url = self
            .archive
            .layout()
            .registry_url(&hit.suite(), &package.name);

        RecordBuilder::new(self.name)
            .description(package.summary.as_deref())
            .supplier(maintainer.or(package.maintainer.as_deref()))
            .maintainer_name(maintainer)
            .maintainer_email(email)
            .homepage(package.homepage.as_deref())
            .download_url(download_url.as_deref())
            .registry_url(Some(&registry_url))
            .build()
    }
}

impl Provider for AptProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "deb"
            && id.namespace_lower().as_deref() == Some(self.archive.layout().distro)
            && self.codename(id).is_some()
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some(codename) = self.codename(id) else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let arch = id.qualifier("arch").unwrap_or(DEFAULT_ARCH).to_string();
        let name = id.name().to_string();

        self.cache.get_or_resolve((name.clone(), codename, arch.clone()), || {
            Ok(match self.archive.find(&name, codename, &arch) {
                Some(hit) => Lookup::from_record(self.to_record(&hit)),
                None => Lookup::Absent(Miss::NotFound),
            })
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
        self.archive.clear();
    }
}
