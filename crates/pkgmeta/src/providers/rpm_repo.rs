//! RPM packages from public repository metadata.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use pkgmeta_repo_index::rpm::{
    METADATA_TIMEOUT, RpmDistro, RpmHit, RpmRepositories, parse_distro_qualifier,
    repository_arch,
};

use crate::provider::{Lookup, LookupCache, Miss, Provider, ProviderError, SharedFetch};

const NAME: &str = "rpm-repo";

/// Distro and optional version from the `distro` qualifier, else the
/// namespace with no version.
fn target(id: &PackageIdentifier) -> Option<(RpmDistro, Option<String>)> {
    match id.qualifier("distro") {
        Some(distro) => {
            let (name, version) = parse_distro_qualifier(distro);
            Some((RpmDistro::from_name(&name)?, version))
        }
        None => Some((RpmDistro::from_name(&id.namespace_lower()?)?, None)),
    }
}

pub struct RpmRepo {
    repos: RpmRepositories<SharedFetch>,
    cache: LookupCache<(String, RpmDistro, Option<String>, String)>,
}

impl RpmRepo {
    pub fn new(fetch: SharedFetch) -> Self {
        Self {
            repos: RpmRepositories::new(fetch),
            cache: LookupCache::new(),
        }
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.repos = self.repos.with_timeouts(METADATA_TIMEOUT.min(timeout), timeout);
        self
    }

    pub fn repositories(&self) -> &RpmRepositories<SharedFetch> {
        &self.repos
    }
}

fn to_record(hit: &RpmHit) -> MetadataRecord {
    let package = &hit.record;
    let licenses: Vec<&str> = package.license.as_deref().into_iter().collect();
    let download_url = hit.download_url();

    RecordBuilder::new(NAME)
        .description(package.summary.as_deref())
        .licenses(&licenses)
        .supplier(package.supplier())
        .homepage(package.homepage.as_deref())
        .download_url(download_url.as_deref())
        .build()
}

impl Provider for RpmRepo {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        15
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "rpm" && target(id).is_some()
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some((distro, version)) = target(id) else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let arch = repository_arch(id.qualifier("arch")).to_string();
        let name = id.name().to_string();

        let key = (name.clone(), distro, version.clone(), arch.clone());
        self.cache.get_or_resolve(key, || {
            Ok(match self.repos.find(&name, distro, version.as_deref(), &arch) {
                Some(hit) => Lookup::from_record(to_record(&hit)),
                None => Lookup::Absent(Miss::NotFound),
            })
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
        self.repos.clear();
    }
}
