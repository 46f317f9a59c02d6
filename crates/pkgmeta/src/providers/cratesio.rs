//! crates.io API.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "crates.io";
const API_BASE: &str = "https://crates.io/api/v1/crates";

pub struct CratesIo {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, String)>,
}

impl CratesIo {
    pub fn new(fetch: SharedFetch) -> Self {
        Self {
            fetch,
            timeout: Duration::from_secs(10),
            cache: LookupCache::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Provider for CratesIo {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        10
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "cargo"
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let name = id.name().to_string();
        let key = (name.clone(), id.version().unwrap_or("latest").to_string());
        self.cache.get_or_resolve(key, || {
            // Only the version endpoint carries the license.
            let url = match id.version() {
                Some(version) => format!("{API_BASE}/{}/{}", encode(&name), encode(version)),
                None => format!("{API_BASE}/{}", encode(&name)),
            };
            Ok(lookup_json(&self.fetch, NAME, &name, &url, self.timeout, |data| {
                Some(normalize(&name, data))
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn normalize(name: &str, data: &Value) -> MetadataRecord {
    let version = &data["version"];
    let krate = &data["crate"];
    let either = |key: &str| str_at(version, key).or_else(|| str_at(krate, key));

    let licenses: Vec<&str> = str_at(version, "license").into_iter().collect();
    let publisher = str_at(&version["published_by"], "name");
    let registry_url = format!("https://crates.io/crates/{name}");

    RecordBuilder::new(NAME)
        .description(either("description"))
        .licenses(&licenses)
        .supplier(publisher)
        .maintainer_name(publisher)
        .homepage(either("homepage"))
        .repository_url(either("repository"))
        .documentation_url(either("documentation"))
        .registry_url(Some(&registry_url))
        .build()
}
