//! sources.debian.org package info API.
//!
//! An unknown exact version falls back to `latest`.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "sources.debian.org";
const API_BASE: &str = "https://sources.debian.org/api";
const SUPPLIER: &str = "Debian Project";

pub struct DebianSources {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, String)>,
}

impl DebianSources {
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

    fn package_info(&self, name: &str, version: &str) -> Lookup {
        let url = format!("{API_BASE}/info/package/{}/{}", encode(name), encode(version));
        lookup_json(&self.fetch, NAME, name, &url, self.timeout, |data| {
            Some(normalize(name, version, data))
        })
    }
}

impl Provider for DebianSources {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        15
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "deb" && id.namespace_lower().as_deref() == Some("debian")
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let name = id.name().to_string();
        let version = id.version().unwrap_or("latest").to_string();
        self.cache.get_or_resolve((name.clone(), version.clone()), || {
            let lookup = self.package_info(&name, &version);
            if lookup.is_found() || version == "latest" {
                return Ok(lookup);
            }
            Ok(self.package_info(&name, "latest"))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Repository URL from `pkg_infos.vcs`: either `"Git <url>"` or an object
/// with `url`/`browser`.
fn vcs_url(vcs: &Value) -> Option<&str> {
    match vcs {
        Value::String(s) => {
            let mut parts = s.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(_), Some(url)) => Some(url),
                (Some(only), None)
                    if ["http://", "https://", "git://"]
                        .iter()
                        .any(|p| only.starts_with(p)) =>
                {
                    Some(only)
                }
                _ => None,
            }
        }
        Value::Object(_) => str_at(vcs, "url").or_else(|| str_at(vcs, "browser")),
        _ => None,
    }
}

fn normalize(name: &str, version: &str, data: &Value) -> MetadataRecord {
    let info = &data["pkg_infos"];
    let version = match version {
        "latest" => str_at(data, "version").unwrap_or(version),
        exact => exact,
    };
    let homepage = format!("https://tracker.debian.org/pkg/{name}");
    let registry_url = format!("https://sources.debian.org/src/{name}/{version}/");

    RecordBuilder::new(NAME)
        .description(str_at(info, "long_description").or_else(|| str_at(info, "description")))
        .supplier(Some(SUPPLIER))
        .homepage(Some(&homepage))
        .registry_url(Some(&registry_url))
        .repository_url(vcs_url(&info["vcs"]))
        .build()
}
