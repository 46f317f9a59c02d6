//! Built-in providers.
//!
//! | Provider | Priority | Identifiers |
//! |---|---|---|
//! | `license-db` | 1 | apk, deb, rpm with a known distro |
//! | `lifecycle` | 5 | tracked runtimes and frameworks, no network |
//! | `pypi.org`, `crates.io`, `pub.dev` | 10 | pypi, cargo, pub |
//! | `ubuntu-apt` | 12 | deb/ubuntu |
//! | `sources.debian.org`, `rpm-repo` | 15 | deb/debian, rpm |
//! | `debian-apt` | 16 | deb/debian |
//! | `deps.dev` | 40 | pypi, npm, cargo, maven, golang, gem, nuget |
//! | `ecosyste.ms` | 45 | language packages |
//! | `purl` | 70 | OS packages, no network |
//! | `clearlydefined.io` | 75 | language packages |
//! | `repology.org` | 90 | OS packages |

pub mod apt;
pub mod clearlydefined;
pub mod cratesio;
pub mod debian_sources;
pub mod depsdev;
pub mod ecosystems;
pub mod license_db;
pub mod lifecycle;
pub mod pubdev;
pub mod purl;
pub mod pypi;
pub mod repology;
pub mod rpm_repo;

use std::sync::Arc;
use std::time::Duration;

use pkgmeta_core::MetadataRecord;
use pkgmeta_repo_index::{DEFAULT_USER_AGENT, HttpFetcher, get_json};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::provider::{Lookup, Provider, SharedFetch, absorb};

pub use apt::AptProvider;
pub use clearlydefined::ClearlyDefined;
pub use cratesio::CratesIo;
pub use debian_sources::DebianSources;
pub use depsdev::DepsDev;
pub use ecosystems::Ecosystems;
pub use license_db::LicenseDb;
pub use lifecycle::Lifecycle;
pub use pubdev::PubDev;
pub use purl::PurlHeuristic;
pub use pypi::Pypi;
pub use repology::Repology;
pub use rpm_repo::RpmRepo;

/// OS package types, served by distro indices rather than language
/// registries.
pub const OS_PACKAGE_TYPES: &[&str] = &["deb", "rpm", "apk", "alpm", "ebuild"];

/// Every built-in provider allowed by `config`, over a shared HTTP agent.
pub fn builtin(config: &ResolverConfig) -> Vec<Box<dyn Provider>> {
    let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    let fetch: SharedFetch = Arc::new(HttpFetcher::new(user_agent));
    builtin_with(config, fetch)
}

/// Every built-in provider allowed by `config`, over `fetch`.
pub fn builtin_with(config: &ResolverConfig, fetch: SharedFetch) -> Vec<Box<dyn Provider>> {
    let timeout = config.http_timeout();
    let index_timeout = config.index_timeout();

    let mut all: Vec<Box<dyn Provider>> = vec![
        Box::new(Lifecycle),
        Box::new(Pypi::new(fetch.clone()).with_timeout(timeout)),
        Box::new(CratesIo::new(fetch.clone()).with_timeout(timeout)),
        Box::new(PubDev::new(fetch.clone()).with_timeout(timeout)),
        Box::new(AptProvider::ubuntu(fetch.clone()).with_timeout(index_timeout)),
        Box::new(DebianSources::new(fetch.clone()).with_timeout(timeout)),
        Box::new(RpmRepo::new(fetch.clone()).with_index_timeout(index_timeout)),
        Box::new(AptProvider::debian(fetch.clone()).with_timeout(index_timeout)),
        Box::new(DepsDev::new(fetch.clone()).with_timeout(timeout)),
        Box::new(Ecosystems::new(fetch.clone())),
        Box::new(PurlHeuristic),
        Box::new(ClearlyDefined::new(fetch.clone())),
        Box::new(Repology::new(fetch.clone()).with_timeout(timeout)),
    ];

    if config.license_db.enabled {
        match config.license_db.cache_dir() {
            Some(dir) => all.push(Box::new(LicenseDb::new(
                fetch,
                dir,
                &config.license_db.releases_url,
                config.license_db.releases_to_check,
            ))),
            None => debug!("no cache directory for the license database"),
        }
    }

    all.retain(|provider| {
        let disabled = config.is_disabled(provider.name());
        if disabled {
            debug!(provider = provider.name(), "provider disabled by config");
        }
        !disabled
    });
    all
}

/// Trimmed, non-empty string at `key`.
pub(crate) fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Fetch a JSON document and normalize it, absorbing expected failures.
pub(crate) fn lookup_json<N>(
    fetch: &SharedFetch,
    provider: &'static str,
    key: &str,
    url: &str,
    timeout: Duration,
    normalize: N,
) -> Lookup
where
    N: FnOnce(&Value) -> Option<MetadataRecord>,
{
    debug!(provider, url = %url, "fetching metadata");
    match get_json::<Value, _>(fetch, url, timeout) {
        Ok(data) => Lookup::from(normalize(&data)),
        Err(e) => absorb(provider, key, &e),
    }
}

/// Percent-encode one path segment.
pub(crate) fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_at() {
        let value = json!({"a": " x ", "b": "", "c": 3});
        assert_eq!(str_at(&value, "a"), Some("x"));
        assert_eq!(str_at(&value, "b"), None);
        assert_eq!(str_at(&value, "c"), None);
        assert_eq!(str_at(&value, "d"), None);
        assert_eq!(str_at(&Value::Null, "a"), None);
    }

    #[test]
    fn test_builtin_honors_config() {
        let mut config = ResolverConfig::default();
        config.disabled_providers = vec!["repology.org".to_string()];
        config.license_db.enabled = false;

        let names: Vec<_> = builtin(&config).iter().map(|p| p.name()).collect();
        assert!(names.contains(&"pypi.org"));
        assert!(names.contains(&"lifecycle"));
        assert!(!names.contains(&"repology.org"));
        assert!(!names.contains(&"license-db"));
    }
}
