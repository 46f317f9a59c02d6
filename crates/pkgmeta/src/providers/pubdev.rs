//! pub.dev API for Dart packages.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder, parse_contact};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "pub.dev";
const API_BASE: &str = "https://pub.dev/api/packages";

pub struct PubDev {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, String)>,
}

impl PubDev {
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

impl Provider for PubDev {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        10
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "pub"
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let name = id.name().to_string();
        let key = (name.clone(), id.version().unwrap_or("latest").to_string());
        self.cache.get_or_resolve(key, || {
            let url = format!("{API_BASE}/{}", encode(&name));
            Ok(lookup_json(&self.fetch, NAME, &name, &url, self.timeout, |data| {
                normalize(&name, data)
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn normalize(name: &str, data: &Value) -> Option<MetadataRecord> {
    let pubspec = data["latest"].get("pubspec").filter(|p| p.is_object())?;

    let author = pubspec
        .get("authors")
        .and_then(Value::as_array)
        .and_then(|authors| authors.first())
        .and_then(Value::as_str)
        .or_else(|| str_at(pubspec, "author"));
    let (maintainer, email) = author.map(parse_contact).unwrap_or_default();
    // A verified publisher outranks the listed author.
    let supplier = str_at(&data["publisher"], "publisherId").or(maintainer);

    let licenses: Vec<&str> = str_at(pubspec, "license").into_iter().collect();
    let registry_url = format!("https://pub.dev/packages/{name}");

    Some(
        RecordBuilder::new(NAME)
            .description(str_at(pubspec, "description"))
            .licenses(&licenses)
            .supplier(supplier)
            .homepage(str_at(pubspec, "homepage"))
            .repository_url(str_at(pubspec, "repository"))
            .documentation_url(str_at(pubspec, "documentation"))
            .issue_tracker_url(str_at(pubspec, "issue_tracker"))
            .registry_url(Some(&registry_url))
            .maintainer_name(maintainer)
            .maintainer_email(email)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize() {
        let data = json!({
            "name": "http",
            "latest": {
                "version": "1.2.1",
                "pubspec": {
                    "description": "A composable, multi-platform, Future-based API for HTTP requests.",
                    "repository": "https://github.com/dart-lang/http/tree/master/pkgs/http",
                    "authors": ["Dart Team <misc@dartlang.org>"]
                }
            },
            "publisher": {"publisherId": "dart.dev"}
        });
        let record = normalize("http", &data).unwrap();
        assert_eq!(record.supplier.as_deref(), Some("dart.dev"));
        assert_eq!(record.maintainer_name.as_deref(), Some("Dart Team"));
        assert_eq!(record.maintainer_email.as_deref(), Some("misc@dartlang.org"));
        assert_eq!(
            record.registry_url.as_deref(),
            Some("https://pub.dev/packages/http")
        );
    }

    #[test]
    fn test_missing_pubspec() {
        assert!(normalize("x", &json!({"latest": {}})).is_none());
        assert!(normalize("x", &json!({})).is_none());
    }
}
