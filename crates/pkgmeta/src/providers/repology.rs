//! Repology project API, the last resort for OS packages.
//!
//! Repology allows about one request per second, so it runs after every
//! other provider.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "repology.org";
const API_BASE: &str = "https://repology.org/api/v1/project";
const SUPPORTED_TYPES: &[&str] = &["deb", "rpm", "apk", "alpm"];

/// Repology repository to prefer for `id`: the `distro` qualifier with
/// `-`/`.` turned into `_`, a rolling repository for rolling distros, else
/// the namespace.
fn preferred_repository(id: &PackageIdentifier) -> Option<String> {
    let namespace = id.namespace_lower()?;
    if let Some(distro) = id.qualifier("distro") {
        return Some(distro.replace(['-', '.'], "_"));
    }
    let rolling = match namespace.as_str() {
        "alpine" => Some("alpine_edge"),
        "arch" => Some("arch"),
        "opensuse" => Some("opensuse_tumbleweed"),
        _ => None,
    };
    Some(rolling.map_or(namespace, str::to_string))
}

pub struct Repology {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, Option<String>)>,
}

impl Repology {
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

impl Provider for Repology {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        90
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        SUPPORTED_TYPES.contains(&id.ty())
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let name = id.name().to_string();
        let preferred = preferred_repository(id);
        self.cache.get_or_resolve((name.clone(), preferred.clone()), || {
            let url = format!("{API_BASE}/{}", encode(&name));
            Ok(lookup_json(&self.fetch, NAME, &name, &url, self.timeout, |data| {
                let entries = data.as_array()?;
                best_entry(entries, preferred.as_deref()).map(normalize)
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// The preferred repository's entry, else the first with a summary, else
/// the first.
fn best_entry<'a>(entries: &'a [Value], preferred: Option<&str>) -> Option<&'a Value> {
    if let Some(preferred) = preferred {
        if let Some(entry) = entries.iter().find(|e| str_at(e, "repo") == Some(preferred)) {
            return Some(entry);
        }
    }
    entries
        .iter()
        .find(|e| str_at(e, "summary").is_some())
        .or_else(|| entries.first())
}

/// A string, or the first string of an array.
fn first_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}

fn normalize(entry: &Value) -> MetadataRecord {
    let licenses: Vec<&str> = entry["licenses"]
        .as_array()
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    RecordBuilder::new(NAME)
        .description(str_at(entry, "summary"))
        .homepage(first_str(&entry["www"]))
        .licenses(&licenses)
        .maintainer_name(first_str(&entry["maintainers"]))
        .build()
}
