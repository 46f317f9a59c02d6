//! ClearlyDefined curated license definitions.

use std::time::Duration;

use pkgmeta_core::license::NO_ASSERTION;
use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Miss, Provider, ProviderError, SharedFetch};

const NAME: &str = "clearlydefined.io";
const API_BASE: &str = "https://api.clearlydefined.io/definitions";

/// Identifier type to ClearlyDefined `type/provider`.
fn coordinate_prefix(ty: &str) -> Option<&'static str> {
    Some(match ty {
        "pypi" => "pypi/pypi",
        "npm" => "npm/npmjs",
        "cargo" => "crate/cratesio",
        "maven" => "maven/mavencentral",
        "gem" => "gem/rubygems",
        "nuget" => "nuget/nuget",
        "golang" => "go/golang",
        _ => return None,
    })
}

pub struct ClearlyDefined {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<String>,
}

impl ClearlyDefined {
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

/// `type/provider/namespace/name/revision`, with `-` for missing parts.
fn coordinate(id: &PackageIdentifier) -> Option<String> {
    let prefix = coordinate_prefix(id.ty())?;
    Some(format!(
        "{prefix}/{}/{}/{}",
        id.namespace().map_or_else(|| "-".to_string(), encode),
        encode(id.name()),
        id.version().map_or_else(|| "-".to_string(), encode),
    ))
}

impl Provider for ClearlyDefined {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        75
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        coordinate_prefix(id.ty()).is_some()
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some(coordinate) = coordinate(id) else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        self.cache.get_or_resolve(coordinate.clone(), || {
            let url = format!("{API_BASE}/{coordinate}");
            Ok(lookup_json(&self.fetch, NAME, &coordinate, &url, self.timeout, |data| {
                Some(normalize(data))
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn normalize(data: &Value) -> MetadataRecord {
    let licensed = &data["licensed"];
    let described = &data["described"];

    let licenses: Vec<&str> = str_at(licensed, "declared")
        .filter(|l| *l != NO_ASSERTION)
        .into_iter()
        .collect();
    let supplier = licensed["attribution"]["parties"]
        .as_array()
        .and_then(|parties| parties.first())
        .and_then(Value::as_str);

    RecordBuilder::new(NAME)
        .licenses(&licenses)
        .supplier(supplier)
        .homepage(str_at(described, "projectWebsite"))
        .repository_url(str_at(&described["sourceLocation"], "url"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinate() {
        let id =
            PackageIdentifier::parse("pkg:maven/org.apache.commons/commons-lang3@3.14.0").unwrap();
        assert_eq!(
            coordinate(&id).as_deref(),
            Some("maven/mavencentral/org.apache.commons/commons-lang3/3.14.0")
        );
        let id = PackageIdentifier::parse("pkg:npm/lodash").unwrap();
        assert_eq!(coordinate(&id).as_deref(), Some("npm/npmjs/-/lodash/-"));
        let id = PackageIdentifier::parse("pkg:deb/debian/curl").unwrap();
        assert!(coordinate(&id).is_none());
    }

    #[test]
    fn test_noassertion_is_dropped() {
        let data = json!({
            "licensed": {"declared": "NOASSERTION", "attribution": {"parties": ["Copyright Jane"]}},
            "described": {"sourceLocation": {"url": "https://github.com/lodash/lodash"}}
        });
        let record = normalize(&data);
        assert!(record.licenses.is_empty());
        assert_eq!(record.supplier.as_deref(), Some("Copyright Jane"));
        assert_eq!(
            record.repository_url.as_deref(),
            Some("git+https://github.com/lodash/lodash")
        );
    }
}
