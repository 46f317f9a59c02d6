//! ecosyste.ms package lookup API.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{OS_PACKAGE_TYPES, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "ecosyste.ms";
const LOOKUP_URL: &str = "https://packages.ecosyste.ms/api/v1/packages/lookup";

pub struct Ecosystems {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<String>,
}

impl Ecosystems {
    pub fn new(fetch: SharedFetch) -> Self {
        Self {
            fetch,
            timeout: Duration::from_secs(15),
            cache: LookupCache::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Provider for Ecosystems {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        45
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        !OS_PACKAGE_TYPES.contains(&id.ty())
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let purl = id.to_string();
        self.cache.get_or_resolve(purl.clone(), || {
            let url = format!("{LOOKUP_URL}?purl={}", urlencoding::encode(&purl));
            Ok(lookup_json(&self.fetch, NAME, &purl, &url, self.timeout, |data| {
                match data {
                    Value::Array(list) => list.first().map(normalize),
                    Value::Object(_) => Some(normalize(data)),
                    _ => None,
                }
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn normalize(data: &Value) -> MetadataRecord {
    let normalized: Vec<&str> = data["normalized_licenses"]
        .as_array()
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let licenses = if normalized.is_empty() {
        str_at(data, "licenses").into_iter().collect()
    } else {
        normalized
    };

    let first_maintainer = data["maintainers"].as_array().and_then(|m| m.first());
    let maintainer =
        first_maintainer.and_then(|m| str_at(m, "name").or_else(|| str_at(m, "login")));
    let email = first_maintainer.and_then(|m| str_at(m, "email"));

    let repo = &data["repo_metadata"];
    let owner = match &repo["owner"] {
        Value::String(owner) => Some(owner.as_str()),
        owner @ Value::Object(_) => str_at(owner, "name").or_else(|| str_at(owner, "login")),
        _ => None,
    };
    let issues = match (str_at(repo, "html_url"), repo["has_issues"].as_bool()) {
        (Some(html), Some(true)) => Some(format!("{}/issues", html.trim_end_matches('/'))),
        _ => None,
    };

    RecordBuilder::new(NAME)
        .description(str_at(data, "description"))
        .licenses(&licenses)
        .supplier(maintainer.or(owner))
        .homepage(str_at(data, "homepage"))
        .repository_url(str_at(data, "repository_url"))
        .documentation_url(str_at(data, "documentation_url"))
        .registry_url(str_at(data, "registry_url"))
        .issue_tracker_url(issues.as_deref())
        .download_url(str_at(repo, "download_url"))
        .maintainer_name(maintainer)
        .maintainer_email(email)
        .build()
}
