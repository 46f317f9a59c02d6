//! deps.dev (Open Source Insights) v3 API.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Miss, Provider, ProviderError, SharedFetch};

const NAME: &str = "deps.dev";
const API_BASE: &str = "https://api.deps.dev/v3";

fn system(ty: &str) -> Option<&'static str> {
    Some(match ty {
        "pypi" => "PYPI",
        "npm" => "NPM",
        "cargo" => "CARGO",
        "maven" => "MAVEN",
        "golang" => "GO",
        "gem" => "RUBYGEMS",
        "nuget" => "NUGET",
        _ => return None,
    })
}

pub struct DepsDev {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, String, String)>,
}

impl DepsDev {
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

impl Provider for DepsDev {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        40
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        system(id.ty()).is_some()
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some(system) = system(id.ty()) else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let separator = if id.ty() == "maven" { ":" } else { "/" };
        let name = id.qualified_name(separator);
        let version = id.version().unwrap_or_default().to_string();

        let key = (id.ty().to_string(), name.clone(), version.clone());
        self.cache.get_or_resolve(key, || {
            let mut url = format!("{API_BASE}/systems/{system}/packages/{}", encode(&name));
            if !version.is_empty() {
                url.push_str(&format!("/versions/{}", encode(&version)));
            }
            Ok(lookup_json(&self.fetch, NAME, &name, &url, self.timeout, |data| {
                Some(normalize(data))
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn normalize(data: &Value) -> MetadataRecord {
    let licenses: Vec<&str> = data["licenses"]
        .as_array()
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut homepage = None;
    let mut repository = None;
    for link in data["links"].as_array().into_iter().flatten() {
        let label = str_at(link, "label").unwrap_or_default().to_lowercase();
        let url = str_at(link, "url");
        if label.contains("home") {
            homepage = url.or(homepage);
        } else if ["source", "repository", "repo"].iter().any(|w| label.contains(w)) {
            repository = url.or(repository);
        }
    }

    let related = data["relatedProjects"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|project| str_at(&project["projectKey"], "id"))
        .find(|id| id.starts_with("github.com/") || id.starts_with("gitlab.com/"))
        .map(|id| format!("https://{id}"));

    RecordBuilder::new(NAME)
        .licenses(&licenses)
        .homepage(homepage)
        .repository_url(repository.or(related.as_deref()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_links() {
        let data = json!({
            "licenses": ["MIT"],
            "links": [
                {"label": "HOMEPAGE", "url": "https://lodash.com/"},
                {"label": "SOURCE_REPO", "url": "https://github.com/lodash/lodash"},
                {"label": "ISSUE_TRACKER", "url": "https://github.com/lodash/lodash/issues"}
            ]
        });
        let record = normalize(&data);
        assert_eq!(record.licenses, vec!["MIT"]);
        assert_eq!(record.homepage.as_deref(), Some("https://lodash.com/"));
        assert_eq!(
            record.repository_url.as_deref(),
            Some("git+https://github.com/lodash/lodash")
        );
    }

    #[test]
    fn test_related_project_fallback() {
        let data = json!({
            "relatedProjects": [
                {"projectKey": {"id": "bitbucket.org/a/b"}},
                {"projectKey": {"id": "gitlab.com/group/proj"}}
            ]
        });
        let record = normalize(&data);
        assert_eq!(
            record.repository_url.as_deref(),
            Some("git+https://gitlab.com/group/proj")
        );
    }

    #[test]
    fn test_system_mapping() {
        assert_eq!(system("golang"), Some("GO"));
        assert_eq!(system("gem"), Some("RUBYGEMS"));
        assert_eq!(system("deb"), None);
    }
}
