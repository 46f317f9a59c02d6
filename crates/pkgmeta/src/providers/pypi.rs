//! PyPI JSON API.

use std::time::Duration;

use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder, parse_contact};
use serde_json::Value;

use super::{encode, lookup_json, str_at};
use crate::provider::{Lookup, LookupCache, Provider, ProviderError, SharedFetch};

const NAME: &str = "pypi.org";
const API_BASE: &str = "https://pypi.org/pypi";

pub struct Pypi {
    fetch: SharedFetch,
    timeout: Duration,
    cache: LookupCache<(String, String)>,
}

impl Pypi {
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

impl Provider for Pypi {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        10
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        id.ty() == "pypi"
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let name = id.name().to_string();
        let version = id.version().unwrap_or("latest").to_string();
        self.cache.get_or_resolve((name.clone(), version), || {
            let url = format!("{API_BASE}/{}/json", encode(&name));
            Ok(lookup_json(&self.fetch, NAME, &name, &url, self.timeout, |data| {
                Some(normalize(&name, data))
            }))
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Where a `project_urls` entry belongs, judged by its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProjectUrl {
    Repository,
    IssueTracker,
    Documentation,
    Homepage,
}

fn classify_project_url(label: &str) -> Option<ProjectUrl> {
    let label = label.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| label.contains(w));
    if has(&["source", "repository", "github"]) {
        Some(ProjectUrl::Repository)
    } else if has(&["issue", "bug", "tracker"]) {
        Some(ProjectUrl::IssueTracker)
    } else if has(&["documentation", "docs"]) {
        Some(ProjectUrl::Documentation)
    } else if has(&["homepage"]) {
        Some(ProjectUrl::Homepage)
    } else {
        None
    }
}

fn normalize(name: &str, data: &Value) -> MetadataRecord {
    let info = &data["info"];

    // Author first, then maintainer; a bare "Name <email>" in the email
    // field fills whatever is still missing.
    let (mut maintainer, mut email) = match (str_at(info, "author"), str_at(info, "maintainer")) {
        (Some(author), _) => (Some(author), str_at(info, "author_email")),
        (None, Some(maintainer)) => (Some(maintainer), str_at(info, "maintainer_email")),
        (None, None) => (None, None),
    };
    if maintainer.is_none() {
        if let Some(contact) = str_at(info, "author_email").or(str_at(info, "maintainer_email")) {
            let (parsed_name, parsed_email) = parse_contact(contact);
            maintainer = parsed_name;
            email = email.or(parsed_email);
        }
    }

    let mut homepage = str_at(info, "home_page");
    let mut repository = None;
    let mut issues = None;
    let mut docs = None;
    if let Some(urls) = info.get("project_urls").and_then(Value::as_object) {
        for (label, url) in urls {
            let Some(url) = url.as_str() else { continue };
            match classify_project_url(label) {
                Some(ProjectUrl::Repository) => repository = repository.or(Some(url)),
                Some(ProjectUrl::IssueTracker) => issues = issues.or(Some(url)),
                Some(ProjectUrl::Documentation) => docs = docs.or(Some(url)),
                Some(ProjectUrl::Homepage) => homepage = homepage.or(Some(url)),
                None => {}
            }
        }
    }

    let licenses: Vec<&str> = str_at(info, "license").into_iter().collect();
    let registry_url = format!("https://pypi.org/project/{name}/");

    RecordBuilder::new(NAME)
        .description(str_at(info, "summary"))
        .licenses(&licenses)
        .supplier(maintainer)
        .homepage(homepage)
        .repository_url(repository)
        .documentation_url(docs)
        .issue_tracker_url(issues)
        .registry_url(Some(&registry_url))
        .maintainer_name(maintainer)
        .maintainer_email(email)
        .build()
}
