//! The normalized metadata record and its merge operation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::license::{free_slot, normalize_license_list};
use crate::sanitize::{
    MAX_DESCRIPTION_LENGTH, sanitize_description, sanitize_email, sanitize_license,
    sanitize_string, sanitize_supplier, sanitize_url,
};
use crate::vcs::normalize_vcs_url;

/// Longest license text kept verbatim.
const MAX_LICENSE_TEXT_LENGTH: usize = 16 * MAX_DESCRIPTION_LENGTH;

/// Lifecycle dates are ISO 8601 dates or quarters (`2026-Q1`).
const MAX_LIFECYCLE_DATE_LENGTH: usize = 32;

/// A record field that carries provider attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Description,
    Licenses,
    Supplier,
    Homepage,
    RepositoryUrl,
    DocumentationUrl,
    RegistryUrl,
    IssueTrackerUrl,
    DownloadUrl,
    MaintainerName,
    MaintainerEmail,
    ReleaseDate,
    EndOfSupport,
    EndOfLife,
}

impl Field {
    /// Every single-valued field, in merge order.
    pub const SCALARS: [Field; 13] = [
        Field::Description,
        Field::Supplier,
        Field::Homepage,
        Field::RepositoryUrl,
        Field::DocumentationUrl,
        Field::RegistryUrl,
        Field::IssueTrackerUrl,
        Field::DownloadUrl,
        Field::MaintainerName,
        Field::MaintainerEmail,
        Field::ReleaseDate,
        Field::EndOfSupport,
        Field::EndOfLife,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Description => "description",
            Field::Licenses => "licenses",
            Field::Supplier => "supplier",
            Field::Homepage => "homepage",
            Field::RepositoryUrl => "repository_url",
            Field::DocumentationUrl => "documentation_url",
            Field::RegistryUrl => "registry_url",
            Field::IssueTrackerUrl => "issue_tracker_url",
            Field::DownloadUrl => "download_url",
            Field::MaintainerName => "maintainer_name",
            Field::MaintainerEmail => "maintainer_email",
            Field::ReleaseDate => "release_date",
            Field::EndOfSupport => "end_of_support",
            Field::EndOfLife => "end_of_life",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized package metadata, with the provider behind every field.
///
/// Records are built by one provider and combined with [`merge`](Self::merge),
/// which always returns a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub description: Option<String>,
    /// SPDX ids or expressions, unique, in discovery order.
    pub licenses: Vec<String>,
    /// Full text for `LicenseRef-*` entries.
    pub license_texts: BTreeMap<String, String>,
    pub supplier: Option<String>,
    pub homepage: Option<String>,
    pub repository_url: Option<String>,
    pub documentation_url: Option<String>,
    pub registry_url: Option<String>,
    pub issue_tracker_url: Option<String>,
    pub download_url: Option<String>,
    pub maintainer_name: Option<String>,
    pub maintainer_email: Option<String>,
    /// First stable release of the version's release cycle.
    pub release_date: Option<String>,
    /// End of active support for the release cycle.
    pub end_of_support: Option<String>,
    /// End of security support for the release cycle.
    pub end_of_life: Option<String>,
    /// First provider that contributed to this record.
    pub primary_source: Option<String>,
    pub field_sources: BTreeMap<Field, String>,
}

impl MetadataRecord {
    /// Value of a single-valued field. `Licenses` always returns `None`.
    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Description => &self.description,
            Field::Supplier => &self.supplier,
            Field::Homepage => &self.homepage,
            Field::RepositoryUrl => &self.repository_url,
            Field::DocumentationUrl => &self.documentation_url,
            Field::RegistryUrl => &self.registry_url,
            Field::IssueTrackerUrl => &self.issue_tracker_url,
            Field::DownloadUrl => &self.download_url,
            Field::MaintainerName => &self.maintainer_name,
            Field::MaintainerEmail => &self.maintainer_email,
            Field::ReleaseDate => &self.release_date,
            Field::EndOfSupport => &self.end_of_support,
            Field::EndOfLife => &self.end_of_life,
            Field::Licenses => return None,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        Some(match field {
            Field::Description => &mut self.description,
            Field::Supplier => &mut self.supplier,
            Field::Homepage => &mut self.homepage,
            Field::RepositoryUrl => &mut self.repository_url,
            Field::DocumentationUrl => &mut self.documentation_url,
            Field::RegistryUrl => &mut self.registry_url,
            Field::IssueTrackerUrl => &mut self.issue_tracker_url,
            Field::DownloadUrl => &mut self.download_url,
            Field::MaintainerName => &mut self.maintainer_name,
            Field::MaintainerEmail => &mut self.maintainer_email,
            Field::ReleaseDate => &mut self.release_date,
            Field::EndOfSupport => &mut self.end_of_support,
            Field::EndOfLife => &mut self.end_of_life,
            Field::Licenses => return None,
        })
    }

    /// Whether the field is populated.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Licenses => !self.licenses.is_empty(),
            other => self.get(other).is_some(),
        }
    }

    /// True when any field other than the maintainer email or the release
    /// date is populated.
    pub fn has_data(&self) -> bool {
        Field::SCALARS
            .iter()
            .filter(|f| !matches!(f, Field::MaintainerEmail | Field::ReleaseDate))
            .any(|f| self.get(*f).is_some())
            || !self.licenses.is_empty()
    }

    /// Description, licenses and supplier are all present.
    pub fn is_sufficient(&self) -> bool {
        self.description.is_some() && !self.licenses.is_empty() && self.supplier.is_some()
    }

    /// Provider credited for `field`: its explicit attribution, or the
    /// record's primary source.
    pub fn source_of(&self, field: Field) -> Option<&str> {
        self.field_sources
            .get(&field)
            .map(String::as_str)
            .or(self.primary_source.as_deref())
    }

    /// Distinct contributing providers, primary source first.
    pub fn merged_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = Vec::new();
        let all = self
            .primary_source
            .iter()
            .chain(self.field_sources.values())
            .map(String::as_str);
        for source in all {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }

    /// A copy with one field cleared, along with its attribution.
    pub fn without(&self, field: Field) -> MetadataRecord {
        let mut out = self.clone();
        match out.slot_mut(field) {
            Some(slot) => *slot = None,
            None => out.licenses.clear(),
        }
        out.field_sources.remove(&field);
        out
    }

    /// Left-biased merge.
    ///
    /// Fields already set on `self` win. Fields taken from `other` keep
    /// `other`'s attribution. License texts are unioned; a text already
    /// present under the same id family (`id`, `id-2`, ...) is not added
    /// again, and a new text under a taken id moves to the next free slot.
    /// Licenses adopted from `other` follow those renames.
    pub fn merge(&self, other: &MetadataRecord) -> MetadataRecord {
        let mut out = self.clone();

        if out.primary_source.is_none() {
            out.primary_source = other.primary_source.clone();
        }

        for field in Field::SCALARS {
            if self.get(field).is_some() {
                continue;
            }
            let Some(value) = other.get(field) else {
                continue;
            };
            if let Some(slot) = out.slot_mut(field) {
                *slot = Some(value.to_string());
            }
            if let Some(source) = other.source_of(field) {
                out.field_sources.insert(field, source.to_string());
            }
        }

        let renames = merge_license_texts(&mut out.license_texts, &other.license_texts);

        if self.licenses.is_empty() && !other.licenses.is_empty() {
            let mut licenses: Vec<String> = Vec::with_capacity(other.licenses.len());
            for license in &other.licenses {
                let license = renames.get(license).cloned().unwrap_or_else(|| license.clone());
                if !licenses.contains(&license) {
                    licenses.push(license);
                }
            }
            out.licenses = licenses;
            if let Some(source) = other.source_of(Field::Licenses) {
                out.field_sources.insert(Field::Licenses, source.to_string());
            }
        }

        out
    }
}

/// Split `LicenseRef-X-3` into (`LicenseRef-X`, 3); unsuffixed ids are slot 1.
fn family_key(id: &str) -> (&str, u32) {
    if let Some((base, suffix)) = id.rsplit_once('-') {
        if let Ok(n) = suffix.parse::<u32>() {
            if n >= 2 && !base.is_empty() && !suffix.starts_with('0') {
                return (base, n);
            }
        }
    }
    (id, 1)
}

/// Union `incoming` into `texts`, returning the id renames applied.
fn merge_license_texts(
    texts: &mut BTreeMap<String, String>,
    incoming: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut renames = BTreeMap::new();

    let mut entries: Vec<(&String, &String)> = incoming.iter().collect();
    entries.sort_by_key(|(id, _)| family_key(id));

    for (id, text) in entries {
        let (base, _) = family_key(id);
        let existing = texts
            .iter()
            .find(|(key, value)| family_key(key).0 == base && *value == text)
            .map(|(key, _)| key.clone());

        let target = match existing {
            Some(key) => key,
            None => {
                let key = free_slot(texts, base);
                texts.insert(key.clone(), text.clone());
                key
            }
        };
        if target != *id {
            renames.insert(id.clone(), target);
        }
    }

    renames
}

/// Split a `Name <email>` contact string.
///
/// A bare address yields only the email; text without angle brackets yields
/// only the name.
pub fn parse_contact(value: &str) -> (Option<&str>, Option<&str>) {
    let value = value.trim();
    if let Some((name, rest)) = value.split_once('<') {
        let email = rest.split_once('>').map_or(rest, |(email, _)| email).trim();
        let name = name.trim().trim_matches('"').trim();
        return (
            (!name.is_empty()).then_some(name),
            (!email.is_empty()).then_some(email),
        );
    }
    if value.is_empty() {
        (None, None)
    } else if !value.contains(' ') && value.contains('@') {
        (None, Some(value))
    } else {
        (Some(value), None)
    }
}

/// Builds a [`MetadataRecord`] for one provider.
///
/// Every setter sanitizes its input and records the provider as the field's
/// source, so attribution is complete by construction. Setters take
/// `Option<&str>` so optional upstream values chain directly.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    source: String,
    record: MetadataRecord,
}

impl RecordBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let record = MetadataRecord {
            primary_source: Some(source.clone()),
            ..Default::default()
        };
        Self { source, record }
    }

    fn set(mut self, field: Field, value: Option<String>) -> Self {
        if let Some(value) = value {
            if let Some(slot) = self.record.slot_mut(field) {
                *slot = Some(value);
                self.record.field_sources.insert(field, self.source.clone());
            }
        }
        self
    }

    pub fn description(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_description);
        self.set(Field::Description, value)
    }

    pub fn supplier(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_supplier);
        self.set(Field::Supplier, value)
    }

    pub fn homepage(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_url);
        self.set(Field::Homepage, value)
    }

    /// Repository URL, normalized to the `git+https://` convention first.
    pub fn repository_url(self, value: Option<&str>) -> Self {
        let value = value
            .map(normalize_vcs_url)
            .and_then(|url| sanitize_url(&url));
        self.set(Field::RepositoryUrl, value)
    }

    pub fn documentation_url(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_url);
        self.set(Field::DocumentationUrl, value)
    }

    pub fn registry_url(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_url);
        self.set(Field::RegistryUrl, value)
    }

    pub fn issue_tracker_url(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_url);
        self.set(Field::IssueTrackerUrl, value)
    }

    pub fn download_url(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_url);
        self.set(Field::DownloadUrl, value)
    }

    pub fn maintainer_name(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_supplier);
        self.set(Field::MaintainerName, value)
    }

    pub fn maintainer_email(self, value: Option<&str>) -> Self {
        let value = value.and_then(sanitize_email);
        self.set(Field::MaintainerEmail, value)
    }

    pub fn release_date(self, value: Option<&str>) -> Self {
        let value = value.and_then(|v| sanitize_string(v, MAX_LIFECYCLE_DATE_LENGTH, false));
        self.set(Field::ReleaseDate, value)
    }

    pub fn end_of_support(self, value: Option<&str>) -> Self {
        let value = value.and_then(|v| sanitize_string(v, MAX_LIFECYCLE_DATE_LENGTH, false));
        self.set(Field::EndOfSupport, value)
    }

    pub fn end_of_life(self, value: Option<&str>) -> Self {
        let value = value.and_then(|v| sanitize_string(v, MAX_LIFECYCLE_DATE_LENGTH, false));
        self.set(Field::EndOfLife, value)
    }

    /// Raw license strings, normalized as a list. Replaces earlier licenses.
    pub fn licenses<S: AsRef<str>>(mut self, raw: &[S]) -> Self {
        let (ids, texts) = normalize_license_list(raw);
        let ids: Vec<String> = ids.iter().filter_map(|id| sanitize_license(id)).collect();
        let texts: BTreeMap<String, String> = texts
            .into_iter()
            .filter(|(id, _)| ids.contains(id))
            .filter_map(|(id, text)| {
                sanitize_string(&text, MAX_LICENSE_TEXT_LENGTH, true).map(|t| (id, t))
            })
            .collect();

        if ids.is_empty() {
            return self;
        }
        self.record.licenses = ids;
        self.record.license_texts = texts;
        self.record
            .field_sources
            .insert(Field::Licenses, self.source.clone());
        self
    }

    pub fn build(self) -> MetadataRecord {
        self.record
    }
}
