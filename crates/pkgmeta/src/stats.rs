//! Summary counts over a batch of resolutions.

use std::collections::BTreeMap;

use pkgmeta_core::{Field, MetadataRecord};
use serde::Serialize;

/// Coverage of a resolved batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub total: usize,
    pub resolved: usize,
    pub with_description: usize,
    pub with_licenses: usize,
    pub with_supplier: usize,
    pub with_homepage: usize,
    pub with_repository: usize,
    /// Provider name to the number of fields it supplied, per field.
    pub by_provider: BTreeMap<String, BTreeMap<Field, usize>>,
}

impl ResolutionStats {
    pub fn from_results(results: &BTreeMap<String, Option<MetadataRecord>>) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };

        for record in results.values().flatten() {
            stats.resolved += 1;
            stats.with_description += usize::from(record.has(Field::Description));
            stats.with_licenses += usize::from(record.has(Field::Licenses));
            stats.with_supplier += usize::from(record.has(Field::Supplier));
            stats.with_homepage += usize::from(record.has(Field::Homepage));
            stats.with_repository += usize::from(record.has(Field::RepositoryUrl));

            for (field, provider) in &record.field_sources {
                *stats
                    .by_provider
                    .entry(provider.clone())
                    .or_default()
                    .entry(*field)
                    .or_default() += 1;
            }
        }
        stats
    }

    pub fn unresolved(&self) -> usize {
        self.total - self.resolved
    }

    /// Total fields each provider supplied, most first.
    pub fn provider_totals(&self) -> Vec<(&str, usize)> {
        let mut totals: Vec<(&str, usize)> = self
            .by_provider
            .iter()
            .map(|(name, fields)| (name.as_str(), fields.values().sum()))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmeta_core::RecordBuilder;

    #[test]
    fn test_from_results() {
        let a = RecordBuilder::new("pypi.org")
            .description(Some("HTTP for humans"))
            .licenses(&["Apache-2.0"])
            .build();
        let b = RecordBuilder::new("purl").supplier(Some("Debian Project")).build();
        let merged = a.merge(&b);

        let mut results = BTreeMap::new();
        results.insert("pkg:pypi/requests".to_string(), Some(merged));
        results.insert("pkg:npm/missing".to_string(), None);
        results.insert("bad".to_string(), None);

        let stats = ResolutionStats::from_results(&results);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved(), 2);
        assert_eq!(stats.with_description, 1);
        assert_eq!(stats.with_licenses, 1);
        assert_eq!(stats.with_supplier, 1);
        assert_eq!(stats.with_homepage, 0);
        assert_eq!(stats.by_provider["pypi.org"][&Field::Licenses], 1);
        assert_eq!(stats.by_provider["purl"][&Field::Supplier], 1);
        assert_eq!(stats.provider_totals(), vec![("pypi.org", 2), ("purl", 1)]);
    }
}
