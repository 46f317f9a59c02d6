//! Release-cycle dates for tracked runtimes and frameworks, from a static
//! table with no network access.
//!
//! Only packages whose own version is the runtime's version are tracked.
//! Arbitrary OS packages are not: `pkg:deb/debian/curl@8.0` says nothing
//! about the distro release, and curl's lifecycle is not the distro's.

use std::sync::OnceLock;

use glob::Pattern;
use pkgmeta_core::{PackageIdentifier, RecordBuilder};
use tracing::debug;

use crate::provider::{Lookup, Miss, Provider, ProviderError};

const NAME: &str = "lifecycle";

/// How much of a version names its release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKey {
    Major,
    MajorMinor,
}

/// Dates for one release cycle: release, end of support, end of life.
type Cycle = (&'static str, Option<&'static str>, Option<&'static str>, Option<&'static str>);

struct Product {
    name: &'static str,
    /// Glob patterns matched against the name, namespace and
    /// `namespace/name`, lowercased.
    patterns: &'static [&'static str],
    /// Identifier types the product is published under; empty for any.
    types: &'static [&'static str],
    cycle_key: CycleKey,
    cycles: &'static [Cycle],
}

const PRODUCTS: &[Product] = &[
    Product {
        name: "python",
        patterns: &[
            "python",
            "python2",
            "python2.*",
            "python3",
            "python3.*",
            "cpython",
            "libpython*",
        ],
        types: &[],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("2.7", None, Some("2020-01-01"), Some("2020-04-20")),
            ("3.10", Some("2021-10-04"), Some("2023-04-04"), Some("2026-10-31")),
            ("3.11", Some("2022-10-24"), Some("2024-04-24"), Some("2027-10-31")),
            ("3.12", Some("2023-10-02"), Some("2025-04-02"), Some("2028-10-31")),
            ("3.13", Some("2024-10-07"), Some("2026-10-07"), Some("2029-10-31")),
            ("3.14", Some("2025-10-07"), Some("2027-10-07"), Some("2030-10-31")),
        ],
    },
    Product {
        name: "django",
        patterns: &["django"],
        types: &["pypi"],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("4.2", None, Some("2023-12-04"), Some("2026-04-30")),
            ("5.2", None, Some("2025-12-03"), Some("2028-04-30")),
            ("6.0", None, Some("2026-08-31"), Some("2027-04-30")),
        ],
    },
    Product {
        name: "rails",
        patterns: &[
            "rails",
            "railties",
            "actionpack",
            "activerecord",
            "activesupport",
            "actionmailer",
            "actioncable",
            "activestorage",
            "actionview",
            "activejob",
            "actionmailbox",
            "actiontext",
            "activemodel",
            "ruby-rails",
        ],
        types: &["gem"],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("7.0", Some("2021-12-15"), Some("2025-10-29"), Some("2025-10-29")),
            ("7.1", Some("2023-10-05"), Some("2025-10-29"), Some("2025-10-29")),
            ("7.2", None, None, Some("2026-08-09")),
            ("8.0", Some("2024-11-07"), Some("2026-05-07"), Some("2026-11-07")),
            ("8.1", Some("2025-10-22"), Some("2026-10-10"), Some("2027-10-10")),
        ],
    },
    Product {
        name: "laravel",
        patterns: &["laravel/framework", "laravel"],
        types: &["composer"],
        cycle_key: CycleKey::Major,
        cycles: &[
            ("10", Some("2023-02-14"), Some("2025-02-06"), Some("2026-02-04")),
            ("11", Some("2024-03-12"), Some("2025-09-03"), Some("2026-03-12")),
            ("12", Some("2025-02-24"), Some("2026-09-03"), Some("2027-03-12")),
            ("13", Some("2026-Q1"), Some("2026-Q3"), Some("2027-Q1")),
        ],
    },
    Product {
        name: "php",
        patterns: &[
            "php",
            "php-cli",
            "php-fpm",
            "php-cgi",
            "php-common",
            "php7",
            "php7.*",
            "php8",
            "php8.*",
            "php74",
            "php74-*",
            "php80",
            "php80-*",
            "php81",
            "php81-*",
            "php82",
            "php82-*",
            "php83",
            "php83-*",
            "php84",
            "php84-*",
            "php85",
            "php85-*",
            "libphp*",
        ],
        types: &[],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("7.4", Some("2019-11-28"), None, Some("2022-11-28")),
            ("8.0", Some("2020-11-26"), None, Some("2023-11-26")),
            ("8.1", Some("2021-11-25"), None, Some("2025-12-31")),
            ("8.2", Some("2022-12-08"), Some("2024-12-31"), Some("2026-12-31")),
            ("8.3", Some("2023-11-23"), Some("2025-12-31"), Some("2027-12-31")),
            ("8.4", Some("2024-11-21"), Some("2026-12-31"), Some("2028-12-31")),
            ("8.5", Some("2025-11-20"), Some("2027-12-31"), Some("2029-12-31")),
        ],
    },
    Product {
        name: "go",
        patterns: &[
            "go",
            "golang",
            "golang-go",
            "golang-src",
            "golang-doc",
            "golang-1.*",
            "golang-1.*-go",
            "golang-1.*-src",
            "golang-1.*-doc",
        ],
        types: &[],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("1.22", Some("2024-02-06"), Some("2025-02-11"), Some("2025-02-11")),
            ("1.23", Some("2024-08-13"), Some("2025-08-12"), Some("2025-08-12")),
            ("1.24", Some("2025-02-11"), None, None),
            ("1.25", Some("2025-08-12"), None, None),
        ],
    },
    Product {
        name: "rust",
        patterns: &[
            "rust",
            "rustc",
            "rustc-*",
            "cargo",
            "cargo-*",
            "rust-all",
            "rust-src",
            "rust-doc",
            "rust-gdb",
            "rust-lldb",
            "libstd-rust*",
        ],
        types: &[],
        cycle_key: CycleKey::MajorMinor,
        cycles: &[
            ("1.90", Some("2025-09-18"), Some("2025-10-30"), Some("2025-10-30")),
            ("1.91", Some("2025-10-30"), Some("2025-12-11"), Some("2025-12-11")),
            ("1.92", Some("2025-12-11"), None, None),
        ],
    },
    Product {
        name: "react",
        patterns: &["react", "react-dom"],
        types: &["npm"],
        cycle_key: CycleKey::Major,
        cycles: &[
            ("17", Some("2020-10-20"), None, None),
            ("18", Some("2022-03-29"), None, None),
            ("19", Some("2024-12-05"), None, None),
        ],
    },
    Product {
        name: "vue",
        patterns: &[
            "vue",
            "@vue/runtime-core",
            "@vue/compiler-sfc",
            "@vue/reactivity",
            "@vue/shared",
        ],
        types: &["npm"],
        cycle_key: CycleKey::Major,
        cycles: &[("2", None, Some("2023-12-31"), Some("2023-12-31")), ("3", None, None, None)],
    },
];

/// Compiled name patterns, one list per entry of [`PRODUCTS`].
fn compiled_patterns() -> &'static [Vec<Pattern>] {
    static PATTERNS: OnceLock<Vec<Vec<Pattern>>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        PRODUCTS
            .iter()
            .map(|product| {
                product
                    .patterns
                    .iter()
                    .filter_map(|p| Pattern::new(p).ok())
                    .collect()
            })
            .collect()
    })
}

/// The tracked product `id` belongs to, if any.
fn product_for(id: &PackageIdentifier) -> Option<&'static Product> {
    let name = id.name().to_lowercase();
    let mut candidates = vec![name.clone()];
    if let Some(namespace) = id.namespace_lower().filter(|ns| !ns.is_empty()) {
        candidates.push(format!("{namespace}/{name}"));
        candidates.push(namespace);
    }
    let ty = id.ty().to_lowercase();

    PRODUCTS
        .iter()
        .zip(compiled_patterns())
        .find(|(product, patterns)| {
            let named = patterns
                .iter()
                .any(|pattern| candidates.iter().any(|c| pattern.matches(c)));
            named && (product.types.is_empty() || product.types.contains(&ty.as_str()))
        })
        .map(|(product, _)| product)
}

/// The release cycle a version belongs to: `3.12.7` is cycle `3.12`, or
/// `3` when only the major version counts.
fn version_cycle(version: &str, key: CycleKey) -> Option<String> {
    let version = version.trim_start_matches('v');
    let mut parts = version.split('.');
    let major = parts.next().filter(|p| is_number(p))?;
    match key {
        CycleKey::Major => Some(major.to_string()),
        CycleKey::MajorMinor => match parts.next() {
            Some(minor) => {
                let minor = minor.split(['-', '+']).next().unwrap_or_default();
                is_number(minor).then(|| format!("{major}.{minor}"))
            }
            None => Some(major.to_string()),
        },
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Lifecycle dates for tracked language runtimes and frameworks.
pub struct Lifecycle;

impl Provider for Lifecycle {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        5
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        product_for(id).is_some()
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some(product) = product_for(id) else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let Some(cycle) = id
            .version()
            .and_then(|version| version_cycle(version, product.cycle_key))
        else {
            debug!(purl = %id, product = product.name, "no release cycle in version");
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let Some((_, released, support_ends, life_ends)) =
            product.cycles.iter().find(|(name, ..)| *name == cycle)
        else {
            debug!(product = product.name, %cycle, "release cycle not tracked");
            return Ok(Lookup::Absent(Miss::NotFound));
        };

        let record = RecordBuilder::new(NAME)
            .release_date(*released)
            .end_of_support(*support_ends)
            .end_of_life(*life_ends)
            .build();
        Ok(Lookup::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmeta_core::Field;

    fn parse(s: &str) -> PackageIdentifier {
        PackageIdentifier::parse(s).unwrap()
    }

    #[test]
    fn test_version_cycle() {
        assert_eq!(version_cycle("3.12.7", CycleKey::MajorMinor).as_deref(), Some("3.12"));
        assert_eq!(version_cycle("v1.22.3", CycleKey::MajorMinor).as_deref(), Some("1.22"));
        assert_eq!(version_cycle("8.2-rc1", CycleKey::MajorMinor).as_deref(), Some("8.2"));
        assert_eq!(version_cycle("19", CycleKey::MajorMinor).as_deref(), Some("19"));
        assert_eq!(version_cycle("18.3.1", CycleKey::Major).as_deref(), Some("18"));
        assert_eq!(version_cycle("1:8.2.7-1", CycleKey::MajorMinor), None);
        assert_eq!(version_cycle("latest", CycleKey::Major), None);
    }

    #[test]
    fn test_product_matching() {
        let name_of = |s: &str| product_for(&parse(s)).map(|p| p.name);
        assert_eq!(name_of("pkg:deb/debian/python3.11@3.11.2-6"), Some("python"));
        assert_eq!(name_of("pkg:pypi/Django@4.2.9"), Some("django"));
        assert_eq!(name_of("pkg:composer/laravel/framework@11.4.0"), Some("laravel"));
        assert_eq!(name_of("pkg:rpm/fedora/golang-1.22-src@1.22.1"), Some("go"));
        assert_eq!(name_of("pkg:npm/%40vue/reactivity@3.4.0"), Some("vue"));
        // Framework names only count in their own ecosystem.
        assert_eq!(name_of("pkg:npm/django@1.0.0"), None);
        assert_eq!(name_of("pkg:deb/debian/curl@8.0.0"), None);
    }

    #[test]
    fn test_known_cycle() {
        let record = Lifecycle
            .resolve(&parse("pkg:pypi/django@4.2.9"))
            .unwrap()
            .into_record()
            .unwrap();
        assert!(record.release_date.is_none());
        assert_eq!(record.end_of_support.as_deref(), Some("2023-12-04"));
        assert_eq!(record.end_of_life.as_deref(), Some("2026-04-30"));
        assert_eq!(record.source_of(Field::EndOfLife), Some(NAME));
        assert!(record.description.is_none());
    }

    #[test]
    fn test_cycle_without_end_dates_is_absent() {
        // Only a release date is known, which is not enough to answer.
        let lookup = Lifecycle.resolve(&parse("pkg:npm/react@18.2.0")).unwrap();
        assert_eq!(lookup, Lookup::Absent(Miss::NotFound));
    }

    #[test]
    fn test_untracked_cycle_or_version() {
        let lookup = Lifecycle.resolve(&parse("pkg:pypi/django@1.11.29")).unwrap();
        assert_eq!(lookup, Lookup::Absent(Miss::NotFound));
        let lookup = Lifecycle.resolve(&parse("pkg:pypi/django")).unwrap();
        assert_eq!(lookup, Lookup::Absent(Miss::NotFound));
    }
}
