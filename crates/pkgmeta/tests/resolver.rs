mod common;

use std::time::Duration;

use common::{Scripted, calls, record};
use pkgmeta::{Field, MergeMode, PackageIdentifier, ResolutionStats, Resolver};

fn requests() -> PackageIdentifier {
    PackageIdentifier::parse("pkg:pypi/requests@2.31.0").unwrap()
}

#[test]
fn merges_in_priority_order() {
    let a = Scripted::answering(
        "A",
        10,
        record("A")
            .description(Some("From A"))
            .licenses(&["MIT"])
            .build(),
    );
    let b = Scripted::answering(
        "B",
        20,
        record("B")
            .description(Some("From B"))
            .homepage(Some("https://example.org/"))
            .build(),
    );
    let (a_calls, b_calls) = (a.counter(), b.counter());

    let mut resolver = Resolver::new();
    // Registration order must not matter.
    resolver.register(Box::new(b));
    resolver.register(Box::new(a));

    let merged = resolver.resolve(&requests()).unwrap();
    assert_eq!(merged.description.as_deref(), Some("From A"));
    assert_eq!(merged.licenses, vec!["MIT"]);
    assert_eq!(merged.homepage.as_deref(), Some("https://example.org/"));
    assert_eq!(merged.source_of(Field::Description), Some("A"));
    assert_eq!(merged.source_of(Field::Homepage), Some("B"));
    assert_eq!(merged.primary_source.as_deref(), Some("A"));
    assert_eq!(merged.merged_sources(), vec!["A", "B"]);
    assert_eq!((calls(&a_calls), calls(&b_calls)), (1, 1));
}

#[test]
fn disjoint_answers_are_combined_with_attribution() {
    let a = Scripted::answering(
        "A",
        10,
        record("A")
            .description(Some("HTTP for Humans."))
            .supplier(Some("Python Software Foundation"))
            .build(),
    );
    let b = Scripted::answering(
        "B",
        20,
        record("B")
            .licenses(&["Apache-2.0"])
            .homepage(Some("https://requests.readthedocs.io/"))
            .build(),
    );

    let mut resolver = Resolver::new();
    resolver.register(Box::new(a));
    resolver.register(Box::new(b));

    let merged = resolver.resolve(&requests()).unwrap();
    assert_eq!(merged.description.as_deref(), Some("HTTP for Humans."));
    assert_eq!(merged.supplier.as_deref(), Some("Python Software Foundation"));
    assert_eq!(merged.licenses, vec!["Apache-2.0"]);
    assert_eq!(merged.homepage.as_deref(), Some("https://requests.readthedocs.io/"));
    assert_eq!(merged.source_of(Field::Description), Some("A"));
    assert_eq!(merged.source_of(Field::Supplier), Some("A"));
    assert_eq!(merged.source_of(Field::Licenses), Some("B"));
    assert_eq!(merged.source_of(Field::Homepage), Some("B"));
    assert_eq!(merged.merged_sources(), vec!["A", "B"]);
    assert!(merged.is_sufficient());
}

#[test]
fn stops_once_sufficient() {
    let a = Scripted::answering(
        "A",
        10,
        record("A")
            .description(Some("HTTP for Humans."))
            .licenses(&["Apache-2.0"])
            .supplier(Some("Kenneth Reitz"))
            .build(),
    );
    let b = Scripted::answering(
        "B",
        20,
        record("B").homepage(Some("https://example.org/")).build(),
    );
    let b_calls = b.counter();

    let mut resolver = Resolver::new();
    resolver.register(Box::new(a));
    resolver.register(Box::new(b));

    let merged = resolver.resolve(&requests()).unwrap();
    assert!(merged.is_sufficient());
    assert!(merged.homepage.is_none());
    assert_eq!(calls(&b_calls), 0);
}

#[test]
fn sufficiency_reached_across_providers() {
    let a = Scripted::answering(
        "A",
        10,
        record("A").description(Some("desc")).build(),
    );
    let b = Scripted::answering(
        "B",
        20,
        record("B")
            .licenses(&["MIT"])
            .supplier(Some("Acme"))
            .build(),
    );
    let c = Scripted::answering(
        "C",
        30,
        record("C").homepage(Some("https://example.org/")).build(),
    );
    let c_calls = c.counter();

    let mut resolver = Resolver::new();
    resolver.register(Box::new(a));
    resolver.register(Box::new(b));
    resolver.register(Box::new(c));

    let merged = resolver.resolve(&requests()).unwrap();
    assert_eq!(merged.source_of(Field::Supplier), Some("B"));
    assert_eq!(calls(&c_calls), 0);
}

#[test]
fn first_wins_keeps_first_answer() {
    let empty = Scripted::empty("A", 10);
    let b = Scripted::answering("B", 20, record("B").description(Some("From B")).build());
    let c = Scripted::answering("C", 30, record("C").licenses(&["MIT"]).build());
    let (a_calls, c_calls) = (empty.counter(), c.counter());

    let mut resolver = Resolver::new().with_merge_mode(MergeMode::FirstWins);
    resolver.register(Box::new(empty));
    resolver.register(Box::new(b));
    resolver.register(Box::new(c));

    let result = resolver.resolve(&requests()).unwrap();
    assert_eq!(result.description.as_deref(), Some("From B"));
    assert!(result.licenses.is_empty());
    assert_eq!(calls(&a_calls), 1);
    assert_eq!(calls(&c_calls), 0);

    // The configured mode can be overridden per call.
    let merged = resolver.resolve_with(&requests(), MergeMode::Merge).unwrap();
    assert_eq!(merged.licenses, vec!["MIT"]);
}

#[test]
fn failing_and_panicking_providers_are_isolated() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(Scripted::panicking("boom", 5)));
    resolver.register(Box::new(Scripted::failing("broken", 6)));
    resolver.register(Box::new(Scripted::answering(
        "A",
        10,
        record("A").description(Some("still resolved")).build(),
    )));

    let result = resolver.resolve(&requests()).unwrap();
    assert_eq!(result.description.as_deref(), Some("still resolved"));
    assert_eq!(result.merged_sources(), vec!["A"]);

    // The resolver stays usable afterwards.
    assert!(resolver.resolve(&requests()).is_some());
}

#[test]
fn no_supporting_provider() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(Scripted::answering(
        "A",
        10,
        record("A").description(Some("x")).build(),
    )));
    let npm = PackageIdentifier::parse("pkg:npm/lodash@4.17.21").unwrap();
    assert!(resolver.providers_for(&npm).is_empty());
    assert!(resolver.resolve(&npm).is_none());
}

#[test]
fn resolve_many_isolates_bad_identifiers() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(Scripted::answering(
        "A",
        10,
        record("A").description(Some("x")).build(),
    )));

    let results = resolver.resolve_many(&["pkg:pypi/requests", "not a purl", "pkg:npm/lodash"]);
    assert_eq!(results.len(), 3);
    assert!(results["pkg:pypi/requests"].is_some());
    assert!(results["not a purl"].is_none());
    assert!(results["pkg:npm/lodash"].is_none());

    let stats = ResolutionStats::from_results(&results);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.with_description, 1);
    assert_eq!(stats.unresolved(), 2);
}

#[test]
fn parallel_matches_sequential() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(
        Scripted::answering(
            "A",
            10,
            record("A").description(Some("shared")).build(),
        )
        .for_types(&["pypi", "npm"]),
    ));
    resolver.register(Box::new(
        Scripted::answering("B", 20, record("B").licenses(&["MIT"]).build()).for_types(&["npm"]),
    ));

    let purls: Vec<String> = (0..32)
        .map(|i| {
            if i % 3 == 0 {
                format!("pkg:npm/pkg{i}@1.0.0")
            } else {
                format!("pkg:pypi/pkg{i}")
            }
        })
        .chain(["pkg:cargo/serde".to_string(), "pkg:".to_string()])
        .collect();

    let sequential = resolver.resolve_many(&purls);
    let parallel = resolver.resolve_many_parallel(&purls);
    assert_eq!(sequential, parallel);
    assert_eq!(sequential["pkg:npm/pkg0@1.0.0"].as_ref().unwrap().licenses, vec!["MIT"]);
}

#[test]
fn expired_deadline_skips_remaining() {
    let a = Scripted::answering("A", 10, record("A").description(Some("x")).build());
    let a_calls = a.counter();

    let mut resolver = Resolver::new().with_batch_deadline(Duration::ZERO);
    resolver.register(Box::new(a));

    let results = resolver.resolve_many(&["pkg:pypi/a", "pkg:pypi/b"]);
    assert_eq!(results.len(), 2);
    assert!(results.values().all(Option::is_none));
    assert_eq!(calls(&a_calls), 0);
}

#[test]
fn repository_urls_can_be_stripped() {
    let repo_only = Scripted::answering(
        "A",
        10,
        record("A")
            .repository_url(Some("https://github.com/psf/requests"))
            .build(),
    );
    let with_homepage = Scripted::answering(
        "B",
        20,
        record("B")
            .repository_url(Some("https://github.com/psf/requests"))
            .homepage(Some("https://requests.readthedocs.io/"))
            .build(),
    );

    let mut resolver = Resolver::new().with_repository_urls(false);
    resolver.register(Box::new(repo_only));
    resolver.register(Box::new(with_homepage));

    let result = resolver.resolve(&requests()).unwrap();
    assert!(result.repository_url.is_none());
    assert_eq!(result.source_of(Field::Homepage), Some("B"));
    assert!(!result.field_sources.contains_key(&Field::RepositoryUrl));
}

#[test]
fn list_providers_sorted() {
    let mut resolver = Resolver::new();
    resolver.register(Box::new(Scripted::empty("late", 90)));
    resolver.register(Box::new(Scripted::empty("early", 1)));
    let names: Vec<_> = resolver.list_providers().iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["early", "late"]);
}
