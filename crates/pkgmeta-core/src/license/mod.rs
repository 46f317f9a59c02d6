//! License string normalization.
//!
//! Conservative by construction: a string is either already valid SPDX, an
//! exact alias of a listed license, full license text (kept verbatim under
//! `LicenseRef-Custom`), or a case variant of a valid expression. Anything
//! else is passed through unchanged. Nothing is guessed.

mod aliases;
mod expression;

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Token used when a license field holds full license text.
pub const CUSTOM_LICENSE_REF: &str = "LicenseRef-Custom";

/// Token for an empty license field.
pub const NO_ASSERTION: &str = "NOASSERTION";

/// Strings longer than this many characters are treated as license text.
pub const LICENSE_TEXT_LENGTH_THRESHOLD: usize = 100;

/// Result of normalizing one license string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLicense {
    /// SPDX identifier, expression, `LicenseRef-*` key, or the unchanged input.
    pub expression: String,
    /// Full license text when the input was text rather than an identifier.
    pub text: Option<String>,
}

impl NormalizedLicense {
    fn id(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            text: None,
        }
    }
}

fn looks_like_text(value: &str) -> bool {
    value.chars().count() > LICENSE_TEXT_LENGTH_THRESHOLD || value.matches('\n').count() > 2
}

/// Whether `value` is a syntactically valid, canonically spelled SPDX
/// expression (including `LicenseRef-*` and the special values).
pub fn is_spdx_expression(value: &str) -> bool {
    !value.is_empty() && !looks_like_text(value) && expression::is_valid(value)
}

/// Normalize one license string.
pub fn normalize_license(raw: &str) -> NormalizedLicense {
    let stripped = raw.trim();
    if stripped.is_empty() {
        return NormalizedLicense::id(NO_ASSERTION);
    }

    if is_spdx_expression(stripped) {
        return NormalizedLicense::id(stripped);
    }

    if looks_like_text(stripped) {
        return NormalizedLicense {
            expression: CUSTOM_LICENSE_REF.to_string(),
            text: Some(stripped.to_string()),
        };
    }

    if let Some(target) = aliases::lookup(stripped) {
        if expression::is_valid(target) {
            return NormalizedLicense::id(target);
        }
        warn!(alias = %stripped, target = %target, "license alias maps to an invalid SPDX id");
    }

    if let Some(canonical) = expression::canonicalize(stripped) {
        return NormalizedLicense::id(canonical);
    }

    debug!(license = %stripped, "unrecognized license string");
    NormalizedLicense::id(stripped)
}

/// Normalize a list of license strings.
///
/// Empty entries are skipped and duplicate ids are dropped, keeping
/// discovery order. Each distinct license text gets its own key: the first
/// is `LicenseRef-Custom`, later ones `LicenseRef-Custom-2`, `-3`, and so on.
pub fn normalize_license_list<S: AsRef<str>>(
    licenses: &[S],
) -> (Vec<String>, BTreeMap<String, String>) {
    let mut ids: Vec<String> = Vec::new();
    let mut texts: BTreeMap<String, String> = BTreeMap::new();

    for raw in licenses {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        let normalized = normalize_license(raw);
        let id = match normalized.text {
            Some(text) => {
                if let Some((existing, _)) = texts.iter().find(|(_, t)| **t == text) {
                    existing.clone()
                } else {
                    let key = free_slot(&texts, &normalized.expression);
                    texts.insert(key.clone(), text);
                    key
                }
            }
            None => normalized.expression,
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    (ids, texts)
}

/// First unused key among `base`, `base-2`, `base-3`, ...
pub fn free_slot<V>(map: &BTreeMap<String, V>, base: &str) -> String {
    if !map.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|key| !map.contains_key(key))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_spdx_unchanged() {
        for id in [
            "MIT",
            "Apache-2.0",
            "MIT OR Apache-2.0",
            "(MIT OR Apache-2.0) AND BSD-3-Clause",
            "LicenseRef-Proprietary",
            "NOASSERTION",
        ] {
            assert_eq!(normalize_license(id), NormalizedLicense::id(id), "{id}");
        }
    }

    #[test]
    fn test_alias() {
        assert_eq!(
            normalize_license("Apache License 2.0"),
            NormalizedLicense::id("Apache-2.0")
        );
        assert_eq!(normalize_license("GPLv3"), NormalizedLicense::id("GPL-3.0-only"));
        assert_eq!(normalize_license("  expat "), NormalizedLicense::id("MIT"));
    }

    #[test]
    fn test_long_text_becomes_custom_ref() {
        let blob = "Permission is hereby granted, free of charge, to any person ".repeat(9);
        let blob = blob.trim().to_string();
        assert!(blob.len() > 500);
        let normalized = normalize_license(&blob);
        assert_eq!(normalized.expression, CUSTOM_LICENSE_REF);
        assert_eq!(normalized.text.as_deref(), Some(blob.as_str()));
    }

    #[test]
    fn test_multiline_text_becomes_custom_ref() {
        let text = "Copyright\nAll rights\nreserved\nfor real";
        let normalized = normalize_license(text);
        assert_eq!(normalized.expression, CUSTOM_LICENSE_REF);
        assert_eq!(normalized.text.as_deref(), Some(text));
    }

    #[test]
    fn test_case_variant_canonicalized() {
        assert_eq!(
            normalize_license("mit or apache-2.0"),
            NormalizedLicense::id("MIT OR Apache-2.0")
        );
    }

    #[test]
    fn test_rpm_compound_passes_through() {
        // Only whole-string aliases apply; components are not rewritten.
        for raw in ["GPLv2+ and LGPLv2+", "ASL 2.0 or MIT", "GPLv2+ and Whatever"] {
            assert_eq!(normalize_license(raw), NormalizedLicense::id(raw), "{raw}");
        }
        assert_eq!(
            normalize_license("apache-2.0 and mit"),
            NormalizedLicense::id("Apache-2.0 AND MIT")
        );
    }

    #[test]
    fn test_unversioned_names_pass_through() {
        for raw in ["gpl", "bsd", "GPL", "BSD", "artistic", "cc-by", "unicode"] {
            assert_eq!(normalize_license(raw), NormalizedLicense::id(raw), "{raw}");
        }
    }

    #[test]
    fn test_unknown_passthrough() {
        assert_eq!(
            normalize_license(" Some Custom License "),
            NormalizedLicense::id("Some Custom License")
        );
    }

    #[test]
    fn test_empty_is_noassertion() {
        assert_eq!(normalize_license(""), NormalizedLicense::id(NO_ASSERTION));
        assert_eq!(normalize_license("   "), NormalizedLicense::id(NO_ASSERTION));
    }

    #[test]
    fn test_idempotent() {
        let long = "x".repeat(500);
        let at_threshold = "y".repeat(LICENSE_TEXT_LENGTH_THRESHOLD);
        let over_threshold = "y".repeat(LICENSE_TEXT_LENGTH_THRESHOLD + 1);
        let inputs = [
            "MIT",
            "Apache License 2.0",
            "mit or apache-2.0",
            "GPLv2+ and LGPLv2+",
            "gplv2+ and gplv3+ and lgplv2+ and agplv3+ and asl 2.0 and bsd and mit",
            "gpl-2.0-or-later and gpl-3.0-or-later and lgpl-2.1-or-later and apache-2.0 and mit",
            "Some Custom License",
            "gpl-2+",
            "",
            long.as_str(),
            at_threshold.as_str(),
            over_threshold.as_str(),
            "a\nb\nc\nd",
            "BSD",
            "LicenseRef-foo",
        ];
        for input in inputs {
            let once = normalize_license(input).expression;
            let twice = normalize_license(&once).expression;
            assert_eq!(once, twice, "{input:?}");
        }
    }

    #[test]
    fn test_idempotent_over_alias_table() {
        for (alias, target) in aliases::LICENSE_ALIASES {
            let once = normalize_license(alias).expression;
            assert_eq!(once, *target, "{alias}");
            assert_eq!(normalize_license(&once).expression, once, "{alias}");
        }
    }

    #[test]
    fn test_list_dedups_ids_and_texts() {
        let text_a = "a".repeat(200);
        let text_b = "b".repeat(200);
        let (ids, texts) = normalize_license_list(&[
            "MIT",
            "mit license",
            "",
            text_a.as_str(),
            text_b.as_str(),
            text_a.as_str(),
        ]);
        assert_eq!(ids, vec!["MIT", "LicenseRef-Custom", "LicenseRef-Custom-2"]);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts["LicenseRef-Custom"], text_a);
        assert_eq!(texts["LicenseRef-Custom-2"], text_b);
    }

    #[test]
    fn test_free_slot() {
        let mut map = BTreeMap::new();
        assert_eq!(free_slot(&map, "X"), "X");
        map.insert("X".to_string(), ());
        map.insert("X-2".to_string(), ());
        assert_eq!(free_slot(&map, "X"), "X-3");
    }
}
