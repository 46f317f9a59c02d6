//! deb822 stanza parsing for `Packages` files.

use std::collections::HashMap;

use crate::record::PackageRecord;

/// One blank-line-delimited paragraph of `Field: value` pairs.
pub type Stanza = HashMap<String, String>;

/// Split a deb822 document into stanzas.
///
/// Continuation lines (leading space or tab) are appended to the previous
/// field with a newline. Lines without a colon are skipped.
pub fn parse_stanzas(text: &str) -> Vec<Stanza> {
    let mut stanzas = Vec::new();
    let mut current = Stanza::new();
    let mut last_key: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
            last_key = None;
            continue;
        }

        if line.starts_with([' ', '\t']) {
            if let Some(value) = last_key.as_ref().and_then(|key| current.get_mut(key)) {
                value.push('\n');
                value.push_str(line.trim_start());
            }
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_string();
        current.insert(key.clone(), value.trim_start().to_string());
        last_key = Some(key);
    }

    if !current.is_empty() {
        stanzas.push(current);
    }
    stanzas
}

/// Build a record from a binary package stanza. `Package` and `Version` are
/// required.
pub fn stanza_to_record(stanza: &Stanza, default_arch: &str) -> Option<PackageRecord> {
    let field = |key: &str| {
        stanza
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let name = field("Package")?;
    let version = field("Version")?;
    let checksum = field("SHA256").map(|digest| ("sha256".to_string(), digest));

    Some(PackageRecord {
        name,
        version,
        arch: field("Architecture").or_else(|| Some(default_arch.to_string())),
        license: None,
        vendor: None,
        maintainer: field("Maintainer"),
        summary: field("Description").map(|d| first_line(&d).to_string()),
        description: field("Description"),
        homepage: field("Homepage"),
        location: field("Filename"),
        checksum,
    })
}

fn first_line(value: &str) -> &str {
    let line = value.lines().next().unwrap_or(value).trim();
    if line.is_empty() { value } else { line }
}
