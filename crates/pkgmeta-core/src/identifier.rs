//! Package identifiers in the `pkg:type/namespace/name@version?qualifiers#subpath` form.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a package identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("missing 'pkg:' scheme in {0:?}")]
    MissingScheme(String),

    #[error("invalid package type {0:?}")]
    InvalidType(String),

    #[error("missing package name in {0:?}")]
    MissingName(String),

    #[error("invalid qualifier {0:?}")]
    InvalidQualifier(String),

    #[error("invalid percent-encoding in {0:?}")]
    InvalidEncoding(String),
}

/// A parsed package identifier.
///
/// Qualifiers keep the order they were given in, but equality and hashing
/// treat them as an unordered set. The `Display` form is canonical: qualifiers
/// sorted by key, components percent-encoded.
#[derive(Debug, Clone)]
pub struct PackageIdentifier {
    ty: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
    qualifiers: Vec<(String, String)>,
    subpath: Option<String>,
}

impl PackageIdentifier {
    /// Build an identifier from a type and a name.
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ty: ty.into().to_ascii_lowercase(),
            namespace: None,
            name: name.into(),
            version: None,
            qualifiers: Vec::new(),
            subpath: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version = (!version.is_empty()).then_some(version);
        self
    }

    /// Add or replace a qualifier. Empty values remove the key.
    pub fn with_qualifier(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_ascii_lowercase();
        let value = value.into();
        self.qualifiers.retain(|(k, _)| *k != key);
        if !value.is_empty() {
            self.qualifiers.push((key, value));
        }
        self
    }

    pub fn with_subpath(mut self, subpath: impl Into<String>) -> Self {
        let subpath = subpath.into();
        self.subpath = (!subpath.is_empty()).then_some(subpath);
        self
    }

    /// Parse an identifier string.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let trimmed = input.trim();
        let rest = strip_scheme(trimmed)
            .ok_or_else(|| IdentifierError::MissingScheme(input.to_string()))?;
        let rest = rest.trim_start_matches('/');

        let (rest, subpath) = match rest.split_once('#') {
            Some((head, tail)) => (head, parse_subpath(tail)?),
            None => (rest, None),
        };

        let (rest, qualifiers) = match rest.split_once('?') {
            Some((head, tail)) => (head, parse_qualifiers(tail)?),
            None => (rest, Vec::new()),
        };

        let rest = rest.trim_end_matches('/');
        let (ty, path) = rest
            .split_once('/')
            .ok_or_else(|| IdentifierError::MissingName(input.to_string()))?;
        if !is_valid_type(ty) {
            return Err(IdentifierError::InvalidType(ty.to_string()));
        }

        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let last = segments
            .pop()
            .ok_or_else(|| IdentifierError::MissingName(input.to_string()))?;

        let (raw_name, raw_version) = match last.rsplit_once('@') {
            Some((name, version)) if !name.is_empty() => (name, Some(version)),
            _ => (last, None),
        };

        let name = decode(raw_name)?;
        if name.is_empty() {
            return Err(IdentifierError::MissingName(input.to_string()));
        }
        let version = raw_version
            .map(decode)
            .transpose()?
            .filter(|v| !v.is_empty());

        let namespace = if segments.is_empty() {
            None
        } else {
            let decoded = segments
                .iter()
                .map(|s| decode(s))
                .collect::<Result<Vec<_>, _>>()?;
            Some(decoded.join("/"))
        };

        Ok(Self {
            ty: ty.to_ascii_lowercase(),
            namespace,
            name,
            version,
            qualifiers,
            subpath,
        })
    }

    /// Package type, e.g. `deb`, `rpm`, `pypi`.
    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Qualifiers in their original order.
    pub fn qualifiers(&self) -> &[(String, String)] {
        &self.qualifiers
    }

    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn subpath(&self) -> Option<&str> {
        self.subpath.as_deref()
    }

    /// Lowercased namespace, the form distro tables are keyed by.
    pub fn namespace_lower(&self) -> Option<String> {
        self.namespace.as_ref().map(|ns| ns.to_ascii_lowercase())
    }

    /// Namespace and name joined with `separator`, or just the name.
    pub fn qualified_name(&self, separator: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}{separator}{}", self.name),
            None => self.name.clone(),
        }
    }

    /// A copy of this identifier with one qualifier removed.
    pub fn without_qualifier(&self, key: &str) -> Self {
        let mut out = self.clone();
        out.qualifiers.retain(|(k, _)| k != key);
        out
    }

    fn sorted_qualifiers(&self) -> Vec<&(String, String)> {
        let mut sorted: Vec<_> = self.qualifiers.iter().collect();
        sorted.sort();
        sorted
    }
}

fn strip_scheme(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;
    scheme.eq_ignore_ascii_case("pkg").then_some(rest)
}

fn is_valid_type(ty: &str) -> bool {
    let mut chars = ty.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
}

fn decode(raw: &str) -> Result<String, IdentifierError> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| IdentifierError::InvalidEncoding(raw.to_string()))
}

fn parse_qualifiers(raw: &str) -> Result<Vec<(String, String)>, IdentifierError> {
    let mut qualifiers: Vec<(String, String)> = Vec::new();
    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| IdentifierError::InvalidQualifier(pair.to_string()))?;
        let key = key.to_ascii_lowercase();
        if key.is_empty() {
            return Err(IdentifierError::InvalidQualifier(pair.to_string()));
        }
        let value = decode(value)?;
        if value.is_empty() {
            continue;
        }
        qualifiers.retain(|(k, _)| *k != key);
        qualifiers.push((key, value));
    }
    Ok(qualifiers)
}

fn parse_subpath(raw: &str) -> Result<Option<String>, IdentifierError> {
    let segments = raw
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(decode)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((!segments.is_empty()).then(|| segments.join("/")))
}

fn encode(component: &str) -> String {
    urlencoding::encode(component).replace("%3A", ":")
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.ty)?;
        if let Some(ns) = &self.namespace {
            for segment in ns.split('/').filter(|s| !s.is_empty()) {
                write!(f, "{}/", encode(segment))?;
            }
        }
        write!(f, "{}", encode(&self.name))?;
        if let Some(version) = &self.version {
            write!(f, "@{}", encode(version))?;
        }
        for (i, (key, value)) in self.sorted_qualifiers().into_iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={}", encode(value))?;
        }
        if let Some(subpath) = &self.subpath {
            let encoded: Vec<String> = subpath.split('/').map(encode).collect();
            write!(f, "#{}", encoded.join("/"))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for PackageIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for PackageIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.namespace == other.namespace
            && self.name == other.name
            && self.version == other.version
            && self.subpath == other.subpath
            && self.sorted_qualifiers() == other.sorted_qualifiers()
    }
}

impl Eq for PackageIdentifier {}

impl Hash for PackageIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.namespace.hash(state);
        self.name.hash(state);
        self.version.hash(state);
        self.subpath.hash(state);
        self.sorted_qualifiers().hash(state);
    }
}

impl Serialize for PackageIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
