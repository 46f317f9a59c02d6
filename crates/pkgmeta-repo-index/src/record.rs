use std::collections::HashMap;

/// One binary package as listed in a repository index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    /// `epoch:version-release` for RPM, the `Version` field for Debian.
    pub version: String,
    pub arch: Option<String>,
    pub license: Option<String>,
    /// RPM `vendor`.
    pub vendor: Option<String>,
    /// RPM `packager` or Debian `Maintainer`, unparsed.
    pub maintainer: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Package file path relative to the repository base.
    pub location: Option<String>,
    /// `(algorithm, digest)`.
    pub checksum: Option<(String, String)>,
}

impl PackageRecord {
    /// Vendor, falling back to the packager/maintainer.
    pub fn supplier(&self) -> Option<&str> {
        self.vendor.as_deref().or(self.maintainer.as_deref())
    }

    /// Absolute download URL under `base`.
    pub fn download_url(&self, base: &str) -> Option<String> {
        self.location.as_deref().map(|location| join_url(base, location))
    }
}

/// Packages of one repository coordinate, by name.
pub type RepositoryIndex = HashMap<String, PackageRecord>;

/// Join a relative path onto a base URL with exactly one `/` between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
