//! Supported RPM distributions and where their repositories live.

use std::fmt;

/// Architecture used when an identifier does not name one.
pub const DEFAULT_ARCH: &str = "x86_64";

/// RPM-family distributions with public repository metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpmDistro {
    Rocky,
    AlmaLinux,
    CentOs,
    Fedora,
    AmazonLinux,
}

/// How to reach a repository's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    /// Fixed base URL.
    Base(String),
    /// Plain-text mirror list; the first `http` line is the base URL.
    MirrorList(String),
}

impl RpmDistro {
    pub const ALL: [RpmDistro; 5] = [
        RpmDistro::Rocky,
        RpmDistro::AlmaLinux,
        RpmDistro::CentOs,
        RpmDistro::Fedora,
        RpmDistro::AmazonLinux,
    ];

    /// Look up a distro by name or alias (`alma`, `amzn`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rocky" => Some(Self::Rocky),
            "almalinux" | "alma" => Some(Self::AlmaLinux),
            "centos" => Some(Self::CentOs),
            "fedora" => Some(Self::Fedora),
            "amzn" | "amazonlinux" => Some(Self::AmazonLinux),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rocky => "rocky",
            Self::AlmaLinux => "almalinux",
            Self::CentOs => "centos",
            Self::Fedora => "fedora",
            Self::AmazonLinux => "amazonlinux",
        }
    }

    /// Supported major versions, oldest first.
    pub fn versions(self) -> &'static [&'static str] {
        match self {
            Self::Rocky | Self::AlmaLinux | Self::CentOs => &["8", "9"],
            Self::Fedora => &["39", "40", "41", "42"],
            Self::AmazonLinux => &["2", "2023"],
        }
    }

    pub fn supports_version(self, version: &str) -> bool {
        self.versions().contains(&version)
    }

    /// Repositories searched for a package, in order.
    pub fn repositories(self) -> &'static [&'static str] {
        match self {
            Self::Rocky | Self::AlmaLinux | Self::CentOs => &["BaseOS", "AppStream"],
            Self::Fedora => &["Everything"],
            Self::AmazonLinux => &["core"],
        }
    }

    /// Location of one repository, or `None` for an unsupported version.
    pub fn source(self, version: &str, repo: &str, arch: &str) -> Option<RepoSource> {
        if !self.supports_version(version) {
            return None;
        }
        let source = match (self, version) {
            (Self::Rocky, _) => RepoSource::Base(format!(
                "https://download.rockylinux.org/pub/rocky/{version}/{repo}/{arch}/os/"
            )),
            (Self::AlmaLinux, _) => RepoSource::Base(format!(
                "https://repo.almalinux.org/almalinux/{version}/{repo}/{arch}/os/"
            )),
            (Self::CentOs, "8") => RepoSource::Base(format!(
                "https://vault.centos.org/centos/8-stream/{repo}/{arch}/os/"
            )),
            (Self::CentOs, _) => RepoSource::Base(format!(
                "https://mirror.stream.centos.org/9-stream/{repo}/{arch}/os/"
            )),
            (Self::Fedora, _) => RepoSource::Base(format!(
                "https://dl.fedoraproject.org/pub/fedora/linux/releases/{version}/Everything/{arch}/os/"
            )),
            (Self::AmazonLinux, "2") => RepoSource::MirrorList(format!(
                "https://cdn.amazonlinux.com/2/core/latest/{arch}/mirror.list"
            )),
            (Self::AmazonLinux, _) => RepoSource::MirrorList(format!(
                "https://cdn.amazonlinux.com/al2023/core/mirrors/latest/{arch}/mirror.list"
            )),
        };
        Some(source)
    }
}

impl fmt::Display for RpmDistro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a `distro` qualifier into name and version.
///
/// Accepts `rocky-9`, `fedora-40`, `centos-stream-9`, `amzn-2023` and
/// `rocky-el9`. A value without a separator has no version.
pub fn parse_distro_qualifier(distro: &str) -> (String, Option<String>) {
    let distro = distro.trim().to_ascii_lowercase();

    if let Some(version) = distro.strip_prefix("centos-stream-") {
        return ("centos".to_string(), Some(version.to_string()));
    }
    if let Some((name, version)) = distro.split_once("-el") {
        if !version.contains("-el") {
            return (name.to_string(), Some(version.to_string()));
        }
    }
    match distro.rsplit_once('-') {
        Some((name, version)) => (name.to_string(), Some(version.to_string())),
        None => (distro, None),
    }
}

/// The architecture repository to search for `arch`.
pub fn repository_arch(arch: Option<&str>) -> &str {
    match arch {
        None | Some("") | Some("noarch") => DEFAULT_ARCH,
        Some(arch) => arch,
    }
}
