//! Metadata derived from the identifier itself, with no network access.
//!
//! OS packages get the distribution as supplier and a package tracker page
//! as homepage. This guarantees a supplier for every namespaced OS package.

use pkgmeta_core::{PackageIdentifier, RecordBuilder};

use super::OS_PACKAGE_TYPES;
use crate::provider::{Lookup, Miss, Provider, ProviderError};

const NAME: &str = "purl";

/// Distribution namespace to its publishing organization.
fn namespace_supplier(namespace: &str) -> Option<&'static str> {
    Some(match namespace {
        "debian" => "Debian Project",
        "ubuntu" => "Canonical Ltd",
        "redhat" | "rhel" => "Red Hat, Inc.",
        "centos" => "CentOS Project",
        "fedora" => "Fedora Project",
        "amazon" => "Amazon Web Services",
        "oracle" => "Oracle Corporation",
        "rocky" => "Rocky Enterprise Software Foundation",
        "almalinux" => "AlmaLinux OS Foundation",
        "alpine" => "Alpine Linux",
        "arch" => "Arch Linux",
        "gentoo" => "Gentoo Foundation",
        "opensuse" => "openSUSE Project",
        "suse" => "SUSE LLC",
        "wolfi" | "chainguard" => "Chainguard, Inc.",
        _ => return None,
    })
}

/// Package tracker URL template per type and namespace; `{name}` is
/// substituted.
fn tracker_template(ty: &str, namespace: &str) -> Option<&'static str> {
    Some(match (ty, namespace) {
        ("deb", "debian") => "https://tracker.debian.org/pkg/{name}",
        ("deb", "ubuntu") => "https://launchpad.net/ubuntu/+source/{name}",
        ("rpm", "fedora") => "https://packages.fedoraproject.org/pkgs/{name}",
        ("rpm", "centos") => "https://git.centos.org/rpms/{name}",
        ("rpm", "redhat" | "rhel") => "https://access.redhat.com/downloads/content/package-browser",
        ("rpm", "amazon") => "https://docs.aws.amazon.com/linux/",
        ("rpm", "rocky" | "almalinux") => "https://pkgs.org/search/?q={name}",
        ("apk", "alpine") => "https://pkgs.alpinelinux.org/package/edge/main/x86_64/{name}",
        ("apk", "wolfi") => "https://github.com/wolfi-dev/os/tree/main/{name}",
        ("apk", "chainguard") => "https://images.chainguard.dev/directory/image/{name}/overview",
        _ => return None,
    })
}

/// Uppercase the first letter of every alphabetic run.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

pub struct PurlHeuristic;

impl Provider for PurlHeuristic {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        70
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        OS_PACKAGE_TYPES.contains(&id.ty())
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let Some(namespace) = id.namespace() else {
            return Ok(Lookup::Absent(Miss::NotFound));
        };
        let lower = namespace.to_lowercase();

        let supplier = namespace_supplier(&lower)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} Project", title_case(namespace)));
        let homepage = tracker_template(id.ty(), &lower)
            .map(|template| template.replace("{name}", &urlencoding::encode(id.name())));

        Ok(Lookup::from_record(
            RecordBuilder::new(NAME)
                .supplier(Some(&supplier))
                .homepage(homepage.as_deref())
                .build(),
        ))
    }
}
