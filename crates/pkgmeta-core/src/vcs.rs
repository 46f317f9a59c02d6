//! Canonicalization of repository URLs to the `git+https://` convention.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::sanitize::scheme_and_authority;

/// Hosts that only serve git repositories.
pub const KNOWN_GIT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "codeberg.org",
    "sr.ht",
    "git.sr.ht",
    "gitea.com",
    "gitee.com",
    "salsa.debian.org",
    "gitlab.gnome.org",
    "gitlab.freedesktop.org",
    "git.kernel.org",
    "git.savannah.gnu.org",
    "git.savannah.nongnu.org",
];

fn scp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+@([^:/\s]+):/?(.+)$").expect("valid regex")
    })
}

fn host_of(authority: &str) -> String {
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

/// Whether `host` (ignoring case and a `www.` prefix) is a known git host.
pub fn is_known_git_host(host: &str) -> bool {
    KNOWN_GIT_HOSTS.contains(&host_of(host).as_str())
}

/// Normalize a repository URL.
///
/// - `scm:git:` prefixes are stripped and mark the URL as git.
/// - `user@host:path` shorthand becomes `git+https://host/path`.
/// - `ssh://` URLs on known git hosts become `git+ssh://`.
/// - Schemeless `host/path` on a known git host becomes `git+https://host/path`.
/// - `http(s)://` gets a `git+` prefix only when the URL is known to be git.
///
/// Everything else, including plain `https://` on unknown hosts, is returned
/// unchanged since it may not be a repository at all.
pub fn normalize_vcs_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return url.to_string();
    }

    let (url, marked_git) = match strip_prefix_ignore_case(trimmed, "scm:git:") {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let normalized = normalize_inner(url, marked_git);
    if normalized != trimmed {
        trace!(from = %trimmed, to = %normalized, "normalized vcs url");
    }
    normalized
}

fn normalize_inner(url: &str, marked_git: bool) -> String {
    if !url.contains("://") {
        if let Some(caps) = scp_pattern().captures(url) {
            return format!("git+https://{}/{}", &caps[1], &caps[2]);
        }
        if let Some((host, _)) = url.split_once('/') {
            if is_known_git_host(host) {
                return format!("git+https://{url}");
            }
        }
        return url.to_string();
    }

    let Some((scheme, authority)) = scheme_and_authority(url) else {
        return url.to_string();
    };
    let scheme = scheme.to_ascii_lowercase();
    let known = marked_git || is_known_git_host(authority);

    match scheme.as_str() {
        "http" | "https" if known => format!("git+{url}"),
        "ssh" if known => format!("git+{url}"),
        _ => url.to_string(),
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}
