//! Cleaning of untrusted strings and URLs returned by package registries.
//!
//! Values from third-party sources end up in compliance documents, so every
//! string is stripped of control characters and length-capped, and URLs are
//! restricted to web and git schemes. Content escaping is left to whoever
//! renders the output.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

pub const MAX_DESCRIPTION_LENGTH: usize = 4096;
pub const MAX_SUPPLIER_LENGTH: usize = 256;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_LICENSE_LENGTH: usize = 512;
pub const MAX_EMAIL_LENGTH: usize = 254;

/// URL schemes accepted by [`sanitize_url`].
pub const ALLOWED_URL_SCHEMES: &[&str] =
    &["http", "https", "git", "git+ssh", "git+https", "git+http"];

const ELLIPSIS: &str = "...";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
    })
}

fn html_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<[a-z][^>]*>").expect("valid regex"))
}

/// C0 and C1 control characters, except tab and line breaks.
fn is_stripped_control(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => false,
        '\u{00}'..='\u{1f}' | '\u{7f}'..='\u{9f}' => true,
        _ => false,
    }
}

/// Clean a free-text value.
///
/// Control characters are removed. Without `allow_newlines`, all whitespace
/// runs collapse to a single space. Values longer than `max_length`
/// characters are cut at a word boundary and end in `...`. Returns `None`
/// when nothing is left.
pub fn sanitize_string(value: &str, max_length: usize, allow_newlines: bool) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| !is_stripped_control(*c)).collect();
    let cleaned = if allow_newlines {
        cleaned.trim().to_string()
    } else {
        cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
    };

    let length = cleaned.chars().count();
    let result = if length > max_length {
        debug!(from = length, to = max_length, "truncating value");
        truncate_at_word(&cleaned, max_length)
    } else {
        cleaned
    };

    (!result.is_empty()).then_some(result)
}

fn truncate_at_word(value: &str, max_length: usize) -> String {
    if max_length <= ELLIPSIS.len() {
        return value.chars().take(max_length).collect();
    }
    let limit = max_length - ELLIPSIS.len();
    let base: String = value.chars().take(limit).collect();
    let base = match base.rfind(' ') {
        Some(pos) if pos > 0 => &base[..pos],
        _ => base.as_str(),
    };
    format!("{}{ELLIPSIS}", base.trim_end())
}

pub fn sanitize_description(value: &str) -> Option<String> {
    sanitize_string(value, MAX_DESCRIPTION_LENGTH, true)
}

pub fn sanitize_supplier(value: &str) -> Option<String> {
    sanitize_string(value, MAX_SUPPLIER_LENGTH, false)
}

pub fn sanitize_license(value: &str) -> Option<String> {
    sanitize_string(value, MAX_LICENSE_LENGTH, false)
}

/// Split a URL into its scheme and authority, if it has both.
///
/// Deliberately lenient: `git+ssh://git@host:org/repo` has an authority that
/// is not a valid host:port pair but is still a usable VCS location.
pub(crate) fn scheme_and_authority(url: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let valid_scheme = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }
    let rest = rest.strip_prefix("//")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some((scheme, &rest[..end]))
}

/// Validate a URL from an external source.
///
/// Accepts only [`ALLOWED_URL_SCHEMES`], requires a host, rejects anything
/// containing markup and anything longer than [`MAX_URL_LENGTH`]. Accepted
/// URLs are returned trimmed but otherwise unchanged.
pub fn sanitize_url(value: &str) -> Option<String> {
    let url = value.trim();
    if url.is_empty() {
        return None;
    }
    if url.len() > MAX_URL_LENGTH {
        debug!(length = url.len(), "rejecting url: too long");
        return None;
    }
    let Some((scheme, authority)) = scheme_and_authority(url) else {
        debug!(url = %truncated(url), "rejecting url: no scheme or host");
        return None;
    };
    let scheme = scheme.to_ascii_lowercase();
    if !ALLOWED_URL_SCHEMES.contains(&scheme.as_str()) {
        debug!(url = %truncated(url), scheme = %scheme, "rejecting url: disallowed scheme");
        return None;
    }
    if authority.is_empty() {
        debug!(url = %truncated(url), "rejecting url: no host");
        return None;
    }
    if html_pattern().is_match(url) {
        debug!(url = %truncated(url), "rejecting url: contains markup");
        return None;
    }
    Some(url.to_string())
}

/// Validate an email address with a conservative pattern.
pub fn sanitize_email(value: &str) -> Option<String> {
    let email = value.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return None;
    }
    email_pattern().is_match(email).then(|| email.to_string())
}

fn truncated(value: &str) -> String {
    value.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_characters() {
        assert_eq!(
            sanitize_string("hello\u{0}\u{7}world\u{85}", 100, true),
            Some("helloworld".to_string())
        );
    }

    #[test]
    fn test_keeps_newlines_when_allowed() {
        assert_eq!(
            sanitize_string("  line one\nline two  ", 100, true),
            Some("line one\nline two".to_string())
        );
    }

    #[test]
    fn test_collapses_whitespace_without_newlines() {
        assert_eq!(
            sanitize_string("Acme\n  Corp\t Inc", 100, false),
            Some("Acme Corp Inc".to_string())
        );
    }

    #[test]
    fn test_empty_becomes_none() {
        assert_eq!(sanitize_string("   ", 100, true), None);
        assert_eq!(sanitize_string("\u{1}\u{2}", 100, false), None);
    }

    #[test]
    fn test_truncates_at_word_boundary() {
        let out = sanitize_string("the quick brown fox jumps", 15, false).unwrap();
        assert_eq!(out, "the quick...");
        assert!(out.chars().count() <= 15);
    }

    #[test]
    fn test_truncates_without_spaces() {
        let out = sanitize_string("abcdefghijklmnop", 10, false).unwrap();
        assert_eq!(out, "abcdefg...");
    }

    #[test]
    fn test_truncation_is_char_safe() {
        let out = sanitize_string("ééééééééééééé", 8, false).unwrap();
        assert_eq!(out, "ééééé...");
    }

    #[test]
    fn test_url_accepts_web_and_git_schemes() {
        for url in [
            "https://example.com/path",
            "http://example.com",
            "git://git.kernel.org/pub/scm/git/git.git",
            "git+ssh://git@github.com/org/repo.git",
            "git+https://github.com/org/repo",
            "GIT+HTTP://example.com/repo",
        ] {
            assert_eq!(sanitize_url(url).as_deref(), Some(url), "{url}");
        }
    }

    #[test]
    fn test_url_rejects_other_schemes() {
        assert_eq!(sanitize_url("javascript:alert(1)"), None);
        assert_eq!(sanitize_url("ftp://host/x"), None);
        assert_eq!(sanitize_url("file:///etc/passwd"), None);
        assert_eq!(sanitize_url("example.com/no-scheme"), None);
    }

    #[test]
    fn test_url_requires_host() {
        assert_eq!(sanitize_url("https:///path"), None);
        assert_eq!(sanitize_url("https:example.com"), None);
    }

    #[test]
    fn test_url_rejects_markup_and_length() {
        assert_eq!(sanitize_url("https://example.com/<script>alert(1)</script>"), None);
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(sanitize_url(&long), None);
    }

    #[test]
    fn test_url_trims_but_does_not_rewrite() {
        assert_eq!(
            sanitize_url("  https://example.com/a%20b?x=1  ").as_deref(),
            Some("https://example.com/a%20b?x=1")
        );
    }

    #[test]
    fn test_email() {
        assert_eq!(
            sanitize_email(" dev@example.org ").as_deref(),
            Some("dev@example.org")
        );
        assert_eq!(sanitize_email("not an email"), None);
        assert_eq!(sanitize_email("dev@localhost"), None);
        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert_eq!(sanitize_email(&long), None);
    }
}
