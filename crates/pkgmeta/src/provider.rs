//! The contract every metadata source implements.
//!
//! A provider answers one question: what does this source know about a
//! package identifier? Expected failures (not found, rate limits, timeouts,
//! malformed payloads) are answers too, reported as [`Lookup::Absent`] and
//! cached. Only programming errors surface as [`ProviderError`], which the
//! resolver logs and never caches.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use pkgmeta_core::{MetadataRecord, PackageIdentifier};
use pkgmeta_repo_index::{Fetch, FetchError};
use serde::Serialize;
use tracing::{debug, warn};

/// Transport shared by every network provider.
pub type SharedFetch = Arc<dyn Fetch>;

/// Why a provider had nothing to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Miss {
    NotFound,
    RateLimited,
    Timeout,
    Transport,
    Malformed,
}

impl Miss {
    pub fn as_str(self) -> &'static str {
        match self {
            Miss::NotFound => "not found",
            Miss::RateLimited => "rate limited",
            Miss::Timeout => "timeout",
            Miss::Transport => "transport error",
            Miss::Malformed => "malformed response",
        }
    }
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FetchError> for Miss {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::NotFound(_) => Miss::NotFound,
            FetchError::RateLimited(_) => Miss::RateLimited,
            FetchError::Timeout(_) => Miss::Timeout,
            FetchError::Status { .. } | FetchError::Transport(_) | FetchError::Io(_) => {
                Miss::Transport
            }
            FetchError::Malformed(_) => Miss::Malformed,
        }
    }
}

/// Outcome of one provider lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(MetadataRecord),
    Absent(Miss),
}

impl Lookup {
    /// `Found` only when the record carries data.
    pub fn from_record(record: MetadataRecord) -> Self {
        if record.has_data() {
            Lookup::Found(record)
        } else {
            Lookup::Absent(Miss::NotFound)
        }
    }

    pub fn into_record(self) -> Option<MetadataRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::Absent(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

impl From<Option<MetadataRecord>> for Lookup {
    fn from(record: Option<MetadataRecord>) -> Self {
        record.map_or(Lookup::Absent(Miss::NotFound), Lookup::from_record)
    }
}

/// Turn a fetch failure into an absent lookup, logging it at the level its
/// class deserves.
pub fn absorb(provider: &str, key: &str, error: &FetchError) -> Lookup {
    let miss = Miss::from(error);
    match miss {
        Miss::NotFound => debug!(provider, package = %key, "package not found"),
        _ => warn!(provider, package = %key, error = %error, "lookup failed: {miss}"),
    }
    Lookup::Absent(miss)
}

/// Unexpected provider failures. These are not cached.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider}: {message}")]
    Internal {
        provider: &'static str,
        message: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of package metadata.
pub trait Provider: Send + Sync {
    /// Stable name, recorded as the source of every field it contributes.
    fn name(&self) -> &'static str;

    /// Lower runs earlier. Bands: 1-20 native sources, 21-50 aggregators,
    /// 51-80 offline derivation, 81-100 rate-limited fallbacks.
    fn priority(&self) -> u8;

    fn supports(&self, id: &PackageIdentifier) -> bool;

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError>;

    /// Drop every cached lookup.
    fn clear_cache(&self) {}
}

/// Name and priority of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub priority: u8,
}

/// Per-provider memo of lookups, absent ones included.
pub struct LookupCache<K> {
    entries: RwLock<HashMap<K, Lookup>>,
}

impl<K> Default for LookupCache<K> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> LookupCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached lookup for `key`, or the result of `resolve`. Errors pass
    /// through uncached.
    pub fn get_or_resolve<F>(&self, key: K, resolve: F) -> Result<Lookup, ProviderError>
    where
        F: FnOnce() -> Result<Lookup, ProviderError>,
    {
        if let Some(hit) = self.get(&key) {
            debug!(key = ?key, "lookup cache hit");
            return Ok(hit);
        }

        let lookup = resolve()?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries.entry(key).or_insert(lookup).clone())
    }

    pub fn get(&self, key: &K) -> Option<Lookup> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
