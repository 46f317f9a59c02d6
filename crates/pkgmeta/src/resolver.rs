//! Priority-ordered resolution across providers.
//!
//! Providers that support an identifier run in ascending priority order.
//! Their answers are folded left with [`MetadataRecord::merge`], so a
//! higher-priority provider always wins a contested field. The fold stops as
//! soon as description, licenses and supplier are all known.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use pkgmeta_core::{Field, MetadataRecord, PackageIdentifier};
use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::config::ResolverConfig;
use crate::provider::{Lookup, Provider, ProviderInfo};
use crate::providers;

/// How answers from several providers combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Fold every answer into one record.
    #[default]
    Merge,
    /// Keep the first answer with data.
    FirstWins,
}

/// Ordered set of providers.
#[derive(Default)]
pub struct Resolver {
    providers: Vec<Box<dyn Provider>>,
    merge_mode: MergeMode,
    strip_repository_url: bool,
    batch_deadline: Option<Duration>,
}

impl Resolver {
    /// An empty resolver. Register providers before resolving.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver with the built-in providers, honoring `config`.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut resolver = Self::new()
            .with_merge_mode(if config.merge_results {
                MergeMode::Merge
            } else {
                MergeMode::FirstWins
            })
            .with_repository_urls(!config.disable_vcs_enrichment);
        resolver.batch_deadline = config.batch_deadline();

        for provider in providers::builtin(config) {
            resolver.register(provider);
        }
        resolver
    }

    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    /// With `false`, repository URLs are dropped from every provider answer.
    pub fn with_repository_urls(mut self, enabled: bool) -> Self {
        self.strip_repository_url = !enabled;
        self
    }

    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }

    pub fn register(&mut self, provider: Box<dyn Provider>) {
        debug!(
            provider = provider.name(),
            priority = provider.priority(),
            "registered provider"
        );
        self.providers.push(provider);
    }

    /// Providers supporting `id`, by ascending priority. Ties keep
    /// registration order.
    pub fn providers_for(&self, id: &PackageIdentifier) -> Vec<&dyn Provider> {
        let mut matching: Vec<&dyn Provider> = self
            .providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| p.supports(id))
            .collect();
        matching.sort_by_key(|p| p.priority());
        matching
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self
            .providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name(),
                priority: p.priority(),
            })
            .collect();
        infos.sort_by_key(|info| info.priority);
        infos
    }

    pub fn clear_caches(&self) {
        for provider in &self.providers {
            provider.clear_cache();
        }
        debug!(providers = self.providers.len(), "cleared provider caches");
    }

    /// Resolve with the configured merge mode.
    pub fn resolve(&self, id: &PackageIdentifier) -> Option<MetadataRecord> {
        self.resolve_with(id, self.merge_mode)
    }

    pub fn resolve_with(&self, id: &PackageIdentifier, mode: MergeMode) -> Option<MetadataRecord> {
        let providers = self.providers_for(id);
        if providers.is_empty() {
            debug!(purl = %id, "no provider supports identifier");
            return None;
        }

        let mut merged: Option<MetadataRecord> = None;
        for provider in providers {
            if merged.as_ref().is_some_and(MetadataRecord::is_sufficient) {
                debug!(purl = %id, "sufficient metadata, skipping remaining providers");
                break;
            }

            let Some(record) = self.call(provider, id) else {
                continue;
            };
            merged = Some(match merged {
                None => record,
                Some(current) => current.merge(&record),
            });
            if mode == MergeMode::FirstWins {
                break;
            }
        }
        merged
    }

    /// Parse and resolve. Unparseable identifiers resolve to `None`.
    pub fn resolve_str(&self, purl: &str) -> Option<MetadataRecord> {
        match PackageIdentifier::parse(purl) {
            Ok(id) => self.resolve(&id),
            Err(e) => {
                debug!(purl = %purl, error = %e, "invalid package identifier");
                None
            }
        }
    }

    /// Resolve a batch, keyed by the caller's input strings.
    ///
    /// One bad identifier never affects the others. Once the batch deadline
    /// passes, identifiers not yet started map to `None`.
    pub fn resolve_many<S: AsRef<str>>(
        &self,
        purls: &[S],
    ) -> BTreeMap<String, Option<MetadataRecord>> {
        let started = Instant::now();
        let mut results = BTreeMap::new();
        let mut expired = false;

        for purl in purls {
            let purl = purl.as_ref();
            if !expired && self.past_deadline(started) {
                warn!(remaining = purls.len() - results.len(), "batch deadline exceeded");
                expired = true;
            }
            let record = if expired {
                None
            } else {
                self.resolve_str(purl)
            };
            results.insert(purl.to_string(), record);
        }
        results
    }

    /// [`resolve_many`](Self::resolve_many) across threads. Each identifier
    /// is still folded in priority order, so results match the sequential
    /// version.
    pub fn resolve_many_parallel<S: AsRef<str> + Sync>(
        &self,
        purls: &[S],
    ) -> BTreeMap<String, Option<MetadataRecord>> {
        let started = Instant::now();
        let results: BTreeMap<String, Option<MetadataRecord>> = purls
            .par_iter()
            .map(|purl| {
                let purl = purl.as_ref();
                let record = if self.past_deadline(started) {
                    None
                } else {
                    self.resolve_str(purl)
                };
                (purl.to_string(), record)
            })
            .collect();

        if self.past_deadline(started) {
            warn!(identifiers = purls.len(), "batch deadline exceeded");
        }
        results
    }

    fn past_deadline(&self, started: Instant) -> bool {
        self.batch_deadline
            .is_some_and(|deadline| started.elapsed() >= deadline)
    }

    /// One provider call. Errors and panics are logged and count as no
    /// answer.
    fn call(&self, provider: &dyn Provider, id: &PackageIdentifier) -> Option<MetadataRecord> {
        let outcome = catch_unwind(AssertUnwindSafe(|| provider.resolve(id)));
        let record = match outcome {
            Ok(Ok(Lookup::Found(record))) if record.has_data() => record,
            Ok(Ok(Lookup::Found(_))) => return None,
            Ok(Ok(Lookup::Absent(miss))) => {
                debug!(provider = provider.name(), purl = %id, reason = %miss, "no metadata");
                return None;
            }
            Ok(Err(e)) => {
                error!(provider = provider.name(), purl = %id, error = %e, "provider failed");
                return None;
            }
            Err(panic) => {
                error!(
                    provider = provider.name(),
                    purl = %id,
                    panic = panic_message(panic.as_ref()),
                    "provider panicked"
                );
                return None;
            }
        };

        let record = if self.strip_repository_url {
            record.without(Field::RepositoryUrl)
        } else {
            record
        };
        // Stripping may leave nothing behind.
        record.has_data().then_some(record)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
