//! Pre-computed license databases for Linux distributions.
//!
//! One gzipped JSON database per distro release is published as a release
//! asset. Databases are downloaded on first use, kept on disk under the
//! cache directory, and held in memory for the life of the provider.
//!
//! Lookup order inside a database: the exact identifier, then the same
//! package under any architecture, then the package name alone.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use pkgmeta_core::{MetadataRecord, PackageIdentifier, RecordBuilder};
use pkgmeta_repo_index::{Fetch, FetchError, get_json, maybe_gunzip};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::provider::{Lookup, LookupCache, Miss, Provider, ProviderError, SharedFetch};

const NAME: &str = "license-db";
const RELEASES_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Distro releases with a published database, oldest first.
const SUPPORTED_DISTROS: &[(&str, &[&str])] = &[
    ("alpine", &["3.13", "3.14", "3.15", "3.16", "3.17", "3.18", "3.19", "3.20", "3.21"]),
    ("wolfi", &["rolling"]),
    ("amazonlinux", &["2", "2023"]),
    ("centos", &["stream8", "stream9"]),
    ("debian", &["11", "12", "13"]),
    ("ubuntu", &["20.04", "22.04", "24.04"]),
    ("rocky", &["8", "9"]),
    ("almalinux", &["8", "9"]),
    ("fedora", &["39", "40", "41", "42"]),
];

fn supported(distro: &str) -> Option<(&'static str, &'static [&'static str])> {
    SUPPORTED_DISTROS
        .iter()
        .find(|(name, _)| *name == distro)
        .copied()
}

/// Map a release version onto a published one: exact match, then ever
/// shorter dotted prefixes (`24.04.1` to `24.04`, `9.4` to `9`).
fn normalize_version(distro: &str, version: &str) -> Option<&'static str> {
    let (_, versions) = supported(distro)?;
    let mut candidate = version;
    loop {
        if let Some(found) = versions.iter().copied().find(|v| *v == candidate) {
            return Some(found);
        }
        candidate = &candidate[..candidate.rfind('.')?];
    }
}

/// Spell a release the way database assets name it. CentOS Stream is
/// published as `stream8`, which qualifiers write as `stream-8` or `8`.
fn canonical_release(distro: &str, version: &str) -> String {
    if distro == "centos" {
        let number = version
            .strip_prefix("stream")
            .map_or(version, |rest| rest.trim_start_matches('-'));
        return format!("stream{number}");
    }
    version.to_string()
}

/// Split `name-version` where `name` is a run of ASCII lowercase letters.
fn split_distro(qualifier: &str) -> Option<(&str, &str)> {
    let end = qualifier.find(|c: char| !c.is_ascii_lowercase())?;
    let (name, rest) = qualifier.split_at(end);
    let version = rest.strip_prefix('-')?;
    (!name.is_empty() && !version.is_empty()).then_some((name, version))
}

/// Whether `value` starts with `digits.digits`.
fn starts_with_release(value: &str) -> bool {
    let Some((major, rest)) = value.split_once('.') else {
        return false;
    };
    !major.is_empty()
        && major.bytes().all(|b| b.is_ascii_digit())
        && rest.bytes().next().is_some_and(|b| b.is_ascii_digit())
}

/// Database to consult for `id`: the `distro` qualifier when it names a
/// published release, else the namespace's newest release.
fn database_for(id: &PackageIdentifier) -> Option<(&'static str, &'static str)> {
    let namespace = id.namespace_lower().unwrap_or_default();

    if let Some(raw) = id.qualifier("distro").filter(|q| !q.is_empty()) {
        let lower = raw.to_lowercase();
        let parsed = match split_distro(&lower) {
            Some((distro, version)) => Some((distro.to_string(), version.to_string())),
            None if matches!(namespace.as_str(), "alpine" | "wolfi")
                && starts_with_release(raw) =>
            {
                Some((namespace.clone(), raw.to_string()))
            }
            None => None,
        };
        if let Some((distro, version)) = parsed {
            let version = canonical_release(&distro, &version);
            if let (Some((name, _)), Some(normalized)) =
                (supported(&distro), normalize_version(&distro, &version))
            {
                return Some((name, normalized));
            }
        }
    }

    let (name, versions) = supported(&namespace)?;
    versions.last().map(|version| (name, *version))
}

/// One package in a license database.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PackageEntry {
    name: Option<String>,
    spdx: Option<String>,
    description: Option<String>,
    supplier: Option<String>,
    homepage: Option<String>,
    download_url: Option<String>,
    maintainer_name: Option<String>,
    maintainer_email: Option<String>,
}

impl PackageEntry {
    fn to_record(&self) -> Option<MetadataRecord> {
        let spdx = self.spdx.as_deref().filter(|s| !s.trim().is_empty())?;
        Some(
            RecordBuilder::new(NAME)
                .licenses(&[spdx])
                .description(self.description.as_deref())
                .supplier(self.supplier.as_deref())
                .homepage(self.homepage.as_deref())
                .download_url(self.download_url.as_deref())
                .maintainer_name(self.maintainer_name.as_deref())
                .maintainer_email(self.maintainer_email.as_deref())
                .build(),
        )
    }
}

#[derive(Deserialize)]
struct RawDatabase {
    #[serde(default)]
    packages: BTreeMap<String, PackageEntry>,
}

type Coordinates = (String, String, String, String);

fn coordinates(id: &PackageIdentifier) -> Coordinates {
    (
        id.ty().to_string(),
        id.namespace().unwrap_or_default().to_string(),
        id.name().to_string(),
        id.version().unwrap_or_default().to_string(),
    )
}

fn qualifiers_without_arch(id: &PackageIdentifier) -> BTreeMap<String, String> {
    id.qualifiers()
        .iter()
        .filter(|(k, _)| k != "arch")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// A loaded database with indices for architecture-agnostic and
/// name-only lookups.
struct LicenseDatabase {
    packages: BTreeMap<String, PackageEntry>,
    by_coordinates: HashMap<Coordinates, Vec<(BTreeMap<String, String>, String)>>,
    /// Package name to key. An entry's own `name` wins over the name
    /// parsed from a key; otherwise the first key in order wins.
    by_name: HashMap<String, String>,
}

impl LicenseDatabase {
    fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawDatabase = serde_json::from_slice(bytes)?;
        let mut by_coordinates: HashMap<Coordinates, Vec<_>> = HashMap::new();
        let mut by_name: HashMap<String, String> = HashMap::new();
        let mut by_key_name: HashMap<String, String> = HashMap::new();
        for (key, entry) in &raw.packages {
            if let Some(name) = entry.name.as_deref().filter(|n| !n.is_empty()) {
                by_name.entry(name.to_string()).or_insert_with(|| key.clone());
            }
            // Keys that are not identifiers still serve exact and name lookups.
            let Ok(id) = PackageIdentifier::parse(key) else {
                continue;
            };
            by_key_name
                .entry(id.name().to_string())
                .or_insert_with(|| key.clone());
            by_coordinates
                .entry(coordinates(&id))
                .or_default()
                .push((qualifiers_without_arch(&id), key.clone()));
        }
        for (name, key) in by_key_name {
            by_name.entry(name).or_insert(key);
        }
        Ok(Self {
            packages: raw.packages,
            by_coordinates,
            by_name,
        })
    }

    fn len(&self) -> usize {
        self.packages.len()
    }

    fn find(&self, id: &PackageIdentifier) -> Option<&PackageEntry> {
        self.packages
            .get(&id.to_string())
            .or_else(|| self.find_any_arch(id))
            .or_else(|| self.find_by_name(id.name()))
    }

    /// Same package and qualifiers under another architecture. Only applies
    /// when `id` names an architecture.
    fn find_any_arch(&self, id: &PackageIdentifier) -> Option<&PackageEntry> {
        id.qualifier("arch")?;
        let wanted = qualifiers_without_arch(id);
        self.by_coordinates
            .get(&coordinates(id))?
            .iter()
            .find(|(qualifiers, _)| *qualifiers == wanted)
            .and_then(|(_, key)| self.packages.get(key))
    }

    fn find_by_name(&self, name: &str) -> Option<&PackageEntry> {
        self.by_name.get(name).and_then(|key| self.packages.get(key))
    }
}

#[derive(Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Deserialize)]
struct ReleaseAsset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    browser_download_url: String,
}

/// Asset name to download URL across `releases`, newest first wins.
fn collect_assets(releases: &[Release]) -> HashMap<String, String> {
    let mut assets = HashMap::new();
    for release in releases {
        debug!(
            tag = release.tag_name.as_deref().unwrap_or("unknown"),
            count = release.assets.len(),
            "scanning release"
        );
        for asset in &release.assets {
            if asset.name.ends_with(".json.gz") && !asset.browser_download_url.is_empty() {
                assets
                    .entry(asset.name.clone())
                    .or_insert_with(|| asset.browser_download_url.clone());
            }
        }
    }
    assets
}

fn read_cached(path: &Path) -> Result<LicenseDatabase, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let json = maybe_gunzip(bytes).map_err(|e| e.to_string())?;
    LicenseDatabase::parse(&json).map_err(|e| e.to_string())
}

fn write_cached(path: &Path, json: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut encoder = GzEncoder::new(fs::File::create(path)?, Compression::default());
    encoder.write_all(json)?;
    encoder.finish()?;
    Ok(())
}

type ReleaseKey = (String, String);

/// License databases keyed by distro release.
pub struct LicenseDb {
    fetch: SharedFetch,
    cache_dir: PathBuf,
    releases_url: String,
    releases_to_check: u32,
    databases: RwLock<HashMap<ReleaseKey, Option<Arc<LicenseDatabase>>>>,
    /// One lock per release being loaded, so a slow download only holds
    /// back lookups for the same release.
    loading: Mutex<HashMap<ReleaseKey, Arc<Mutex<()>>>>,
    assets: RwLock<Option<Arc<HashMap<String, String>>>>,
    assets_lock: Mutex<()>,
    cache: LookupCache<String>,
}

impl LicenseDb {
    pub fn new(
        fetch: SharedFetch,
        cache_dir: PathBuf,
        releases_url: &str,
        releases_to_check: u32,
    ) -> Self {
        Self {
            fetch,
            cache_dir,
            releases_url: releases_url.to_string(),
            releases_to_check,
            databases: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
            assets: RwLock::new(None),
            assets_lock: Mutex::new(()),
            cache: LookupCache::new(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_file(&self, distro: &str, version: &str) -> PathBuf {
        self.cache_dir.join(format!("{distro}-{version}.json.gz"))
    }

    fn cached_database(&self, key: &ReleaseKey) -> Option<Option<Arc<LicenseDatabase>>> {
        let databases = self.databases.read().unwrap_or_else(|e| e.into_inner());
        databases.get(key).cloned()
    }

    fn release_lock(&self, key: &ReleaseKey) -> Arc<Mutex<()>> {
        let mut loading = self.loading.lock().unwrap_or_else(|e| e.into_inner());
        loading.entry(key.clone()).or_default().clone()
    }

    /// The database for one release, from memory, disk, or a download.
    /// Failures are remembered too.
    fn database(&self, distro: &str, version: &str) -> Option<Arc<LicenseDatabase>> {
        let key = (distro.to_string(), version.to_string());
        if let Some(db) = self.cached_database(&key) {
            return db;
        }

        // Concurrent lookups of one release share a download.
        let lock = self.release_lock(&key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(db) = self.cached_database(&key) {
            return db;
        }

        let db = self.load(distro, version).map(Arc::new);
        self.databases
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, db.clone());
        db
    }

    fn load(&self, distro: &str, version: &str) -> Option<LicenseDatabase> {
        let path = self.cache_file(distro, version);
        if path.exists() {
            match read_cached(&path) {
                Ok(db) => {
                    debug!(
                        path = %path.display(),
                        packages = db.len(),
                        "loaded license database from cache"
                    );
                    return Some(db);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "discarding unreadable license database"
                    );
                    let _ = fs::remove_file(&path);
                }
            }
        }

        let filename = format!("{distro}-{version}.json.gz");
        let assets = self.release_assets();
        let Some(url) = assets.get(&filename) else {
            debug!(%filename, "license database not published in recent releases");
            return None;
        };

        info!(%filename, "downloading license database");
        let json = match self.fetch.get(url, DOWNLOAD_TIMEOUT).and_then(maybe_gunzip) {
            Ok(json) => json,
            Err(e) => {
                warn!(%filename, error = %e, "license database download failed");
                return None;
            }
        };
        let db = match LicenseDatabase::parse(&json) {
            Ok(db) => db,
            Err(e) => {
                warn!(%filename, error = %e, "license database is malformed");
                return None;
            }
        };

        match write_cached(&path, &json) {
            Ok(()) => info!(path = %path.display(), "cached license database"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to cache license database")
            }
        }
        Some(db)
    }

    /// Database assets across recent releases, fetched once. A failed
    /// listing is remembered as empty.
    fn release_assets(&self) -> Arc<HashMap<String, String>> {
        if let Some(assets) = self.cached_assets() {
            return assets;
        }
        let _guard = self.assets_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(assets) = self.cached_assets() {
            return assets;
        }

        let url = format!("{}?per_page={}", self.releases_url, self.releases_to_check);
        let assets = match get_json::<Vec<Release>, _>(&self.fetch, &url, RELEASES_TIMEOUT) {
            Ok(releases) => collect_assets(&releases),
            Err(FetchError::NotFound(_)) => {
                debug!(url = %url, "no releases published");
                HashMap::new()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to list license database releases");
                HashMap::new()
            }
        };
        debug!(count = assets.len(), "license database assets");

        let assets = Arc::new(assets);
        *self.assets.write().unwrap_or_else(|e| e.into_inner()) = Some(assets.clone());
        assets
    }

    fn cached_assets(&self) -> Option<Arc<HashMap<String, String>>> {
        self.assets.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Provider for LicenseDb {
    fn name(&self) -> &'static str {
        NAME
    }

    fn priority(&self) -> u8 {
        1
    }

    fn supports(&self, id: &PackageIdentifier) -> bool {
        let namespace = id.namespace_lower().unwrap_or_default();
        match id.ty() {
            "apk" => matches!(namespace.as_str(), "alpine" | "wolfi"),
            "deb" => matches!(namespace.as_str(), "debian" | "ubuntu"),
            "rpm" => matches!(
                namespace.as_str(),
                "rocky" | "almalinux" | "amazonlinux" | "centos" | "fedora"
            ),
            _ => false,
        }
    }

    fn resolve(&self, id: &PackageIdentifier) -> Result<Lookup, ProviderError> {
        let purl = id.to_string();
        self.cache.get_or_resolve(purl.clone(), || {
            let Some((distro, version)) = database_for(id) else {
                return Ok(Lookup::Absent(Miss::NotFound));
            };
            let Some(db) = self.database(distro, version) else {
                return Ok(Lookup::Absent(Miss::NotFound));
            };
            match db.find(id) {
                Some(entry) => Ok(Lookup::from(entry.to_record())),
                None => {
                    debug!(package = %purl, distro, version, "package not in license database");
                    Ok(Lookup::Absent(Miss::NotFound))
                }
            }
        })
    }

    fn clear_cache(&self) {
        self.cache.clear();
        self.databases.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.loading.lock().unwrap_or_else(|e| e.into_inner()).clear();
        *self.assets.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
