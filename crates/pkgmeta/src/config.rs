//! Resolver configuration.
//!
//! Loaded from `$XDG_CONFIG_HOME/pkgmeta/config.toml`, then overlaid with
//! environment variables:
//!
//! - `PKGMETA_DISABLE_VCS_ENRICHMENT` (`1`, `true` or `yes`) strips
//!   repository URLs from every provider answer.
//! - `PKGMETA_LICENSE_DB_DIR` overrides the license database cache directory.
//!
//! Example config.toml:
//! ```toml
//! merge_results = true
//! http_timeout_secs = 10
//! disabled_providers = ["repology.org"]
//!
//! [license_db]
//! enabled = true
//! releases_to_check = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DISABLE_VCS_ENV: &str = "PKGMETA_DISABLE_VCS_ENRICHMENT";
pub const LICENSE_DB_DIR_ENV: &str = "PKGMETA_LICENSE_DB_DIR";

/// Release listing of the pre-computed license databases.
pub const DEFAULT_LICENSE_DB_RELEASES_URL: &str =
    "https://api.github.com/repos/sbomify/github-action/releases";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Pre-computed license database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseDbConfig {
    pub enabled: bool,
    /// Where downloaded databases are kept. Defaults to
    /// `$XDG_CACHE_HOME/pkgmeta/license-db`.
    pub cache_dir: Option<PathBuf>,
    pub releases_url: String,
    /// How many recent releases to search for database assets.
    pub releases_to_check: u32,
}

impl Default for LicenseDbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: None,
            releases_url: DEFAULT_LICENSE_DB_RELEASES_URL.to_string(),
            releases_to_check: 5,
        }
    }
}

impl LicenseDbConfig {
    /// Configured cache directory, else the default one.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| cache_base().map(|base| base.join("license-db")))
    }
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Merge answers from every provider, or stop at the first one.
    pub merge_results: bool,
    pub http_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub user_agent: Option<String>,
    pub disable_vcs_enrichment: bool,
    pub license_db: LicenseDbConfig,
    /// Provider names never registered.
    pub disabled_providers: Vec<String>,
    /// Identifiers not started before this many seconds into a batch are
    /// reported unresolved.
    pub batch_deadline_secs: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            merge_results: true,
            http_timeout_secs: 10,
            index_timeout_secs: 120,
            user_agent: None,
            disable_vcs_enrichment: false,
            license_db: LicenseDbConfig::default(),
            disabled_providers: Vec::new(),
            batch_deadline_secs: None,
        }
    }
}

impl ResolverConfig {
    /// Global config file (if present) plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::global_config_path() {
            Some(path) if path.is_file() => Self::load_file(&path)?,
            _ => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Get the global config path.
    pub fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::config_dir)?;
        Some(config_home.join("pkgmeta").join("config.toml"))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay the process environment.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from `lookup`.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(DISABLE_VCS_ENV) {
            self.disable_vcs_enrichment = is_truthy(&value);
        }
        if let Some(dir) = lookup(LICENSE_DB_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.license_db.cache_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        self.batch_deadline_secs.map(Duration::from_secs)
    }

    pub fn is_disabled(&self, provider: &str) -> bool {
        self.disabled_providers.iter().any(|p| p == provider)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Base cache directory: `$XDG_CACHE_HOME/pkgmeta`.
fn cache_base() -> Option<PathBuf> {
    let base = std::env::var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::cache_dir)?;
    Some(base.join("pkgmeta"))
}
