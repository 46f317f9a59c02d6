//! In-memory cache of loaded repository indices, keyed by coordinate.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::IndexError;
use crate::record::RepositoryIndex;

/// Loaded indices by repository coordinate.
///
/// A coordinate is either absent or fully loaded. A failed load stores an
/// empty index, so the download is not retried for the rest of the process.
pub struct IndexCache<K> {
    indices: RwLock<HashMap<K, Arc<RepositoryIndex>>>,
}

impl<K> Default for IndexCache<K> {
    fn default() -> Self {
        Self {
            indices: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone + Debug> IndexCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index for `key`, running `load` on first use.
    pub fn get_or_load<F>(&self, key: &K, load: F) -> Arc<RepositoryIndex>
    where
        F: FnOnce() -> Result<RepositoryIndex, IndexError>,
    {
        if let Some(index) = self.get(key) {
            debug!(coordinate = ?key, "index cache hit");
            return index;
        }

        let index = match load() {
            Ok(index) => index,
            Err(e) => {
                warn!(coordinate = ?key, error = %e, "failed to load repository index");
                RepositoryIndex::new()
            }
        };

        let mut indices = match self.indices.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A concurrent load of the same coordinate may have finished first.
        Arc::clone(indices.entry(key.clone()).or_insert_with(|| Arc::new(index)))
    }

    pub fn get(&self, key: &K) -> Option<Arc<RepositoryIndex>> {
        let indices = match self.indices.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        indices.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.indices.read().map_or(0, |indices| indices.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.indices.write() {
            Ok(mut indices) => indices.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
