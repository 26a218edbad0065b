//! Hands out computation caches by (identity, cycle timestamp) and frees them
//! when the cycle ends.

use super::computation::ComputationCache;
use crate::temporal::Instant;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which view and calculation configuration a cache serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheIdentity {
    pub view: String,
    pub calculation_configuration: String,
}

impl CacheIdentity {
    pub fn new(view: impl Into<String>, calculation_configuration: impl Into<String>) -> Self {
        Self { view: view.into(), calculation_configuration: calculation_configuration.into() }
    }
}

impl fmt::Display for CacheIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.view, self.calculation_configuration)
    }
}

#[derive(Debug, Default)]
pub struct ComputationCacheSource {
    caches: DashMap<(CacheIdentity, Instant), Arc<ComputationCache>>,
}

impl ComputationCacheSource {
    pub fn new() -> Self { Self::default() }

    /// The cache for `identity` at `timestamp`, created on first request.
    pub fn get_cache(&self, identity: &CacheIdentity, timestamp: Instant) -> Arc<ComputationCache> {
        let cache = self
            .caches
            .entry((identity.clone(), timestamp))
            .or_insert_with(|| Arc::new(ComputationCache::new(timestamp)));
        Arc::clone(cache.value())
    }

    /// The cache for `identity` at `timestamp`, only if one was already created.
    pub fn find_cache(&self, identity: &CacheIdentity, timestamp: Instant) -> Option<Arc<ComputationCache>> {
        self.caches.get(&(identity.clone(), timestamp)).map(|c| Arc::clone(c.value()))
    }

    /// Frees every cache of `view` at `timestamp`. Returns how many were released.
    ///
    /// Entries are cleared as well as unregistered, so a worker still holding an
    /// `Arc` does not keep the values alive.
    pub fn release_caches(&self, view: &str, timestamp: Instant) -> usize {
        let keys: Vec<_> = self
            .caches
            .iter()
            .filter(|entry| entry.key().0.view == view && entry.key().1 == timestamp)
            .map(|entry| entry.key().clone())
            .collect();

        let mut released = 0;
        for key in keys {
            if let Some((_, cache)) = self.caches.remove(&key) {
                debug!(identity = %key.0, timestamp = %timestamp, values = cache.len(), "releasing computation cache");
                cache.clear();
                released += 1;
            }
        }
        released
    }

    pub fn len(&self) -> usize { self.caches.len() }
    pub fn is_empty(&self) -> bool { self.caches.is_empty() }
}
