use crate::models::RawPreferences;
use crate::services::stores::{ProfileStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// In-process cache of raw preference blobs in front of any profile store
///
/// Only hits are cached; a missing profile is asked for again next time.
/// Entries live for the configured TTL unless invalidated first.
pub struct CachedProfileStore {
    inner: Arc<dyn ProfileStore>,
    cache: moka::future::Cache<String, RawPreferences>,
}

impl CachedProfileStore {
    pub fn new(inner: Arc<dyn ProfileStore>, max_entries: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }

    /// Drop a searcher's cached blob after their preferences change
    pub async fn invalidate(&self, searcher_id: &str) {
        self.cache.invalidate(&CacheKey::preferences(searcher_id)).await;
        tracing::debug!(searcher_id = %searcher_id, "Invalidated cached preferences");
    }
}

#[async_trait]
impl ProfileStore for CachedProfileStore {
    async fn read_preferences(
        &self,
        searcher_id: &str,
    ) -> Result<Option<RawPreferences>, StoreError> {
        let key = CacheKey::preferences(searcher_id);

        if let Some(raw) = self.cache.get(&key).await {
            tracing::trace!("Cache hit: {}", key);
            return Ok(Some(raw));
        }

        let raw = self.inner.read_preferences(searcher_id).await?;
        if let Some(raw) = &raw {
            self.cache.insert(key, raw.clone()).await;
        }

        Ok(raw)
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for searcher preferences
    pub fn preferences(searcher_id: &str) -> String {
        format!("prefs:{}", searcher_id)
    }
}
