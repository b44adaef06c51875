//! Key-value stores backing the cache layer

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::errors::{CacheResult, CacheStoreError};

/// A stored value with its remaining lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedValue {
    pub value: Bytes,
    pub ttl: Duration,
}

/// Expiring key-value store
///
/// Entries may vanish at any time (eviction, restart); a missing key is
/// indistinguishable from one that was never written.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> CacheResult<()>;

    /// Remaining lifetime of a live entry
    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>>;

    /// Value and remaining lifetime together
    ///
    /// The default reads them separately; stores that can answer atomically
    /// should override it.
    async fn entry(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        let Some(value) = self.get(key).await? else {
            return Ok(None);
        };
        let ttl = self.ttl(key).await?.unwrap_or_default();
        Ok(Some(CachedValue { value, ttl }))
    }
}

#[derive(Debug)]
struct StoredEntry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process store: least-recently-used eviction, expiry checked on read
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, StoredEntry>>,
}

impl MemoryCacheStore {
    pub fn new(capacity: usize) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| CacheStoreError::Unavailable {
            message: "memory cache capacity must be non-zero".to_string(),
        })?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn live(entries: &mut LruCache<String, StoredEntry>, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(CachedValue {
                value: entry.value.clone(),
                ttl: entry.expires_at.saturating_duration_since(now),
            }),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(Self::live(&mut *self.entries.lock().await, key).is_some())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        Ok(Self::live(&mut *self.entries.lock().await, key).map(|cached| cached.value))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        if ttl.is_zero() {
            entries.pop(key);
            return Ok(());
        }
        entries.put(
            key.to_string(),
            StoredEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ttl(&self, key: &str) -> CacheResult<Option<Duration>> {
        Ok(Self::live(&mut *self.entries.lock().await, key).map(|cached| cached.ttl))
    }

    async fn entry(&self, key: &str) -> CacheResult<Option<CachedValue>> {
        Ok(Self::live(&mut *self.entries.lock().await, key))
    }
}
