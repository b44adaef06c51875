//! Cache layer
//!
//! Every endpoint runs through [`CacheLayer::lookup`]: a hit is returned as
//! stored; a miss computes, stores the result under a policy-drawn TTL and
//! returns it; a failed computation stores and returns a fallback value under
//! a short fixed TTL. Callers never see an error.
//!
//! Store failures degrade to a miss (on read) or a skipped write.

use bytes::Bytes;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::jitter::jittered_duration;

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheStore, CachedValue, MemoryCacheStore};

/// How long a successfully computed value is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicy {
    Fixed(Duration),
    /// Uniform draw from `[min, max]` so entries written together do not
    /// expire together
    Jittered { min: Duration, max: Duration },
}

impl TtlPolicy {
    pub fn draw(&self) -> Duration {
        match *self {
            Self::Fixed(ttl) => ttl,
            Self::Jittered { min, max } => jittered_duration(min, max),
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Computed,
    Fallback,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Computed => "computed",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub value: Bytes,
    /// Remaining lifetime for hits, the lifetime just assigned otherwise
    pub ttl: Duration,
    pub status: CacheStatus,
    pub policy: TtlPolicy,
}

impl CacheLookup {
    /// Whether `ttl` should be passed on to clients as-is
    ///
    /// Freshly computed values under a jittered policy are not: clients get
    /// their own randomized max-age instead.
    pub fn ttl_is_client_facing(&self) -> bool {
        self.status != CacheStatus::Computed || self.policy.is_fixed()
    }
}

#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    fallback_ttl: Duration,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("fallback_ttl", &self.fallback_ttl)
            .finish_non_exhaustive()
    }
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>, fallback_ttl: Duration) -> Self {
        Self {
            store,
            fallback_ttl,
        }
    }

    /// Serve `key` from the store, or compute and store it
    pub async fn lookup<C, CF, E, F, FF>(
        &self,
        key: &CacheKey,
        policy: TtlPolicy,
        compute: C,
        fallback: F,
    ) -> CacheLookup
    where
        C: FnOnce() -> CF,
        CF: Future<Output = Result<Bytes, E>>,
        E: Display,
        F: FnOnce() -> FF,
        FF: Future<Output = Bytes>,
    {
        match self.store.entry(key.as_str()).await {
            Ok(Some(cached)) => {
                info!(key = %key, outcome = "hit", ttl_secs = cached.ttl.as_secs(), "Cache lookup");
                return CacheLookup {
                    value: cached.value,
                    ttl: cached.ttl,
                    status: CacheStatus::Hit,
                    policy,
                };
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, treating as miss"),
        }

        let (value, ttl, status) = match compute().await {
            Ok(value) => (value, policy.draw(), CacheStatus::Computed),
            Err(e) => {
                warn!(key = %key, error = %e, "Computation failed, serving fallback");
                (fallback().await, self.fallback_ttl, CacheStatus::Fallback)
            }
        };

        if let Err(e) = self.store.set(key.as_str(), value.clone(), ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }

        info!(key = %key, outcome = status.as_str(), ttl_secs = ttl.as_secs(), "Cache lookup");
        CacheLookup {
            value,
            ttl,
            status,
            policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CacheResult, CacheStoreError, IconError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(86_400);

    fn jittered() -> TtlPolicy {
        TtlPolicy::Jittered {
            min: 3 * DAY,
            max: 5 * DAY,
        }
    }

    fn layer() -> CacheLayer {
        CacheLayer::new(
            Arc::new(MemoryCacheStore::new(16).unwrap()),
            Duration::from_secs(7_200),
        )
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn exists(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheStoreError::Unavailable {
                message: "down".to_string(),
            })
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<Bytes>> {
            Err(CacheStoreError::Unavailable {
                message: "down".to_string(),
            })
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> CacheResult<()> {
            Err(CacheStoreError::Unavailable {
                message: "down".to_string(),
            })
        }

        async fn ttl(&self, _key: &str) -> CacheResult<Option<Duration>> {
            Err(CacheStoreError::Unavailable {
                message: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let layer = layer();
        let key = CacheKey::icon("github.com", 64);
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, IconError>(Bytes::from_static(b"png"))
        };
        let first = layer
            .lookup(&key, jittered(), compute, || async { Bytes::new() })
            .await;
        assert_eq!(first.status, CacheStatus::Computed);
        assert!(first.ttl >= 3 * DAY && first.ttl <= 5 * DAY);
        assert!(!first.ttl_is_client_facing());

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, IconError>(Bytes::from_static(b"other"))
        };
        let second = layer
            .lookup(&key, jittered(), compute, || async { Bytes::new() })
            .await;
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.value, first.value);
        assert!(second.ttl <= first.ttl);
        assert!(second.ttl_is_client_facing());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_degrade_to_short_lived_fallback() {
        let layer = layer();
        let key = CacheKey::image("https://a.test/broken.png", 32);

        let mut results = Vec::new();
        for _ in 0..2 {
            results.push(
                layer
                    .lookup(
                        &key,
                        jittered(),
                        || async { Err::<Bytes, _>(IconError::decode("bad magic")) },
                        || async { Bytes::from_static(b"fallback") },
                    )
                    .await,
            );
        }

        assert_eq!(results[0].status, CacheStatus::Fallback);
        assert_eq!(results[1].status, CacheStatus::Hit);
        assert_eq!(results[0].value, results[1].value);
        assert!(results[1].ttl <= Duration::from_secs(7_200));
        assert!(results[1].ttl < 3 * DAY);
    }

    #[tokio::test]
    async fn test_fixed_policy_ttl_is_client_facing() {
        let layer = layer();
        let result = layer
            .lookup(
                &CacheKey::icons("github.com"),
                TtlPolicy::Fixed(Duration::from_secs(300)),
                || async { Ok::<_, IconError>(Bytes::from_static(b"{}")) },
                || async { Bytes::new() },
            )
            .await;
        assert_eq!(result.ttl, Duration::from_secs(300));
        assert!(result.ttl_is_client_facing());
    }

    #[tokio::test]
    async fn test_broken_store_still_serves() {
        let layer = CacheLayer::new(Arc::new(BrokenStore), Duration::from_secs(7_200));
        let key = CacheKey::twitter_icon("jack", 32);

        let ok = layer
            .lookup(
                &key,
                jittered(),
                || async { Ok::<_, IconError>(Bytes::from_static(b"png")) },
                || async { Bytes::new() },
            )
            .await;
        assert_eq!(ok.status, CacheStatus::Computed);
        assert_eq!(ok.value, Bytes::from_static(b"png"));

        let failed = layer
            .lookup(
                &key,
                jittered(),
                || async { Err::<Bytes, _>(IconError::decode("x")) },
                || async { Bytes::from_static(b"fallback") },
            )
            .await;
        assert_eq!(failed.status, CacheStatus::Fallback);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_lookup_is_logged_with_outcome() {
        let layer = layer();
        let key = CacheKey::icons("logged.test");
        layer
            .lookup(
                &key,
                TtlPolicy::Fixed(Duration::from_secs(300)),
                || async { Ok::<_, IconError>(Bytes::from_static(b"{}")) },
                || async { Bytes::new() },
            )
            .await;
        assert!(logs_contain("icons:logged.test"));
        assert!(logs_contain("computed"));
    }
}
