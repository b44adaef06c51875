//! Icon service
//!
//! Owns the long-lived pieces (HTTP client, blacklist, cache, letter store)
//! and exposes one method per endpoint. Every method goes through the cache
//! layer and always yields a value.

use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheKey, CacheLayer, CacheLookup, CacheStore, MemoryCacheStore, TtlPolicy};
use crate::config::Config;
use crate::discovery::{IconDiscovery, IconListings};
use crate::errors::{AppError, AppResult, IconError};
use crate::fetcher::{Blacklist, BoundedFetcher, FetchLimits, FetchResult, build_http_client};
use crate::imaging;
use crate::resolver::{CandidateResolver, LetterIconStore, letter_for_name};
use crate::utils::UrlUtils;

pub mod suggestions;

pub use suggestions::parse_suggestions;

/// Edge length of favicons served when the upstream lookup fails
pub const FAVICON_FALLBACK_SIZE: u32 = 16;

const EMPTY_LISTING: &[u8] = br#"{"icons":[]}"#;
const EMPTY_SUGGESTIONS: &[u8] = b"[]";

#[derive(Debug)]
pub struct IconService {
    config: Config,
    fetcher: BoundedFetcher,
    resolver: CandidateResolver,
    letters: Arc<LetterIconStore>,
    cache: CacheLayer,
}

impl IconService {
    /// Build the service with a pooled HTTP client and an in-memory cache
    pub fn from_config(config: Config) -> AppResult<Self> {
        let client = build_http_client(&config.fetch)?;
        let store = MemoryCacheStore::new(config.cache.capacity)
            .map_err(|e| AppError::configuration(e.to_string()))?;
        Self::with_components(config, client, Arc::new(store))
    }

    /// Build the service around an existing client and cache store
    pub fn with_components(
        config: Config,
        client: Client,
        store: Arc<dyn CacheStore>,
    ) -> AppResult<Self> {
        let fetcher = BoundedFetcher::new(client, Blacklist::new());
        let letters = Arc::new(LetterIconStore::open(&config.letters)?);

        let page_limits = FetchLimits::new(config.fetch.page_max_bytes, config.fetch.timeout);
        let icon_limits = FetchLimits::new(config.fetch.icon_max_bytes, config.fetch.timeout);
        let discovery = IconDiscovery::new(fetcher.clone(), page_limits);
        let resolver =
            CandidateResolver::new(discovery, fetcher.clone(), icon_limits, letters.clone());
        let cache = CacheLayer::new(store, config.cache.fallback_ttl);

        info!(
            "Icon service ready (cache capacity {}, letter icons in {})",
            config.cache.capacity,
            letters.directory().display()
        );

        Ok(Self {
            config,
            fetcher,
            resolver,
            letters,
            cache,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn blacklist(&self) -> &Blacklist {
        self.fetcher.blacklist()
    }

    fn success_policy(&self) -> TtlPolicy {
        TtlPolicy::Jittered {
            min: self.config.cache.success_ttl_min,
            max: self.config.cache.success_ttl_max,
        }
    }

    /// Best icon for a website, falling back to its letter glyph
    pub async fn resolve_icon(&self, url: &str, size: u32) -> CacheLookup {
        self.cache
            .lookup(
                &CacheKey::icon(url, size),
                self.success_policy(),
                || async { Ok::<_, IconError>(self.resolver.resolve(url.trim(), size).await) },
                || self.letters.render_default(size),
            )
            .await
    }

    /// JSON listing of the icons a website declares
    pub async fn list_icons(&self, url: &str) -> CacheLookup {
        let compute = || async {
            let listing = match self.resolver.discovery().discover(url.trim()).await {
                Ok(page) => IconListings::from(page.candidates.as_slice()),
                Err(e) => {
                    warn!("Icon listing for {} failed: {}", url, e);
                    IconListings::default()
                }
            };
            serde_json::to_vec(&listing)
                .map(Bytes::from)
                .map_err(|e| AppError::internal(format!("Failed to serialize listing: {e}")))
        };

        self.cache
            .lookup(
                &CacheKey::icons(url),
                TtlPolicy::Fixed(self.config.cache.listing_ttl),
                compute,
                || async { Bytes::from_static(EMPTY_LISTING) },
            )
            .await
    }

    /// Arbitrary remote image, downscaled to a square PNG
    pub async fn resolve_image(&self, url: &str, size: u32) -> CacheLookup {
        let limits = FetchLimits::new(self.config.fetch.image_max_bytes, self.config.fetch.timeout);
        let target = UrlUtils::normalize_scheme(url);
        let compute = || async {
            let content = self.fetcher.fetch(&target, limits).await?;
            imaging::normalize_blocking(content, size).await
        };

        self.cache
            .lookup(
                &CacheKey::image(url, size),
                self.success_policy(),
                compute,
                || self.letters.render_default(size),
            )
            .await
    }

    /// Site favicon from the upstream favicon service, served unresized
    pub async fn favicon(&self, url: &str) -> CacheLookup {
        let domain = UrlUtils::strip_to_domain(url);
        let upstream = format!(
            "{}?domain={}",
            self.config.upstream.favicon_service_url,
            urlencoding::encode(&domain)
        );
        let limits = FetchLimits::new(
            self.config.fetch.favicon_max_bytes,
            self.config.fetch.timeout,
        );
        let compute = || async {
            match self.fetcher.fetch(&upstream, limits).await? {
                FetchResult::Raster(bytes) => {
                    imaging::verify_png(&bytes)?;
                    Ok(bytes)
                }
                FetchResult::Vector(_) => Err(IconError::FormatMismatch {
                    expected: "image/png".to_string(),
                    actual: "image/svg+xml".to_string(),
                }),
            }
        };

        self.cache
            .lookup(
                &CacheKey::favicon(&domain),
                self.success_policy(),
                compute,
                || self.letters.render_default(FAVICON_FALLBACK_SIZE),
            )
            .await
    }

    /// Facebook profile picture, downscaled to a square PNG
    pub async fn facebook_icon(&self, user: &str, size: u32) -> CacheLookup {
        let upstream = format!(
            "{}/{}/picture?type=large",
            self.config.upstream.facebook_graph_url.trim_end_matches('/'),
            urlencoding::encode(user.trim())
        );
        let limits = FetchLimits::new(
            self.config.fetch.profile_max_bytes,
            self.config.fetch.timeout,
        );
        let compute = || async {
            let content = self.fetcher.fetch(&upstream, limits).await?;
            imaging::normalize_blocking(content, size).await
        };

        self.cache
            .lookup(
                &CacheKey::facebook_icon(user, size),
                self.success_policy(),
                compute,
                || self.letters.render_default(size),
            )
            .await
    }

    /// Letter glyph for a Twitter user name
    ///
    /// Profile pictures are no longer retrievable without API access, so the
    /// endpoint only serves letter icons.
    pub async fn twitter_icon(&self, user: &str, size: u32) -> CacheLookup {
        let letter = letter_for_name(user);
        self.cache
            .lookup(
                &CacheKey::twitter_icon(user, size),
                self.success_policy(),
                || async { Ok::<_, IconError>(self.letters.render(letter, size).await) },
                || self.letters.render_default(size),
            )
            .await
    }

    /// JSON array of search suggestions for a query
    pub async fn search_suggestions(&self, query: &str, lang: &str) -> CacheLookup {
        let upstream = format!(
            "{}?output=toolbar&q={}&hl={}",
            self.config.upstream.suggestions_url,
            urlencoding::encode(query.trim()),
            urlencoding::encode(lang.trim())
        );
        let limits = FetchLimits::new(
            self.config.fetch.page_max_bytes,
            self.config.fetch.suggestions_timeout,
        );
        let compute = || async {
            let suggestions = match self.fetcher.fetch_text(&upstream, limits).await {
                Ok(document) => parse_suggestions(&document.body),
                Err(e) => Err(e),
            }
            .unwrap_or_else(|e| {
                warn!("Search suggestions for {:?} failed: {}", query, e);
                Vec::new()
            });
            serde_json::to_vec(&suggestions)
                .map(Bytes::from)
                .map_err(|e| AppError::internal(format!("Failed to serialize suggestions: {e}")))
        };

        self.cache
            .lookup(
                &CacheKey::search_suggestions(query, lang),
                TtlPolicy::Fixed(self.config.cache.suggestions_ttl),
                compute,
                || async { Bytes::from_static(EMPTY_SUGGESTIONS) },
            )
            .await
    }
}
