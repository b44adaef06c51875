use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::parse_default;

/// Environment variable prefix for configuration overrides
///
/// Nested keys are separated by a double underscore, e.g.
/// `ICON_PROXY_CACHE__CAPACITY=1000`.
pub const ENV_PREFIX: &str = "ICON_PROXY_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Verbose logging and in-process defaults suitable for development
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub letters: LetterIconConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub responses: ResponseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest edge length a client may request
    #[serde(default = "default_max_icon_size")]
    pub max_icon_size: u32,
}

/// Bounds applied to every outbound request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Total per-request timeout (connect + headers + body)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
    #[serde(default = "default_page_max_bytes")]
    pub page_max_bytes: usize,
    #[serde(default = "default_icon_max_bytes")]
    pub icon_max_bytes: usize,
    #[serde(default = "default_image_max_bytes")]
    pub image_max_bytes: usize,
    #[serde(default = "default_favicon_max_bytes")]
    pub favicon_max_bytes: usize,
    #[serde(default = "default_profile_max_bytes")]
    pub profile_max_bytes: usize,
    #[serde(default = "default_suggestions_timeout", with = "duration_serde")]
    pub suggestions_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries before least-recently-used eviction
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Lower bound of the randomized TTL window for successful results
    #[serde(default = "default_success_ttl_min", with = "duration_serde")]
    pub success_ttl_min: Duration,
    /// Upper bound of the randomized TTL window for successful results
    #[serde(default = "default_success_ttl_max", with = "duration_serde")]
    pub success_ttl_max: Duration,
    /// TTL for fallback values stored after a failed computation
    #[serde(default = "default_fallback_ttl", with = "duration_serde")]
    pub fallback_ttl: Duration,
    #[serde(default = "default_listing_ttl", with = "duration_serde")]
    pub listing_ttl: Duration,
    #[serde(default = "default_suggestions_ttl", with = "duration_serde")]
    pub suggestions_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterIconConfig {
    /// Directory holding `{letter}.png` and `{unicode-name}.png` glyphs
    #[serde(default = "default_letter_icon_dir")]
    pub directory: PathBuf,
    #[serde(default = "default_letter_memo_capacity")]
    pub memo_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_favicon_service_url")]
    pub favicon_service_url: String,
    #[serde(default = "default_facebook_graph_url")]
    pub facebook_graph_url: String,
    #[serde(default = "default_suggestions_url")]
    pub suggestions_url: String,
}

/// Client-facing Cache-Control values for freshly computed responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_image_max_age_min_days")]
    pub image_max_age_min_days: u64,
    #[serde(default = "default_image_max_age_max_days")]
    pub image_max_age_max_days: u64,
    #[serde(default = "default_json_max_age", with = "duration_serde")]
    pub json_max_age: Duration,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_icon_size() -> u32 {
    DEFAULT_MAX_ICON_SIZE
}

// Fetch defaults
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fetch_timeout() -> Duration {
    parse_default(DEFAULT_FETCH_TIMEOUT)
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT)
}

fn default_pool_max_idle_per_host() -> usize {
    DEFAULT_POOL_MAX_IDLE_PER_HOST
}

fn default_page_max_bytes() -> usize {
    DEFAULT_PAGE_MAX_BYTES
}

fn default_icon_max_bytes() -> usize {
    DEFAULT_ICON_MAX_BYTES
}

fn default_image_max_bytes() -> usize {
    DEFAULT_IMAGE_MAX_BYTES
}

fn default_favicon_max_bytes() -> usize {
    DEFAULT_FAVICON_MAX_BYTES
}

fn default_profile_max_bytes() -> usize {
    DEFAULT_PROFILE_MAX_BYTES
}

fn default_suggestions_timeout() -> Duration {
    parse_default(DEFAULT_SUGGESTIONS_TIMEOUT)
}

// Cache defaults
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_success_ttl_min() -> Duration {
    parse_default(DEFAULT_SUCCESS_TTL_MIN)
}

fn default_success_ttl_max() -> Duration {
    parse_default(DEFAULT_SUCCESS_TTL_MAX)
}

fn default_fallback_ttl() -> Duration {
    parse_default(DEFAULT_FALLBACK_TTL)
}

fn default_listing_ttl() -> Duration {
    parse_default(DEFAULT_LISTING_TTL)
}

fn default_suggestions_ttl() -> Duration {
    parse_default(DEFAULT_SUGGESTIONS_TTL)
}

// Letter icon defaults
fn default_letter_icon_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LETTER_ICON_DIR)
}

fn default_letter_memo_capacity() -> usize {
    DEFAULT_LETTER_MEMO_CAPACITY
}

// Upstream defaults
fn default_favicon_service_url() -> String {
    DEFAULT_FAVICON_SERVICE_URL.to_string()
}

fn default_facebook_graph_url() -> String {
    DEFAULT_FACEBOOK_GRAPH_URL.to_string()
}

fn default_suggestions_url() -> String {
    DEFAULT_SUGGESTIONS_URL.to_string()
}

// Response defaults
fn default_image_max_age_min_days() -> u64 {
    DEFAULT_IMAGE_MAX_AGE_MIN_DAYS
}

fn default_image_max_age_max_days() -> u64 {
    DEFAULT_IMAGE_MAX_AGE_MAX_DAYS
}

fn default_json_max_age() -> Duration {
    parse_default(DEFAULT_JSON_MAX_AGE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            web: WebConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            letters: LetterIconConfig::default(),
            upstream: UpstreamConfig::default(),
            responses: ResponseConfig::default(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_icon_size: default_max_icon_size(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            page_max_bytes: default_page_max_bytes(),
            icon_max_bytes: default_icon_max_bytes(),
            image_max_bytes: default_image_max_bytes(),
            favicon_max_bytes: default_favicon_max_bytes(),
            profile_max_bytes: default_profile_max_bytes(),
            suggestions_timeout: default_suggestions_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            success_ttl_min: default_success_ttl_min(),
            success_ttl_max: default_success_ttl_max(),
            fallback_ttl: default_fallback_ttl(),
            listing_ttl: default_listing_ttl(),
            suggestions_ttl: default_suggestions_ttl(),
        }
    }
}

impl Default for LetterIconConfig {
    fn default() -> Self {
        Self {
            directory: default_letter_icon_dir(),
            memo_capacity: default_letter_memo_capacity(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            favicon_service_url: default_favicon_service_url(),
            facebook_graph_url: default_facebook_graph_url(),
            suggestions_url: default_suggestions_url(),
        }
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            image_max_age_min_days: default_image_max_age_min_days(),
            image_max_age_max_days: default_image_max_age_max_days(),
            json_max_age: default_json_max_age(),
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `ICON_PROXY_*` variables
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let path = Path::new(config_file);
        if path.exists() {
            info!("Loading configuration from: {}", config_file);
        } else {
            info!(
                "Config file {} not found, using defaults and environment",
                config_file
            );
        }

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config
            .validate()
            .map_err(|message| anyhow::anyhow!("Invalid configuration: {}", message))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.cache.success_ttl_min > self.cache.success_ttl_max {
            return Err(format!(
                "cache.success_ttl_min ({}) must not exceed cache.success_ttl_max ({})",
                humantime::format_duration(self.cache.success_ttl_min),
                humantime::format_duration(self.cache.success_ttl_max)
            ));
        }
        if self.cache.fallback_ttl.is_zero() {
            return Err("cache.fallback_ttl must be greater than zero".to_string());
        }
        if self.cache.capacity == 0 {
            return Err("cache.capacity must be greater than zero".to_string());
        }
        if self.letters.memo_capacity == 0 {
            return Err("letters.memo_capacity must be greater than zero".to_string());
        }
        let caps = [
            ("fetch.page_max_bytes", self.fetch.page_max_bytes),
            ("fetch.icon_max_bytes", self.fetch.icon_max_bytes),
            ("fetch.image_max_bytes", self.fetch.image_max_bytes),
            ("fetch.favicon_max_bytes", self.fetch.favicon_max_bytes),
            ("fetch.profile_max_bytes", self.fetch.profile_max_bytes),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, value)| *value == 0) {
            return Err(format!("{name} must be greater than zero"));
        }
        if self.web.max_icon_size == 0 {
            return Err("web.max_icon_size must be greater than zero".to_string());
        }
        if self.responses.image_max_age_min_days > self.responses.image_max_age_max_days {
            return Err(
                "responses.image_max_age_min_days must not exceed image_max_age_max_days"
                    .to_string(),
            );
        }
        Ok(())
    }
}
