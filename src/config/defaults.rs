/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_ICON_SIZE: u32 = 1024;

// Fetch defaults
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_FETCH_TIMEOUT: &str = "15s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;
pub const MEGABYTE: usize = 1024 * 1024;
pub const DEFAULT_PAGE_MAX_BYTES: usize = 2 * MEGABYTE;
pub const DEFAULT_ICON_MAX_BYTES: usize = MEGABYTE;
pub const DEFAULT_IMAGE_MAX_BYTES: usize = MEGABYTE;
pub const DEFAULT_FAVICON_MAX_BYTES: usize = MEGABYTE;
pub const DEFAULT_PROFILE_MAX_BYTES: usize = 5 * MEGABYTE;
pub const DEFAULT_SUGGESTIONS_TIMEOUT: &str = "5s";

// Cache defaults
pub const DEFAULT_CACHE_CAPACITY: usize = 50_000;
pub const DEFAULT_SUCCESS_TTL_MIN: &str = "3days";
pub const DEFAULT_SUCCESS_TTL_MAX: &str = "5days";
pub const DEFAULT_FALLBACK_TTL: &str = "2h";
pub const DEFAULT_LISTING_TTL: &str = "5m";
pub const DEFAULT_SUGGESTIONS_TTL: &str = "1h";

// Letter icon defaults
pub const DEFAULT_LETTER_ICON_DIR: &str = "./letter-icons";
pub const DEFAULT_LETTER_MEMO_CAPACITY: usize = 256;

// Upstream service defaults
pub const DEFAULT_FAVICON_SERVICE_URL: &str = "https://www.google.com/s2/favicons";
pub const DEFAULT_FACEBOOK_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_SUGGESTIONS_URL: &str = "https://suggestqueries.google.com/complete/search";

// Client-facing Cache-Control defaults
pub const DEFAULT_IMAGE_MAX_AGE_MIN_DAYS: u64 = 1;
pub const DEFAULT_IMAGE_MAX_AGE_MAX_DAYS: u64 = 3;
pub const DEFAULT_JSON_MAX_AGE: &str = "1h";
