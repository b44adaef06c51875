//! Utility helpers shared across the icon pipeline
//!
//! - `utils::url` for target parsing, site labels and cache-key normalization
//! - `utils::jitter` for randomized cache expiry

pub mod jitter;
pub mod url;

pub use url::UrlUtils;
