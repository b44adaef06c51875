//! Error type definitions for the icon proxy

use thiserror::Error;

/// Top-level application error type
///
/// Only request validation and startup problems end up here; pipeline
/// failures are turned into fallback images long before the web layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Pipeline errors that escaped to the caller
    #[error("Icon error: {0}")]
    Icon(#[from] IconError),

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while fetching, discovering and normalizing icons
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IconError {
    /// The page to scan for icon declarations could not be retrieved
    #[error("Failed to fetch page {url}: {message}")]
    PageFetch { url: String, message: String },

    /// Candidate fetch failed (connect, timeout or HTTP status)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Declared or read length exceeded the byte cap
    #[error("Resource too large: {url} (limit: {limit} bytes)")]
    TooLarge { url: String, limit: usize },

    /// URL previously found unsafe to retry
    #[error("URL blacklisted: {url}")]
    Blacklisted { url: String },

    /// Raster candidate smaller than the requested edge length
    #[error("Image at {url} is {width}x{height}, smaller than {required}px")]
    Undersized {
        url: String,
        width: u32,
        height: u32,
        required: u32,
    },

    /// Content is not a decodable raster image or well-formed SVG
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Encoded output did not sniff as the expected format
    #[error("Format mismatch: expected {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// Target could not be parsed as a URL
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors raised by a cache store backend
#[derive(Error, Debug)]
pub enum CacheStoreError {
    #[error("Cache backend unavailable: {message}")]
    Unavailable { message: String },
}

impl AppError {
    /// Create a validation error for a request field
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IconError {
    pub fn page_fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::PageFetch {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn too_large<U: Into<String>>(url: U, limit: usize) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit,
        }
    }

    pub fn blacklisted<U: Into<String>>(url: U) -> Self {
        Self::Blacklisted { url: url.into() }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn invalid_url<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_from_icon_error() {
        let err: AppError = IconError::blacklisted("https://a.test/x.png").into();
        assert!(matches!(err, AppError::Icon(IconError::Blacklisted { .. })));
        assert!(err.to_string().contains("https://a.test/x.png"));
    }
}
