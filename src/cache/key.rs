//! Cache key construction
//!
//! A key is the endpoint name followed by its normalized arguments, joined
//! with `:`. Arguments are normalized here so that equivalent requests
//! (`GitHub.com` and `github.com`) share an entry, and percent-encoded so
//! that no argument can contain the separator.

use std::fmt;

use crate::utils::UrlUtils;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: &str) -> Self {
        Self(endpoint.to_string())
    }

    /// Append one argument, percent-encoded
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(&urlencoding::encode(&value.to_string()));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `icon:{url}:{size}`
    pub fn icon(url: &str, size: u32) -> Self {
        Self::new("icon")
            .arg(UrlUtils::normalize_target(url))
            .arg(size)
    }

    /// `icons:{url}`
    pub fn icons(url: &str) -> Self {
        Self::new("icons").arg(UrlUtils::normalize_target(url))
    }

    /// `image:{url}:{size}`
    pub fn image(url: &str, size: u32) -> Self {
        Self::new("image")
            .arg(UrlUtils::normalize_target(url))
            .arg(size)
    }

    /// `favicon:{domain}`
    pub fn favicon(domain: &str) -> Self {
        Self::new("favicon").arg(domain.trim().to_lowercase())
    }

    /// `facebook-icon:{user}:{size}`
    pub fn facebook_icon(user: &str, size: u32) -> Self {
        Self::new("facebook-icon").arg(user.trim()).arg(size)
    }

    /// `twitter-icon:{user}:{size}`
    pub fn twitter_icon(user: &str, size: u32) -> Self {
        Self::new("twitter-icon").arg(user.trim()).arg(size)
    }

    /// `google-search-suggestions:{query}:{lang}`
    pub fn search_suggestions(query: &str, lang: &str) -> Self {
        Self::new("google-search-suggestions")
            .arg(query.trim())
            .arg(lang.trim().to_lowercase())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
