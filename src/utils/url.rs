//! URL utilities for consistent target handling
//!
//! Request targets arrive in loose forms (`github.com`, `https://GitHub.com/`,
//! `example.co.uk/about`). These helpers turn them into the shapes the
//! pipeline needs: hosts, site labels, cache-key arguments and log-safe
//! strings.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Second-level labels that act as part of a public suffix under a
/// two-letter country code (`co.uk`, `com.au`, `ne.jp`, ...)
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "ac", "co", "com", "edu", "gob", "go", "gov", "ltd", "mil", "ne", "net", "nic", "or", "org",
    "plc", "sch",
];

static SENSITIVE_QUERY_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([?&](?:username|password|user|pass|pwd|passwd|token|access_token)=)[^&]*")
        .expect("static regex is valid")
});

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Whether the target carries an explicit scheme
    pub fn has_scheme(target: &str) -> bool {
        target.contains("://")
    }

    /// Prefix `http://` when no scheme is present
    ///
    /// ```rust
    /// use icon_proxy::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::normalize_scheme("example.com"), "http://example.com");
    /// assert_eq!(UrlUtils::normalize_scheme("https://example.com"), "https://example.com");
    /// ```
    pub fn normalize_scheme(target: &str) -> String {
        let trimmed = target.trim();
        if Self::has_scheme(trimmed) {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        }
    }

    /// The URL with its query string and fragment removed
    pub fn path_without_query(url: &str) -> &str {
        let end = url.find(['?', '#']).unwrap_or(url.len());
        &url[..end]
    }

    /// Host portion of a target, lowercased, with or without a scheme
    pub fn host_of(target: &str) -> Option<String> {
        Url::parse(&Self::normalize_scheme(target))
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }

    /// Strip scheme and path, leaving `host[:port]` as typed
    ///
    /// ```rust
    /// use icon_proxy::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::strip_to_domain("https://google.com/search?q=1"), "google.com");
    /// assert_eq!(UrlUtils::strip_to_domain("google.com"), "google.com");
    /// ```
    pub fn strip_to_domain(target: &str) -> String {
        let trimmed = target.trim();
        let without_scheme = match trimmed.find("://") {
            Some(pos) => &trimmed[pos + 3..],
            None => trimmed,
        };
        without_scheme
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// The label that names the site: `example` for `www.example.co.uk`
    ///
    /// Takes the second-level label, skipping one more label when the
    /// second-level one is a known public suffix under a country code. A
    /// single-label host is returned as-is.
    pub fn site_label(host: &str) -> Option<String> {
        let labels: Vec<&str> = host
            .trim_end_matches('.')
            .split('.')
            .filter(|label| !label.is_empty())
            .collect();

        let label = match labels.as_slice() {
            [] => return None,
            [only] => *only,
            [.., second, tld]
                if labels.len() >= 3
                    && tld.len() == 2
                    && SECOND_LEVEL_SUFFIXES.contains(&second.to_lowercase().as_str()) =>
            {
                labels[labels.len() - 3]
            }
            [.., second, _] => *second,
        };
        Some(label.to_lowercase())
    }

    /// Canonical form of a target for use inside cache keys
    ///
    /// Absolute URLs are re-serialized by the `url` crate (lowercased scheme
    /// and host, default path `/`). Bare targets keep their path but get a
    /// lowercased host, so `GitHub.com` and `github.com` share one key while
    /// `github.com` and `https://github.com` stay distinct (they resolve
    /// differently).
    pub fn normalize_target(target: &str) -> String {
        let trimmed = target.trim();
        if Self::has_scheme(trimmed) {
            return match Url::parse(trimmed) {
                Ok(url) => url.to_string(),
                Err(_) => trimmed.to_string(),
            };
        }
        match trimmed.split_once('/') {
            Some((host, rest)) => format!("{}/{}", host.to_lowercase(), rest),
            None => trimmed.to_lowercase(),
        }
    }

    /// Mask credentials in a URL before it is logged
    pub fn obfuscate_credentials(url: &str) -> String {
        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url)
            && (!parsed.username().is_empty() || parsed.password().is_some())
        {
            let mut masked = parsed.clone();
            let _ = masked.set_username("****");
            let _ = masked.set_password(Some("****"));
            obfuscated = masked.to_string();
        }

        SENSITIVE_QUERY_PARAMS
            .replace_all(&obfuscated, "${1}****")
            .to_string()
    }
}
