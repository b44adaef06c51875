//! Bounded HTTP fetching
//!
//! Every outbound request goes through [`BoundedFetcher`]: a total timeout,
//! a byte cap enforced while streaming the body, and a shared
//! [`Blacklist`] of URLs that blew through their cap earlier. Successful
//! fetches are classified as raster bytes or vector (SVG) text.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, header};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::errors::{IconError, IconResult};
use crate::utils::UrlUtils;

pub mod blacklist;
pub mod client;

pub use blacklist::Blacklist;
pub use client::build_http_client;

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Per-request bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_bytes: usize,
    pub timeout: Duration,
}

impl FetchLimits {
    pub fn new(max_bytes: usize, timeout: Duration) -> Self {
        Self { max_bytes, timeout }
    }
}

/// Classified payload of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Raster(Bytes),
    Vector(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Raster,
    Vector,
}

impl FetchResult {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Raster(_) => ContentKind::Raster,
            Self::Vector(_) => ContentKind::Vector,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Raster(bytes) => bytes.len(),
            Self::Vector(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fetched text document and the URL it was finally served from
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub final_url: Url,
    pub body: String,
}

/// Whether the URL path names an SVG file
pub fn is_vector_url(url: &str) -> bool {
    UrlUtils::path_without_query(url)
        .to_ascii_lowercase()
        .ends_with(".svg")
}

/// Whether a Content-Type header value denotes SVG (parameters ignored)
pub fn is_vector_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case(SVG_MIME_TYPE))
        .unwrap_or(false)
}

/// Whether a text body looks like an SVG document regardless of headers
pub fn looks_like_svg(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("<svg") || trimmed.ends_with("</svg>")
}

enum CappedReadError {
    TooLarge,
    Network(String),
}

/// HTTP fetcher enforcing timeouts, byte caps and the shared blacklist
#[derive(Debug, Clone)]
pub struct BoundedFetcher {
    client: Client,
    blacklist: Blacklist,
}

impl BoundedFetcher {
    pub fn new(client: Client, blacklist: Blacklist) -> Self {
        Self { client, blacklist }
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Fetch an icon or image and classify it as raster or vector
    ///
    /// Exceeding `limits.max_bytes`, by declared length or by bytes actually
    /// read, fails with [`IconError::TooLarge`] and blacklists the URL; any
    /// later call for the same URL fails with [`IconError::Blacklisted`]
    /// without touching the network.
    pub async fn fetch(&self, url: &str, limits: FetchLimits) -> IconResult<FetchResult> {
        if self.blacklist.contains(url).await {
            debug!(
                "Skipping blacklisted URL {}",
                UrlUtils::obfuscate_credentials(url)
            );
            return Err(IconError::blacklisted(url));
        }

        let response = self.send(url, limits.timeout).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = match Self::read_capped(response, limits.max_bytes).await {
            Ok(body) => body,
            Err(CappedReadError::TooLarge) => {
                if self.blacklist.insert(url).await {
                    warn!(
                        "Blacklisting {} after exceeding {} byte limit",
                        UrlUtils::obfuscate_credentials(url),
                        limits.max_bytes
                    );
                }
                return Err(IconError::too_large(url, limits.max_bytes));
            }
            Err(CappedReadError::Network(message)) => {
                return Err(IconError::network(url, message));
            }
        };

        let declared_vector = is_vector_url(url)
            || content_type
                .as_deref()
                .map(is_vector_content_type)
                .unwrap_or(false);

        if declared_vector {
            return Ok(FetchResult::Vector(
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        match String::from_utf8(body) {
            Ok(text) if looks_like_svg(&text) => Ok(FetchResult::Vector(text)),
            Ok(text) => Ok(FetchResult::Raster(Bytes::from(text.into_bytes()))),
            Err(err) => Ok(FetchResult::Raster(Bytes::from(err.into_bytes()))),
        }
    }

    /// Fetch a text document without blacklisting on oversize
    pub async fn fetch_text(&self, url: &str, limits: FetchLimits) -> IconResult<FetchedDocument> {
        let response = self.send(url, limits.timeout).await?;
        let final_url = response.url().clone();
        let body = Self::read_capped(response, limits.max_bytes)
            .await
            .map_err(|err| match err {
                CappedReadError::TooLarge => IconError::too_large(url, limits.max_bytes),
                CappedReadError::Network(message) => IconError::network(url, message),
            })?;

        Ok(FetchedDocument {
            final_url,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Fetch the HTML page for a target, trying `https://` then `http://`
    /// when the target has no scheme
    ///
    /// Any failure is reported as [`IconError::PageFetch`]. Oversized pages
    /// are not blacklisted.
    pub async fn fetch_page(&self, target: &str, limits: FetchLimits) -> IconResult<FetchedDocument> {
        let target = target.trim();
        if UrlUtils::has_scheme(target) {
            return self
                .fetch_text(target, limits)
                .await
                .map_err(|err| IconError::page_fetch(target, err.to_string()));
        }

        let mut failures = Vec::new();
        for scheme in ["https", "http"] {
            let candidate = format!("{scheme}://{target}");
            match self.fetch_text(&candidate, limits).await {
                Ok(document) => return Ok(document),
                Err(err) => {
                    debug!("Page fetch via {} failed: {}", scheme, err);
                    failures.push(err.to_string());
                }
            }
        }
        Err(IconError::page_fetch(target, failures.join("; ")))
    }

    async fn send(&self, url: &str, timeout: Duration) -> IconResult<Response> {
        let parsed = Url::parse(url).map_err(|e| IconError::invalid_url(url, e.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| IconError::network(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IconError::network(url, format!("HTTP {status}")));
        }
        Ok(response)
    }

    async fn read_capped(response: Response, max_bytes: usize) -> Result<Vec<u8>, CappedReadError> {
        if let Some(declared) = response.content_length()
            && declared > max_bytes as u64
        {
            return Err(CappedReadError::TooLarge);
        }

        let initial = response
            .content_length()
            .map(|len| len as usize)
            .unwrap_or(0)
            .min(max_bytes);
        let mut body = Vec::with_capacity(initial);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CappedReadError::Network(e.to_string()))?;
            if body.len() + chunk.len() > max_bytes {
                return Err(CappedReadError::TooLarge);
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
