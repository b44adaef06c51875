//! Candidate resolution
//!
//! Walks a page's icon candidates from largest to smallest declared size,
//! returning the first one that fetches, is big enough and normalizes.
//! When every candidate fails, the site's letter glyph is served instead, so
//! [`CandidateResolver::resolve`] always produces an image.

use bytes::Bytes;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::discovery::{Candidate, IconDiscovery};
use crate::errors::{IconError, IconResult};
use crate::fetcher::{BoundedFetcher, FetchLimits, FetchResult, SVG_MIME_TYPE};
use crate::imaging;
use crate::utils::UrlUtils;

pub mod letters;

pub use letters::{LetterIconStore, letter_for_name, letter_for_url};

/// Attempt order for a requested edge length
///
/// Largest declared size first, unknown sizes (0) last, ties in discovery
/// order. Candidates declaring a known size below `size` are dropped.
pub fn order_candidates(candidates: Vec<Candidate>, size: u32) -> Vec<Candidate> {
    let mut ordered: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.declared_size == 0 || c.declared_size >= size)
        .collect();
    ordered.sort_by_key(|c| (c.declared_size == 0, Reverse(c.declared_size)));
    ordered
}

#[derive(Debug, Clone)]
pub struct CandidateResolver {
    discovery: IconDiscovery,
    fetcher: BoundedFetcher,
    icon_limits: FetchLimits,
    letters: Arc<LetterIconStore>,
}

impl CandidateResolver {
    pub fn new(
        discovery: IconDiscovery,
        fetcher: BoundedFetcher,
        icon_limits: FetchLimits,
        letters: Arc<LetterIconStore>,
    ) -> Self {
        Self {
            discovery,
            fetcher,
            icon_limits,
            letters,
        }
    }

    pub fn discovery(&self) -> &IconDiscovery {
        &self.discovery
    }

    /// Best icon for `page_url` as a `size` x `size` PNG
    pub async fn resolve(&self, page_url: &str, size: u32) -> Bytes {
        let candidates = match self.discovery.discover(page_url).await {
            Ok(page) => page.candidates,
            Err(e) => {
                warn!("Icon discovery failed for {}: {}", page_url, e);
                Vec::new()
            }
        };

        for candidate in order_candidates(candidates, size) {
            match self.try_candidate(&candidate, size).await {
                Ok(png) => {
                    info!(
                        "Resolved icon for {} from {}",
                        page_url,
                        UrlUtils::obfuscate_credentials(&candidate.url)
                    );
                    return png;
                }
                Err(e) => debug!("Candidate {} rejected: {}", candidate.url, e),
            }
        }

        let letter = letter_for_url(page_url);
        info!(
            "No usable icon for {}, serving letter icon {:?}",
            page_url, letter
        );
        self.letters.render(letter, size).await
    }

    async fn try_candidate(&self, candidate: &Candidate, size: u32) -> IconResult<Bytes> {
        let fetched = self.fetcher.fetch(&candidate.url, self.icon_limits).await?;

        // A declared SVG type wins over the fetcher's sniffing
        let content = match fetched {
            FetchResult::Raster(bytes) if candidate.mime_hint == SVG_MIME_TYPE => {
                match std::str::from_utf8(&bytes) {
                    Ok(text) => FetchResult::Vector(text.to_string()),
                    Err(_) => FetchResult::Raster(bytes),
                }
            }
            other => other,
        };

        if let FetchResult::Raster(bytes) = &content {
            let (width, height) = imaging::raster_dimensions(bytes)?;
            imaging::check_pixel_bounds(width, height)?;
            if width.min(height) < size {
                return Err(IconError::Undersized {
                    url: candidate.url.clone(),
                    width,
                    height,
                    required: size,
                });
            }
        }

        imaging::normalize_blocking(content, size).await
    }
}
