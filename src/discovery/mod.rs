//! Icon discovery
//!
//! Fetches a page, scans its `<link>` declarations for icons and appends the
//! well-known root paths that browsers probe when a page declares nothing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::errors::IconResult;
use crate::fetcher::{BoundedFetcher, FetchLimits, SVG_MIME_TYPE, is_vector_url};

pub mod markup;

pub use markup::{LinkDecl, extract_links};

/// Declared size standing in for `sizes="any"`
pub const ANY_SIZE: u32 = 1000;

/// `rel` patterns in priority order
static REL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^apple-touch-icon$",
        r"(?i)^apple-touch-icon-precomposed$",
        r"(?i)^icon$",
        r"(?i)^shortcut icon$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static regex is valid"))
    .collect()
});

/// Root paths tried after every declared link
const FALLBACK_PATHS: &[&str] = &["/apple-touch-icon.png", "/apple-touch-icon-precomposed.png"];

/// A possible icon location for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    /// Width from the `sizes` attribute; 0 when unknown
    pub declared_size: u32,
    /// Declared or inferred MIME type; empty when unknown
    pub mime_hint: String,
    pub is_fallback_path: bool,
}

#[derive(Debug, Clone)]
pub struct DiscoveredPage {
    pub final_url: Url,
    pub candidates: Vec<Candidate>,
}

/// Public view of a declared candidate, as served by the icon listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconListing {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconListings {
    pub icons: Vec<IconListing>,
}

impl From<&[Candidate]> for IconListings {
    fn from(candidates: &[Candidate]) -> Self {
        let icons = candidates
            .iter()
            .filter(|candidate| !candidate.is_fallback_path)
            .map(|candidate| IconListing {
                url: candidate.url.clone(),
                size: (candidate.declared_size > 0).then_some(candidate.declared_size),
                mime_type: (!candidate.mime_hint.is_empty()).then(|| candidate.mime_hint.clone()),
            })
            .collect();
        Self { icons }
    }
}

/// Whether a `rel` value matches a pattern, as a whole or by any token
pub fn rel_matches(rel: &str, pattern: &Regex) -> bool {
    let tokens: Vec<String> = rel.split_whitespace().map(str::to_lowercase).collect();
    if tokens.is_empty() {
        return false;
    }
    pattern.is_match(&tokens.join(" ")) || tokens.iter().any(|token| pattern.is_match(token))
}

/// Width declared by a `sizes` attribute
///
/// ```rust
/// use icon_proxy::discovery::parse_declared_size;
///
/// assert_eq!(parse_declared_size(Some("180x180")), 180);
/// assert_eq!(parse_declared_size(Some("16x16 32x32")), 32);
/// assert_eq!(parse_declared_size(Some("any")), 1000);
/// assert_eq!(parse_declared_size(Some("large")), 0);
/// assert_eq!(parse_declared_size(None), 0);
/// ```
pub fn parse_declared_size(sizes: Option<&str>) -> u32 {
    sizes
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|token| {
            if token.eq_ignore_ascii_case("any") {
                return Some(ANY_SIZE);
            }
            let (width, height) = token.split_once(['x', 'X'])?;
            height.parse::<u32>().ok()?;
            width.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0)
}

/// Build the ordered, deduplicated candidate list for a page
pub fn candidates_from_links(base: &Url, links: &[LinkDecl]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for pattern in REL_PATTERNS.iter() {
        for link in links.iter().filter(|link| rel_matches(&link.rel, pattern)) {
            let Some(href) = link.href.as_deref().map(str::trim) else {
                continue;
            };
            let resolved = match base.join(href) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
                Ok(url) => {
                    debug!("Ignoring icon link with scheme {}", url.scheme());
                    continue;
                }
                Err(e) => {
                    debug!("Ignoring unresolvable icon href {:?}: {}", href, e);
                    continue;
                }
            };

            let declared_size = parse_declared_size(link.sizes.as_deref());
            let mime_hint = match link.mime_type.as_deref().map(str::trim) {
                Some(mime) if !mime.is_empty() => mime.to_string(),
                _ if is_vector_url(&resolved) => SVG_MIME_TYPE.to_string(),
                _ => String::new(),
            };

            match positions.get(&resolved) {
                Some(&index) => {
                    let existing = &mut candidates[index];
                    if declared_size > existing.declared_size {
                        existing.declared_size = declared_size;
                        if existing.mime_hint.is_empty() {
                            existing.mime_hint = mime_hint;
                        }
                    }
                }
                None => {
                    positions.insert(resolved.clone(), candidates.len());
                    candidates.push(Candidate {
                        url: resolved,
                        declared_size,
                        mime_hint,
                        is_fallback_path: false,
                    });
                }
            }
        }
    }

    for path in FALLBACK_PATHS {
        let Ok(url) = base.join(path) else {
            continue;
        };
        let resolved = url.to_string();
        if positions.contains_key(&resolved) {
            continue;
        }
        positions.insert(resolved.clone(), candidates.len());
        candidates.push(Candidate {
            url: resolved,
            declared_size: 0,
            mime_hint: String::new(),
            is_fallback_path: true,
        });
    }

    candidates
}

/// Page scanner producing icon candidates
#[derive(Debug, Clone)]
pub struct IconDiscovery {
    fetcher: BoundedFetcher,
    limits: FetchLimits,
}

impl IconDiscovery {
    pub fn new(fetcher: BoundedFetcher, limits: FetchLimits) -> Self {
        Self { fetcher, limits }
    }

    /// Fetch `page_url` and list its icon candidates
    pub async fn discover(&self, page_url: &str) -> IconResult<DiscoveredPage> {
        let document = self.fetcher.fetch_page(page_url, self.limits).await?;
        let links = extract_links(&document.body);
        let candidates = candidates_from_links(&document.final_url, &links);
        debug!(
            "Discovered {} icon candidates ({} declared links) at {}",
            candidates.len(),
            links.len(),
            document.final_url
        );
        Ok(DiscoveredPage {
            final_url: document.final_url,
            candidates,
        })
    }
}
