//! Icon discovery and normalization proxy
//!
//! Resolves the best available icon for a website, or a downscaled copy of
//! any remote image, as a square PNG. Pages are scanned for declared icons,
//! candidates are fetched under strict size and time bounds, results are
//! cached with randomized expiry, and every failure path ends in a usable
//! image (a letter glyph or the default tile).
//!
//! The pipeline, leaves first:
//!
//! - [`fetcher`]: bounded HTTP fetches and the oversize blacklist
//! - [`imaging`]: raster/SVG to square PNG
//! - [`discovery`]: `<link rel="icon">` scanning
//! - [`resolver`]: candidate ordering and letter fallback
//! - [`cache`]: TTL-policied lookups over a pluggable store
//! - [`service`]: one method per endpoint
//! - [`web`]: axum front end

pub mod cache;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod fetcher;
pub mod imaging;
pub mod resolver;
pub mod service;
pub mod utils;
pub mod web;

pub use config::Config;
pub use errors::{AppError, AppResult, IconError, IconResult};
pub use service::IconService;
