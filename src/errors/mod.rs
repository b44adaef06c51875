//! Centralized error handling for the icon proxy
//!
//! Errors are split in two layers:
//!
//! - **Icon errors**: everything that can go wrong while fetching, discovering
//!   or normalizing an icon. These are absorbed inside the pipeline (next
//!   candidate, letter fallback, cached fallback) and never reach a client.
//! - **Application errors**: request validation and configuration problems,
//!   which are surfaced by the web layer.
//!
//! # Usage
//!
//! ```rust
//! use icon_proxy::errors::{IconError, IconResult};
//!
//! fn check(len: usize, limit: usize) -> IconResult<()> {
//!     if len > limit {
//!         return Err(IconError::too_large("https://example.com/a.png", limit));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for pipeline Results
pub type IconResult<T> = Result<T, IconError>;

/// Convenience type alias for cache store Results
pub type CacheResult<T> = Result<T, CacheStoreError>;
