//! HTTP client construction
//!
//! One pooled client is built at startup and shared by page, icon and image
//! fetches. Timeouts are applied per request by the fetcher, so the client
//! only carries the connect timeout.

use reqwest::{Client, redirect};

use crate::config::FetchConfig;
use crate::errors::{AppError, AppResult};

/// Maximum redirects followed before a fetch is treated as failed
const MAX_REDIRECTS: usize = 10;

/// Build the shared HTTP client from fetch configuration
pub fn build_http_client(config: &FetchConfig) -> AppResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {e}")))
}
