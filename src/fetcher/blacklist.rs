//! Shared set of URLs that are not worth fetching again
//!
//! A URL lands here when it blew through the byte cap. Entries live for the
//! rest of the process; there is no expiry.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cheaply cloneable handle to the process-wide blacklist
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    urls: Arc<RwLock<HashSet<String>>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.urls.read().await.contains(url)
    }

    /// Returns `true` when the URL was not already present
    pub async fn insert(&self, url: &str) -> bool {
        self.urls.write().await.insert(url.to_string())
    }

    pub async fn len(&self) -> usize {
        self.urls.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.urls.read().await.is_empty()
    }
}
