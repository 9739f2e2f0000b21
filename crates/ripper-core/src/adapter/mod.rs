//! Content-source adapters and the first-match registry.
//!
//! An adapter knows how to list the chapters of a title URL, the page URLs of
//! a chapter, and how to fetch page bytes. Site-specific scraping lives behind
//! this trait; the engine only sees descriptors and bytes.

mod http;
mod manifest;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RipperConfig;
use crate::error::AdapterError;

pub use http::HttpOptions;
pub use manifest::ManifestAdapter;

/// Descriptive information shown in the supported-sites list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub site_url: String,
    pub language: String,
}

/// One chapter as listed by an adapter. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDescriptor {
    pub title: String,
    pub url: String,
    /// 1-based position within the adapter's listing.
    pub ordinal: usize,
}

impl ChapterDescriptor {
    pub fn new(title: impl Into<String>, url: impl Into<String>, ordinal: usize) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ordinal,
        }
    }
}

/// Capability interface implemented by every content source.
///
/// Implementations apply their own per-request timeouts and report them as
/// ordinary `AdapterError`s.
#[async_trait]
pub trait ContentAdapter: Send + Sync {
    fn info(&self) -> AdapterInfo;

    fn can_handle(&self, url: &str) -> bool;

    async fn fetch_chapters(&self, title_url: &str) -> Result<Vec<ChapterDescriptor>, AdapterError>;

    /// Page URLs of a chapter, in reading order.
    async fn fetch_pages(&self, chapter: &ChapterDescriptor) -> Result<Vec<String>, AdapterError>;

    async fn fetch_page_bytes(&self, page_url: &str) -> Result<Vec<u8>, AdapterError>;
}

/// Registered adapters, resolved by first-match on `can_handle`.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ContentAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapters configured from `cfg`.
    pub fn with_defaults(cfg: &RipperConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ManifestAdapter::new(cfg.http_options())));
        registry
    }

    /// Appends an adapter; earlier registrations win on overlapping URLs.
    pub fn register(&mut self, adapter: Arc<dyn ContentAdapter>) {
        tracing::debug!(name = %adapter.info().name, "registered adapter");
        self.adapters.push(adapter);
    }

    pub fn resolve(&self, url: &str) -> Result<Arc<dyn ContentAdapter>, AdapterError> {
        self.adapters
            .iter()
            .find(|a| a.can_handle(url))
            .cloned()
            .ok_or_else(|| AdapterError::NoAdapter(url.to_string()))
    }

    pub fn infos(&self) -> Vec<AdapterInfo> {
        self.adapters.iter().map(|a| a.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
