//! Generic JSON-manifest source.
//!
//! A title URL ending in `.json` points at `{"chapters": [{"title", "url"}]}`;
//! each chapter URL points at `{"pages": ["..."]}`. Relative URLs are resolved
//! against the manifest that lists them.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::http::{self, HttpOptions};
use super::{AdapterInfo, ChapterDescriptor, ContentAdapter};
use crate::error::AdapterError;

#[derive(Debug, Deserialize)]
struct TitleManifest {
    chapters: Vec<ManifestChapter>,
}

#[derive(Debug, Deserialize)]
struct ManifestChapter {
    title: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChapterManifest {
    pages: Vec<String>,
}

pub struct ManifestAdapter {
    http: HttpOptions,
}

impl ManifestAdapter {
    pub fn new(http: HttpOptions) -> Self {
        Self { http }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let body = http::fetch(url, &self.http).await?;
        serde_json::from_slice(&body).map_err(|e| AdapterError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn resolve_against(base: &str, reference: &str) -> Result<String, AdapterError> {
    let base_url = Url::parse(base).map_err(|e| AdapterError::Malformed {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    base_url
        .join(reference)
        .map(String::from)
        .map_err(|e| AdapterError::Malformed {
            url: base.to_string(),
            message: format!("bad reference {reference:?}: {e}"),
        })
}

#[async_trait]
impl ContentAdapter for ManifestAdapter {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            name: "JSON manifest".to_string(),
            site_url: "file:// or http(s):// *.json".to_string(),
            language: "any".to_string(),
        }
    }

    fn can_handle(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        matches!(parsed.scheme(), "http" | "https" | "file")
            && parsed.path().to_ascii_lowercase().ends_with(".json")
    }

    async fn fetch_chapters(&self, title_url: &str) -> Result<Vec<ChapterDescriptor>, AdapterError> {
        let manifest: TitleManifest = self.fetch_json(title_url).await?;
        manifest
            .chapters
            .into_iter()
            .enumerate()
            .map(|(i, c)| {
                let url = resolve_against(title_url, &c.url)?;
                Ok(ChapterDescriptor::new(c.title, url, i + 1))
            })
            .collect()
    }

    async fn fetch_pages(&self, chapter: &ChapterDescriptor) -> Result<Vec<String>, AdapterError> {
        let manifest: ChapterManifest = self.fetch_json(&chapter.url).await?;
        manifest
            .pages
            .iter()
            .map(|p| resolve_against(&chapter.url, p))
            .collect()
    }

    async fn fetch_page_bytes(&self, page_url: &str) -> Result<Vec<u8>, AdapterError> {
        http::fetch(page_url, &self.http).await
    }
}
