//! Chapter catalog: adapter listings turned into selectable rows.
//!
//! Display names are derived from the descriptor every time, so toggling the
//! numbering prefix never leaves stale names behind.

use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterRegistry, ChapterDescriptor};
use crate::error::EngineError;

const PREFIX_SEPARATOR: &str = " - ";

/// A chapter as offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRow {
    pub chapter: ChapterDescriptor,
    pub display_name: String,
}

/// Display name for `chapter` in a listing of `total` chapters.
///
/// With `prefix` on, the ordinal is zero-padded to the digit count of `total`.
pub fn display_name(chapter: &ChapterDescriptor, total: usize, prefix: bool) -> String {
    if !prefix {
        return chapter.title.clone();
    }
    let width = total.max(1).to_string().len();
    format!(
        "{:0width$}{}{}",
        chapter.ordinal,
        PREFIX_SEPARATOR,
        chapter.title,
        width = width
    )
}

/// Rows for a listing, in source order.
pub fn build_rows(chapters: &[ChapterDescriptor], prefix: bool) -> Vec<ChapterRow> {
    let total = chapters.len();
    chapters
        .iter()
        .map(|c| ChapterRow {
            chapter: c.clone(),
            display_name: display_name(c, total, prefix),
        })
        .collect()
}

/// Fetches the chapter listing for `title_url` through the first matching adapter.
///
/// Returns `Cancelled` if `cancel` fires before the adapter answers.
pub async fn fetch_listing(
    registry: &AdapterRegistry,
    title_url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<ChapterDescriptor>, EngineError> {
    let adapter = registry.resolve(title_url)?;
    tracing::debug!(url = title_url, adapter = %adapter.info().name, "fetching chapter list");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        listing = adapter.fetch_chapters(title_url) => Ok(listing?),
    }
}

/// `fetch_listing` followed by `build_rows`.
pub async fn list_chapters(
    registry: &AdapterRegistry,
    title_url: &str,
    prefix: bool,
    cancel: &CancellationToken,
) -> Result<Vec<ChapterRow>, EngineError> {
    let chapters = fetch_listing(registry, title_url, cancel).await?;
    Ok(build_rows(&chapters, prefix))
}
