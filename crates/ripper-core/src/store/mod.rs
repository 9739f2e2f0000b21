//! Persistent state: pending queue, bookmarks and session (SQLite via sqlx).

mod db;
mod queue;

use anyhow::Result;
use async_trait::async_trait;

use crate::prefs::{Bookmarks, SessionState};
use crate::queue::DownloadJob;

pub use db::StateDb;

#[cfg(test)]
pub(crate) use db::open_memory;

/// Persistence boundary used by the engine at startup, shutdown and on
/// bookmark edits.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Replaces the stored queue with `jobs` (in queue order).
    async fn save_queue(&self, jobs: &[DownloadJob]) -> Result<()>;
    async fn load_queue(&self) -> Result<Vec<DownloadJob>>;

    async fn save_bookmarks(&self, bookmarks: &Bookmarks) -> Result<()>;
    async fn load_bookmarks(&self) -> Result<Bookmarks>;

    async fn save_session(&self, session: &SessionState) -> Result<()>;
    /// Default session if none was saved yet.
    async fn load_session(&self) -> Result<SessionState>;
}
