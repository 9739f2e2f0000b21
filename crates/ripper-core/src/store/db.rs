//! SQLite-backed state database.
//!
//! Handles connection and migrations. Queue rows live in `queue`; bookmarks
//! and the session are small enough for one table each.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

use crate::prefs::{Bookmarks, SessionState};
use crate::queue::DownloadJob;

use super::StateStore;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the state database, `~/.local/state/ripper/state.db` by default.
#[derive(Clone)]
pub struct StateDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl StateDb {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("ripper")?;
        let db_path = xdg_dirs
            .place_state_file("state.db")
            .context("create state directory")?;
        Self::open_at(&db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await
            .with_context(|| format!("open state db {}", path.display()))?;
        let db = StateDb { pool };
        db.migrate().await?;
        tracing::debug!(path = %path.display(), "state db ready");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // - `position` keeps queue order; `id` is the job id shown to users.
        // - `chapter_json` holds the chapter descriptor.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue (
                position INTEGER NOT NULL,
                id INTEGER NOT NULL,
                chapter_json TEXT NOT NULL,
                display_name TEXT NOT NULL,
                destination TEXT NOT NULL,
                format TEXT NOT NULL,
                state TEXT NOT NULL,
                error TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookmarks (
                position INTEGER NOT NULL,
                url TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

const SESSION_KEY: &str = "session";

#[async_trait]
impl StateStore for StateDb {
    async fn save_queue(&self, jobs: &[DownloadJob]) -> Result<()> {
        self.replace_queue(jobs).await
    }

    async fn load_queue(&self) -> Result<Vec<DownloadJob>> {
        self.read_queue().await
    }

    async fn save_bookmarks(&self, bookmarks: &Bookmarks) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM bookmarks")
            .execute(&mut *tx)
            .await?;
        for (position, url) in bookmarks.urls().iter().enumerate() {
            sqlx::query("INSERT INTO bookmarks (position, url) VALUES (?1, ?2)")
                .bind(position as i64)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn load_bookmarks(&self) -> Result<Bookmarks> {
        let rows = sqlx::query("SELECT url FROM bookmarks ORDER BY position ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(Bookmarks::from_urls(
            rows.into_iter().map(|row| row.get::<String, _>("url")),
        ))
    }

    async fn save_session(&self, session: &SessionState) -> Result<()> {
        let json = serde_json::to_string(session)?;
        sqlx::query(
            r#"
            INSERT INTO session (key, value_json) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json
            "#,
        )
        .bind(SESSION_KEY)
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_session(&self) -> Result<SessionState> {
        let row = sqlx::query("SELECT value_json FROM session WHERE key = ?1")
            .bind(SESSION_KEY)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(SessionState::default());
        };
        let json: String = row.get("value_json");
        match serde_json::from_str(&json) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(error = %e, "stored session unreadable, using defaults");
                Ok(SessionState::default())
            }
        }
    }
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<StateDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = StateDb { pool };
    db.migrate().await?;
    Ok(db)
}
