//! Queue rows: replace on save, read in order on load.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sqlx::Row;

use crate::adapter::ChapterDescriptor;
use crate::queue::{DownloadJob, JobProgress, JobStatus, OutputFormat};

use super::db::StateDb;

impl StateDb {
    /// Replaces every stored row with `jobs`, in one transaction.
    pub(super) async fn replace_queue(&self, jobs: &[DownloadJob]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM queue").execute(&mut *tx).await?;
        for (position, job) in jobs.iter().enumerate() {
            let chapter_json = serde_json::to_string(&job.chapter)?;
            let destination = job.destination.to_str().with_context(|| {
                format!("job {} destination is not valid UTF-8", job.id)
            })?;
            sqlx::query(
                r#"
                INSERT INTO queue (
                    position, id, chapter_json, display_name,
                    destination, format, state, error
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(position as i64)
            .bind(job.id as i64)
            .bind(chapter_json)
            .bind(job.display_name.as_str())
            .bind(destination)
            .bind(job.format.as_str())
            .bind(job.status.as_str())
            .bind(job.error.as_deref())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::debug!(jobs = jobs.len(), "saved queue");
        Ok(())
    }

    /// Stored jobs in queue order. Rows that no longer parse are skipped.
    pub(super) async fn read_queue(&self) -> Result<Vec<DownloadJob>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chapter_json, display_name, destination, format, state, error
            FROM queue
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            match job_from_row(&row).with_context(|| format!("queue row {id}")) {
                Ok(job) => out.push(job),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "skipping stored job"),
            }
        }
        Ok(out)
    }
}

fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DownloadJob> {
    let id: i64 = row.get("id");
    let chapter_json: String = row.get("chapter_json");
    let format_str: String = row.get("format");
    let state_str: String = row.get("state");
    let destination: String = row.get("destination");

    let chapter: ChapterDescriptor =
        serde_json::from_str(&chapter_json).context("chapter descriptor")?;
    let format = OutputFormat::from_str(&format_str)
        .with_context(|| format!("unknown output format {format_str:?}"))?;

    Ok(DownloadJob {
        id: u64::try_from(id).context("negative job id")?,
        chapter,
        display_name: row.get("display_name"),
        destination: PathBuf::from(destination),
        format,
        status: JobStatus::from_str(&state_str),
        progress: JobProgress::default(),
        error: row.get("error"),
    })
}
