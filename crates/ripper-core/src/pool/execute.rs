//! Execute one claimed job: page list, pages in order, one write.

use std::future::Future;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AdapterError, EngineError};
use crate::output::Page;
use crate::queue::{DownloadJob, JobId, JobProgress, JobQueue, JobStatus};

use super::guard::JobGuard;
use super::progress::ProgressEvent;
use super::PoolContext;

/// Records progress on the queue and forwards it to the run's aggregator.
struct Reporter {
    queue: JobQueue,
    job_id: JobId,
    events: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Reporter {
    fn report(&self, pages_done: usize, pages_total: usize) {
        let progress = JobProgress::new(pages_done, pages_total);
        self.queue.set_progress(self.job_id, progress);
        if let Some(tx) = &self.events {
            let _ = tx.send(ProgressEvent {
                job_id: self.job_id,
                progress,
            });
        }
    }
}

/// Awaits `fut` unless `cancel` fires first. Used for the page list only;
/// page transfers always run to completion.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Runs a job the pool already marked Running and records its terminal state.
pub(super) async fn run_job(
    queue: JobQueue,
    ctx: PoolContext,
    job: DownloadJob,
    cancel: CancellationToken,
    events: Option<mpsc::UnboundedSender<ProgressEvent>>,
) {
    let mut guard = JobGuard::new(queue.clone(), ctx.control.clone(), job.id);
    let reporter = Reporter {
        queue: queue.clone(),
        job_id: job.id,
        events,
    };
    let started = Instant::now();
    tracing::debug!(job_id = job.id, chapter = %job.display_name, format = job.format.as_str(), "job started");

    let (status, error) = match download_job(&ctx, &job, &cancel, &reporter).await {
        Ok(()) => {
            tracing::info!(
                job_id = job.id,
                path = %job.destination.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job completed"
            );
            (JobStatus::Completed, None)
        }
        Err(e) if e.is_cancelled() => {
            tracing::info!(job_id = job.id, "job cancelled");
            (JobStatus::Cancelled, None)
        }
        Err(e) => {
            tracing::warn!(job_id = job.id, chapter = %job.display_name, error = %e, "job failed");
            (JobStatus::Error, Some(e.to_string()))
        }
    };
    queue.finish(job.id, status, error);
    guard.disarm();
}

async fn download_job(
    ctx: &PoolContext,
    job: &DownloadJob,
    cancel: &CancellationToken,
    reporter: &Reporter,
) -> Result<(), EngineError> {
    let adapter = ctx.registry.resolve(&job.chapter.url)?;
    let page_urls = cancellable(cancel, adapter.fetch_pages(&job.chapter)).await??;
    if page_urls.is_empty() {
        return Err(AdapterError::Malformed {
            url: job.chapter.url.clone(),
            message: "chapter lists no pages".into(),
        }
        .into());
    }

    let total = page_urls.len();
    reporter.report(0, total);

    let mut pages = Vec::with_capacity(total);
    for (i, url) in page_urls.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let bytes = adapter
            .fetch_page_bytes(&url)
            .await
            .map_err(|source| EngineError::PageFetch {
                page: i + 1,
                total,
                source,
            })?;
        pages.push(Page { url, bytes });
        reporter.report(i + 1, total);
    }

    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    ctx.writer
        .write(pages, &job.destination, job.format)
        .await?;
    Ok(())
}
