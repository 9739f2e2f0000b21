//! Bounded worker pool over the shared job queue.
//!
//! Keeps up to `max_concurrent` jobs running at once; when one finishes, the
//! next Waiting job in queue order is claimed until none is left or the run is
//! stopped. A stopped run claims nothing more and lets its running jobs reach
//! a terminal state before returning.

mod execute;
mod guard;
mod progress;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::adapter::AdapterRegistry;
use crate::control::JobControl;
use crate::error::EngineError;
use crate::output::OutputWriter;
use crate::queue::{JobId, JobQueue};

pub use progress::{aggregate, ProgressStats};

/// Collaborators shared by every worker of a run.
#[derive(Clone)]
pub struct PoolContext {
    pub registry: Arc<AdapterRegistry>,
    pub writer: Arc<dyn OutputWriter>,
    pub control: Arc<JobControl>,
}

/// Outcome of one run, counted from the statuses of the jobs it claimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// True if the run ended because it was stopped.
    pub stopped: bool,
}

/// Runs Waiting jobs with up to `max_concurrent` in flight at once.
///
/// `cancel` stops the run; each job gets a child token registered with
/// `ctx.control` so it can also be stopped on its own. Overall progress is
/// sent to `progress_tx` after every page.
pub async fn run_all(
    queue: &JobQueue,
    ctx: &PoolContext,
    max_concurrent: usize,
    cancel: &CancellationToken,
    progress_tx: Option<mpsc::Sender<ProgressStats>>,
) -> Result<RunSummary, EngineError> {
    if max_concurrent == 0 {
        return Err(EngineError::invalid("maximum concurrency must be at least 1"));
    }

    let started = Instant::now();
    let (events_tx, aggregator) = match progress_tx {
        Some(stats_tx) => {
            let (tx, rx) = mpsc::unbounded_channel();
            let handle = tokio::spawn(progress::run_aggregator(rx, stats_tx, started));
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    let mut claimed: HashSet<JobId> = HashSet::new();
    let mut join_set = JoinSet::new();

    loop {
        while join_set.len() < max_concurrent && !cancel.is_cancelled() {
            let Some(job) = queue.claim_next_waiting() else {
                break;
            };
            claimed.insert(job.id);
            let token = ctx.control.register(job.id, cancel);
            join_set.spawn(execute::run_job(
                queue.clone(),
                ctx.clone(),
                job,
                token,
                events_tx.clone(),
            ));
        }

        if join_set.is_empty() {
            break;
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        if let Err(e) = res {
            // The job guard already recorded the job as Error.
            tracing::warn!(error = %e, "job task join");
        }
    }

    drop(events_tx);
    if let Some(handle) = aggregator {
        let _ = handle.await;
    }

    let counts = queue.counts_for(&claimed);
    let summary = RunSummary {
        claimed: claimed.len(),
        completed: counts.completed,
        failed: counts.error,
        cancelled: counts.cancelled,
        stopped: cancel.is_cancelled(),
    };
    tracing::info!(
        claimed = summary.claimed,
        completed = summary.completed,
        failed = summary.failed,
        cancelled = summary.cancelled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    Ok(summary)
}
