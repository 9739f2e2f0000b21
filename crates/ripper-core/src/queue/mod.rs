//! The download job queue.
//!
//! An ordered list shared between the controlling caller (enqueue, remove)
//! and the worker pool (claim, progress, finish). Every access goes through
//! one lock, so a removal never interleaves with a worker's status update and
//! snapshots are always consistent.

mod job;

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::catalog::ChapterRow;
use crate::error::EngineError;
use crate::output::destination_for;

pub use job::{DownloadJob, JobId, JobProgress, JobStatus, OutputFormat};

/// Counts derived by scanning job statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub waiting: usize,
    pub running: usize,
    pub cancelled: usize,
    pub completed: usize,
    pub error: usize,
}

impl StatusCounts {
    fn add(&mut self, status: JobStatus) {
        match status {
            JobStatus::Waiting => self.waiting += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Cancelled => self.cancelled += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.waiting + self.running + self.cancelled + self.completed + self.error
    }
}

#[derive(Debug)]
struct QueueInner {
    jobs: Vec<DownloadJob>,
    next_id: JobId,
}

impl Default for QueueInner {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }
}

impl QueueInner {
    fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }
}

/// Shared, cloneable handle to the job list.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    inner: Arc<RwLock<QueueInner>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, QueueInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, QueueInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one Waiting job per (row × format), rows in the given order and
    /// formats as the inner loop. Rejects an empty format list without touching
    /// the queue.
    pub fn enqueue(
        &self,
        rows: &[ChapterRow],
        formats: &[OutputFormat],
        save_dir: &Path,
    ) -> Result<Vec<JobId>, EngineError> {
        if formats.is_empty() {
            return Err(EngineError::invalid(
                "select at least one output format (folder, cbz)",
            ));
        }
        // Destinations are stored as text.
        if save_dir.to_str().is_none() {
            return Err(EngineError::invalid(format!(
                "save directory {} is not valid UTF-8",
                save_dir.display()
            )));
        }
        let mut unique_formats: Vec<OutputFormat> = Vec::with_capacity(formats.len());
        for f in formats {
            if !unique_formats.contains(f) {
                unique_formats.push(*f);
            }
        }

        let mut inner = self.write();
        let mut ids = Vec::with_capacity(rows.len() * unique_formats.len());
        for row in rows {
            for &format in &unique_formats {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.jobs.push(DownloadJob {
                    id,
                    chapter: row.chapter.clone(),
                    display_name: row.display_name.clone(),
                    destination: destination_for(save_dir, &row.display_name, format),
                    format,
                    status: JobStatus::Waiting,
                    progress: JobProgress::default(),
                    error: None,
                });
                ids.push(id);
            }
        }
        tracing::debug!(added = ids.len(), total = inner.jobs.len(), "enqueued jobs");
        Ok(ids)
    }

    /// Removes a job that is not Running.
    pub fn remove(&self, id: JobId) -> Result<DownloadJob, EngineError> {
        let mut inner = self.write();
        let Some(pos) = inner.position(id) else {
            return Err(EngineError::invalid(format!("job {id} is not in the queue")));
        };
        if inner.jobs[pos].is_busy() {
            return Err(EngineError::invalid(format!(
                "job {id} is running; stop it before removing"
            )));
        }
        Ok(inner.jobs.remove(pos))
    }

    /// Removes every job that is not Running. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut inner = self.write();
        let before = inner.jobs.len();
        inner.jobs.retain(|j| j.is_busy());
        before - inner.jobs.len()
    }

    /// Puts an Error or Cancelled job back to Waiting with progress reset.
    pub fn requeue(&self, id: JobId) -> Result<(), EngineError> {
        let mut inner = self.write();
        let Some(pos) = inner.position(id) else {
            return Err(EngineError::invalid(format!("job {id} is not in the queue")));
        };
        let job = &mut inner.jobs[pos];
        match job.status {
            JobStatus::Error | JobStatus::Cancelled => {
                job.status = JobStatus::Waiting;
                job.progress = JobProgress::default();
                job.error = None;
                Ok(())
            }
            other => Err(EngineError::invalid(format!(
                "job {id} is {}; only failed or cancelled jobs can be requeued",
                other.as_str()
            ))),
        }
    }

    /// Consistent copy of every job, in queue order.
    pub fn snapshot(&self) -> Vec<DownloadJob> {
        self.read().jobs.clone()
    }

    pub fn get(&self, id: JobId) -> Option<DownloadJob> {
        let inner = self.read();
        inner.position(id).map(|pos| inner.jobs[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().jobs.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for job in &self.read().jobs {
            counts.add(job.status);
        }
        counts
    }

    /// Counts over the given job ids only (e.g. the jobs of one run).
    pub fn counts_for(&self, ids: &HashSet<JobId>) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for job in self.read().jobs.iter().filter(|j| ids.contains(&j.id)) {
            counts.add(job.status);
        }
        counts
    }

    /// Replaces the queue with jobs loaded from the state store.
    ///
    /// Running jobs were interrupted by the previous shutdown and come back as
    /// Waiting; progress is always reset.
    pub fn restore(&self, jobs: Vec<DownloadJob>) {
        let mut inner = self.write();
        let mut seen = HashSet::new();
        let mut next_id = 1;
        inner.jobs = jobs
            .into_iter()
            .map(|mut job| {
                if job.status == JobStatus::Running {
                    job.status = JobStatus::Waiting;
                }
                job.progress = JobProgress::default();
                job
            })
            .collect();
        // Ids must stay unique; renumber clashes from hand-edited state.
        for job in inner.jobs.iter_mut() {
            if !seen.insert(job.id) {
                job.id = 0;
            }
            next_id = next_id.max(job.id + 1);
        }
        for job in inner.jobs.iter_mut().filter(|j| j.id == 0) {
            job.id = next_id;
            next_id += 1;
        }
        inner.next_id = next_id;
    }

    /// Jobs to persist at shutdown: everything not Completed, with Running
    /// recorded as Waiting so it restarts on the next launch.
    pub fn persistable(&self) -> Vec<DownloadJob> {
        self.read()
            .jobs
            .iter()
            .filter(|j| j.status != JobStatus::Completed)
            .map(|j| {
                let mut job = j.clone();
                if job.status == JobStatus::Running {
                    job.status = JobStatus::Waiting;
                }
                job.progress = JobProgress::default();
                job
            })
            .collect()
    }

    /// Claims the first Waiting job in queue order, marking it Running.
    pub(crate) fn claim_next_waiting(&self) -> Option<DownloadJob> {
        let mut inner = self.write();
        let job = inner
            .jobs
            .iter_mut()
            .find(|j| j.status == JobStatus::Waiting)?;
        job.status = JobStatus::Running;
        job.progress = JobProgress::default();
        job.error = None;
        Some(job.clone())
    }

    /// Records page progress for a Running job. Ignored for any other state.
    pub(crate) fn set_progress(&self, id: JobId, progress: JobProgress) {
        let mut inner = self.write();
        if let Some(pos) = inner.position(id) {
            let job = &mut inner.jobs[pos];
            if job.status == JobStatus::Running {
                job.progress = progress;
            }
        }
    }

    /// Moves a Running job to a terminal state. Returns false (and changes
    /// nothing) if the transition is not allowed.
    pub(crate) fn finish(&self, id: JobId, status: JobStatus, error: Option<String>) -> bool {
        let mut inner = self.write();
        let Some(pos) = inner.position(id) else {
            tracing::warn!(job_id = id, "finished job is no longer queued");
            return false;
        };
        let job = &mut inner.jobs[pos];
        if !job.status.can_transition_to(status) || !status.is_terminal() {
            tracing::warn!(
                job_id = id,
                from = job.status.as_str(),
                to = status.as_str(),
                "rejected job transition"
            );
            return false;
        }
        job.status = status;
        job.error = error;
        true
    }
}
