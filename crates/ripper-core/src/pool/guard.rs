//! RAII guard that settles a claimed job if its worker never does.

use std::sync::Arc;

use crate::control::JobControl;
use crate::queue::{JobId, JobQueue, JobStatus};

/// Unregisters the job's cancel token when dropped. While armed (the worker
/// panicked or was aborted before recording an outcome) it also marks the
/// job Error so it never stays Running.
pub(super) struct JobGuard {
    queue: JobQueue,
    control: Arc<JobControl>,
    job_id: JobId,
    armed: bool,
}

impl JobGuard {
    pub(super) fn new(queue: JobQueue, control: Arc<JobControl>, job_id: JobId) -> Self {
        Self {
            queue,
            control,
            job_id,
            armed: true,
        }
    }

    pub(super) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.control.unregister(self.job_id);
        if self.armed {
            tracing::warn!(job_id = self.job_id, "worker ended without an outcome");
            self.queue.finish(
                self.job_id,
                JobStatus::Error,
                Some("worker task aborted".to_string()),
            );
        }
    }
}
