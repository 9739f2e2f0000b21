//! Job control for stop/cancel: per-job cancellation tokens.
//!
//! While the worker pool runs, each running job is registered with a child of
//! the run's token. Stopping the whole run cancels the parent; a control client
//! (e.g. `ripper stop 3` via socket) can cancel one job. Workers check their
//! token between pages and end the job as Cancelled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use crate::queue::JobId;

/// Shared registry of job id -> cancellation token.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<JobId, CancellationToken>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job; returns its token, a child of `run` so stopping
    /// the run also stops the job.
    pub fn register(&self, job_id: JobId, run: &CancellationToken) -> CancellationToken {
        let token = run.child_token();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, token.clone());
        token
    }

    /// Unregister a job (call when the job finishes, success or failure).
    pub fn unregister(&self, job_id: JobId) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }

    /// Request cancellation of one job. Returns false if the job is not registered.
    pub fn request_abort(&self, job_id: JobId) -> bool {
        match self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids of the jobs currently registered.
    pub fn running_ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Default path for the control socket (same XDG state dir as the state DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("ripper")?;
    dirs.place_state_file("control.sock")
}
