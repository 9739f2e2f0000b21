//! Types for queued download jobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::adapter::ChapterDescriptor;

/// Queue-local job identifier, persisted with the queue.
pub type JobId = u64;

/// How a finished chapter is committed to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One directory per chapter, one file per page.
    Folder,
    /// One CBZ (zip) archive per chapter.
    #[serde(alias = "cbz")]
    Archive,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Folder => "folder",
            OutputFormat::Archive => "cbz",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "folder" | "dir" => Some(OutputFormat::Folder),
            "cbz" | "archive" | "zip" => Some(OutputFormat::Archive),
            _ => None,
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Waiting,
    Running,
    Cancelled,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Running => "running",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "waiting" => JobStatus::Waiting,
            "running" => JobStatus::Running,
            "cancelled" => JobStatus::Cancelled,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            _ => JobStatus::Error,
        }
    }

    /// Completed, Error and Cancelled: no further automatic transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Transitions taken by the worker pool. Re-entry to Waiting is a user
    /// action (`JobQueue::requeue`) and is not covered here.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        match self {
            JobStatus::Waiting => next == JobStatus::Running,
            JobStatus::Running => next.is_terminal(),
            _ => false,
        }
    }
}

/// Pages fetched so far out of the chapter's page count (0/0 until the page list is known).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobProgress {
    pub pages_done: usize,
    pub pages_total: usize,
}

impl JobProgress {
    pub fn new(pages_done: usize, pages_total: usize) -> Self {
        Self {
            pages_done,
            pages_total,
        }
    }

    /// Fraction complete in [0.0, 1.0]; 0 while the page count is unknown.
    pub fn fraction(&self) -> f64 {
        if self.pages_total == 0 {
            return 0.0;
        }
        (self.pages_done as f64 / self.pages_total as f64).min(1.0)
    }
}

/// One queued chapter × format download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    pub id: JobId,
    pub chapter: ChapterDescriptor,
    /// Display name at enqueue time; also the base of the destination name.
    pub display_name: String,
    pub destination: PathBuf,
    pub format: OutputFormat,
    pub status: JobStatus,
    pub progress: JobProgress,
    /// Message of the failure that moved the job to Error.
    pub error: Option<String>,
}

impl DownloadJob {
    /// True while Running; a busy job cannot be removed.
    pub fn is_busy(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// (chapter URL, format). Not unique: the queue keeps duplicates.
    pub fn identity(&self) -> (&str, OutputFormat) {
        (&self.chapter.url, self.format)
    }
}
