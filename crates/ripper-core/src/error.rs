//! Error kinds surfaced by the engine.
//!
//! Job-scoped errors (`PageFetch`, `Write`) end only the owning job; `Cancelled`
//! marks a user-initiated stop and is never reported as a failure.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a content-source adapter (or by adapter resolution).
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No registered adapter accepts the URL.
    #[error("no adapter can handle {0}")]
    NoAdapter(String),
    /// Network/transport failure, including timeouts.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// Server answered with a non-2xx status.
    #[error("{url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    /// The listing could not be parsed or is unusable.
    #[error("malformed listing from {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Failure while committing a finished job to disk.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("writer task failed: {0}")]
    Join(String),
}

impl WriteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by presenter-facing engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// A page of a job could not be fetched (1-based page index).
    #[error("page {page} of {total} failed: {source}")]
    PageFetch {
        page: usize,
        total: usize,
        #[source]
        source: AdapterError,
    },
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("operation cancelled")]
    Cancelled,
    /// Rejected before any queue mutation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidOperation(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_fetch_message_names_page() {
        let err = EngineError::PageFetch {
            page: 3,
            total: 5,
            source: AdapterError::Http {
                url: "https://example.com/3.jpg".into(),
                code: 404,
            },
        };
        assert_eq!(
            err.to_string(),
            "page 3 of 5 failed: https://example.com/3.jpg returned HTTP 404"
        );
    }

    #[test]
    fn cancelled_is_not_a_failure_kind() {
        assert!(EngineError::Cancelled.is_cancelled());
        assert!(!EngineError::invalid("x").is_cancelled());
    }
}
