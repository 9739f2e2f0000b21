//! In-process fakes for adapter, writer and pool tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::adapter::{AdapterInfo, ChapterDescriptor, ContentAdapter};
use crate::error::{AdapterError, WriteError};
use crate::output::{OutputWriter, Page};
use crate::queue::{JobQueue, JobStatus, OutputFormat};

/// Adapter serving a fixed listing under `prefix`.
///
/// Chapter `i` lives at `{prefix}c/{i}`; its page `n` at `{prefix}c/{i}/p{n}.png`.
pub(crate) struct FakeAdapter {
    name: String,
    prefix: String,
    chapters: Vec<(String, usize)>,
    failing_page: Option<(usize, usize)>,
    listing_delay: Duration,
    page_delay: Duration,
    gate: Option<Arc<Semaphore>>,
    observed: Option<JobQueue>,
    max_running_seen: Arc<AtomicUsize>,
    page_requests: Arc<AtomicUsize>,
    page_fetches: Arc<AtomicUsize>,
}

impl FakeAdapter {
    pub(crate) fn named(name: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            chapters: Vec::new(),
            failing_page: None,
            listing_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            gate: None,
            observed: None,
            max_running_seen: Arc::new(AtomicUsize::new(0)),
            page_requests: Arc::new(AtomicUsize::new(0)),
            page_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// (title, page count) per chapter, in listing order.
    pub(crate) fn with_chapters(mut self, chapters: Vec<(&str, usize)>) -> Self {
        self.chapters = chapters
            .into_iter()
            .map(|(t, n)| (t.to_string(), n))
            .collect();
        self
    }

    /// Page `page` (1-based) of chapter `ordinal` answers HTTP 500.
    pub(crate) fn with_failing_page(mut self, ordinal: usize, page: usize) -> Self {
        self.failing_page = Some((ordinal, page));
        self
    }

    pub(crate) fn with_listing_delay(mut self, delay: Duration) -> Self {
        self.listing_delay = delay;
        self
    }

    pub(crate) fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Every page fetch waits for a permit (returned afterwards).
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Samples the number of Running jobs in `queue` on every page fetch.
    pub(crate) fn observing(mut self, queue: JobQueue) -> Self {
        self.observed = Some(queue);
        self
    }

    pub(crate) fn max_running_seen(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_running_seen)
    }

    /// Page fetches started, counted before the gate.
    pub(crate) fn page_requests(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.page_requests)
    }

    /// Page fetches that got past the gate and delay.
    pub(crate) fn page_fetches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.page_fetches)
    }

    pub(crate) fn chapter_url(&self, ordinal: usize) -> String {
        format!("{}c/{}", self.prefix, ordinal)
    }

    pub(crate) fn descriptors(&self) -> Vec<ChapterDescriptor> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(i, (title, _))| ChapterDescriptor::new(title.clone(), self.chapter_url(i + 1), i + 1))
            .collect()
    }

    fn ordinal_of(&self, chapter_url: &str) -> Option<usize> {
        chapter_url
            .strip_prefix(&format!("{}c/", self.prefix))?
            .split('/')
            .next()?
            .parse()
            .ok()
    }
}

#[async_trait]
impl ContentAdapter for FakeAdapter {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            name: self.name.clone(),
            site_url: self.prefix.clone(),
            language: "English".to_string(),
        }
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }

    async fn fetch_chapters(&self, _title_url: &str) -> Result<Vec<ChapterDescriptor>, AdapterError> {
        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }
        Ok(self.descriptors())
    }

    async fn fetch_pages(&self, chapter: &ChapterDescriptor) -> Result<Vec<String>, AdapterError> {
        let count = self
            .ordinal_of(&chapter.url)
            .and_then(|o| self.chapters.get(o.wrapping_sub(1)))
            .map(|(_, n)| *n)
            .ok_or_else(|| AdapterError::Malformed {
                url: chapter.url.clone(),
                message: "unknown chapter".into(),
            })?;
        Ok((1..=count).map(|n| format!("{}/p{}.png", chapter.url, n)).collect())
    }

    async fn fetch_page_bytes(&self, page_url: &str) -> Result<Vec<u8>, AdapterError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(queue) = &self.observed {
            let running = queue.counts().running;
            self.max_running_seen.fetch_max(running, Ordering::SeqCst);
        }
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|_| AdapterError::Transport {
                url: page_url.to_string(),
                message: "gate closed".into(),
            })?;
        }
        if !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }
        self.page_fetches.fetch_add(1, Ordering::SeqCst);

        if let Some((ordinal, page)) = self.failing_page {
            if page_url == format!("{}/p{}.png", self.chapter_url(ordinal), page) {
                return Err(AdapterError::Http {
                    url: page_url.to_string(),
                    code: 500,
                });
            }
        }
        Ok(page_url.as_bytes().to_vec())
    }
}

/// One recorded `OutputWriter::write` call.
#[derive(Debug, Clone)]
pub(crate) struct WriteCall {
    pub destination: PathBuf,
    pub format: OutputFormat,
    pub page_urls: Vec<String>,
}

/// Writer that records calls instead of touching the filesystem.
#[derive(Default)]
pub(crate) struct RecordingWriter {
    calls: Mutex<Vec<WriteCall>>,
    fail: bool,
}

impl RecordingWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every write fails with a permission error.
    pub(crate) fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn calls(&self) -> Vec<WriteCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutputWriter for RecordingWriter {
    async fn write(
        &self,
        pages: Vec<Page>,
        destination: &Path,
        format: OutputFormat,
    ) -> Result<(), WriteError> {
        self.calls.lock().unwrap().push(WriteCall {
            destination: destination.to_path_buf(),
            format,
            page_urls: pages.into_iter().map(|p| p.url).collect(),
        });
        if self.fail {
            return Err(WriteError::io(
                destination,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        Ok(())
    }
}

/// Polls `counter` until it reaches `n` (panics after a few seconds).
pub(crate) async fn wait_for_count(counter: &AtomicUsize, n: usize) {
    for _ in 0..500 {
        if counter.load(Ordering::SeqCst) >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for count {n}, at {}",
        counter.load(Ordering::SeqCst)
    );
}

/// Polls `queue` until `n` jobs are Running (panics after a few seconds).
pub(crate) async fn wait_for_running(queue: &JobQueue, n: usize) {
    for _ in 0..500 {
        if queue.counts().running >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for {n} running jobs: {:?}",
        queue
            .snapshot()
            .iter()
            .map(|j| j.status)
            .collect::<Vec<JobStatus>>()
    );
}
