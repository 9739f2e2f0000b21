//! The engine: one service object owning the queue, the pool's run state and
//! the persisted preferences. Front ends (the `ripper` CLI) call only this.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterInfo, AdapterRegistry, ChapterDescriptor};
use crate::catalog::{self, ChapterRow};
use crate::control::JobControl;
use crate::error::EngineError;
use crate::output::OutputWriter;
use crate::pool::{self, PoolContext, ProgressStats, RunSummary};
use crate::prefs::{Bookmarks, SessionState};
use crate::queue::{
    DownloadJob, JobId, JobProgress, JobQueue, JobStatus, OutputFormat, StatusCounts,
};
use crate::store::StateStore;

/// Last chapter listing and the numbering mode applied to it.
#[derive(Debug, Default)]
struct CatalogState {
    prefix: bool,
    chapters: Vec<ChapterDescriptor>,
}

pub struct Engine {
    registry: Arc<AdapterRegistry>,
    writer: Arc<dyn OutputWriter>,
    store: Arc<dyn StateStore>,
    queue: JobQueue,
    control: Arc<JobControl>,
    run: Mutex<Option<CancellationToken>>,
    catalog: RwLock<CatalogState>,
    bookmarks: RwLock<Bookmarks>,
    session: RwLock<SessionState>,
}

/// Clears the engine's active-run slot when the run future completes or is dropped.
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Engine {
    pub fn new(
        registry: AdapterRegistry,
        writer: Arc<dyn OutputWriter>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            writer,
            store,
            queue: JobQueue::new(),
            control: Arc::new(JobControl::new()),
            run: Mutex::new(None),
            catalog: RwLock::new(CatalogState::default()),
            bookmarks: RwLock::new(Bookmarks::new()),
            session: RwLock::new(SessionState::default()),
        }
    }

    /// Loads the pending queue, bookmarks and session. Call once, before any
    /// other operation. Returns the number of restored jobs.
    pub async fn startup(&self) -> Result<usize> {
        let jobs = self.store.load_queue().await?;
        let restored = jobs.len();
        self.queue.restore(jobs);

        let bookmarks = self.store.load_bookmarks().await?;
        *self.bookmarks.write().unwrap_or_else(PoisonError::into_inner) = bookmarks;

        let session = self.store.load_session().await?;
        self.set_prefix_mode(session.chapter_prefix);
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;

        tracing::debug!(restored, "engine started");
        Ok(restored)
    }

    /// Stops any run and saves the queue, bookmarks and session.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop_all();
        self.save_queue().await?;
        let bookmarks = self.bookmarks();
        self.store.save_bookmarks(&bookmarks).await?;
        let session = self.session();
        self.store.save_session(&session).await?;
        Ok(())
    }

    /// Saves every non-Completed job, Running ones as Waiting.
    pub async fn save_queue(&self) -> Result<()> {
        self.store.save_queue(&self.queue.persistable()).await
    }

    pub fn supported_sites(&self) -> Vec<AdapterInfo> {
        self.registry.infos()
    }

    /// Fetches and remembers the listing for `title_url`. `prefix` overrides
    /// the current numbering mode for this and later listings.
    pub async fn list_chapters(
        &self,
        title_url: &str,
        prefix: Option<bool>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ChapterRow>, EngineError> {
        let chapters = catalog::fetch_listing(&self.registry, title_url, cancel).await?;
        let mut state = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(prefix) = prefix {
            state.prefix = prefix;
        }
        state.chapters = chapters;
        tracing::debug!(url = title_url, chapters = state.chapters.len(), "listed chapters");
        Ok(catalog::build_rows(&state.chapters, state.prefix))
    }

    /// Switches numbering and returns the last listing's rows recomputed.
    pub fn set_prefix_mode(&self, on: bool) -> Vec<ChapterRow> {
        let mut state = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        state.prefix = on;
        catalog::build_rows(&state.chapters, on)
    }

    pub fn prefix_mode(&self) -> bool {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .prefix
    }

    /// Rows of the last listing under the current numbering mode.
    pub fn chapter_rows(&self) -> Vec<ChapterRow> {
        let state = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog::build_rows(&state.chapters, state.prefix)
    }

    /// Queues `selection` as delivered by a view (most recently selected
    /// first). The selection is reversed so the queue reads top to bottom in
    /// the order the user picked.
    pub fn enqueue(
        &self,
        selection: &[ChapterRow],
        formats: &[OutputFormat],
        save_dir: &Path,
    ) -> Result<Vec<JobId>, EngineError> {
        let rows: Vec<ChapterRow> = selection.iter().rev().cloned().collect();
        self.queue.enqueue(&rows, formats, save_dir)
    }

    pub fn remove(&self, id: JobId) -> Result<DownloadJob, EngineError> {
        self.queue.remove(id)
    }

    pub fn remove_all(&self) -> usize {
        self.queue.remove_all()
    }

    pub fn requeue(&self, id: JobId) -> Result<(), EngineError> {
        self.queue.requeue(id)
    }

    pub fn snapshot(&self) -> Vec<DownloadJob> {
        self.queue.snapshot()
    }

    pub fn counts(&self) -> StatusCounts {
        self.queue.counts()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Pages done / known over the jobs currently Running.
    pub fn progress(&self) -> JobProgress {
        let jobs = self.queue.snapshot();
        pool::aggregate(
            jobs.iter()
                .filter(|j| j.status == JobStatus::Running)
                .map(|j| &j.progress),
        )
    }

    /// Runs every Waiting job with at most `max_concurrency` at once and
    /// returns when the run drained or was stopped.
    pub async fn start_all(
        &self,
        max_concurrency: usize,
        progress_tx: Option<mpsc::Sender<ProgressStats>>,
    ) -> Result<RunSummary, EngineError> {
        if max_concurrency == 0 {
            return Err(EngineError::invalid("maximum concurrency must be at least 1"));
        }
        let token = {
            let mut slot = self.run.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(EngineError::invalid("a download run is already active"));
            }
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            token
        };
        let _active = ActiveRun { slot: &self.run };

        let ctx = PoolContext {
            registry: Arc::clone(&self.registry),
            writer: Arc::clone(&self.writer),
            control: Arc::clone(&self.control),
        };
        tracing::info!(
            waiting = self.queue.counts().waiting,
            max_concurrency,
            "starting downloads"
        );
        pool::run_all(&self.queue, &ctx, max_concurrency, &token, progress_tx).await
    }

    /// Stops the active run: Running jobs end Cancelled at their next step,
    /// Waiting jobs stay Waiting. Returns false if nothing was running.
    pub fn stop_all(&self) -> bool {
        match self
            .run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) => {
                tracing::info!("stopping all downloads");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops one Running job.
    pub fn stop(&self, id: JobId) -> Result<(), EngineError> {
        if self.control.request_abort(id) {
            tracing::info!(job_id = id, "stopping job");
            Ok(())
        } else {
            Err(EngineError::invalid(format!("job {id} is not running")))
        }
    }

    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn bookmarks(&self) -> Bookmarks {
        self.bookmarks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds and saves a bookmark. Returns false if it was already there.
    pub async fn add_bookmark(&self, url: &str) -> Result<bool> {
        let updated = {
            let mut marks = self.bookmarks.write().unwrap_or_else(PoisonError::into_inner);
            if !marks.insert(url) {
                return Ok(false);
            }
            marks.clone()
        };
        self.store.save_bookmarks(&updated).await?;
        Ok(true)
    }

    /// Removes and saves. Returns false if the URL was not bookmarked.
    pub async fn remove_bookmark(&self, url: &str) -> Result<bool> {
        let updated = {
            let mut marks = self.bookmarks.write().unwrap_or_else(PoisonError::into_inner);
            if !marks.remove(url) {
                return Ok(false);
            }
            marks.clone()
        };
        self.store.save_bookmarks(&updated).await?;
        Ok(true)
    }

    /// Session as loaded at startup, with the current numbering mode.
    pub fn session(&self) -> SessionState {
        let mut session = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        session.chapter_prefix = self.prefix_mode();
        session
    }

    /// Replaces the session kept for the next shutdown.
    pub fn update_session(&self, session: SessionState) {
        self.set_prefix_mode(session.chapter_prefix);
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}
