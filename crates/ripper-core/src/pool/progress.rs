//! Progress reporting for a run (pages done, rate, ETA).
//!
//! Workers report per-job page progress; the aggregator folds it into one
//! overall figure for the jobs of the current run and forwards a
//! `ProgressStats` on every event. Consumers can compute
//! rate = pages_done / elapsed_secs and ETA = (pages_total - pages_done) / rate.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::queue::{JobId, JobProgress};

/// Overall progress after one job reported.
///
/// The page totals cover every job that reported during the run, finished
/// ones included, so `percent` is run-wide rather than a figure for the
/// jobs still Running. `Engine::progress` gives the Running-only view.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    /// Job whose update produced this snapshot.
    pub job_id: JobId,
    /// That job's own progress.
    pub job: JobProgress,
    /// Pages fetched so far across the run's jobs, finished ones included.
    pub pages_done: usize,
    /// Pages known so far across the run's jobs.
    pub pages_total: usize,
    /// Jobs that have reported at least once.
    pub jobs_seen: usize,
    /// Seconds since the run started.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Fraction complete in [0.0, 1.0]; 0 until a page count is known.
    pub fn fraction(&self) -> f64 {
        if self.pages_total == 0 {
            return 0.0;
        }
        (self.pages_done as f64 / self.pages_total as f64).min(1.0)
    }

    /// Whole percent, rounded down.
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).floor() as u32
    }

    /// Pages per second (0 if elapsed is 0).
    pub fn pages_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.pages_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.pages_total.saturating_sub(self.pages_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.pages_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }
}

/// Sum of page progress over `jobs`.
pub fn aggregate<'a>(jobs: impl IntoIterator<Item = &'a JobProgress>) -> JobProgress {
    jobs.into_iter().fold(JobProgress::default(), |acc, p| {
        JobProgress::new(acc.pages_done + p.pages_done, acc.pages_total + p.pages_total)
    })
}

/// A worker's page-progress update.
#[derive(Debug, Clone, Copy)]
pub(super) struct ProgressEvent {
    pub job_id: JobId,
    pub progress: JobProgress,
}

/// Folds job events into overall stats and forwards them to `stats_tx`.
/// Runs until every event sender is dropped. Spawn with `tokio::spawn`.
pub(super) async fn run_aggregator(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    stats_tx: mpsc::Sender<ProgressStats>,
    started: Instant,
) {
    let mut per_job: HashMap<JobId, JobProgress> = HashMap::new();
    while let Some(event) = events.recv().await {
        per_job.insert(event.job_id, event.progress);
        let total = aggregate(per_job.values());
        let stats = ProgressStats {
            job_id: event.job_id,
            job: event.progress,
            pages_done: total.pages_done,
            pages_total: total.pages_total,
            jobs_seen: per_job.len(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        // A slow consumer misses intermediate snapshots, never the run.
        let _ = stats_tx.try_send(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(done: usize, total: usize, elapsed: f64) -> ProgressStats {
        ProgressStats {
            job_id: 1,
            job: JobProgress::default(),
            pages_done: done,
            pages_total: total,
            jobs_seen: 1,
            elapsed_secs: elapsed,
        }
    }

    #[test]
    fn fraction_and_eta() {
        let s = stats(5, 20, 10.0);
        assert!((s.fraction() - 0.25).abs() < 1e-9);
        assert_eq!(s.percent(), 25);
        assert!((s.pages_per_sec() - 0.5).abs() < 1e-9);
        assert!((s.eta_secs().unwrap() - 30.0).abs() < 1e-9);
        assert_eq!(stats(0, 10, 0.0).eta_secs(), None);
        assert_eq!(stats(3, 3, 1.0).eta_secs(), Some(0.0));
        assert_eq!(stats(0, 0, 1.0).fraction(), 0.0);
    }

    #[test]
    fn aggregate_sums_jobs() {
        let jobs = [JobProgress::new(2, 5), JobProgress::new(1, 4)];
        assert_eq!(aggregate(&jobs), JobProgress::new(3, 9));
    }

    #[tokio::test]
    async fn aggregator_recomputes_on_each_event() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stats_tx, mut stats_rx) = mpsc::channel(16);
        let task = tokio::spawn(run_aggregator(event_rx, stats_tx, Instant::now()));

        for (job_id, done, total) in [(1, 0, 4), (2, 0, 6), (1, 2, 4), (2, 6, 6)] {
            event_tx
                .send(ProgressEvent {
                    job_id,
                    progress: JobProgress::new(done, total),
                })
                .unwrap();
        }
        drop(event_tx);
        task.await.unwrap();

        let mut seen = Vec::new();
        while let Ok(s) = stats_rx.try_recv() {
            seen.push((s.pages_done, s.pages_total));
        }
        assert_eq!(seen, [(0, 4), (0, 10), (2, 10), (8, 10)]);
    }

    #[tokio::test]
    async fn finished_jobs_stay_in_the_run_totals() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stats_tx, mut stats_rx) = mpsc::channel(16);
        let task = tokio::spawn(run_aggregator(event_rx, stats_tx, Instant::now()));

        // Job 1 finishes before job 2 starts.
        for (job_id, done, total) in [(1, 3, 3), (2, 0, 5), (2, 1, 5)] {
            event_tx
                .send(ProgressEvent {
                    job_id,
                    progress: JobProgress::new(done, total),
                })
                .unwrap();
        }
        drop(event_tx);
        task.await.unwrap();

        let mut last = None;
        while let Ok(s) = stats_rx.try_recv() {
            last = Some(s);
        }
        let last = last.unwrap();
        assert_eq!((last.pages_done, last.pages_total), (4, 8));
        assert_eq!(last.jobs_seen, 2);
        assert_eq!(last.percent(), 50);
    }
}
