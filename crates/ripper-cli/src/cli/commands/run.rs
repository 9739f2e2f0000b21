//! `ripper run` – download every waiting job.

use anyhow::Result;
use ripper_core::pool::ProgressStats;
use ripper_core::Engine;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::cli::control_socket;

pub async fn run_downloads(engine: Arc<Engine>, jobs: usize) -> Result<()> {
    let waiting = engine.counts().waiting;
    if waiting == 0 {
        println!("No waiting jobs.");
        return Ok(());
    }

    let socket_path = ripper_core::control::default_control_socket_path().ok();
    let listener = socket_path.as_ref().and_then(|path| {
        match control_socket::spawn_control_listener(Arc::clone(&engine), path) {
            Ok(handle) => {
                tracing::debug!(path = %path.display(), "control socket listening");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                None
            }
        }
    });

    let interrupt = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nStopping; running chapters end after their current page.");
                engine.stop_all();
            }
        })
    };

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressStats>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || stats.pages_done >= stats.pages_total
            {
                let eta = stats
                    .eta_secs()
                    .map(|s| format!("{:.0}s", s))
                    .unwrap_or_else(|| "?".to_string());
                print!(
                    "\r  {} / {} pages ({}%)  {:.1} pages/s  ETA {}  ",
                    stats.pages_done,
                    stats.pages_total,
                    stats.percent(),
                    stats.pages_per_sec(),
                    eta
                );
                let _ = std::io::stdout().flush();
                last_print = now;
            }
        }
        println!();
    });

    let result = engine.start_all(jobs, Some(progress_tx)).await;
    let _ = progress_handle.await;
    interrupt.abort();
    if let Some(handle) = listener {
        handle.abort();
    }
    if let Some(path) = &socket_path {
        let _ = std::fs::remove_file(path);
    }

    // Bookmarks and session are saved by the commands that change them.
    engine.save_queue().await?;
    let summary = result?;

    println!(
        "{} completed, {} failed, {} cancelled{}",
        summary.completed,
        summary.failed,
        summary.cancelled,
        if summary.stopped { " (stopped)" } else { "" }
    );
    if summary.failed > 0 {
        println!("Run `ripper status` for details; `ripper requeue <id>` retries a job.");
    }
    tracing::info!("run finished: {} of {} job(s) completed", summary.completed, summary.claimed);
    Ok(())
}
