//! `ripper status` – show the download queue.

use anyhow::Result;
use ripper_core::queue::JobStatus;
use ripper_core::Engine;
use std::fmt::Write;

/// Queue table plus per-status totals, as printed by `ripper status`.
pub(crate) fn render_status(engine: &Engine) -> String {
    let jobs = engine.snapshot();
    if jobs.is_empty() {
        return "Queue is empty.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<10} {:<7} {:<9} {}",
        "ID", "STATE", "FORMAT", "PAGES", "CHAPTER"
    );
    for j in &jobs {
        let pages = if j.progress.pages_total == 0 {
            "-".to_string()
        } else {
            format!("{}/{}", j.progress.pages_done, j.progress.pages_total)
        };
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<7} {:<9} {}",
            j.id,
            j.status.as_str(),
            j.format.as_str(),
            pages,
            j.display_name
        );
        if j.status == JobStatus::Error {
            if let Some(err) = &j.error {
                let _ = writeln!(out, "{:<6} {}", "", err);
            }
        }
    }
    let c = engine.counts();
    let _ = writeln!(
        out,
        "{} waiting, {} running, {} failed, {} cancelled, {} completed",
        c.waiting, c.running, c.error, c.cancelled, c.completed
    );
    out
}

pub fn run_status(engine: &Engine) -> Result<()> {
    print!("{}", render_status(engine));
    Ok(())
}
