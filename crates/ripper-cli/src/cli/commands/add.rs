//! `ripper add <url>` – queue chapters of a title.

use anyhow::{Context, Result};
use ripper_core::catalog::ChapterRow;
use ripper_core::config::RipperConfig;
use ripper_core::queue::OutputFormat;
use ripper_core::Engine;
use std::path::PathBuf;

use super::chapters::fetch_rows;
use crate::cli::select::parse_selection;

pub async fn run_add(
    engine: &Engine,
    cfg: &RipperConfig,
    url: &str,
    select: &str,
    formats: &[OutputFormat],
    save_to: Option<PathBuf>,
    prefix: Option<bool>,
) -> Result<()> {
    let mut session = engine.session();
    let formats = if formats.is_empty() {
        vec![OutputFormat::Folder]
    } else {
        formats.to_vec()
    };
    let save_dir = match save_to.or_else(|| session.save_to.clone()) {
        Some(dir) => dir,
        None => match &cfg.default_save_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("current directory")?,
        },
    };

    let rows = fetch_rows(engine, url, prefix).await?;
    let indices = parse_selection(select, rows.len())?;
    // A view hands over the most recent selection first; keep that contract.
    let selection: Vec<ChapterRow> = indices.iter().rev().map(|&i| rows[i].clone()).collect();
    let ids = engine.enqueue(&selection, &formats, &save_dir)?;

    session.url = url.to_string();
    session.save_to = Some(save_dir.clone());
    session.folder_checked = formats.contains(&OutputFormat::Folder);
    session.cbz_checked = formats.contains(&OutputFormat::Archive);
    session.chapter_prefix = engine.prefix_mode();
    engine.update_session(session);
    engine.shutdown().await?;

    println!(
        "Queued {} job(s) for {} chapter(s) in {}",
        ids.len(),
        indices.len(),
        save_dir.display()
    );
    Ok(())
}
