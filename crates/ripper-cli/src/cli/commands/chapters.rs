//! `ripper sites` and `ripper chapters <url>`.

use anyhow::Result;
use ripper_core::catalog::ChapterRow;
use ripper_core::Engine;
use tokio_util::sync::CancellationToken;

pub fn run_sites(engine: &Engine) -> Result<()> {
    let sites = engine.supported_sites();
    println!("{:<20} {:<12} {}", "NAME", "LANGUAGE", "SITE");
    for site in sites {
        println!("{:<20} {:<12} {}", site.name, site.language, site.site_url);
    }
    Ok(())
}

/// Lists chapters; Ctrl-C abandons a slow listing.
pub(crate) async fn fetch_rows(
    engine: &Engine,
    url: &str,
    prefix: Option<bool>,
) -> Result<Vec<ChapterRow>> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let rows = engine.list_chapters(url, prefix, &cancel).await;
    watcher.abort();
    Ok(rows?)
}

pub async fn run_chapters(engine: &Engine, url: &str, prefix: Option<bool>) -> Result<()> {
    let rows = fetch_rows(engine, url, prefix).await?;
    if rows.is_empty() {
        println!("No chapters listed.");
        return Ok(());
    }
    let width = rows.len().to_string().len();
    for row in &rows {
        println!("{:>width$}  {}", row.chapter.ordinal, row.display_name, width = width);
    }
    Ok(())
}
