//! `ripper bookmark add|remove|list`.

use anyhow::Result;
use ripper_core::Engine;

use crate::cli::BookmarkAction;

pub async fn run_bookmark(engine: &Engine, action: BookmarkAction) -> Result<()> {
    match action {
        BookmarkAction::Add { url } => {
            if engine.add_bookmark(&url).await? {
                println!("Bookmarked {url}");
            } else {
                println!("Already bookmarked: {url}");
            }
        }
        BookmarkAction::Remove { url } => {
            if engine.remove_bookmark(&url).await? {
                println!("Removed bookmark {url}");
            } else {
                println!("Not bookmarked: {url}");
            }
        }
        BookmarkAction::List => {
            let bookmarks = engine.bookmarks();
            if bookmarks.is_empty() {
                println!("No bookmarks.");
            }
            for url in bookmarks.urls() {
                println!("{url}");
            }
        }
    }
    Ok(())
}
