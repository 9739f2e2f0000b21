//! Output writer: commits a finished job's pages to disk.
//!
//! The pool calls `OutputWriter::write` exactly once per job, after every page
//! was fetched. `FsOutputWriter` writes either a folder of page files or a CBZ
//! archive; an unwritable destination shows up here, at the first write.

mod naming;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::WriteError;
use crate::queue::OutputFormat;

pub use naming::{extension_from_url, page_file_name, sanitize_file_name, sniff_extension};

/// Archive extension used for `OutputFormat::Archive`.
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// One fetched page, in reading order.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Destination of a chapter under `save_dir` for `format`.
pub fn destination_for(save_dir: &Path, display_name: &str, format: OutputFormat) -> PathBuf {
    let base = sanitize_file_name(display_name);
    match format {
        OutputFormat::Folder => save_dir.join(base),
        OutputFormat::Archive => save_dir.join(format!("{base}.{ARCHIVE_EXTENSION}")),
    }
}

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(
        &self,
        pages: Vec<Page>,
        destination: &Path,
        format: OutputFormat,
    ) -> Result<(), WriteError>;
}

/// Filesystem writer. Blocking I/O runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOutputWriter;

impl FsOutputWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputWriter for FsOutputWriter {
    async fn write(
        &self,
        pages: Vec<Page>,
        destination: &Path,
        format: OutputFormat,
    ) -> Result<(), WriteError> {
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || match format {
            OutputFormat::Folder => write_folder(&pages, &destination),
            OutputFormat::Archive => write_archive(&pages, &destination),
        })
        .await
        .map_err(|e| WriteError::Join(e.to_string()))?
    }
}

fn write_folder(pages: &[Page], dir: &Path) -> Result<(), WriteError> {
    fs::create_dir_all(dir).map_err(|e| WriteError::io(dir, e))?;
    let count = pages.len();
    for (i, page) in pages.iter().enumerate() {
        let path = dir.join(page_file_name(i, count, &page.url, &page.bytes));
        fs::write(&path, &page.bytes).map_err(|e| WriteError::io(&path, e))?;
    }
    tracing::debug!(path = %dir.display(), pages = count, "wrote chapter folder");
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Writes a CBZ to `<path>.part` and renames it into place once complete.
fn write_archive(pages: &[Page], path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
    }
    let temp = part_path(path);
    let result = build_archive(pages, &temp).and_then(|()| {
        fs::rename(&temp, path).map_err(|e| WriteError::io(path, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    if result.is_ok() {
        tracing::debug!(path = %path.display(), pages = pages.len(), "wrote chapter archive");
    }
    result
}

fn build_archive(pages: &[Page], temp: &Path) -> Result<(), WriteError> {
    let file = File::create(temp).map_err(|e| WriteError::io(temp, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let archive_err = |source| WriteError::Archive {
        path: temp.to_path_buf(),
        source,
    };

    let count = pages.len();
    for (i, page) in pages.iter().enumerate() {
        zip.start_file(page_file_name(i, count, &page.url, &page.bytes), options)
            .map_err(archive_err)?;
        zip.write_all(&page.bytes)
            .map_err(|e| WriteError::io(temp, e))?;
    }
    let mut out = zip.finish().map_err(archive_err)?;
    out.flush().map_err(|e| WriteError::io(temp, e))?;
    Ok(())
}
