//! Session preferences and bookmarks kept across restarts.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::queue::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    #[default]
    Normal,
    Maximized,
    Minimized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub state: WindowState,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 1024,
            height: 720,
            state: WindowState::Normal,
        }
    }
}

/// Everything a front end restores on the next launch. Stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub window: WindowGeometry,
    /// Last title URL entered.
    pub url: String,
    pub save_to: Option<PathBuf>,
    pub folder_checked: bool,
    pub cbz_checked: bool,
    pub chapter_prefix: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            window: WindowGeometry::default(),
            url: String::new(),
            save_to: None,
            folder_checked: true,
            cbz_checked: false,
            chapter_prefix: false,
        }
    }
}

impl SessionState {
    /// Output formats selected by the checkboxes, folder first.
    pub fn formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::with_capacity(2);
        if self.folder_checked {
            formats.push(OutputFormat::Folder);
        }
        if self.cbz_checked {
            formats.push(OutputFormat::Archive);
        }
        formats
    }

    /// Records the window as it is when closing.
    ///
    /// Only a normal window has meaningful bounds. A maximized window keeps
    /// the last normal bounds so restoring it un-maximizes to a sane size; a
    /// minimized window changes nothing.
    pub fn record_window(&mut self, current: WindowGeometry) {
        match current.state {
            WindowState::Normal => self.window = current,
            WindowState::Maximized => self.window.state = WindowState::Maximized,
            WindowState::Minimized => {}
        }
    }
}

/// Bookmarked title URLs, in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmarks(Vec<String>);

impl Bookmarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds from stored URLs, dropping later duplicates and blanks.
    pub fn from_urls(urls: impl IntoIterator<Item = String>) -> Self {
        let mut out = Self::new();
        for url in urls {
            out.insert(&url);
        }
        out
    }

    /// Appends `url` unless already present. Returns true if added.
    pub fn insert(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() || self.contains(url) {
            return false;
        }
        self.0.push(url.to_string());
        true
    }

    /// Returns true if `url` was present.
    pub fn remove(&mut self, url: &str) -> bool {
        let url = url.trim();
        let before = self.0.len();
        self.0.retain(|u| u != url);
        self.0.len() != before
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|u| u == url)
    }

    pub fn urls(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
