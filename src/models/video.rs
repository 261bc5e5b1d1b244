use std::path::{Path, PathBuf};

use super::folder::folder_name_for;

/// File extensions picked up by the library scan.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mkv", "webm", "avi", "3gp"];

/// Check whether a path has a known video extension.
pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Playable locator handed to the player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(String);

impl ContentRef {
    /// Build a `file://` URI for a local path.
    pub fn from_path(path: &Path) -> Self {
        match glib::filename_to_uri(path, None) {
            Ok(uri) => Self(uri.to_string()),
            // Relative paths are rejected by glib; mpv accepts them verbatim.
            Err(_) => Self(path.to_string_lossy().into_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Conventional location of a video's thumbnail.
///
/// Nothing guarantees the file exists; the thumbnail queue fills it lazily.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailRef(PathBuf);

impl ThumbnailRef {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn exists(&self) -> bool {
        self.0.is_file()
    }
}

/// Raw row returned by the media index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub id: i64,
    pub display_name: String,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub size: u64,
    pub date_added: i64,
}

/// A video known to the media index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub id: i64,
    pub title: String,
    pub content: ContentRef,
    pub path: PathBuf,
    pub duration_ms: u64,
    pub size_bytes: u64,
    /// Unix seconds when the file entered the index.
    pub date_added: i64,
    pub thumbnail: Option<ThumbnailRef>,
    pub folder_name: String,
}

impl VideoRecord {
    pub fn from_row(row: IndexRow, thumbnail: Option<ThumbnailRef>) -> Self {
        Self {
            id: row.id,
            title: row.display_name,
            content: ContentRef::from_path(&row.path),
            folder_name: folder_name_for(&row.path),
            path: row.path,
            duration_ms: row.duration_ms,
            size_bytes: row.size,
            date_added: row.date_added,
            thumbnail,
        }
    }

    /// Parent directory as a raw string, empty when there is none.
    pub fn parent_path(&self) -> String {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Render milliseconds as `m:ss`.
pub fn format_duration(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
