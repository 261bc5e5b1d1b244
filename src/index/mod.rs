//! The media index and its query gateway.

pub mod gateway;

use std::path::{Path, PathBuf};

use anyhow::Result;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::GalleryError;
use crate::models::{IndexRow, MediaStore};
use crate::scanner::{LibraryScanner, ScanConfig, ScanResult};

pub use gateway::MediaGateway;

/// Read-only query interface over indexed videos.
pub trait MediaIndex: Send + Sync + 'static {
    /// All rows ordered by added timestamp, newest first.
    fn query_videos(&self) -> Result<Vec<IndexRow>, GalleryError>;
}

/// The SQLite index kept in sync by the library scanner.
pub struct SqliteMediaIndex {
    store: Mutex<MediaStore>,
    scanner: LibraryScanner,
}

impl SqliteMediaIndex {
    pub fn open(path: &Path, scan: ScanConfig) -> Result<Self> {
        let store = MediaStore::open_or_rebuild(path)?;
        Ok(Self::with_store(store, scan))
    }

    pub fn with_store(store: MediaStore, scan: ScanConfig) -> Self {
        Self {
            store: Mutex::new(store),
            scanner: LibraryScanner::new(scan),
        }
    }

    /// Syncs the index with the library roots. Blocking.
    pub fn rescan(&self, roots: &[PathBuf]) -> Result<ScanResult> {
        let mut store = self.store.lock();
        self.scanner.scan(roots, &mut store)
    }
}

impl MediaIndex for SqliteMediaIndex {
    fn query_videos(&self) -> Result<Vec<IndexRow>, GalleryError> {
        let rows = self.store.lock().query_videos()?;
        debug!("Index query returned {} rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rescan_then_query() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/x.mp4"), b"").unwrap();

        let index = SqliteMediaIndex::open(&dir.path().join("index.sqlite"), ScanConfig::default())
            .unwrap();
        let result = index.rescan(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(result.total_files, 1);

        let rows = index.query_videos().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_name, "x.mp4");
    }
}
