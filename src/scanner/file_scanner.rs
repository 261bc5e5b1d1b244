//! Library scanner that keeps the media index in sync with the filesystem.
//!
//! This module provides the `LibraryScanner` struct which handles:
//! - Recursive directory scanning using walkdir
//! - Video detection by file extension
//! - Cache-aware scanning (skip re-probing unchanged files based on mtime/size)
//! - Batched SQLite writes and pruning of vanished files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{is_video_path, CachedFile, IndexEntry, MediaStore};
use crate::scanner::metadata::DurationProbe;

/// Configuration for the library scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Number of entries to batch before writing to database.
    pub batch_size: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Whether to descend into dot-directories.
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 0, // unlimited
            batch_size: 100,
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

/// Result of a completed scan operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Total number of video files found.
    pub total_files: usize,
    /// Number of files whose headers were probed.
    pub probed: usize,
    /// Number of files reused from the index.
    pub cached: usize,
    /// Number of files that had errors.
    pub error_count: usize,
    /// Rows removed because their file is gone.
    pub pruned: usize,
}

/// A file discovered during the walk.
#[derive(Debug, Clone)]
struct DiscoveredFile {
    path: PathBuf,
    mtime: i64,
    size: i64,
}

/// Walks library roots into a [`MediaStore`].
pub struct LibraryScanner {
    config: ScanConfig,
}

impl LibraryScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans all roots and updates the index. Blocking.
    pub fn scan(&self, roots: &[PathBuf], store: &mut MediaStore) -> Result<ScanResult> {
        info!("Starting library scan of {:?}", roots);
        let scan_time = MediaStore::now();

        let cache_map = store.get_cache_map()?;
        debug!("Loaded {} cached entries", cache_map.len());

        let mut result = ScanResult::default();
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut scanned_roots = Vec::with_capacity(roots.len());

        for root in roots {
            if !root.is_dir() {
                warn!("Library root is not a directory: {:?}", root);
                continue;
            }
            scanned_roots.push(root.clone());

            for file in self.discover_files(root, &mut result.error_count) {
                let entry = Self::index_entry(&file, &cache_map, &mut result);
                batch.push(entry);

                if batch.len() >= self.config.batch_size {
                    store.upsert_batch(&batch, scan_time)?;
                    batch.clear();
                }
            }
        }

        if !batch.is_empty() {
            store.upsert_batch(&batch, scan_time)?;
        }

        // Only roots that were actually walked may lose rows; an unmounted
        // root must not wipe its part of the index.
        if !scanned_roots.is_empty() {
            result.pruned = store
                .prune_unseen(&scanned_roots, scan_time)
                .context("Failed to prune vanished videos")?;
        }

        info!(
            "Scan complete: {} total, {} probed, {} cached, {} errors, {} pruned",
            result.total_files, result.probed, result.cached, result.error_count, result.pruned
        );
        Ok(result)
    }

    /// Discovers all video files below `root`, sorted by path.
    fn discover_files(&self, root: &Path, errors: &mut usize) -> Vec<DiscoveredFile> {
        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if self.config.max_depth > 0 {
            walker = walker.max_depth(self.config.max_depth);
        }

        let include_hidden = self.config.include_hidden;
        let mut files = Vec::new();

        for entry in walker
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error under {:?}: {}", root, e);
                    *errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_video_path(entry.path()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("Failed to read metadata for {:?}: {}", entry.path(), e);
                    *errors += 1;
                    continue;
                }
            };

            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            files.push(DiscoveredFile {
                path: entry.into_path(),
                mtime,
                size: metadata.len() as i64,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    fn index_entry(
        file: &DiscoveredFile,
        cache_map: &HashMap<PathBuf, CachedFile>,
        result: &mut ScanResult,
    ) -> IndexEntry {
        result.total_files += 1;

        let duration_ms = match cache_map.get(&file.path) {
            Some(cached) if cached.mtime == file.mtime && cached.size == file.size => {
                trace!("Cache hit for {:?}", file.path);
                result.cached += 1;
                cached.duration_ms
            }
            _ => {
                result.probed += 1;
                DurationProbe::probe(&file.path)
            }
        };

        IndexEntry {
            title: file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: file.path.clone(),
            duration_ms,
            mtime: file.mtime,
            size: file.size,
        }
    }
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really a video").unwrap();
    }

    #[test]
    fn test_scan_indexes_only_videos() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Movies/a.mp4"));
        touch(&dir.path().join("Movies/b.MKV"));
        touch(&dir.path().join("Movies/notes.txt"));
        touch(&dir.path().join("Camera/c.webm"));
        touch(&dir.path().join(".hidden/d.mp4"));

        let mut store = MediaStore::open_in_memory().unwrap();
        let result = LibraryScanner::default()
            .scan(&[dir.path().to_path_buf()], &mut store)
            .unwrap();

        assert_eq!(result.total_files, 3);
        assert_eq!(result.probed, 3);
        assert_eq!(store.video_count().unwrap(), 3);

        let rows = store.query_videos().unwrap();
        assert!(rows.iter().all(|r| !r.path.to_string_lossy().contains(".hidden")));
        assert!(rows.iter().all(|r| r.duration_ms == 0));
    }

    #[test]
    fn test_rescan_uses_cache_and_keeps_ids() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));

        let mut store = MediaStore::open_in_memory().unwrap();
        let scanner = LibraryScanner::default();
        scanner.scan(&[dir.path().to_path_buf()], &mut store).unwrap();
        let first = store.query_videos().unwrap();

        let second_result = scanner.scan(&[dir.path().to_path_buf()], &mut store).unwrap();
        let second = store.query_videos().unwrap();

        assert_eq!(second_result.cached, 1);
        assert_eq!(second_result.probed, 0);
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].date_added, second[0].date_added);
    }

    #[test]
    fn test_missing_root_does_not_prune() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.mp4"));

        let mut store = MediaStore::open_in_memory().unwrap();
        let scanner = LibraryScanner::default();
        scanner.scan(&[dir.path().to_path_buf()], &mut store).unwrap();

        let result = scanner
            .scan(&[dir.path().join("unmounted")], &mut store)
            .unwrap();
        assert_eq!(result.pruned, 0);
        assert_eq!(store.video_count().unwrap(), 1);
    }

    #[test]
    fn test_deleted_files_are_pruned() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.mp4");
        touch(&a);
        touch(&dir.path().join("b.mp4"));

        let mut store = MediaStore::open_in_memory().unwrap();
        let scanner = LibraryScanner::default();
        scanner.scan(&[dir.path().to_path_buf()], &mut store).unwrap();

        fs::remove_file(&a).unwrap();
        // last_seen has second resolution
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let result = scanner.scan(&[dir.path().to_path_buf()], &mut store).unwrap();

        assert_eq!(result.pruned, 1);
        assert_eq!(store.video_count().unwrap(), 1);
    }
}
