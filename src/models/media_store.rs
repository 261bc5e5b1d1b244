//! SQLite-backed media index.
//!
//! This module provides the `MediaStore` struct which owns the `videos` table:
//! - One row per video file found under the library roots
//! - Stable row ids and first-seen timestamps across rescans
//! - Cached duration so unchanged files skip header parsing

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info, warn};

use crate::models::IndexRow;

/// SQLite-backed storage for the video index.
///
/// The database uses WAL mode so the UI can query while a scan writes.
pub struct MediaStore {
    conn: Connection,
}

/// A video file as observed by the library scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub title: String,
    pub duration_ms: Option<u64>,
    pub mtime: i64,
    pub size: i64,
}

/// Cached attributes used to skip re-probing unchanged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedFile {
    pub mtime: i64,
    pub size: i64,
    pub duration_ms: Option<u64>,
}

impl MediaStore {
    /// Opens or creates the database at the specified path.
    ///
    /// Configures SQLite for optimal performance:
    /// - journal_mode = WAL (write-ahead logging for concurrent access)
    /// - synchronous = NORMAL (balance between safety and speed)
    /// - temp_store = MEMORY (keep temp tables in RAM)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA cache_size = -16000;
            ",
        )
        .context("Failed to configure SQLite pragmas")?;

        let store = Self::with_connection(conn)?;
        info!("Opened media index at {:?}", path);
        Ok(store)
    }

    /// Opens a private in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    /// Opens the index, rebuilding it if the file is unreadable.
    pub fn open_or_rebuild(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(err) => {
                warn!(error = ?err, "Media index unusable, rebuilding");
                Self::handle_corruption(path)
            }
        }
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.create_tables()?;
        Ok(store)
    }

    /// Creates the database schema if it doesn't exist.
    fn create_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                duration_ms INTEGER,
                size INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                date_added INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_videos_date_added ON videos(date_added);
            CREATE INDEX IF NOT EXISTS idx_videos_last_seen ON videos(last_seen);
            ",
            )
            .context("Failed to create database tables")?;

        debug!("Database tables created/verified");
        Ok(())
    }

    /// Batch inserts or updates scanned entries in a single transaction.
    ///
    /// New paths get `date_added` from their modification time; known paths
    /// keep their id and `date_added`.
    pub fn upsert_batch(&mut self, entries: &[IndexEntry], scan_time: i64) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let count = Self::upsert_batch_in_tx(&tx, entries, scan_time)?;
        tx.commit()?;

        debug!("Batch upserted {} videos", count);
        Ok(count)
    }

    fn upsert_batch_in_tx(tx: &Transaction, entries: &[IndexEntry], scan_time: i64) -> Result<usize> {
        let mut stmt = tx.prepare_cached(
            "
            INSERT INTO videos (path, title, duration_ms, size, mtime, date_added, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(path) DO UPDATE SET
                title = excluded.title,
                duration_ms = excluded.duration_ms,
                size = excluded.size,
                mtime = excluded.mtime,
                last_seen = excluded.last_seen
            ",
        )?;

        let mut count = 0;
        for entry in entries {
            stmt.execute(params![
                entry.path.to_string_lossy(),
                entry.title,
                entry.duration_ms.map(|d| d as i64),
                entry.size,
                entry.mtime,
                entry.mtime,
                scan_time,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// All indexed videos, newest first.
    pub fn query_videos(&self) -> Result<Vec<IndexRow>> {
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT id, title, path, duration_ms, size, date_added
            FROM videos
            ORDER BY date_added DESC, id DESC
            ",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(IndexRow {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                    duration_ms: row.get::<_, Option<i64>>(3)?.unwrap_or(0).max(0) as u64,
                    size: row.get::<_, i64>(4)?.max(0) as u64,
                    date_added: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query videos")?;

        Ok(rows)
    }

    /// Gets a map of path to cached attributes for quick scan lookups.
    pub fn get_cache_map(&self) -> Result<HashMap<PathBuf, CachedFile>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, mtime, size, duration_ms FROM videos")?;

        let mut map = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                PathBuf::from(row.get::<_, String>(0)?),
                CachedFile {
                    mtime: row.get(1)?,
                    size: row.get(2)?,
                    duration_ms: row.get::<_, Option<i64>>(3)?.map(|d| d.max(0) as u64),
                },
            ))
        })?;
        for row in rows {
            let (path, cached) = row?;
            map.insert(path, cached);
        }

        Ok(map)
    }

    /// Removes rows under `roots` that were not seen since `scan_time`.
    pub fn prune_unseen(&self, roots: &[PathBuf], scan_time: i64) -> Result<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, path FROM videos WHERE last_seen < ?1")?;
        let stale: Vec<(i64, PathBuf)> = stmt
            .query_map(params![scan_time], |row| {
                Ok((row.get(0)?, PathBuf::from(row.get::<_, String>(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut deleted = 0;
        for (id, path) in stale {
            if roots.iter().any(|root| path.starts_with(root)) || roots.is_empty() {
                deleted += self
                    .conn
                    .execute("DELETE FROM videos WHERE id = ?1", params![id])?;
            }
        }

        if deleted > 0 {
            info!("Pruned {} vanished videos from the index", deleted);
        }
        Ok(deleted)
    }

    /// Number of indexed videos.
    pub fn video_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Handles database corruption by backing up and rebuilding.
    pub fn handle_corruption(path: &Path) -> Result<Self> {
        warn!("Handling potential database corruption at {:?}", path);

        let backup_path = path.with_extension("sqlite.corrupted");
        if path.exists() {
            std::fs::rename(path, &backup_path).with_context(|| {
                format!("Failed to backup corrupted database to {:?}", backup_path)
            })?;
            warn!("Backed up corrupted database to {:?}", backup_path);
        }

        Self::open(path)
    }

    /// Current unix time in seconds.
    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(path: &str, mtime: i64) -> IndexEntry {
        IndexEntry {
            path: PathBuf::from(path),
            title: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned(),
            duration_ms: Some(1500),
            mtime,
            size: 1024,
        }
    }

    #[test]
    fn test_open_and_create() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/index.sqlite");

        let store = MediaStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.video_count().unwrap(), 0);
    }

    #[test]
    fn test_query_orders_newest_first() {
        let mut store = MediaStore::open_in_memory().unwrap();
        store
            .upsert_batch(
                &[
                    entry("/b/y.mp4", 100),
                    entry("/a/x.mp4", 200),
                    entry("/c/z.mp4", 150),
                ],
                1000,
            )
            .unwrap();

        let rows = store.query_videos().unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["x.mp4", "z.mp4", "y.mp4"]);
        assert_eq!(rows[0].duration_ms, 1500);
        assert_eq!(rows[0].size, 1024);
    }

    #[test]
    fn test_upsert_preserves_id_and_date_added() {
        let mut store = MediaStore::open_in_memory().unwrap();
        store.upsert_batch(&[entry("/a/x.mp4", 200)], 1000).unwrap();
        let first = store.query_videos().unwrap().remove(0);

        let mut changed = entry("/a/x.mp4", 900);
        changed.size = 4096;
        store.upsert_batch(&[changed], 2000).unwrap();
        let second = store.query_videos().unwrap().remove(0);

        assert_eq!(first.id, second.id);
        assert_eq!(second.date_added, 200);
        assert_eq!(second.size, 4096);
        assert_eq!(store.video_count().unwrap(), 1);
    }

    #[test]
    fn test_prune_unseen_only_within_roots() {
        let mut store = MediaStore::open_in_memory().unwrap();
        store
            .upsert_batch(&[entry("/lib/a.mp4", 1), entry("/other/b.mp4", 1)], 1000)
            .unwrap();
        store.upsert_batch(&[entry("/lib/c.mp4", 1)], 2000).unwrap();

        let pruned = store.prune_unseen(&[PathBuf::from("/lib")], 2000).unwrap();
        assert_eq!(pruned, 1);

        let paths: Vec<_> = store
            .query_videos()
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect();
        assert!(paths.contains(&PathBuf::from("/other/b.mp4")));
        assert!(paths.contains(&PathBuf::from("/lib/c.mp4")));
        assert!(!paths.contains(&PathBuf::from("/lib/a.mp4")));
    }

    #[test]
    fn test_cache_map() {
        let mut store = MediaStore::open_in_memory().unwrap();
        store.upsert_batch(&[entry("/a/x.mp4", 200)], 1000).unwrap();

        let map = store.get_cache_map().unwrap();
        let cached = map.get(Path::new("/a/x.mp4")).unwrap();
        assert_eq!(
            *cached,
            CachedFile {
                mtime: 200,
                size: 1024,
                duration_ms: Some(1500)
            }
        );
    }

    #[test]
    fn test_handle_corruption_rebuilds() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("index.sqlite");
        std::fs::write(&db_path, b"definitely not sqlite").unwrap();

        let store = MediaStore::open_or_rebuild(&db_path).unwrap();
        assert_eq!(store.video_count().unwrap(), 0);
        assert!(dir.path().join("index.sqlite.corrupted").exists());
    }
}
