//! In-memory layer over the on-disk thumbnails.
//!
//! Decoded thumbnails are kept in an LRU bounded by an approximate byte
//! budget. The disk layer is the thumbnail directory itself, addressed by
//! `ThumbnailLocator`, so this cache only keys on thumbnail paths.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Default memory cache size in megabytes.
pub const DEFAULT_MAX_MEMORY_MB: usize = 128;

/// Minimum memory cache size in megabytes.
const MIN_MEMORY_MB: usize = 16;

/// Maximum memory cache size in megabytes.
const MAX_MEMORY_MB: usize = 512;

/// Estimated bytes per pixel for RGBA textures.
pub const BYTES_PER_PIXEL: usize = 4;

/// Entry count cap, independent of the byte budget.
const DEFAULT_LRU_CAPACITY: usize = 4096;

struct Entry<T> {
    value: T,
    bytes: usize,
}

struct Inner<T> {
    entries: LruCache<PathBuf, Entry<T>>,
    max_bytes: usize,
    current_bytes: usize,
}

/// Shared LRU of decoded thumbnails. Cloning shares the same storage.
pub struct ThumbnailCache<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for ThumbnailCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> ThumbnailCache<T> {
    /// Budget in megabytes, clamped to a sane range.
    pub fn new(max_memory_mb: usize) -> Self {
        let max_memory_mb = max_memory_mb.clamp(MIN_MEMORY_MB, MAX_MEMORY_MB);
        debug!(max_memory_mb, "Initialized thumbnail memory cache");
        Self::with_budget_bytes(max_memory_mb * 1024 * 1024)
    }

    pub fn with_budget_bytes(max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::new(capacity),
                max_bytes,
                current_bytes: 0,
            })),
        }
    }

    /// Look up a thumbnail and mark it as recently used.
    pub fn get(&self, key: &Path) -> Option<T> {
        let mut inner = self.inner.lock();
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn contains(&self, key: &Path) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Insert a decoded thumbnail, evicting least recently used entries
    /// until the byte budget holds again. The newest entry is never evicted.
    pub fn insert(&self, key: PathBuf, value: T, bytes: usize) {
        let mut inner = self.inner.lock();

        if let Some((_, old)) = inner.entries.push(key, Entry { value, bytes }) {
            inner.current_bytes = inner.current_bytes.saturating_sub(old.bytes);
        }
        inner.current_bytes += bytes;

        while inner.current_bytes > inner.max_bytes && inner.entries.len() > 1 {
            match inner.entries.pop_lru() {
                Some((evicted, entry)) => {
                    trace!(?evicted, "Evicted thumbnail from memory cache");
                    inner.current_bytes = inner.current_bytes.saturating_sub(entry.bytes);
                }
                None => break,
            }
        }
    }

    pub fn remove(&self, key: &Path) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.pop(key) {
            inner.current_bytes = inner.current_bytes.saturating_sub(entry.bytes);
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.current_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate memory held by cached thumbnails, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.inner.lock().current_bytes
    }
}

/// Byte estimate for an RGBA thumbnail of the given size.
pub fn texture_bytes(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> PathBuf {
        PathBuf::from(format!("/thumbs/{name}.jpg"))
    }

    #[test]
    fn test_budget_evicts_least_recently_used() {
        let cache = ThumbnailCache::with_budget_bytes(300);
        cache.insert(key("a"), 1, 100);
        cache.insert(key("b"), 2, 100);
        cache.insert(key("c"), 3, 100);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get(&key("a")), Some(1));
        cache.insert(key("d"), 4, 100);

        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("a")));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.memory_usage(), 300);
    }

    #[test]
    fn test_replacing_entry_updates_usage() {
        let cache = ThumbnailCache::with_budget_bytes(1000);
        cache.insert(key("a"), 1, 400);
        cache.insert(key("a"), 2, 100);
        assert_eq!(cache.get(&key("a")), Some(2));
        assert_eq!(cache.memory_usage(), 100);

        cache.remove(&key("a"));
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
    }

    #[test]
    fn test_oversized_entry_is_kept_alone() {
        let cache = ThumbnailCache::with_budget_bytes(50);
        cache.insert(key("a"), 1, 10);
        cache.insert(key("big"), 2, 500);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key("big")));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ThumbnailCache::new(DEFAULT_MAX_MEMORY_MB);
        let other = cache.clone();
        other.insert(key("a"), "tex", texture_bytes(455, 256));
        assert_eq!(cache.get(&key("a")), Some("tex"));
        assert_eq!(cache.memory_usage(), 455 * 256 * 4);

        cache.clear();
        assert!(other.is_empty());
    }
}
