use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::models::ThumbnailRef;

/// Bump when the thumbnail naming scheme changes.
const THUMB_NAMING_VERSION: u8 = 1;

/// Pure mapping from video id to thumbnail file inside the cache directory.
#[derive(Debug, Clone)]
pub struct ThumbnailLocator {
    dir: PathBuf,
}

impl ThumbnailLocator {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<xxh3 of id>.jpg`. Performs no I/O.
    pub fn locate(&self, video_id: i64) -> ThumbnailRef {
        let mut data = [0u8; 9];
        data[0] = THUMB_NAMING_VERSION;
        data[1..].copy_from_slice(&video_id.to_le_bytes());
        ThumbnailRef::new(self.dir.join(format!("{:016x}.jpg", xxh3_64(&data))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_is_deterministic() {
        let locator = ThumbnailLocator::new(PathBuf::from("/cache/thumbs"));
        assert_eq!(locator.locate(42), locator.locate(42));
        assert_ne!(locator.locate(42), locator.locate(43));
    }

    #[test]
    fn test_locate_stays_in_directory() {
        let locator = ThumbnailLocator::new(PathBuf::from("/cache/thumbs"));
        let thumb = locator.locate(-1);
        assert_eq!(thumb.path().parent(), Some(Path::new("/cache/thumbs")));
        let name = thumb.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), "0123456789abcdef.jpg".len());
        assert!(name.ends_with(".jpg"));
        assert!(!thumb.exists());
    }
}
