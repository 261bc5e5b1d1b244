//! Gateway from raw index rows to gallery records.

use std::sync::Arc;

use tracing::{debug, error};

use crate::aggregator::filter_by_folder;
use crate::error::GalleryError;
use crate::index::MediaIndex;
use crate::models::{ThumbnailRef, VideoRecord};
use crate::thumbnails::ThumbnailLocator;

/// Queries the media index and derives content and thumbnail references.
pub struct MediaGateway {
    index: Arc<dyn MediaIndex>,
    thumbnails: ThumbnailLocator,
}

impl MediaGateway {
    pub fn new(index: Arc<dyn MediaIndex>, thumbnails: ThumbnailLocator) -> Self {
        Self { index, thumbnails }
    }

    /// All videos, newest first. Failures are logged and yield an empty list,
    /// so callers cannot tell "no videos" from "query failed".
    pub fn list_all_videos(&self) -> Vec<VideoRecord> {
        match self.try_list_all_videos() {
            Ok(videos) => videos,
            Err(e) => {
                error!("Error fetching videos: {}", e);
                Vec::new()
            }
        }
    }

    /// All videos, newest first, surfacing index failures.
    pub fn try_list_all_videos(&self) -> Result<Vec<VideoRecord>, GalleryError> {
        let rows = self.index.query_videos()?;
        let videos: Vec<VideoRecord> = rows
            .into_iter()
            .map(|row| {
                let thumbnail = Some(self.thumbnail_for(row.id));
                VideoRecord::from_row(row, thumbnail)
            })
            .collect();
        debug!("Gateway produced {} video records", videos.len());
        Ok(videos)
    }

    /// Videos whose parent directory is exactly `folder_path`.
    pub fn videos_in_folder(&self, folder_path: &str) -> Result<Vec<VideoRecord>, GalleryError> {
        let videos = self.try_list_all_videos()?;
        Ok(filter_by_folder(&videos, folder_path))
    }

    /// Conventional thumbnail location for a video id. No I/O.
    pub fn thumbnail_for(&self, id: i64) -> ThumbnailRef {
        self.thumbnails.locate(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndexRow;
    use std::path::PathBuf;

    struct FixedIndex(Result<Vec<IndexRow>, GalleryError>);

    impl MediaIndex for FixedIndex {
        fn query_videos(&self) -> Result<Vec<IndexRow>, GalleryError> {
            self.0.clone()
        }
    }

    fn row(id: i64, path: &str, added: i64) -> IndexRow {
        IndexRow {
            id,
            display_name: path.rsplit('/').next().unwrap().to_string(),
            path: PathBuf::from(path),
            duration_ms: 0,
            size: 0,
            date_added: added,
        }
    }

    fn gateway(result: Result<Vec<IndexRow>, GalleryError>) -> MediaGateway {
        MediaGateway::new(
            Arc::new(FixedIndex(result)),
            ThumbnailLocator::new(PathBuf::from("/thumbs")),
        )
    }

    #[test]
    fn test_lists_records_in_index_order() {
        let gateway = gateway(Ok(vec![row(1, "/a/x.mp4", 200), row(2, "/b/y.mp4", 100)]));
        let videos = gateway.list_all_videos();
        let ids: Vec<_> = videos.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(videos[0].thumbnail, Some(gateway.thumbnail_for(1)));
    }

    #[test]
    fn test_lenient_listing_swallows_failures() {
        let gateway = gateway(Err(GalleryError::IndexQuery("unavailable".into())));
        assert!(gateway.list_all_videos().is_empty());
        assert!(gateway.try_list_all_videos().is_err());
    }

    #[test]
    fn test_folder_query_filters_by_parent() {
        let gateway = gateway(Ok(vec![
            row(1, "/a/x.mp4", 300),
            row(2, "/b/y.mp4", 200),
            row(3, "/a/z.mp4", 100),
        ]));
        let ids: Vec<_> = gateway
            .videos_in_folder("/a")
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
