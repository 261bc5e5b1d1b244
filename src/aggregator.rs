//! Folder grouping over the flat video list.

use std::collections::HashMap;

use crate::models::{FolderSummary, VideoRecord};

/// Groups videos by `folder_name` in a single pass.
///
/// The first video seen in a bucket supplies the folder's path and thumbnail,
/// so with index order (newest first) the newest video represents the folder.
/// Folders are returned in first-seen order.
pub fn group_by_folder(videos: &[VideoRecord]) -> Vec<FolderSummary> {
    let mut folders: Vec<FolderSummary> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for video in videos {
        match slots.get(video.folder_name.as_str()) {
            Some(&slot) => folders[slot].video_count += 1,
            None => {
                let path = video.parent_path();
                slots.insert(video.folder_name.as_str(), folders.len());
                folders.push(FolderSummary {
                    id: path.clone(),
                    name: video.folder_name.clone(),
                    path,
                    thumbnail: video.thumbnail.clone(),
                    video_count: 1,
                });
            }
        }
    }

    folders
}

/// Videos whose parent path string equals `folder_path` exactly.
///
/// No normalization happens: a trailing slash or a symlinked spelling of the
/// same directory does not match.
pub fn filter_by_folder(videos: &[VideoRecord], folder_path: &str) -> Vec<VideoRecord> {
    videos
        .iter()
        .filter(|video| video.parent_path() == folder_path)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexRow, ThumbnailRef, UNKNOWN_FOLDER};
    use std::path::PathBuf;

    fn video(id: i64, path: &str) -> VideoRecord {
        VideoRecord::from_row(
            IndexRow {
                id,
                display_name: format!("{id}.mp4"),
                path: PathBuf::from(path),
                duration_ms: 1000,
                size: 10,
                date_added: 1000 - id,
            },
            Some(ThumbnailRef::new(PathBuf::from(format!("/thumbs/{id}.jpg")))),
        )
    }

    fn sample() -> Vec<VideoRecord> {
        vec![
            video(1, "/home/me/Camera/a.mp4"),
            video(2, "/home/me/Movies/b.mp4"),
            video(3, "/home/me/Camera/c.mp4"),
            video(4, "/mnt/usb/Camera/d.mp4"),
            video(5, "e.mp4"),
        ]
    }

    #[test]
    fn test_counts_sum_to_input_length() {
        let videos = sample();
        let folders = group_by_folder(&videos);
        let total: usize = folders.iter().map(|f| f.video_count).sum();
        assert_eq!(total, videos.len());

        for folder in &folders {
            let expected = videos.iter().filter(|v| v.folder_name == folder.name).count();
            assert_eq!(folder.video_count, expected);
            assert!(folder.video_count >= 1);
        }
    }

    #[test]
    fn test_first_seen_video_represents_folder() {
        let folders = group_by_folder(&sample());
        let camera = folders.iter().find(|f| f.name == "Camera").unwrap();
        // Same base name in two locations shares one bucket.
        assert_eq!(camera.video_count, 3);
        assert_eq!(camera.path, "/home/me/Camera");
        assert_eq!(camera.id, camera.path);
        assert_eq!(
            camera.thumbnail,
            Some(ThumbnailRef::new(PathBuf::from("/thumbs/1.jpg")))
        );
    }

    #[test]
    fn test_parentless_video_lands_in_unknown_folder() {
        let folders = group_by_folder(&sample());
        let unknown = folders.iter().find(|f| f.name == UNKNOWN_FOLDER).unwrap();
        assert_eq!(unknown.video_count, 1);
        assert_eq!(unknown.path, "");
    }

    #[test]
    fn test_empty_input_has_no_folders() {
        assert!(group_by_folder(&[]).is_empty());
    }

    #[test]
    fn test_two_folder_scenario() {
        let videos = vec![video(1, "/a/x.mp4"), video(2, "/b/y.mp4")];
        let mut folders: Vec<_> = group_by_folder(&videos)
            .into_iter()
            .map(|f| (f.name, f.video_count))
            .collect();
        folders.sort();
        assert_eq!(folders, vec![("a".to_string(), 1), ("b".to_string(), 1)]);
    }

    #[test]
    fn test_filter_matches_exact_parent() {
        let videos = sample();
        let ids: Vec<_> = filter_by_folder(&videos, "/home/me/Camera")
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_filter_does_not_normalize() {
        let videos = sample();
        assert!(filter_by_folder(&videos, "/home/me/Camera/").is_empty());
        assert!(filter_by_folder(&videos, "/nowhere").is_empty());
    }
}
