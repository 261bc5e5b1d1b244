use std::path::Path;

use super::video::ThumbnailRef;

/// Folder name used when a video has no parent directory.
pub const UNKNOWN_FOLDER: &str = "Unknown Folder";

/// A directory holding at least one indexed video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    /// The folder's path, used as a stable key.
    pub id: String,
    pub name: String,
    pub path: String,
    /// Borrowed from the first video seen in the folder.
    pub thumbnail: Option<ThumbnailRef>,
    pub video_count: usize,
}

/// Base name of the parent directory, or [`UNKNOWN_FOLDER`].
pub fn folder_name_for(path: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_FOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_names() {
        assert_eq!(folder_name_for(Path::new("/a/b/c.mp4")), "b");
        assert_eq!(folder_name_for(Path::new("/c.mp4")), UNKNOWN_FOLDER);
        assert_eq!(folder_name_for(Path::new("c.mp4")), UNKNOWN_FOLDER);
    }
}
