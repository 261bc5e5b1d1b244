use crate::models::{FolderSummary, VideoRecord};

/// Grid or list presentation of the video and folder collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Grid => Self::List,
            Self::List => Self::Grid,
        }
    }

    pub fn is_grid(self) -> bool {
        self == Self::Grid
    }
}

/// Snapshot of everything the gallery screens render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryState {
    /// Every indexed video, newest first.
    pub videos: Vec<VideoRecord>,
    /// Folders derived from `videos`.
    pub folders: Vec<FolderSummary>,
    /// `videos` filtered to `current_folder`, or all of `videos`.
    pub current_videos: Vec<VideoRecord>,
    /// `None` while viewing all videos.
    pub current_folder: Option<FolderSummary>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub view_mode: ViewMode,
}

impl GalleryState {
    pub fn is_grid_view(&self) -> bool {
        self.view_mode.is_grid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_empty_grid() {
        let state = GalleryState::default();
        assert!(state.videos.is_empty());
        assert!(state.current_folder.is_none());
        assert!(!state.is_loading);
        assert!(state.is_grid_view());
    }

    #[test]
    fn test_view_mode_toggles() {
        assert_eq!(ViewMode::Grid.toggled(), ViewMode::List);
        assert_eq!(ViewMode::List.toggled().toggled(), ViewMode::List);
    }
}
