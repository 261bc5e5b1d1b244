use thiserror::Error;

/// Faults surfaced to the gallery state as user-visible messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GalleryError {
    /// The media index could not be queried.
    #[error("media index query failed: {0}")]
    IndexQuery(String),
    /// None of the library roots can be read.
    #[error("access to the video library was denied")]
    PermissionDenied,
    /// The player reported a decode or transport failure.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl GalleryError {
    /// The underlying cause without the category prefix.
    pub fn cause(&self) -> String {
        match self {
            Self::IndexQuery(cause) | Self::Playback(cause) => cause.clone(),
            Self::PermissionDenied => self.to_string(),
        }
    }
}

impl From<rusqlite::Error> for GalleryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::IndexQuery(err.to_string())
    }
}

impl From<anyhow::Error> for GalleryError {
    fn from(err: anyhow::Error) -> Self {
        Self::IndexQuery(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_strips_category() {
        let err = GalleryError::IndexQuery("disk I/O error".into());
        assert_eq!(err.cause(), "disk I/O error");
        assert_eq!(err.to_string(), "media index query failed: disk I/O error");
    }

    #[test]
    fn test_anyhow_context_is_kept() {
        let err: GalleryError = anyhow::anyhow!("locked")
            .context("Failed to query videos")
            .into();
        assert_eq!(
            err,
            GalleryError::IndexQuery("Failed to query videos: locked".into())
        );
    }
}
