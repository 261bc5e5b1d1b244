//! Start-up configuration.
//!
//! Library roots come from, in order: paths passed on the command line, the
//! `VGALLERY_LIBRARY` environment variable (`:`-separated), and finally the
//! XDG videos directory. The index database and thumbnails live under
//! `XDG_CACHE_HOME/vgallery/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use tracing::{debug, info};

use crate::i18n::Locale;
use crate::scanner::ScanConfig;

/// Environment variable listing library roots.
pub const LIBRARY_ENV: &str = "VGALLERY_LIBRARY";

const INDEX_FILE: &str = "index.sqlite";
const THUMB_DIR: &str = "thumbs";

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Directories scanned into the media index.
    pub library_roots: Vec<PathBuf>,
    /// SQLite media index location.
    pub index_path: PathBuf,
    /// Directory holding generated thumbnails.
    pub thumb_dir: PathBuf,
    pub locale: Locale,
    pub scan: ScanConfig,
}

impl GalleryConfig {
    /// Resolve the configuration from the environment and XDG directories.
    pub fn resolve(cli_roots: &[PathBuf]) -> Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "vgallery")
            .context("Failed to determine project directories")?;
        let env_roots = std::env::var(LIBRARY_ENV).ok();
        let default_root = UserDirs::new().and_then(|dirs| {
            dirs.video_dir()
                .map(Path::to_path_buf)
                .or_else(|| Some(dirs.home_dir().to_path_buf()))
        });

        let config = Self::from_parts(
            cli_roots,
            env_roots.as_deref(),
            default_root,
            proj_dirs.cache_dir(),
            Locale::from_env(),
        );
        info!(
            roots = ?config.library_roots,
            index = ?config.index_path,
            "Resolved gallery configuration"
        );
        Ok(config)
    }

    fn from_parts(
        cli_roots: &[PathBuf],
        env_roots: Option<&str>,
        default_root: Option<PathBuf>,
        cache_dir: &Path,
        locale: Locale,
    ) -> Self {
        let library_roots = if !cli_roots.is_empty() {
            debug!("Using library roots from the command line");
            cli_roots.iter().map(|p| library_root_for(p)).collect()
        } else {
            match env_roots.map(parse_library_var).filter(|r| !r.is_empty()) {
                Some(roots) => {
                    debug!("Using library roots from {}", LIBRARY_ENV);
                    roots
                }
                None => default_root.into_iter().collect(),
            }
        };

        Self {
            library_roots: dedup_roots(library_roots),
            index_path: cache_dir.join(INDEX_FILE),
            thumb_dir: cache_dir.join(THUMB_DIR),
            locale,
            scan: ScanConfig::default(),
        }
    }
}

/// Split a `:`-separated list of directories, skipping empty entries.
pub fn parse_library_var(value: &str) -> Vec<PathBuf> {
    value
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// A file passed on the command line stands for its parent directory.
fn library_root_for(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn dedup_roots(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut unique: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        if !unique.contains(&root) {
            unique.push(root);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parses_library_var() {
        assert_eq!(
            parse_library_var("/a: /b ::/c"),
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
        assert!(parse_library_var("").is_empty());
    }

    #[test]
    fn test_cli_roots_win_over_env() {
        let config = GalleryConfig::from_parts(
            &[PathBuf::from("/cli")],
            Some("/env"),
            Some(PathBuf::from("/videos")),
            Path::new("/cache/vgallery"),
            Locale::English,
        );
        assert_eq!(config.library_roots, vec![PathBuf::from("/cli")]);
        assert_eq!(config.index_path, PathBuf::from("/cache/vgallery/index.sqlite"));
        assert_eq!(config.thumb_dir, PathBuf::from("/cache/vgallery/thumbs"));
    }

    #[test]
    fn test_env_roots_win_over_default() {
        let config = GalleryConfig::from_parts(
            &[],
            Some("/env/a:/env/b:/env/a"),
            Some(PathBuf::from("/videos")),
            Path::new("/cache"),
            Locale::English,
        );
        assert_eq!(
            config.library_roots,
            vec![PathBuf::from("/env/a"), PathBuf::from("/env/b")]
        );
    }

    #[test]
    fn test_falls_back_to_default_root() {
        let config = GalleryConfig::from_parts(
            &[],
            Some("  "),
            Some(PathBuf::from("/videos")),
            Path::new("/cache"),
            Locale::English,
        );
        assert_eq!(config.library_roots, vec![PathBuf::from("/videos")]);
    }

    #[test]
    fn test_file_argument_maps_to_parent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"").unwrap();

        let config = GalleryConfig::from_parts(
            &[file],
            None,
            None,
            Path::new("/cache"),
            Locale::English,
        );
        assert_eq!(config.library_roots, vec![dir.path().to_path_buf()]);
    }
}
