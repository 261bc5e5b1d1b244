//! Thumbnail generation for video files.
//!
//! A single frame is pulled through ffmpeg as PNG on stdout, then scaled with
//! the image crate to approximately 256px height and stored as JPEG.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

/// Default target height for thumbnails in pixels.
pub const DEFAULT_THUMB_HEIGHT: u32 = 256;

/// Minimum width for thumbnails (to handle extreme aspect ratios).
const MIN_THUMB_WIDTH: u32 = 64;

/// Maximum width for thumbnails.
const MAX_THUMB_WIDTH: u32 = 1024;

/// JPEG quality for thumbnail encoding (0-100).
const JPEG_QUALITY: u8 = 85;

/// Many videos open on a black frame, so try one second in first.
const FRAME_TIMESTAMPS: [&str; 2] = ["00:00:01.000", "00:00:00.000"];

pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Generate a thumbnail for `src` at `dst`, returning its dimensions.
    pub fn generate(src: &Path, dst: &Path, target_height: u32) -> Result<(u32, u32)> {
        debug!(?src, ?dst, target_height, "Generating thumbnail");

        let frame = Self::extract_frame(src)?;
        let (src_width, src_height) = frame.dimensions();
        let (thumb_width, thumb_height) =
            Self::calculate_dimensions(src_width, src_height, target_height);

        let thumbnail = frame.resize_exact(thumb_width, thumb_height, FilterType::CatmullRom);

        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create thumbnail directory: {:?}", parent))?;
        }

        // Write next to the target and rename, so readers never see a partial JPEG.
        let partial = dst.with_extension("jpg.part");
        Self::save_thumbnail(&thumbnail, &partial)?;
        std::fs::rename(&partial, dst)
            .with_context(|| format!("Failed to move thumbnail into place: {:?}", dst))?;

        Ok((thumb_width, thumb_height))
    }

    fn extract_frame(src: &Path) -> Result<DynamicImage> {
        let mut last_err = None;
        for timestamp in FRAME_TIMESTAMPS {
            match Self::ffmpeg_frame(src, timestamp) {
                Ok(frame) => return Ok(frame),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no frame timestamps to try")))
    }

    fn ffmpeg_frame(src: &Path, timestamp: &str) -> Result<DynamicImage> {
        let output = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(timestamp)
            .arg("-i")
            .arg(src)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("png")
            .arg("-")
            .output()
            .context("Failed to run ffmpeg")?;

        if !output.status.success() || output.stdout.is_empty() {
            bail!(
                "ffmpeg produced no frame at {} for {:?}: {}",
                timestamp,
                src,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)
            .context("Failed to decode ffmpeg frame")
    }

    /// Calculate thumbnail dimensions preserving aspect ratio.
    ///
    /// Width is clamped to MIN_THUMB_WIDTH..MAX_THUMB_WIDTH to handle extreme aspect ratios.
    fn calculate_dimensions(src_width: u32, src_height: u32, target_height: u32) -> (u32, u32) {
        if src_height == 0 || src_width == 0 {
            return (target_height, target_height);
        }

        let target_height = target_height.min(src_height).max(1);
        let aspect = src_width as f64 / src_height as f64;
        let width = (target_height as f64 * aspect).round() as u32;
        (width.clamp(MIN_THUMB_WIDTH, MAX_THUMB_WIDTH), target_height)
    }

    fn save_thumbnail(img: &DynamicImage, dst: &Path) -> Result<()> {
        use image::codecs::jpeg::JpegEncoder;
        use std::fs::File;
        use std::io::BufWriter;

        let file = File::create(dst)
            .with_context(|| format!("Failed to create thumbnail file: {:?}", dst))?;
        let mut writer = BufWriter::new(file);

        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .with_context(|| format!("Failed to encode thumbnail: {:?}", dst))?;

        debug!(?dst, "Saved thumbnail");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_calculate_dimensions_landscape() {
        assert_eq!(
            ThumbnailGenerator::calculate_dimensions(1920, 1080, 256),
            (455, 256)
        );
    }

    #[test]
    fn test_calculate_dimensions_never_upscales() {
        assert_eq!(
            ThumbnailGenerator::calculate_dimensions(320, 180, 256),
            (320, 180)
        );
    }

    #[test]
    fn test_calculate_dimensions_extremes() {
        assert_eq!(ThumbnailGenerator::calculate_dimensions(0, 0, 256), (256, 256));
        assert_eq!(
            ThumbnailGenerator::calculate_dimensions(10, 2000, 256),
            (MIN_THUMB_WIDTH, 256)
        );
        assert_eq!(
            ThumbnailGenerator::calculate_dimensions(20000, 300, 256),
            (MAX_THUMB_WIDTH, 256)
        );
    }

    #[test]
    fn test_save_thumbnail_writes_jpeg() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("t.jpg");
        let img = DynamicImage::new_rgb8(8, 4);
        ThumbnailGenerator::save_thumbnail(&img, &dst).unwrap();

        let bytes = std::fs::read(&dst).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_generate_fails_for_missing_source() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("t.jpg");
        let result = ThumbnailGenerator::generate(&dir.path().join("missing.mp4"), &dst, 256);
        assert!(result.is_err());
        assert!(!dst.exists());
    }
}
