//! Thumbnail pipeline for the video gallery.
//!
//! This module provides:
//! - `ThumbnailLocator` - Maps a video id to its conventional thumbnail path
//! - `ThumbnailGenerator` - Grabs a frame with ffmpeg and scales it
//! - `ThumbnailCache` - Memory-bounded LRU of decoded thumbnails
//! - `ThumbnailQueue` - Worker queue for background generation

pub mod cache;
pub mod generator;
pub mod locator;
pub mod queue;

pub use cache::ThumbnailCache;
pub use generator::{ThumbnailGenerator, DEFAULT_THUMB_HEIGHT};
pub use locator::ThumbnailLocator;
pub use queue::{ThumbnailJob, ThumbnailQueue, ThumbnailReady};
