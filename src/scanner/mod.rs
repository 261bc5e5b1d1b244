//! Library scanning for the media index.
//!
//! - `LibraryScanner` walks the library roots and syncs the `videos` table
//! - `DurationProbe` reads durations from container headers

pub mod file_scanner;
pub mod metadata;

pub use file_scanner::{LibraryScanner, ScanConfig, ScanResult};
pub use metadata::DurationProbe;
