//! Read access to the video library.
//!
//! The gallery only needs to read the library roots. Access is checked on
//! startup and again whenever the window regains focus, so fixing
//! permissions outside the app takes effect without a restart.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Granted,
    Denied,
}

impl AccessStatus {
    pub fn is_granted(self) -> bool {
        self == AccessStatus::Granted
    }
}

pub trait AccessGate {
    fn check(&self) -> AccessStatus;
}

/// Granted when at least one library root is a directory we can list.
#[derive(Debug, Clone)]
pub struct LibraryAccessGate {
    roots: Vec<PathBuf>,
}

impl LibraryAccessGate {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

fn is_readable_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(_) => true,
        Err(e) => {
            debug!(?path, "Library root not readable: {}", e);
            false
        }
    }
}

impl AccessGate for LibraryAccessGate {
    fn check(&self) -> AccessStatus {
        if self.roots.iter().any(|root| is_readable_dir(root)) {
            AccessStatus::Granted
        } else {
            AccessStatus::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_readable_root_grants_access() {
        let dir = tempdir().unwrap();
        let gate = LibraryAccessGate::new(vec![
            dir.path().join("missing"),
            dir.path().to_path_buf(),
        ]);
        assert_eq!(gate.check(), AccessStatus::Granted);
    }

    #[test]
    fn test_missing_roots_deny_access() {
        let dir = tempdir().unwrap();
        let gate = LibraryAccessGate::new(vec![dir.path().join("missing")]);
        assert_eq!(gate.check(), AccessStatus::Denied);
        assert!(!gate.check().is_granted());
    }

    #[test]
    fn test_file_root_denies_access() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(LibraryAccessGate::new(vec![file]).check(), AccessStatus::Denied);
    }

    #[test]
    fn test_no_roots_deny_access() {
        assert_eq!(LibraryAccessGate::new(Vec::new()).check(), AccessStatus::Denied);
    }
}
