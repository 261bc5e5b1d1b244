//! Background thumbnail generation.
//!
//! - Bounded worker pool fed through a flume channel
//! - Duplicate requests for a thumbnail already in flight are dropped
//! - Completions are delivered on an async channel so the GTK main loop can
//!   await them without polling

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::generator::ThumbnailGenerator;
use crate::models::ThumbnailRef;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 2;

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of pending requests in the queue.
const MAX_QUEUE_SIZE: usize = 256;

/// A video whose thumbnail should be written to `target`.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub source: PathBuf,
    pub target: ThumbnailRef,
}

/// Completion notice for a job.
#[derive(Debug, Clone)]
pub struct ThumbnailReady {
    pub target: ThumbnailRef,
    pub ok: bool,
}

pub struct ThumbnailQueue {
    request_tx: Option<Sender<ThumbnailJob>>,
    result_rx: async_channel::Receiver<ThumbnailReady>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Targets currently queued or being generated.
    pending: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ThumbnailQueue {
    pub fn new(workers: usize, thumb_height: u32) -> Result<Self> {
        Self::spawn(workers.clamp(1, MAX_WORKERS), thumb_height)
    }

    fn spawn(num_workers: usize, thumb_height: u32) -> Result<Self> {
        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = async_channel::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(Mutex::new(HashSet::new()));

        let mut handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let pending = Arc::clone(&pending);

            let handle = thread::Builder::new()
                .name(format!("thumb-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, pending, thumb_height))
                .context("Failed to spawn thumbnail worker")?;
            handles.push(handle);
        }

        debug!(num_workers, "Started thumbnail worker queue");

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            workers: handles,
            shutdown,
            pending,
        })
    }

    /// Submit a job for generation.
    ///
    /// Returns false when the thumbnail already exists on disk, is already
    /// pending, or the queue is full.
    pub fn request(&self, job: ThumbnailJob) -> bool {
        if job.target.exists() {
            trace!(target = ?job.target.path(), "Thumbnail already on disk");
            return false;
        }

        let key = job.target.path().to_path_buf();
        if !self.pending.lock().insert(key.clone()) {
            trace!(?key, "Thumbnail already pending");
            return false;
        }

        let Some(tx) = &self.request_tx else {
            self.pending.lock().remove(&key);
            return false;
        };

        match tx.try_send(job) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(_)) => {
                warn!("Thumbnail queue full, dropping request");
                self.pending.lock().remove(&key);
                false
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                error!("Thumbnail queue disconnected");
                self.pending.lock().remove(&key);
                false
            }
        }
    }

    /// Completion stream. Every clone observes each result once.
    pub fn results(&self) -> async_channel::Receiver<ThumbnailReady> {
        self.result_rx.clone()
    }

    pub fn is_pending(&self, target: &ThumbnailRef) -> bool {
        self.pending.lock().contains(target.path())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Shutting down thumbnail queue");

        // Closing the request side wakes idle workers.
        self.request_tx = None;
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        self.pending.lock().clear();

        debug!("Thumbnail queue shutdown complete");
    }
}

impl Drop for ThumbnailQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<ThumbnailJob>,
    tx: async_channel::Sender<ThumbnailReady>,
    shutdown: Arc<AtomicBool>,
    pending: Arc<Mutex<HashSet<PathBuf>>>,
    thumb_height: u32,
) {
    debug!(worker_id, "Thumbnail worker started");

    while let Ok(job) = rx.recv() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let ok = job.target.exists()
            || match ThumbnailGenerator::generate(&job.source, job.target.path(), thumb_height) {
                Ok(_) => true,
                Err(e) => {
                    warn!(source = ?job.source, "Failed to generate thumbnail: {:#}", e);
                    false
                }
            };

        pending.lock().remove(job.target.path());

        if tx
            .send_blocking(ThumbnailReady {
                target: job.target,
                ok,
            })
            .is_err()
        {
            break;
        }
    }

    debug!(worker_id, "Thumbnail worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn job(dir: &std::path::Path, name: &str) -> ThumbnailJob {
        ThumbnailJob {
            source: dir.join(format!("{name}.mp4")),
            target: ThumbnailRef::new(dir.join(format!("{name}.jpg"))),
        }
    }

    #[test]
    fn test_existing_thumbnail_is_not_queued() {
        let dir = tempdir().unwrap();
        let job = job(dir.path(), "a");
        std::fs::write(job.target.path(), b"jpeg").unwrap();

        let queue = ThumbnailQueue::spawn(0, 256).unwrap();
        assert!(!queue.request(job));
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_request_is_dropped() {
        let dir = tempdir().unwrap();
        // No workers, so the first job stays pending.
        let queue = ThumbnailQueue::spawn(0, 256).unwrap();

        assert!(queue.request(job(dir.path(), "a")));
        assert!(!queue.request(job(dir.path(), "a")));
        assert!(queue.request(job(dir.path(), "b")));
        assert_eq!(queue.pending_count(), 2);
        assert!(queue.is_pending(&job(dir.path(), "a").target));
    }

    #[test]
    fn test_failed_generation_is_reported() {
        let dir = tempdir().unwrap();
        let queue = ThumbnailQueue::new(1, 256).unwrap();
        let results = queue.results();

        // The source does not exist, so generation fails either way.
        let job = job(dir.path(), "missing");
        assert!(queue.request(job.clone()));

        let ready = std::iter::repeat_with(|| results.try_recv())
            .take(200)
            .find_map(|r| {
                if r.is_err() {
                    std::thread::sleep(Duration::from_millis(50));
                }
                r.ok()
            })
            .expect("worker did not report");
        assert_eq!(ready.target, job.target);
        assert!(!ready.ok);
        assert!(!queue.is_pending(&job.target));
    }

    #[test]
    fn test_requests_after_shutdown_are_rejected() {
        let dir = tempdir().unwrap();
        let mut queue = ThumbnailQueue::new(1, 256).unwrap();
        queue.shutdown();
        assert!(!queue.request(job(dir.path(), "a")));
        assert_eq!(queue.pending_count(), 0);
    }
}
