//! Gallery state store.
//!
//! `GalleryStore` owns the single [`GalleryState`] and is the only place it
//! changes. Screens read snapshots and subscribe to a `watch` channel; every
//! named operation publishes a fresh snapshot.
//!
//! `load_all` and `select_folder` are tagged with a request generation. Only
//! the most recently issued request may publish its result or clear the
//! loading flag, so overlapping requests resolve to the last one issued.

pub mod state;

pub use state::{GalleryState, ViewMode};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task;
use tracing::{debug, error, info};

use crate::aggregator::{filter_by_folder, group_by_folder};
use crate::error::GalleryError;
use crate::i18n::Locale;
use crate::index::MediaGateway;
use crate::models::FolderSummary;

struct Shared {
    state: GalleryState,
    generation: u64,
}

struct Inner {
    gateway: Arc<MediaGateway>,
    locale: Locale,
    shared: Mutex<Shared>,
    publisher: watch::Sender<GalleryState>,
}

/// Cloneable handle to the gallery state.
#[derive(Clone)]
pub struct GalleryStore {
    inner: Arc<Inner>,
}

/// Clears the loading flag for its request on every exit path.
struct RequestGuard<'a> {
    store: &'a GalleryStore,
    generation: u64,
    finished: bool,
}

impl RequestGuard<'_> {
    /// Apply the request's outcome; returns false if a newer request won.
    fn complete<F>(mut self, apply: F) -> bool
    where
        F: FnOnce(&mut GalleryState),
    {
        self.finished = true;
        self.store.finish_request(self.generation, apply)
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.finish_request(self.generation, |_| {});
        }
    }
}

impl GalleryStore {
    pub fn new(gateway: Arc<MediaGateway>, locale: Locale) -> Self {
        let (publisher, _) = watch::channel(GalleryState::default());
        Self {
            inner: Arc::new(Inner {
                gateway,
                locale,
                shared: Mutex::new(Shared {
                    state: GalleryState::default(),
                    generation: 0,
                }),
                publisher,
            }),
        }
    }

    pub fn locale(&self) -> Locale {
        self.inner.locale
    }

    /// Current state.
    pub fn snapshot(&self) -> GalleryState {
        self.inner.shared.lock().state.clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<GalleryState> {
        self.inner.publisher.subscribe()
    }

    /// Reload every video from the index and regroup folders.
    ///
    /// On failure the previous videos and folders stay published and the
    /// error message is set.
    pub async fn load_all(&self) {
        let guard = self.begin_request();
        let gateway = Arc::clone(&self.inner.gateway);
        let result = run_blocking(move || gateway.try_list_all_videos()).await;

        match result {
            Ok(videos) => {
                let folders = group_by_folder(&videos);
                let (video_count, folder_count) = (videos.len(), folders.len());
                let applied = guard.complete(move |state| {
                    let active = state.current_folder.as_ref().and_then(|current| {
                        folders.iter().find(|f| f.path == current.path).cloned()
                    });
                    match active {
                        Some(folder) => {
                            state.current_videos = filter_by_folder(&videos, &folder.path);
                            state.current_folder = Some(folder);
                        }
                        None => {
                            state.current_folder = None;
                            state.current_videos = videos.clone();
                        }
                    }
                    state.videos = videos;
                    state.folders = folders;
                });
                if applied {
                    info!("Loaded {} videos in {} folders", video_count, folder_count);
                } else {
                    debug!("Discarding stale video load");
                }
            }
            Err(e) => {
                error!("Error loading videos: {}", e);
                let message = self.inner.locale.load_failed(&e.cause());
                guard.complete(move |state| state.error = Some(message));
            }
        }
    }

    /// Show only the videos directly inside `folder`.
    ///
    /// The subset is taken from the published `videos`, so it never holds
    /// rows the last load has not seen. The index query only decides whether
    /// the folder can be opened. On failure the current subset and active
    /// folder are left as they were.
    pub async fn select_folder(&self, folder: FolderSummary) {
        let guard = self.begin_request();
        let gateway = Arc::clone(&self.inner.gateway);
        let folder_path = folder.path.clone();
        let result = run_blocking(move || gateway.videos_in_folder(&folder_path)).await;

        match result {
            Ok(_) => {
                let name = folder.name.clone();
                let mut count = 0;
                if guard.complete(|state| {
                    state.current_videos = filter_by_folder(&state.videos, &folder.path);
                    count = state.current_videos.len();
                    state.current_folder = Some(folder);
                }) {
                    info!("Opened folder {} with {} videos", name, count);
                } else {
                    debug!("Discarding stale folder selection for {}", name);
                }
            }
            Err(e) => {
                error!("Error loading folder videos: {}", e);
                let message = self.inner.locale.folder_load_failed(&e.cause());
                guard.complete(move |state| state.error = Some(message));
            }
        }
    }

    /// Return to all videos without querying the index.
    pub fn show_all(&self) {
        self.update(|state| {
            state.current_videos = state.videos.clone();
            state.current_folder = None;
            state.error = None;
        });
    }

    pub fn toggle_view_mode(&self) {
        self.update(|state| state.view_mode = state.view_mode.toggled());
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    /// Library access was refused.
    ///
    /// Any in-flight load is superseded so its result never replaces the
    /// denial message.
    pub fn set_permission_denied(&self) {
        let message = self.inner.locale.permission_denied().to_string();
        let mut shared = self.inner.shared.lock();
        shared.generation = shared.generation.wrapping_add(1);
        shared.state.is_loading = false;
        shared.state.error = Some(message);
        self.inner.publisher.send_replace(shared.state.clone());
        info!("Library access denied");
    }

    /// Surface a player failure.
    pub fn set_playback_error(&self, err: &GalleryError) {
        let message = self.inner.locale.playback_failed(&err.cause());
        self.update(|state| state.error = Some(message));
    }

    fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut GalleryState),
    {
        let mut shared = self.inner.shared.lock();
        apply(&mut shared.state);
        self.inner.publisher.send_replace(shared.state.clone());
    }

    fn begin_request(&self) -> RequestGuard<'_> {
        let mut shared = self.inner.shared.lock();
        shared.generation = shared.generation.wrapping_add(1);
        shared.state.is_loading = true;
        shared.state.error = None;
        self.inner.publisher.send_replace(shared.state.clone());
        RequestGuard {
            store: self,
            generation: shared.generation,
            finished: false,
        }
    }

    fn finish_request<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut GalleryState),
    {
        let mut shared = self.inner.shared.lock();
        if shared.generation != generation {
            return false;
        }
        apply(&mut shared.state);
        shared.state.is_loading = false;
        self.inner.publisher.send_replace(shared.state.clone());
        true
    }
}

/// Run an index call off the async workers.
async fn run_blocking<T, F>(call: F) -> Result<T, GalleryError>
where
    F: FnOnce() -> Result<T, GalleryError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(call)
        .await
        .map_err(|e| GalleryError::IndexQuery(format!("index task failed: {e}")))?
}
