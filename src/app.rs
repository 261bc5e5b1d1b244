use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use gtk4::prelude::*;
use gtk4::{gio, Application};
use tokio::runtime::Handle;

use crate::config::GalleryConfig;
use crate::index::{MediaGateway, SqliteMediaIndex};
use crate::permission::LibraryAccessGate;
use crate::store::GalleryStore;
use crate::thumbnails::queue::DEFAULT_WORKERS;
use crate::thumbnails::{ThumbnailLocator, ThumbnailQueue, DEFAULT_THUMB_HEIGHT};
use crate::ui::MainWindow;

const APP_ID: &str = "com.vgallery.VideoGallery";

/// Long-lived services handed to the main window.
pub struct AppContext {
    pub config: GalleryConfig,
    pub runtime: Handle,
    pub index: Arc<SqliteMediaIndex>,
    pub store: GalleryStore,
    pub gate: LibraryAccessGate,
    pub thumbnails: ThumbnailQueue,
}

impl AppContext {
    pub fn init(cli_roots: &[PathBuf], runtime: Handle) -> Result<Self> {
        let config = GalleryConfig::resolve(cli_roots)?;

        std::fs::create_dir_all(&config.thumb_dir).with_context(|| {
            format!("Failed to create thumbnail directory: {:?}", config.thumb_dir)
        })?;

        let index = Arc::new(
            SqliteMediaIndex::open(&config.index_path, config.scan.clone())
                .context("Failed to open media index")?,
        );
        let gateway = Arc::new(MediaGateway::new(
            index.clone(),
            ThumbnailLocator::new(config.thumb_dir.clone()),
        ));
        let store = GalleryStore::new(gateway, config.locale);
        let gate = LibraryAccessGate::new(config.library_roots.clone());
        let thumbnails = ThumbnailQueue::new(DEFAULT_WORKERS, DEFAULT_THUMB_HEIGHT)?;

        Ok(Self {
            config,
            runtime,
            index,
            store,
            gate,
            thumbnails,
        })
    }
}

pub struct VGalleryApp {
    app: Application,
}

impl VGalleryApp {
    pub fn new(runtime: Handle) -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        let activate_runtime = runtime.clone();
        app.connect_activate(move |app| Self::present(app, &[], &activate_runtime));
        app.connect_open(move |app, files, _hint| {
            let roots: Vec<PathBuf> = files.iter().filter_map(|f| f.path()).collect();
            Self::present(app, &roots, &runtime);
        });

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn present(app: &Application, roots: &[PathBuf], runtime: &Handle) {
        if let Some(window) = app.active_window() {
            window.present();
            return;
        }

        match AppContext::init(roots, runtime.clone()) {
            Ok(ctx) => {
                let window = MainWindow::new(app, ctx);
                window.present();
                window.start();
                // Keep the window alive by storing it on the Application.
                unsafe {
                    app.set_data("main-window", window);
                }
            }
            Err(e) => {
                tracing::error!("Failed to start the gallery: {:#}", e);
                app.quit();
            }
        }
    }
}
