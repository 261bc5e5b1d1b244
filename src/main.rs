mod aggregator;
mod app;
mod config;
mod error;
mod i18n;
mod index;
mod models;
mod permission;
mod scanner;
mod store;
mod thumbnails;
mod ui;
mod video;

use std::time::Duration;

use app::VGalleryApp;
use tracing_subscriber::EnvFilter;

fn main() {
    // Prefer C numeric locale up-front; GTK may later adjust locale again.
    std::env::set_var("LC_NUMERIC", "C");
    unsafe {
        libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast());
    }

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "vgallery=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vgallery-rt")
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let app = VGalleryApp::new(runtime.handle().clone());
    let code = app.run();

    drop(app);
    runtime.shutdown_timeout(Duration::from_secs(1));
    std::process::exit(code);
}
