// Video and folder tiles for the gallery grid and list

use gtk4::prelude::*;
use gtk4::{
    gdk, glib, Align, Box as GtkBox, ContentFit, Label, Orientation, Overlay, Picture, Widget,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::i18n::Locale;
use crate::models::{format_duration, format_size, FolderSummary, ThumbnailRef, VideoRecord};
use crate::store::ViewMode;
use crate::thumbnails::cache::texture_bytes;
use crate::thumbnails::{ThumbnailCache, ThumbnailJob, ThumbnailQueue, ThumbnailReady};

const GRID_THUMB_WIDTH: i32 = 240;
const GRID_THUMB_HEIGHT: i32 = 135;
const LIST_THUMB_WIDTH: i32 = 128;
const LIST_THUMB_HEIGHT: i32 = 72;

/// Binds thumbnails to pictures, generating missing ones in the background.
pub struct ThumbnailBinder {
    cache: ThumbnailCache<gdk::Texture>,
    queue: ThumbnailQueue,
    /// Pictures waiting on a thumbnail that is being generated.
    waiting: RefCell<HashMap<PathBuf, Vec<glib::WeakRef<Picture>>>>,
}

impl ThumbnailBinder {
    pub fn new(queue: ThumbnailQueue, cache: ThumbnailCache<gdk::Texture>) -> Rc<Self> {
        let binder = Rc::new(Self {
            cache,
            queue,
            waiting: RefCell::new(HashMap::new()),
        });

        let results = binder.queue.results();
        let weak = Rc::downgrade(&binder);
        glib::spawn_future_local(async move {
            while let Ok(ready) = results.recv().await {
                let Some(binder) = weak.upgrade() else {
                    break;
                };
                binder.on_ready(ready);
            }
        });

        binder
    }

    /// Show `thumbnail` in `picture`, queueing generation from `source` when
    /// the file does not exist yet.
    pub fn bind(
        &self,
        picture: &Picture,
        thumbnail: Option<&ThumbnailRef>,
        source: Option<&Path>,
    ) {
        let Some(thumbnail) = thumbnail else {
            return;
        };

        if let Some(texture) = self.load(thumbnail) {
            picture.set_paintable(Some(&texture));
            return;
        }

        let Some(source) = source else {
            return;
        };
        self.waiting
            .borrow_mut()
            .entry(thumbnail.path().to_path_buf())
            .or_default()
            .push(picture.downgrade());
        self.queue.request(ThumbnailJob {
            source: source.to_path_buf(),
            target: thumbnail.clone(),
        });
    }

    fn load(&self, thumbnail: &ThumbnailRef) -> Option<gdk::Texture> {
        if let Some(texture) = self.cache.get(thumbnail.path()) {
            return Some(texture);
        }
        if !thumbnail.exists() {
            return None;
        }

        match gdk::Texture::from_filename(thumbnail.path()) {
            Ok(texture) => {
                let bytes = texture_bytes(texture.width() as u32, texture.height() as u32);
                self.cache
                    .insert(thumbnail.path().to_path_buf(), texture.clone(), bytes);
                Some(texture)
            }
            Err(e) => {
                tracing::warn!(path = ?thumbnail.path(), "Failed to load thumbnail: {}", e);
                None
            }
        }
    }

    fn on_ready(&self, ready: ThumbnailReady) {
        let pictures = self
            .waiting
            .borrow_mut()
            .remove(ready.target.path())
            .unwrap_or_default();
        if !ready.ok || pictures.is_empty() {
            return;
        }

        if let Some(texture) = self.load(&ready.target) {
            for picture in pictures.iter().filter_map(|weak| weak.upgrade()) {
                picture.set_paintable(Some(&texture));
            }
        }
    }
}

fn thumbnail_picture(mode: ViewMode) -> Picture {
    let picture = Picture::new();
    picture.set_can_shrink(true);
    picture.set_content_fit(ContentFit::Cover);
    picture.add_css_class("tile-thumb");
    if mode.is_grid() {
        picture.set_size_request(GRID_THUMB_WIDTH, GRID_THUMB_HEIGHT);
    } else {
        picture.set_size_request(LIST_THUMB_WIDTH, LIST_THUMB_HEIGHT);
    }
    picture
}

fn badge(text: &str) -> Label {
    let label = Label::new(Some(text));
    label.set_halign(Align::End);
    label.set_valign(Align::End);
    label.set_margin_end(6);
    label.set_margin_bottom(6);
    label.add_css_class("tile-badge");
    label
}

fn title_label(text: &str) -> Label {
    let label = Label::new(Some(text));
    label.set_xalign(0.0);
    label.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
    label.add_css_class("tile-title");
    label
}

fn detail_label(text: &str) -> Label {
    let label = Label::new(Some(text));
    label.set_xalign(0.0);
    label.add_css_class("tile-detail");
    label
}

/// Grid: thumbnail with badge over a title. List: small thumbnail beside
/// the title and detail lines.
fn layout_tile(
    mode: ViewMode,
    picture: &Picture,
    badge_text: &str,
    title: &str,
    detail: &str,
) -> Widget {
    let tile = if mode.is_grid() {
        let overlay = Overlay::new();
        overlay.set_child(Some(picture));
        overlay.add_overlay(&badge(badge_text));

        let tile = GtkBox::new(Orientation::Vertical, 4);
        tile.set_size_request(GRID_THUMB_WIDTH, -1);
        tile.append(&overlay);
        let title = title_label(title);
        title.set_max_width_chars(24);
        tile.append(&title);
        tile
    } else {
        let tile = GtkBox::new(Orientation::Horizontal, 12);
        tile.append(picture);

        let text = GtkBox::new(Orientation::Vertical, 2);
        text.set_valign(Align::Center);
        text.set_hexpand(true);
        text.append(&title_label(title));
        text.append(&detail_label(detail));
        tile.append(&text);
        tile
    };

    tile.add_css_class("tile");
    tile.upcast()
}

pub fn video_tile(video: &VideoRecord, mode: ViewMode, binder: &ThumbnailBinder) -> Widget {
    let picture = thumbnail_picture(mode);
    binder.bind(&picture, video.thumbnail.as_ref(), Some(&video.path));

    let duration = format_duration(video.duration_ms);
    let detail = format!("{}  {}", duration, format_size(video.size_bytes));
    layout_tile(mode, &picture, &duration, &video.title, &detail)
}

/// `source` is the video the folder thumbnail is generated from.
pub fn folder_tile(
    folder: &FolderSummary,
    source: Option<&Path>,
    mode: ViewMode,
    locale: Locale,
    binder: &ThumbnailBinder,
) -> Widget {
    let picture = thumbnail_picture(mode);
    binder.bind(&picture, folder.thumbnail.as_ref(), source);

    let count = locale.video_count(folder.video_count);
    let tile = layout_tile(mode, &picture, &count, &folder.name, &count);
    tile.add_css_class("folder-tile");
    tile
}
