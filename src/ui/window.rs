// Main window for the video gallery
// Header, All Videos / Folders tabs, folder contents, and the playback screen

use gdk4::Display;
use gtk4::prelude::*;
use gtk4::{
    Align, Application, ApplicationWindow, Box as GtkBox, Button, CssProvider, FlowBox, Label,
    Orientation, PolicyType, ScrolledWindow, SelectionMode, Settings, Spinner, Stack,
    StackTransitionType, ToggleButton, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::keybindings::{KeyAction, Keybindings, Screen};
use super::player_screen::PlaybackScreen;
use super::tiles::{self, ThumbnailBinder};
use crate::app::AppContext;
use crate::config::GalleryConfig;
use crate::i18n::Locale;
use crate::index::SqliteMediaIndex;
use crate::models::{FolderSummary, VideoRecord};
use crate::permission::{AccessGate, AccessStatus, LibraryAccessGate};
use crate::store::{GalleryState, GalleryStore, ViewMode};
use crate::thumbnails::cache::DEFAULT_MAX_MEMORY_MB;
use crate::thumbnails::ThumbnailCache;

const APP_TITLE: &str = "VGallery";
const GRID_MIN_COLUMNS: u32 = 2;
const GRID_MAX_COLUMNS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    AllVideos,
    Folders,
}

/// What the content area shows for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentPage {
    Loading,
    Error,
    Empty,
    Videos,
    Folders,
}

impl ContentPage {
    fn name(self) -> &'static str {
        match self {
            ContentPage::Loading => "loading",
            ContentPage::Error => "error",
            ContentPage::Empty => "empty",
            ContentPage::Videos => "videos",
            ContentPage::Folders => "folders",
        }
    }
}

fn content_page(state: &GalleryState, tab: Tab) -> ContentPage {
    if state.is_loading {
        return ContentPage::Loading;
    }
    if state.error.is_some() {
        return ContentPage::Error;
    }

    let (empty, page) = match (&state.current_folder, tab) {
        (Some(_), _) => (state.current_videos.is_empty(), ContentPage::Videos),
        (None, Tab::AllVideos) => (state.videos.is_empty(), ContentPage::Videos),
        (None, Tab::Folders) => (state.folders.is_empty(), ContentPage::Folders),
    };
    if empty {
        ContentPage::Empty
    } else {
        page
    }
}

/// Videos listed on the video page: the open folder, or everything.
fn shown_videos(state: &GalleryState) -> &[VideoRecord] {
    if state.current_folder.is_some() {
        &state.current_videos
    } else {
        &state.videos
    }
}

fn window_title(state: &GalleryState) -> &str {
    state
        .current_folder
        .as_ref()
        .map(|folder| folder.name.as_str())
        .unwrap_or(APP_TITLE)
}

/// The video whose thumbnail represents `folder`.
fn folder_thumbnail_source(state: &GalleryState, folder: &FolderSummary) -> Option<PathBuf> {
    let thumbnail = folder.thumbnail.as_ref()?;
    state
        .videos
        .iter()
        .find(|video| video.thumbnail.as_ref() == Some(thumbnail))
        .map(|video| video.path.clone())
}

/// CSS for terminal aesthetic
const GALLERY_CSS: &str = r#"
* {
    border-radius: 0;
    box-shadow: none;
    background-image: none;
}

window {
    background-color: #0a0a0a;
    color: #e0e0e0;
}

button {
    background-color: transparent;
    border: 1px solid #333333;
    color: #e0e0e0;
}

button:hover {
    background-color: rgba(224, 224, 224, 0.05);
    border-color: #555555;
}

button:checked {
    border-color: #00ff88;
    color: #00ff88;
}

.dir-bar {
    border-bottom: 1px solid #333333;
}

.window-title {
    color: #00ff88;
    font-weight: bold;
}

.status-bar {
    color: #888888;
    font-size: 11px;
    padding: 2px 8px;
    border-top: 1px solid #333333;
}

.tile {
    background-color: #121212;
    border: 1px solid #333333;
    padding: 4px;
}

flowboxchild:hover .tile,
flowboxchild:selected .tile {
    border-color: #00ff88;
    border-style: dashed;
}

.tile-badge {
    background-color: rgba(0, 0, 0, 0.7);
    color: #00ff88;
    padding: 1px 6px;
    font-size: 11px;
    font-weight: bold;
}

.tile-detail {
    color: #888888;
    font-size: 11px;
}

.error-card {
    border: 1px solid #ff5555;
    padding: 16px;
}

.error-title,
.error-text {
    color: #ff5555;
}

.playback {
    background-color: #000000;
}
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(GALLERY_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

fn scrolled(child: &FlowBox) -> ScrolledWindow {
    let scroller = ScrolledWindow::new();
    scroller.set_hscrollbar_policy(PolicyType::Never);
    scroller.set_vexpand(true);
    scroller.set_child(Some(child));
    scroller
}

fn new_flow() -> FlowBox {
    let flow = FlowBox::new();
    flow.set_selection_mode(SelectionMode::None);
    flow.set_activate_on_single_click(true);
    flow.set_valign(Align::Start);
    flow.set_row_spacing(8);
    flow.set_column_spacing(8);
    flow.set_margin_start(8);
    flow.set_margin_end(8);
    flow.set_margin_top(8);
    flow.set_margin_bottom(8);
    flow
}

fn configure_flow(flow: &FlowBox, mode: ViewMode) {
    if mode.is_grid() {
        flow.set_homogeneous(true);
        flow.set_min_children_per_line(GRID_MIN_COLUMNS);
        flow.set_max_children_per_line(GRID_MAX_COLUMNS);
    } else {
        flow.set_homogeneous(false);
        flow.set_min_children_per_line(1);
        flow.set_max_children_per_line(1);
    }
}

/// Main window for the video gallery
pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    stack: Stack,
    title_label: Label,
    back_button: Button,
    view_button: Button,
    rescan_button: Button,
    tab_bar: GtkBox,
    content_stack: Stack,
    spinner: Spinner,
    error_message: Label,
    video_flow: FlowBox,
    folder_flow: FlowBox,
    status_label: Label,
    playback: Rc<PlaybackScreen>,
    keybindings: Keybindings,
    binder: Rc<ThumbnailBinder>,
    store: GalleryStore,
    runtime: Handle,
    index: Arc<SqliteMediaIndex>,
    config: GalleryConfig,
    gate: LibraryAccessGate,
    locale: Locale,
    active_tab: Cell<Tab>,
    last_access: Cell<Option<AccessStatus>>,
    scanning: Cell<bool>,
    shown_videos: RefCell<Vec<VideoRecord>>,
    shown_video_mode: Cell<Option<ViewMode>>,
    shown_folders: RefCell<Vec<FolderSummary>>,
    shown_folder_mode: Cell<Option<ViewMode>>,
}

impl MainWindow {
    pub fn new(app: &Application, ctx: AppContext) -> Rc<Self> {
        load_css();
        if let Some(settings) = Settings::default() {
            settings.set_gtk_application_prefer_dark_theme(true);
        }

        let AppContext {
            config,
            runtime,
            index,
            store,
            gate,
            thumbnails,
        } = ctx;
        let locale = config.locale;

        let window = ApplicationWindow::builder()
            .application(app)
            .title(APP_TITLE)
            .default_width(1200)
            .default_height(800)
            .build();

        let stack = Stack::new();
        stack.set_transition_type(StackTransitionType::Crossfade);
        stack.set_transition_duration(150);

        let gallery_box = GtkBox::new(Orientation::Vertical, 0);

        // Header bar
        let header = GtkBox::new(Orientation::Horizontal, 8);
        header.add_css_class("dir-bar");
        header.set_margin_start(8);
        header.set_margin_end(8);
        header.set_margin_top(4);
        header.set_margin_bottom(4);

        let back_button = Button::with_label("[<]");
        back_button.set_visible(false);
        let title_label = Label::new(Some(APP_TITLE));
        title_label.set_xalign(0.0);
        title_label.set_hexpand(true);
        title_label.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        title_label.add_css_class("window-title");
        let view_button = Button::with_label("[list]");
        let rescan_button = Button::with_label("[rescan]");
        header.append(&back_button);
        header.append(&title_label);
        header.append(&view_button);
        header.append(&rescan_button);
        gallery_box.append(&header);

        // Tabs
        let tab_bar = GtkBox::new(Orientation::Horizontal, 0);
        tab_bar.set_homogeneous(true);
        tab_bar.set_margin_start(8);
        tab_bar.set_margin_end(8);
        tab_bar.set_margin_top(4);
        let all_tab = ToggleButton::with_label(locale.all_videos_tab());
        let folders_tab = ToggleButton::with_label(locale.folders_tab());
        folders_tab.set_group(Some(&all_tab));
        all_tab.set_active(true);
        tab_bar.append(&all_tab);
        tab_bar.append(&folders_tab);
        gallery_box.append(&tab_bar);

        // Content pages
        let content_stack = Stack::new();
        content_stack.set_vexpand(true);

        let spinner = Spinner::new();
        spinner.set_size_request(48, 48);
        spinner.set_halign(Align::Center);
        spinner.set_valign(Align::Center);
        content_stack.add_named(&spinner, Some(ContentPage::Loading.name()));

        let error_card = GtkBox::new(Orientation::Vertical, 8);
        error_card.add_css_class("error-card");
        error_card.set_halign(Align::Center);
        error_card.set_valign(Align::Center);
        let error_title = Label::new(Some(locale.error_title()));
        error_title.add_css_class("error-title");
        let error_message = Label::new(None);
        error_message.set_wrap(true);
        error_message.set_max_width_chars(60);
        error_message.add_css_class("error-text");
        let dismiss_button = Button::with_label(locale.dismiss());
        dismiss_button.set_halign(Align::Center);
        error_card.append(&error_title);
        error_card.append(&error_message);
        error_card.append(&dismiss_button);
        content_stack.add_named(&error_card, Some(ContentPage::Error.name()));

        let empty_label = Label::new(Some(locale.no_videos()));
        empty_label.set_halign(Align::Center);
        empty_label.set_valign(Align::Center);
        content_stack.add_named(&empty_label, Some(ContentPage::Empty.name()));

        let video_flow = new_flow();
        content_stack.add_named(&scrolled(&video_flow), Some(ContentPage::Videos.name()));
        let folder_flow = new_flow();
        content_stack.add_named(&scrolled(&folder_flow), Some(ContentPage::Folders.name()));

        gallery_box.append(&content_stack);

        let status_label = Label::new(Some(">"));
        status_label.set_xalign(0.0);
        status_label.add_css_class("status-bar");
        gallery_box.append(&status_label);

        stack.add_named(&gallery_box, Some("gallery"));

        let playback = PlaybackScreen::new(locale);
        stack.add_named(playback.widget(), Some("playback"));
        stack.set_visible_child_name("gallery");

        window.set_child(Some(&stack));

        let binder = ThumbnailBinder::new(thumbnails, ThumbnailCache::new(DEFAULT_MAX_MEMORY_MB));

        let keybindings = Keybindings::new();
        keybindings.attach(&window);

        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            stack,
            title_label,
            back_button,
            view_button,
            rescan_button,
            tab_bar,
            content_stack,
            spinner,
            error_message,
            video_flow,
            folder_flow,
            status_label,
            playback,
            keybindings,
            binder,
            store,
            runtime,
            index,
            config,
            gate,
            locale,
            active_tab: Cell::new(Tab::AllVideos),
            last_access: Cell::new(None),
            scanning: Cell::new(false),
            shown_videos: RefCell::new(Vec::new()),
            shown_video_mode: Cell::new(None),
            shown_folders: RefCell::new(Vec::new()),
            shown_folder_mode: Cell::new(None),
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        let win = Rc::downgrade(&main_window);
        main_window.back_button.connect_clicked(move |_| {
            if let Some(win) = win.upgrade() {
                win.store.show_all();
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window.view_button.connect_clicked(move |_| {
            if let Some(win) = win.upgrade() {
                win.store.toggle_view_mode();
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window.rescan_button.connect_clicked(move |_| {
            if let Some(win) = win.upgrade() {
                win.reload();
            }
        });

        let win = Rc::downgrade(&main_window);
        dismiss_button.connect_clicked(move |_| {
            if let Some(win) = win.upgrade() {
                win.store.clear_error();
            }
        });

        let win = Rc::downgrade(&main_window);
        all_tab.connect_toggled(move |button| {
            if let Some(win) = win.upgrade() {
                if button.is_active() {
                    win.set_tab(Tab::AllVideos);
                }
            }
        });

        let win = Rc::downgrade(&main_window);
        folders_tab.connect_toggled(move |button| {
            if let Some(win) = win.upgrade() {
                if button.is_active() {
                    win.set_tab(Tab::Folders);
                }
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window
            .video_flow
            .connect_child_activated(move |_flow, child| {
                let Some(win) = win.upgrade() else {
                    return;
                };
                let video = usize::try_from(child.index())
                    .ok()
                    .and_then(|i| win.shown_videos.borrow().get(i).cloned());
                if let Some(video) = video {
                    win.open_video(&video);
                }
            });

        let win = Rc::downgrade(&main_window);
        main_window
            .folder_flow
            .connect_child_activated(move |_flow, child| {
                let Some(win) = win.upgrade() else {
                    return;
                };
                let folder = usize::try_from(child.index())
                    .ok()
                    .and_then(|i| win.shown_folders.borrow().get(i).cloned());
                if let Some(folder) = folder {
                    win.open_folder(folder);
                }
            });

        let win = Rc::downgrade(&main_window);
        main_window.playback.connect_close(move || {
            if let Some(win) = win.upgrade() {
                win.show_gallery();
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window.keybindings.connect_action(move |action| {
            if let Some(win) = win.upgrade() {
                win.handle_action(action);
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window.window.connect_is_active_notify(move |window| {
            if !window.is_active() {
                return;
            }
            if let Some(win) = win.upgrade() {
                win.recheck_access();
            }
        });

        let win = Rc::downgrade(&main_window);
        main_window.window.connect_close_request(move |_| {
            if let Some(win) = win.upgrade() {
                win.playback.release_player();
            }
            glib::Propagation::Proceed
        });

        main_window
    }

    fn weak(&self) -> Weak<Self> {
        self.self_weak.borrow().clone()
    }

    pub fn present(&self) {
        self.window.present();
    }

    /// Subscribe to the store and run the first access check and load.
    pub fn start(&self) {
        let mut updates = self.store.subscribe();
        let weak = self.weak();
        glib::spawn_future_local(async move {
            loop {
                let state = updates.borrow_and_update().clone();
                match weak.upgrade() {
                    Some(win) => win.render(&state),
                    None => break,
                }
                if updates.changed().await.is_err() {
                    break;
                }
            }
        });

        self.reload();
    }

    /// Check library access, then rescan and load, or show the denial.
    fn reload(&self) {
        let status = self.gate.check();
        self.last_access.set(Some(status));
        match status {
            AccessStatus::Granted => self.rescan_and_load(),
            AccessStatus::Denied => self.store.set_permission_denied(),
        }
    }

    /// Window regained focus: pick up access granted outside the app.
    fn recheck_access(&self) {
        let status = self.gate.check();
        let previous = self.last_access.replace(Some(status));
        if previous == Some(AccessStatus::Denied) && status.is_granted() {
            tracing::info!("Library access granted, reloading");
            self.store.clear_error();
            self.rescan_and_load();
        }
    }

    fn rescan_and_load(&self) {
        if self.scanning.replace(true) {
            return;
        }
        self.rescan_button.set_sensitive(false);
        self.status_label
            .set_text(&format!("> {}", self.locale.scanning()));

        let index = self.index.clone();
        let roots = self.config.library_roots.clone();
        let store = self.store.clone();
        let task = self.runtime.spawn(async move {
            match tokio::task::spawn_blocking(move || index.rescan(&roots)).await {
                Ok(Ok(result)) => tracing::info!(?result, "Library scan finished"),
                Ok(Err(e)) => tracing::warn!("Library scan failed: {:#}", e),
                Err(e) => tracing::warn!("Library scan task failed: {}", e),
            }
            store.load_all().await;
        });

        let weak = self.weak();
        glib::spawn_future_local(async move {
            let _ = task.await;
            if let Some(win) = weak.upgrade() {
                win.scanning.set(false);
                win.rescan_button.set_sensitive(true);
                win.update_status(&win.store.snapshot());
            }
        });
    }

    fn open_folder(&self, folder: FolderSummary) {
        let store = self.store.clone();
        self.runtime.spawn(async move {
            store.select_folder(folder).await;
        });
    }

    fn open_video(&self, video: &VideoRecord) {
        let store = self.store.clone();
        self.playback.open(video, move |err| {
            tracing::warn!("Playback failed: {}", err);
            store.set_playback_error(&err);
        });
        self.stack.set_visible_child_name("playback");
        self.keybindings.set_screen(Screen::Playback);
    }

    fn show_gallery(&self) {
        self.stack.set_visible_child_name("gallery");
        self.keybindings.set_screen(Screen::Gallery);
    }

    fn handle_action(&self, action: KeyAction) {
        match action {
            KeyAction::ClosePlayback => self.playback.request_close(),
            KeyAction::LeaveFolder => self.store.show_all(),
            KeyAction::ToggleViewMode => self.store.toggle_view_mode(),
            KeyAction::Rescan => self.reload(),
            KeyAction::TogglePause => self.playback.toggle_pause(),
        }
    }

    fn set_tab(&self, tab: Tab) {
        if self.active_tab.replace(tab) != tab {
            self.render(&self.store.snapshot());
        }
    }

    fn render(&self, state: &GalleryState) {
        let folder_open = state.current_folder.is_some();
        self.title_label.set_text(window_title(state));
        self.back_button.set_visible(folder_open);
        self.tab_bar.set_visible(!folder_open);
        self.keybindings.set_folder_open(folder_open);
        self.view_button
            .set_label(if state.is_grid_view() { "[list]" } else { "[grid]" });

        let page = content_page(state, self.active_tab.get());
        match page {
            ContentPage::Error => self
                .error_message
                .set_text(state.error.as_deref().unwrap_or_default()),
            ContentPage::Videos => self.populate_videos(shown_videos(state), state.view_mode),
            ContentPage::Folders => self.populate_folders(state),
            ContentPage::Loading | ContentPage::Empty => {}
        }
        self.spinner.set_spinning(page == ContentPage::Loading);
        self.content_stack.set_visible_child_name(page.name());

        self.update_status(state);
    }

    fn populate_videos(&self, videos: &[VideoRecord], mode: ViewMode) {
        if self.shown_video_mode.get() == Some(mode) && self.shown_videos.borrow().as_slice() == videos
        {
            return;
        }

        self.video_flow.remove_all();
        configure_flow(&self.video_flow, mode);
        for video in videos {
            self.video_flow
                .append(&tiles::video_tile(video, mode, &self.binder));
        }

        *self.shown_videos.borrow_mut() = videos.to_vec();
        self.shown_video_mode.set(Some(mode));
        tracing::debug!(count = videos.len(), "Rendered video tiles");
    }

    fn populate_folders(&self, state: &GalleryState) {
        let mode = state.view_mode;
        if self.shown_folder_mode.get() == Some(mode) && *self.shown_folders.borrow() == state.folders
        {
            return;
        }

        self.folder_flow.remove_all();
        configure_flow(&self.folder_flow, mode);
        for folder in &state.folders {
            let source = folder_thumbnail_source(state, folder);
            self.folder_flow.append(&tiles::folder_tile(
                folder,
                source.as_deref(),
                mode,
                self.locale,
                &self.binder,
            ));
        }

        *self.shown_folders.borrow_mut() = state.folders.clone();
        self.shown_folder_mode.set(Some(mode));
        tracing::debug!(count = state.folders.len(), "Rendered folder tiles");
    }

    fn update_status(&self, state: &GalleryState) {
        if self.scanning.get() {
            return;
        }
        let roots: Vec<String> = self
            .config
            .library_roots
            .iter()
            .map(|root| root.display().to_string())
            .collect();
        self.status_label.set_text(&format!(
            "> {}  {}",
            self.locale.video_count(shown_videos(state).len()),
            roots.join(":")
        ));
    }
}
