// Playback screen: one player per opened video, released on exit

use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, Label, Orientation, Overlay, Spinner};
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::GalleryError;
use crate::i18n::Locale;
use crate::models::VideoRecord;
use crate::video::{PlayerStatus, VideoPlayer};

type CloseCallback = Box<dyn Fn() + 'static>;
type ErrorCallback = Rc<dyn Fn(GalleryError) + 'static>;

pub struct PlaybackScreen {
    root: GtkBox,
    title: Label,
    overlay: Overlay,
    spinner: Spinner,
    error_label: Label,
    locale: Locale,
    player: RefCell<Option<VideoPlayer>>,
    on_close: Rc<RefCell<Option<CloseCallback>>>,
}

impl PlaybackScreen {
    pub fn new(locale: Locale) -> Rc<Self> {
        let root = GtkBox::new(Orientation::Vertical, 0);
        root.add_css_class("playback");

        let header = GtkBox::new(Orientation::Horizontal, 8);
        header.add_css_class("dir-bar");
        header.set_margin_start(8);
        header.set_margin_end(8);
        header.set_margin_top(4);
        header.set_margin_bottom(4);

        let back_button = Button::with_label("[<]");
        let title = Label::new(None);
        title.set_xalign(0.0);
        title.set_hexpand(true);
        title.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        header.append(&back_button);
        header.append(&title);
        root.append(&header);

        let overlay = Overlay::new();
        overlay.set_hexpand(true);
        overlay.set_vexpand(true);

        let spinner = Spinner::new();
        spinner.set_size_request(48, 48);
        spinner.set_halign(Align::Center);
        spinner.set_valign(Align::Center);
        spinner.set_visible(false);
        overlay.add_overlay(&spinner);

        let error_label = Label::new(None);
        error_label.set_halign(Align::Center);
        error_label.set_valign(Align::Center);
        error_label.set_wrap(true);
        error_label.add_css_class("error-text");
        error_label.set_visible(false);
        overlay.add_overlay(&error_label);

        root.append(&overlay);

        let screen = Rc::new(Self {
            root,
            title,
            overlay,
            spinner,
            error_label,
            locale,
            player: RefCell::new(None),
            on_close: Rc::new(RefCell::new(None)),
        });

        let weak = Rc::downgrade(&screen);
        back_button.connect_clicked(move |_| {
            if let Some(screen) = weak.upgrade() {
                screen.request_close();
            }
        });

        screen
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    /// Called when the user leaves playback.
    pub fn connect_close<F: Fn() + 'static>(&self, callback: F) {
        *self.on_close.borrow_mut() = Some(Box::new(callback));
    }

    /// Start playing `video` with a fresh player. Player failures are shown
    /// on this screen and passed to `on_error` once per video.
    pub fn open<F>(&self, video: &VideoRecord, on_error: F)
    where
        F: Fn(GalleryError) + 'static,
    {
        self.release_player();

        self.title.set_text(&video.title);
        self.apply_status(&PlayerStatus::Buffering);

        let player = VideoPlayer::new();
        self.overlay.set_child(Some(player.widget()));

        let on_error: ErrorCallback = Rc::new(on_error);
        let spinner = self.spinner.clone();
        let error_label = self.error_label.clone();
        let gl_area = player.widget().clone();
        let locale = self.locale;
        player.connect_status_changed(move |status| {
            Self::render_status(&spinner, &error_label, &gl_area, locale, status);
            if let Some(cause) = status.error_message() {
                on_error(GalleryError::Playback(cause.to_string()));
            }
        });

        player.play(&video.content);
        *self.player.borrow_mut() = Some(player);
        tracing::info!(id = video.id, "Opened playback for {:?}", video.path);
    }

    pub fn toggle_pause(&self) {
        if let Some(player) = self.player.borrow().as_ref() {
            player.toggle_pause();
        }
    }

    /// Release the player and notify the close callback.
    pub fn request_close(&self) {
        self.release_player();
        if let Some(callback) = self.on_close.borrow().as_ref() {
            callback();
        }
    }

    /// Release the player without notifying anyone. Safe to call repeatedly.
    pub fn release_player(&self) {
        if let Some(player) = self.player.borrow_mut().take() {
            player.release();
            self.overlay.set_child(None::<&gtk4::Widget>);
        }
        self.spinner.set_visible(false);
        self.spinner.stop();
        self.error_label.set_visible(false);
    }

    fn apply_status(&self, status: &PlayerStatus) {
        if let Some(player) = self.player.borrow().as_ref() {
            Self::render_status(
                &self.spinner,
                &self.error_label,
                player.widget(),
                self.locale,
                status,
            );
        } else {
            self.spinner.set_visible(status.is_buffering());
            self.spinner.set_spinning(status.is_buffering());
        }
    }

    fn render_status(
        spinner: &Spinner,
        error_label: &Label,
        surface: &impl IsA<gtk4::Widget>,
        locale: Locale,
        status: &PlayerStatus,
    ) {
        let buffering = status.is_buffering();
        spinner.set_visible(buffering);
        spinner.set_spinning(buffering);

        match status.error_message() {
            Some(cause) => {
                error_label.set_text(&locale.playback_failed(cause));
                error_label.set_visible(true);
                surface.set_visible(false);
            }
            None => {
                error_label.set_visible(false);
                surface.set_visible(true);
            }
        }
    }
}

impl Drop for PlaybackScreen {
    fn drop(&mut self) {
        self.release_player();
    }
}
