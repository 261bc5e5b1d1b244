// Keybindings for the video gallery
//
// Keybindings:
// - Escape: Close playback, or leave the open folder
// - g: Toggle grid/list view
// - F5: Rescan the library
// - Space: Play/pause during playback

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{EventControllerKey, PropagationPhase, Widget};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Which screen currently has the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Gallery,
    Playback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ClosePlayback,
    LeaveFolder,
    ToggleViewMode,
    Rescan,
    TogglePause,
}

/// Map a key press to an action for the given screen.
pub fn action_for(key: Key, screen: Screen, folder_open: bool) -> Option<KeyAction> {
    match (screen, key) {
        (Screen::Playback, Key::Escape) => Some(KeyAction::ClosePlayback),
        (Screen::Playback, Key::space) => Some(KeyAction::TogglePause),
        (Screen::Gallery, Key::Escape) if folder_open => Some(KeyAction::LeaveFolder),
        (Screen::Gallery, Key::g | Key::G) => Some(KeyAction::ToggleViewMode),
        (Screen::Gallery, Key::F5) => Some(KeyAction::Rescan),
        _ => None,
    }
}

type ActionCallback = Box<dyn Fn(KeyAction) + 'static>;

/// Keybinding manager attached to the main window
pub struct Keybindings {
    controller: EventControllerKey,
    screen: Rc<Cell<Screen>>,
    folder_open: Rc<Cell<bool>>,
    on_action: Rc<RefCell<Option<ActionCallback>>>,
}

impl Keybindings {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let screen = Rc::new(Cell::new(Screen::Gallery));
        let folder_open = Rc::new(Cell::new(false));
        let on_action: Rc<RefCell<Option<ActionCallback>>> = Rc::new(RefCell::new(None));

        let screen_clone = screen.clone();
        let folder_open_clone = folder_open.clone();
        let on_action_clone = on_action.clone();

        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            let action = action_for(keyval, screen_clone.get(), folder_open_clone.get());
            match (action, &*on_action_clone.borrow()) {
                (Some(action), Some(callback)) => {
                    callback(action);
                    glib::Propagation::Stop
                }
                _ => glib::Propagation::Proceed,
            }
        });

        Self {
            controller,
            screen,
            folder_open,
            on_action,
        }
    }

    /// Attach keybindings to a widget (typically the main window)
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        widget.add_controller(self.controller.clone());
    }

    pub fn set_screen(&self, screen: Screen) {
        self.screen.set(screen);
    }

    pub fn set_folder_open(&self, open: bool) {
        self.folder_open.set(open);
    }

    pub fn connect_action<F>(&self, callback: F)
    where
        F: Fn(KeyAction) + 'static,
    {
        *self.on_action.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::new()
    }
}
