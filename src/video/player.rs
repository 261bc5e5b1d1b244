//! Video player using libmpv embedded in GTK4
//!
//! Playback renders through libmpv's OpenGL render API into a GLArea. Each
//! playback screen owns one player; `release` tears mpv down and is safe to
//! call any number of times.

use glib::clone;
use gtk4::gdk;
use gtk4::prelude::*;
use gtk4::{glib, GLArea};
use libmpv2::events::Event;
use libmpv2::render::{OpenGLInitParams, RenderContext, RenderParam, RenderParamApiType};
use libmpv2::Mpv;
use once_cell::sync::OnceCell;
use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::rc::Rc;
use std::time::Duration;

use super::status::{PlayerProbe, PlayerStatus};
use crate::models::ContentRef;

/// Callback type for status changes
pub type StatusCallback = Box<dyn Fn(&PlayerStatus) + 'static>;

/// Poll interval for mpv events and properties
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ensure epoxy is initialized once
static EPOXY_INITIALIZED: OnceCell<()> = OnceCell::new();

fn ensure_epoxy_initialized() {
    EPOXY_INITIALIZED.get_or_init(|| {
        // GTK4 already links epoxy, so symbols resolve from the current process
        epoxy::load_with(|s| unsafe {
            let handle = libc::dlopen(std::ptr::null(), libc::RTLD_NOW | libc::RTLD_GLOBAL);
            if handle.is_null() {
                return std::ptr::null();
            }
            let Ok(c_str) = std::ffi::CString::new(s) else {
                libc::dlclose(handle);
                return std::ptr::null();
            };
            let sym = libc::dlsym(handle, c_str.as_ptr());
            libc::dlclose(handle);
            sym
        });
    });
}

/// GL context wrapper for OpenGL init params (unit type since we use epoxy)
struct GlContext;

#[derive(Default)]
struct PlayerState {
    mpv: Option<Mpv>,
    render_ctx: Option<RenderContext>,
    current: Option<ContentRef>,
    /// Requested before the GL context existed.
    pending: Option<ContentRef>,
    probe: PlayerProbe,
    last_status: Option<PlayerStatus>,
    paused: bool,
}

/// Video player widget using libmpv
pub struct VideoPlayer {
    gl_area: GLArea,
    state: Rc<RefCell<PlayerState>>,
    initialized: Rc<Cell<bool>>,
    released: Rc<Cell<bool>>,
    status_callbacks: Rc<RefCell<Vec<StatusCallback>>>,
    poll_timer: Rc<RefCell<Option<glib::SourceId>>>,
}

impl VideoPlayer {
    pub fn new() -> Self {
        let gl_area = GLArea::new();
        gl_area.set_auto_render(false);
        gl_area.set_has_depth_buffer(false);
        gl_area.set_has_stencil_buffer(false);
        gl_area.set_hexpand(true);
        gl_area.set_vexpand(true);
        gl_area.set_allowed_apis(gdk::GLAPI::GL | gdk::GLAPI::GLES);

        let player = Self {
            gl_area,
            state: Rc::new(RefCell::new(PlayerState::default())),
            initialized: Rc::new(Cell::new(false)),
            released: Rc::new(Cell::new(false)),
            status_callbacks: Rc::new(RefCell::new(Vec::new())),
            poll_timer: Rc::new(RefCell::new(None)),
        };

        player.setup_gl_callbacks();
        player
    }

    /// Get the GTK widget for embedding in the UI
    pub fn widget(&self) -> &GLArea {
        &self.gl_area
    }

    fn setup_gl_callbacks(&self) {
        let state = self.state.clone();
        let initialized = self.initialized.clone();
        let released = self.released.clone();
        let status_callbacks = self.status_callbacks.clone();

        // Realize callback - initialize mpv when GL context is ready
        self.gl_area.connect_realize(clone!(
            #[strong]
            state,
            #[strong]
            initialized,
            #[strong]
            released,
            #[strong]
            status_callbacks,
            move |gl_area| {
                gl_area.make_current();
                if let Some(err) = gl_area.error() {
                    tracing::error!("GLArea error on realize: {}", err);
                    Self::fail(&state, &status_callbacks, err.to_string());
                    return;
                }

                if initialized.get() || released.get() {
                    return;
                }

                ensure_epoxy_initialized();

                match Self::init_mpv() {
                    Ok((mpv, render_ctx)) => {
                        let pending = {
                            let mut state_mut = state.borrow_mut();
                            state_mut.mpv = Some(mpv);
                            state_mut.render_ctx = Some(render_ctx);
                            state_mut.pending.take()
                        };
                        initialized.set(true);
                        tracing::info!("mpv initialized successfully");

                        if let Some(content) = pending {
                            Self::load(&state, &status_callbacks, &content);
                            gl_area.queue_render();
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to initialize mpv: {}", e);
                        Self::fail(&state, &status_callbacks, e.to_string());
                    }
                }
            }
        ));

        // Unrealize callback - clean up mpv
        self.gl_area.connect_unrealize(clone!(
            #[strong]
            state,
            #[strong]
            initialized,
            move |gl_area| {
                gl_area.make_current();
                let mut state = state.borrow_mut();
                // Drop render context first, then mpv
                state.render_ctx = None;
                state.mpv = None;
                initialized.set(false);
                tracing::debug!("mpv cleaned up on unrealize");
            }
        ));

        // Render callback - draw the video frame
        self.gl_area.connect_render(clone!(
            #[strong]
            state,
            move |gl_area, _gl_context| {
                let state = state.borrow();
                if let Some(ref render_ctx) = state.render_ctx {
                    let scale = gl_area.scale_factor();
                    let width = gl_area.width() * scale;
                    let height = gl_area.height() * scale;

                    // flip=true because GTK's coordinate system is flipped
                    if let Err(e) = render_ctx.render::<GlContext>(0, width, height, true) {
                        tracing::error!("mpv render error: {}", e);
                    }
                }
                glib::Propagation::Stop
            }
        ));

        self.gl_area
            .connect_resize(move |gl_area, _width, _height| {
                gl_area.queue_render();
            });
    }

    fn init_mpv() -> Result<(Mpv, RenderContext), Box<dyn std::error::Error>> {
        // GTK initialization may reset locale after program start; libmpv
        // requires LC_NUMERIC=C.
        let locale_set = unsafe { libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast()) };
        if locale_set.is_null() {
            tracing::warn!("Failed to set LC_NUMERIC=C before mpv init");
        }

        let mut mpv = Mpv::with_initializer(|init| {
            init.set_option("hwdec", "auto-safe")?;
            init.set_option("vo", "libmpv")?;
            init.set_option("ao", "pipewire,pulse,alsa")?;
            // Hold the last frame at the end so eof-reached stays observable
            init.set_option("keep-open", "yes")?;
            init.set_option("pause", "no")?;
            init.set_option("cache", "yes")?;
            init.set_option("demuxer-max-bytes", "50MiB")?;
            init.set_option("osd-level", 0i64)?;
            init.set_option("terminal", false)?;
            init.set_option("input-default-bindings", false)?;
            init.set_option("msg-level", "all=warn")?;
            Ok(())
        })?;

        fn get_proc_address(_ctx: &GlContext, name: &str) -> *mut c_void {
            epoxy::get_proc_addr(name) as *mut c_void
        }

        let gl_init_params = OpenGLInitParams {
            get_proc_address,
            ctx: GlContext,
        };

        let render_params = vec![
            RenderParam::ApiType(RenderParamApiType::OpenGl),
            RenderParam::InitParams(gl_init_params),
        ];

        // SAFETY: We have exclusive access to mpv here during initialization
        let render_ctx =
            unsafe { RenderContext::new(mpv.ctx.as_mut(), render_params.into_iter())? };

        Ok((mpv, render_ctx))
    }

    /// Load and play a video. Ignored once the player has been released.
    pub fn play(&self, content: &ContentRef) {
        if self.released.get() {
            tracing::warn!("play() on a released player: {}", content.as_str());
            return;
        }

        if !self.initialized.get() {
            let mut state = self.state.borrow_mut();
            state.pending = Some(content.clone());
            state.probe.begin();
            drop(state);
            tracing::debug!("Player not initialized yet; queued {}", content.as_str());
            Self::publish(&self.state, &self.status_callbacks);
        } else {
            Self::load(&self.state, &self.status_callbacks, content);
            self.gl_area.queue_render();
        }

        self.start_poll_timer();
    }

    fn load(
        state: &Rc<RefCell<PlayerState>>,
        callbacks: &Rc<RefCell<Vec<StatusCallback>>>,
        content: &ContentRef,
    ) {
        let mut state_mut = state.borrow_mut();
        state_mut.probe.begin();
        state_mut.paused = false;

        let result = match state_mut.mpv {
            Some(ref mpv) => mpv
                .command("loadfile", &[content.as_str(), "replace"])
                .map_err(|e| e.to_string()),
            None => Err("player is not available".to_string()),
        };

        match result {
            Ok(()) => {
                state_mut.current = Some(content.clone());
                tracing::info!("Playing: {}", content.as_str());
            }
            Err(e) => {
                tracing::error!("Failed to load {}: {}", content.as_str(), e);
                state_mut.probe.error = Some(e);
            }
        }

        drop(state_mut);
        Self::publish(state, callbacks);
    }

    /// Toggle play/pause
    pub fn toggle_pause(&self) {
        let mut state = self.state.borrow_mut();
        let paused = !state.paused;
        if let Some(ref mpv) = state.mpv {
            if let Err(e) = mpv.set_property("pause", paused) {
                tracing::warn!("Failed to toggle pause: {}", e);
                return;
            }
            state.paused = paused;
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.state.borrow().probe.status()
    }

    pub fn current(&self) -> Option<ContentRef> {
        self.state.borrow().current.clone()
    }

    /// Register a callback for status changes
    pub fn connect_status_changed<F: Fn(&PlayerStatus) + 'static>(&self, callback: F) {
        self.status_callbacks.borrow_mut().push(Box::new(callback));
    }

    /// Stop playback and free mpv. Later calls do nothing.
    pub fn release(&self) {
        if self.released.replace(true) {
            return;
        }

        self.stop_poll_timer();
        self.status_callbacks.borrow_mut().clear();

        if self.gl_area.is_realized() {
            self.gl_area.make_current();
        }

        let mut state = self.state.borrow_mut();
        if let Some(ref mpv) = state.mpv {
            if let Err(e) = mpv.command("stop", &[]) {
                tracing::debug!("mpv stop failed during release: {}", e);
            }
        }
        state.render_ctx = None;
        state.mpv = None;
        state.pending = None;
        state.current = None;
        self.initialized.set(false);

        tracing::info!("Player released");
    }

    fn start_poll_timer(&self) {
        self.stop_poll_timer();

        let state = self.state.clone();
        let callbacks = self.status_callbacks.clone();
        let gl_area = self.gl_area.clone();
        let source_id = glib::timeout_add_local(POLL_INTERVAL, move || {
            Self::poll(&state);
            Self::publish(&state, &callbacks);
            gl_area.queue_render();
            glib::ControlFlow::Continue
        });

        *self.poll_timer.borrow_mut() = Some(source_id);
    }

    fn stop_poll_timer(&self) {
        if let Some(source_id) = self.poll_timer.borrow_mut().take() {
            source_id.remove();
        }
    }

    /// Drain mpv events and refresh the probe from properties.
    fn poll(state: &Rc<RefCell<PlayerState>>) {
        let mut state_mut = state.borrow_mut();
        let PlayerState { mpv, probe, .. } = &mut *state_mut;
        let Some(mpv) = mpv.as_mut() else {
            return;
        };

        let event_ctx = mpv.event_context_mut();
        while let Some(event) = event_ctx.wait_event(0.0) {
            match event {
                Ok(Event::FileLoaded) => {
                    tracing::debug!("File loaded");
                    probe.loaded = true;
                }
                Ok(Event::EndFile(_reason)) => {
                    // A file that ends before it ever loaded could not be opened.
                    if probe.requested && !probe.loaded && probe.error.is_none() {
                        probe.error = Some(String::new());
                    }
                    tracing::debug!("End file event");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("mpv playback error: {}", e);
                    probe.error = Some(e.to_string());
                }
            }
        }

        if probe.loaded {
            probe.idle_active = mpv.get_property("idle-active").unwrap_or(false);
            probe.paused_for_cache = mpv.get_property("paused-for-cache").unwrap_or(false);
            probe.seeking = mpv.get_property("seeking").unwrap_or(false);
            probe.eof_reached = mpv.get_property("eof-reached").unwrap_or(false);
        }
    }

    /// Notify callbacks when the derived status changed.
    fn publish(state: &Rc<RefCell<PlayerState>>, callbacks: &Rc<RefCell<Vec<StatusCallback>>>) {
        let status = {
            let mut state_mut = state.borrow_mut();
            let status = state_mut.probe.status();
            if state_mut.last_status.as_ref() == Some(&status) {
                return;
            }
            state_mut.last_status = Some(status.clone());
            status
        };

        tracing::debug!(?status, "Player status changed");
        for callback in callbacks.borrow().iter() {
            callback(&status);
        }
    }

    fn fail(
        state: &Rc<RefCell<PlayerState>>,
        callbacks: &Rc<RefCell<Vec<StatusCallback>>>,
        message: String,
    ) {
        state.borrow_mut().probe.error = Some(message);
        Self::publish(state, callbacks);
    }
}

impl Default for VideoPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VideoPlayer {
    fn drop(&mut self) {
        self.release();
    }
}
