//! Browser host
//!
//! Wires DOM pointer/resize events, `requestAnimationFrame`, `setTimeout`,
//! Web Audio and `navigator.vibrate` to a [`Game`]. Rendering stays with the
//! page: every state change is handed to `on_render` as a JSON snapshot.
//!
//! Host callbacks are queued while the game is borrowed and invoked after the
//! borrow is released, so JS may call back into the overlay (e.g. `close()`
//! from inside `on_reveal`).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, PointerEvent, Window};

use crate::audio::WebAudio;
use crate::feedback::{FeedbackOutput, Flash, Tone};
use crate::game::{Callbacks, Game};
use crate::settings::Settings;
use crate::sim::Viewport;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Calls to make into JS once the game is no longer borrowed
enum HostCall {
    Reveal,
    Close,
    Flash(Flash),
}

type HostQueue = Rc<RefCell<Vec<HostCall>>>;

/// Feedback output backed by browser capabilities
struct WebOutput {
    window: Window,
    audio: Option<WebAudio>,
    queue: HostQueue,
    vibration_supported: Option<bool>,
}

impl WebOutput {
    fn can_vibrate(&mut self) -> bool {
        // Not every browser exposes navigator.vibrate; calling it blind would throw
        *self.vibration_supported.get_or_insert_with(|| {
            let supported =
                js_sys::Reflect::has(&self.window.navigator(), &JsValue::from_str("vibrate"))
                    .unwrap_or(false);
            if !supported {
                log::warn!("Vibration unavailable - haptics disabled");
            }
            supported
        })
    }
}

impl FeedbackOutput for WebOutput {
    fn init_audio(&mut self) -> bool {
        if self.audio.is_none() {
            self.audio = WebAudio::new();
        }
        self.audio.is_some()
    }

    fn play_tone(&mut self, tone: &Tone) {
        if let Some(audio) = &self.audio {
            audio.play(tone);
        }
    }

    fn vibrate(&mut self, pattern: &[u32]) {
        if !self.can_vibrate() {
            return;
        }
        let array: js_sys::Array = pattern.iter().map(|ms| JsValue::from(*ms)).collect();
        let _ = self.window.navigator().vibrate_with_pattern(&array);
    }

    fn flash(&mut self, flash: &Flash) {
        self.queue.borrow_mut().push(HostCall::Flash(flash.clone()));
    }

    fn shutdown(&mut self) {
        if let Some(audio) = self.audio.take() {
            audio.close();
        }
    }
}

struct JsCallbacks {
    on_reveal: js_sys::Function,
    on_close: js_sys::Function,
    on_render: js_sys::Function,
    on_flash: Option<js_sys::Function>,
}

type PointerListener = Closure<dyn FnMut(PointerEvent)>;

struct Host {
    game: RefCell<Game>,
    window: Window,
    surface: HtmlElement,
    queue: HostQueue,
    js: JsCallbacks,
    closed: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    timeout_id: Cell<Option<i32>>,
    frame_cb: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    timer_cb: RefCell<Option<Closure<dyn FnMut()>>>,
    resize_cb: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>,
    pointer_cbs: RefCell<Vec<(&'static str, PointerListener)>>,
}

impl Host {
    fn now(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn viewport(&self) -> Viewport {
        let rect = self.surface.get_bounding_client_rect();
        Viewport::new(rect.width() as f32, rect.height() as f32)
    }

    fn local_point(&self, event: &PointerEvent) -> Vec2 {
        let rect = self.surface.get_bounding_client_rect();
        Vec2::new(
            (f64::from(event.client_x()) - rect.left()) as f32,
            (f64::from(event.client_y()) - rect.top()) as f32,
        )
    }

    /// Bring rAF and setTimeout in line with the game, then render and flush
    fn sync(&self) {
        if self.closed.get() {
            self.flush();
            return;
        }
        self.reschedule();
        self.render();
        self.flush();
    }

    fn reschedule(&self) {
        let (loop_active, deadline) = {
            let game = self.game.borrow();
            (game.frame_loop_active(), game.next_deadline())
        };

        if loop_active && self.raf_id.get().is_none() {
            if let Some(cb) = self.frame_cb.borrow().as_ref() {
                match self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    Ok(id) => self.raf_id.set(Some(id)),
                    Err(e) => log::warn!("requestAnimationFrame failed: {e:?}"),
                }
            }
        }

        if let Some(id) = self.timeout_id.take() {
            self.window.clear_timeout_with_handle(id);
        }
        if let Some(deadline) = deadline {
            let delay = (deadline - self.now()).max(0.0).ceil() as i32;
            if let Some(cb) = self.timer_cb.borrow().as_ref() {
                match self
                    .window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), delay)
                {
                    Ok(id) => self.timeout_id.set(Some(id)),
                    Err(e) => log::warn!("setTimeout failed: {e:?}"),
                }
            }
        }
    }

    fn render(&self) {
        let snapshot = self.game.borrow().snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                if let Err(e) = self.js.on_render.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                    log::warn!("on_render threw: {e:?}");
                }
            }
            Err(e) => log::warn!("Snapshot serialization failed: {e}"),
        }
    }

    fn flush(&self) {
        let calls: Vec<HostCall> = self.queue.borrow_mut().drain(..).collect();
        for call in calls {
            let result = match call {
                HostCall::Reveal => self.js.on_reveal.call0(&JsValue::NULL),
                HostCall::Close => self.js.on_close.call0(&JsValue::NULL),
                HostCall::Flash(flash) => match &self.js.on_flash {
                    Some(f) => f.call2(
                        &JsValue::NULL,
                        &JsValue::from_str(&flash.color),
                        &JsValue::from(flash.duration_ms),
                    ),
                    None => Ok(JsValue::UNDEFINED),
                },
            };
            if let Err(e) = result {
                log::warn!("Host callback threw: {e:?}");
            }
        }
    }

    fn on_frame(&self, time: f64) {
        self.raf_id.set(None);
        if self.closed.get() {
            return;
        }
        self.game.borrow_mut().frame(time);
        self.sync();
    }

    fn on_timeout(&self) {
        self.timeout_id.set(None);
        if self.closed.get() {
            return;
        }
        let now = self.now();
        self.game.borrow_mut().fire_timers(now);
        self.sync();
    }

    fn on_pointer(&self, kind: &str, event: &PointerEvent) {
        if self.closed.get() {
            return;
        }
        let id = event.pointer_id();
        match kind {
            "pointerdown" => {
                let pos = self.local_point(event);
                let now = self.now();
                let captured = self.game.borrow_mut().pointer_down(id, pos, now);
                if captured {
                    let _ = self.surface.set_pointer_capture(id);
                }
                event.prevent_default();
            }
            "pointermove" => {
                let pos = self.local_point(event);
                self.game.borrow_mut().pointer_move(id, pos);
            }
            "pointercancel" => {
                if self.game.borrow_mut().pointer_cancel(id) {
                    let _ = self.surface.release_pointer_capture(id);
                }
            }
            _ => {
                if self.game.borrow_mut().pointer_up(id) {
                    let _ = self.surface.release_pointer_capture(id);
                }
            }
        }
        self.sync();
    }

    fn on_resize(&self) {
        if self.closed.get() {
            return;
        }
        let viewport = self.viewport();
        self.game.borrow_mut().resize(viewport);
        self.sync();
    }

    fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        let teardown = self.game.borrow_mut().close();

        if let Some(id) = self.raf_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        if let Some(id) = self.timeout_id.take() {
            self.window.clear_timeout_with_handle(id);
        }
        if let Some(id) = teardown.released_pointer {
            let _ = self.surface.release_pointer_capture(id);
        }

        // Closures stay alive until the host drops: close may run inside one of them
        for (kind, cb) in self.pointer_cbs.borrow().iter() {
            let _ = self
                .surface
                .remove_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
        }
        if let Some(cb) = self.resize_cb.borrow().as_ref() {
            let _ = self
                .window
                .remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
        }
        log::info!("Overlay torn down");
        self.flush();
    }
}

/// Handle returned to the page
#[wasm_bindgen]
pub struct TugOfWar {
    host: Rc<Host>,
}

#[wasm_bindgen]
impl TugOfWar {
    /// Mount the game on `surface`. The surface element is the pull zone.
    pub fn open(
        surface: HtmlElement,
        theme: String,
        on_reveal: js_sys::Function,
        on_close: js_sys::Function,
        on_render: js_sys::Function,
        on_flash: Option<js_sys::Function>,
        settings_json: Option<String>,
    ) -> Result<TugOfWar, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let settings = Settings::from_json_or_default(settings_json.as_deref());

        let queue: HostQueue = Rc::new(RefCell::new(Vec::new()));
        let output = WebOutput {
            window: window.clone(),
            audio: None,
            queue: queue.clone(),
            vibration_supported: None,
        };
        let callbacks = {
            let (reveal_q, close_q) = (queue.clone(), queue.clone());
            Callbacks::new(
                move || reveal_q.borrow_mut().push(HostCall::Reveal),
                move || close_q.borrow_mut().push(HostCall::Close),
            )
        };

        let rect = surface.get_bounding_client_rect();
        let viewport = Viewport::new(rect.width() as f32, rect.height() as f32);
        let game = Game::new(settings, theme, viewport, Box::new(output), callbacks);

        let host = Rc::new(Host {
            game: RefCell::new(game),
            window,
            surface,
            queue,
            js: JsCallbacks {
                on_reveal,
                on_close,
                on_render,
                on_flash,
            },
            closed: Cell::new(false),
            raf_id: Cell::new(None),
            timeout_id: Cell::new(None),
            frame_cb: RefCell::new(None),
            timer_cb: RefCell::new(None),
            resize_cb: RefCell::new(None),
            pointer_cbs: RefCell::new(Vec::new()),
        });

        install_callbacks(&host);
        host.sync();
        Ok(TugOfWar { host })
    }

    /// Dismiss the overlay from any phase
    pub fn close(&self) {
        self.host.close();
    }

    /// Current render snapshot as JSON
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.host.game.borrow().snapshot()).unwrap_or_default()
    }
}

impl Drop for TugOfWar {
    fn drop(&mut self) {
        self.host.close();
    }
}

fn install_callbacks(host: &Rc<Host>) {
    let weak: Weak<Host> = Rc::downgrade(host);

    {
        let weak = weak.clone();
        *host.frame_cb.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |time: f64| {
            if let Some(host) = weak.upgrade() {
                host.on_frame(time);
            }
        }));
    }
    {
        let weak = weak.clone();
        *host.timer_cb.borrow_mut() = Some(Closure::<dyn FnMut()>::new(move || {
            if let Some(host) = weak.upgrade() {
                host.on_timeout();
            }
        }));
    }
    {
        let weak = weak.clone();
        let cb = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if let Some(host) = weak.upgrade() {
                host.on_resize();
            }
        });
        let _ = host
            .window
            .add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
        *host.resize_cb.borrow_mut() = Some(cb);
    }

    for kind in ["pointerdown", "pointermove", "pointerup", "pointercancel"] {
        let weak = weak.clone();
        let cb = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
            if let Some(host) = weak.upgrade() {
                host.on_pointer(kind, &event);
            }
        });
        let _ = host
            .surface
            .add_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
        host.pointer_cbs.borrow_mut().push((kind, cb));
    }
}
