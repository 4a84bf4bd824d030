//! Browser backend: canvas 2D surface, DOM input, media elements, LocalStorage

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, HtmlAudioElement, HtmlCanvasElement, HtmlImageElement, KeyboardEvent, MouseEvent,
    Storage, TouchEvent,
};

use crate::assets::{ImageEntry, ImageLoader, LoadNotifier};
use crate::audio::{AudioBackend, ClipInstance};
use crate::engine::Radius;
use crate::error::{RadiusError, RadiusResult};
use crate::input::{InputQueues, Key, MouseButton, TouchPhase};
use crate::persistence::KeyValueStore;
use crate::surface::{Color, Font, Surface, TextAlign, TextBaseline, TextMetrics};
use crate::transform::Rect;

fn js_error(context: &str, value: JsValue) -> RadiusError {
    RadiusError::platform(format!("{context}: {value:?}"))
}

fn window() -> RadiusResult<web_sys::Window> {
    web_sys::window().ok_or_else(|| RadiusError::platform("no window"))
}

/// Decoded images shared between the loader and the surface
pub type ImageElements = Rc<RefCell<HashMap<String, HtmlImageElement>>>;

/// `Surface` over a canvas 2D context
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    images: ImageElements,
    fullscreen: Rc<Cell<bool>>,
    original_size: (u32, u32),
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement, images: ImageElements) -> RadiusResult<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|e| js_error("get_context", e))?
            .ok_or_else(|| RadiusError::platform("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|e| js_error("context cast", e.into()))?;

        // Keep the browser from panning/zooming on touch
        let _ = canvas.set_attribute("style", "touch-action: none;");

        let fullscreen = Rc::new(Cell::new(false));
        {
            let canvas = canvas.clone();
            let fullscreen = fullscreen.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                if fullscreen.get() {
                    fit_to_window(&canvas);
                }
            });
            window()?
                .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())
                .map_err(|e| js_error("resize listener", e))?;
            closure.forget();
        }

        let original_size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            images,
            fullscreen,
            original_size,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

fn fit_to_window(canvas: &HtmlCanvasElement) {
    if let Some(window) = web_sys::window() {
        let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
    }
}

impl TextMetrics for CanvasSurface {
    fn measure_text(&self, font: &Font, text: &str) -> f32 {
        self.context.save();
        self.context.set_font(&font.to_string());
        let width = self.context.measure_text(text).map(|m| m.width()).unwrap_or(0.0);
        self.context.restore();
        width as f32
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> Vec2 {
        Vec2::new(self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn save(&mut self) {
        self.context.save();
    }

    fn restore(&mut self) {
        self.context.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        let _ = self.context.translate(x as f64, y as f64);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        let _ = self.context.scale(sx as f64, sy as f64);
    }

    fn rotate(&mut self, angle: f32) {
        let _ = self.context.rotate(angle as f64);
    }

    fn alpha(&self) -> f32 {
        self.context.global_alpha() as f32
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.context.set_global_alpha(alpha as f64);
    }

    fn set_fill(&mut self, color: &Color) {
        self.context.set_fill_style_str(&color.css());
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.context.fill_rect(x as f64, y as f64, width as f64, height as f64);
    }

    fn set_font(&mut self, font: &Font) {
        self.context.set_font(&font.to_string());
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.context.set_text_align(align.as_str());
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.context.set_text_baseline(baseline.as_str());
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let _ = self.context.fill_text(text, x as f64, y as f64);
    }

    fn draw_image(&mut self, image: &ImageEntry, source: Option<Rect>, dest: Rect) {
        let images = self.images.borrow();
        let Some(element) = images.get(image.source()) else {
            return;
        };
        let (dx, dy, dw, dh) = (
            dest.min.x as f64,
            dest.min.y as f64,
            dest.width() as f64,
            dest.height() as f64,
        );
        let _ = match source {
            Some(s) => self
                .context
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    element,
                    s.min.x as f64,
                    s.min.y as f64,
                    s.width() as f64,
                    s.height() as f64,
                    dx,
                    dy,
                    dw,
                    dh,
                ),
            None => self
                .context
                .draw_image_with_html_image_element_and_dw_and_dh(element, dx, dy, dw, dh),
        };
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen && !self.fullscreen.get() {
            self.original_size = (self.canvas.width(), self.canvas.height());
            fit_to_window(&self.canvas);
        } else if !fullscreen && self.fullscreen.get() {
            self.canvas.set_width(self.original_size.0);
            self.canvas.set_height(self.original_size.1);
        }
        self.fullscreen.set(fullscreen);
    }
}

/// Loads images through `<img>` elements
pub struct HtmlImageLoader {
    images: ImageElements,
}

impl HtmlImageLoader {
    pub fn new(images: ImageElements) -> Self {
        Self { images }
    }
}

impl ImageLoader for HtmlImageLoader {
    fn begin_load(&self, source: &str, done: LoadNotifier) {
        let element = match HtmlImageElement::new() {
            Ok(element) => element,
            Err(e) => {
                log::warn!("Could not create image for {}: {:?}", source, e);
                return;
            }
        };

        let loaded = element.clone();
        let closure = Closure::<dyn FnMut()>::new(move || {
            done.loaded(loaded.natural_width(), loaded.natural_height());
        });
        element.set_onload(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        element.set_src(source);
        self.images.borrow_mut().insert(source.to_string(), element);
    }
}

struct MediaInstance {
    element: Option<HtmlAudioElement>,
}

impl ClipInstance for MediaInstance {
    fn play(&mut self) {
        if let Some(element) = &self.element {
            let _ = element.play();
        }
    }

    fn ended(&self) -> bool {
        self.element.as_ref().is_none_or(|e| e.ended())
    }
}

/// Plays clips through `<audio>` elements
#[derive(Debug, Default)]
pub struct HtmlAudioBackend;

impl AudioBackend for HtmlAudioBackend {
    fn create_instance(&self, source: &str) -> Box<dyn ClipInstance> {
        let element = match HtmlAudioElement::new_with_src(source) {
            Ok(element) => {
                element.set_preload("auto");
                Some(element)
            }
            Err(e) => {
                log::warn!("Could not create audio for {}: {:?}", source, e);
                None
            }
        };
        Box::new(MediaInstance { element })
    }
}

/// `window.localStorage`
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    pub fn new() -> RadiusResult<Self> {
        let storage = window()?
            .local_storage()
            .map_err(|e| js_error("local_storage", e))?
            .ok_or_else(|| RadiusError::storage("LocalStorage unavailable"))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> RadiusResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| RadiusError::storage(format!("set {key}: {e:?}")))
    }

    fn remove(&self, key: &str) -> RadiusResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| RadiusError::storage(format!("remove {key}: {e:?}")))
    }
}

fn listen<E: FromWasmAbi + 'static>(
    target: &web_sys::EventTarget,
    name: &str,
    handler: impl FnMut(E) + 'static,
) -> RadiusResult<()> {
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target
        .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
        .map_err(|e| js_error(name, e))?;
    closure.forget();
    Ok(())
}

/// Feed keyboard (window), mouse and touch (canvas) events into the queues
pub fn wire_input(canvas: &HtmlCanvasElement, input: Rc<InputQueues>) -> RadiusResult<()> {
    let window = window()?;

    for (name, pressed) in [("keydown", true), ("keyup", false)] {
        let input = input.clone();
        listen(&window, name, move |event: KeyboardEvent| {
            if Key::from_dom_key(&event.key()).is_some() {
                event.prevent_default();
                input.keys.dom_key(&event.key(), pressed);
            }
        })?;
    }

    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let input = input.clone();
        listen(canvas, name, move |event: MouseEvent| {
            event.prevent_default();
            input.mouse.button(
                MouseButton::from_dom(event.button()),
                pressed,
                event.offset_x() as f32,
                event.offset_y() as f32,
            );
        })?;
    }

    {
        let input = input.clone();
        listen(canvas, "mousemove", move |event: MouseEvent| {
            event.prevent_default();
            input.mouse.moved(event.offset_x() as f32, event.offset_y() as f32);
        })?;
    }

    {
        let input = input.clone();
        listen(canvas, "mouseleave", move |_: MouseEvent| input.mouse.left())?;
    }

    for (name, phase) in [
        ("touchstart", TouchPhase::Start),
        ("touchmove", TouchPhase::Move),
        ("touchend", TouchPhase::End),
        ("touchcancel", TouchPhase::Cancel),
    ] {
        let input = input.clone();
        let target = canvas.clone();
        listen(canvas, name, move |event: TouchEvent| {
            event.prevent_default();
            let rect = target.get_bounding_client_rect();
            let touches = event.changed_touches();
            for i in 0..touches.length() {
                if let Some(touch) = touches.get(i) {
                    input.touch.touch(
                        touch.identifier(),
                        phase,
                        (touch.client_x() as f64 - rect.left()) as f32,
                        (touch.client_y() as f64 - rect.top()) as f32,
                    );
                }
            }
        })?;
    }

    Ok(())
}

/// Run `frame` on every animation frame, forever
pub fn run_loop<S: Surface + 'static>(radius: Rc<RefCell<Radius<S>>>) {
    let Some(window) = web_sys::window() else {
        log::error!("no window; loop not started");
        return;
    };
    let closure = Closure::once(move |_time: f64| {
        radius.borrow_mut().frame();
        run_loop(radius);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}
