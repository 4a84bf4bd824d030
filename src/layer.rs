//! Layers: one full-screen mode of the application
//!
//! A layer owns its root entities, its own update timestamp and its input
//! hooks. Only the top layer of the engine stack receives input and updates;
//! covered layers keep their state untouched until they are shown again.
//!
//! Hooks run while the engine holds the layer borrowed, so a hook must not
//! borrow its own `LayerRef`. Capture `entities()` or other shared state instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use crate::actions::Actions;
use crate::config::EngineConfig;
use crate::engine::Viewport;
use crate::input::{Key, MouseButton};
use crate::scene::{EntityList, EntityRef, draw_entity, update_list};
use crate::surface::{Color, Surface};

pub type LayerRef = Rc<RefCell<Layer>>;

pub type KeyHandler = Box<dyn FnMut(bool, &mut Actions)>;
pub type AnyKeyHandler = Box<dyn FnMut(Key, bool, &mut Actions)>;
pub type MouseMovedHook = Box<dyn FnMut(Vec2, &mut Actions)>;
pub type MouseButtonHook = Box<dyn FnMut(MouseButton, bool, Vec2, &mut Actions)>;
pub type TouchedHook = Box<dyn FnMut(i32, bool, Vec2, &mut Actions)>;
pub type TouchMovedHook = Box<dyn FnMut(i32, Vec2, &mut Actions)>;
pub type TouchCanceledHook = Box<dyn FnMut(i32, &mut Actions)>;
pub type LayerHook = Box<dyn FnMut(&mut Actions)>;

#[derive(Default)]
pub struct Layer {
    name: String,
    entities: Rc<EntityList>,
    last_update: Option<f64>,
    hidden: bool,
    /// Overrides the configured background
    pub background: Option<Color>,
    key_handlers: HashMap<Key, KeyHandler>,
    any_key: Option<AnyKeyHandler>,
    mouse_moved: Option<MouseMovedHook>,
    mouse_button_pressed: Option<MouseButtonHook>,
    mouse_out: Option<LayerHook>,
    touched: Option<TouchedHook>,
    touch_moved: Option<TouchMovedHook>,
    touch_canceled: Option<TouchCanceledHook>,
    shown: Option<LayerHook>,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("entities", &self.entities.len())
            .field("last_update", &self.last_update)
            .field("hidden", &self.hidden)
            .field("keys", &self.key_handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_ref(self) -> LayerRef {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Handler for presses and releases of one key
    pub fn on_key(mut self, key: Key, handler: impl FnMut(bool, &mut Actions) + 'static) -> Self {
        self.key_handlers.insert(key, Box::new(handler));
        self
    }

    /// Receives keys that have no entry in the per-key table
    pub fn on_any_key(mut self, handler: impl FnMut(Key, bool, &mut Actions) + 'static) -> Self {
        self.any_key = Some(Box::new(handler));
        self
    }

    pub fn on_mouse_moved(mut self, hook: impl FnMut(Vec2, &mut Actions) + 'static) -> Self {
        self.mouse_moved = Some(Box::new(hook));
        self
    }

    pub fn on_mouse_button(
        mut self,
        hook: impl FnMut(MouseButton, bool, Vec2, &mut Actions) + 'static,
    ) -> Self {
        self.mouse_button_pressed = Some(Box::new(hook));
        self
    }

    pub fn on_mouse_out(mut self, hook: impl FnMut(&mut Actions) + 'static) -> Self {
        self.mouse_out = Some(Box::new(hook));
        self
    }

    pub fn on_touched(mut self, hook: impl FnMut(i32, bool, Vec2, &mut Actions) + 'static) -> Self {
        self.touched = Some(Box::new(hook));
        self
    }

    pub fn on_touch_moved(mut self, hook: impl FnMut(i32, Vec2, &mut Actions) + 'static) -> Self {
        self.touch_moved = Some(Box::new(hook));
        self
    }

    pub fn on_touch_canceled(mut self, hook: impl FnMut(i32, &mut Actions) + 'static) -> Self {
        self.touch_canceled = Some(Box::new(hook));
        self
    }

    /// Runs each time the layer becomes the top of the stack
    pub fn on_shown(mut self, hook: impl FnMut(&mut Actions) + 'static) -> Self {
        self.shown = Some(Box::new(hook));
        self
    }

    pub fn entities(&self) -> &Rc<EntityList> {
        &self.entities
    }

    pub fn add_entity(&self, entity: impl Into<EntityRef>) -> EntityRef {
        let entity = entity.into();
        self.entities.append(entity.clone());
        entity
    }

    pub fn remove_entity(&self, entity: &EntityRef) {
        self.entities.remove(entity);
    }

    pub fn last_update(&self) -> Option<f64> {
        self.last_update
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn set_hidden(&mut self) {
        self.hidden = true;
    }

    /// Forget the timestamp so the next update starts a fresh delta
    pub(crate) fn reset_timer(&mut self) {
        self.last_update = None;
        self.hidden = false;
    }

    /// Advance every root entity by the time since this layer's previous update.
    ///
    /// The first update after creation (or a reset) only records the timestamp.
    /// Returns the delta passed to the entities, if any.
    pub fn update(&mut self, now_ms: f64, config: &EngineConfig, actions: &mut Actions) -> Option<f32> {
        let delta = match self.last_update {
            Some(last) if last < now_ms => {
                let elapsed = (now_ms - last) as f32;
                let ms = config.clamp_delta(elapsed);
                if ms != elapsed {
                    log::debug!("{}: clamped {:.1}ms frame to {:.1}ms", self.name, elapsed, ms);
                }
                update_list(&self.entities, ms, actions);
                Some(ms)
            }
            _ => None,
        };

        self.last_update = Some(now_ms);
        delta
    }

    /// Route a key to its handler; unmatched keys are ignored
    pub fn key_pressed(&mut self, key: Key, pressed: bool, actions: &mut Actions) {
        if let Some(handler) = self.key_handlers.get_mut(&key) {
            handler(pressed, actions);
        } else if let Some(handler) = self.any_key.as_mut() {
            handler(key, pressed, actions);
        }
    }

    pub fn mouse_moved(&mut self, position: Vec2, actions: &mut Actions) {
        if let Some(hook) = self.mouse_moved.as_mut() {
            hook(position, actions);
        }
    }

    pub fn mouse_button_pressed(
        &mut self,
        button: MouseButton,
        pressed: bool,
        position: Vec2,
        actions: &mut Actions,
    ) {
        if let Some(hook) = self.mouse_button_pressed.as_mut() {
            hook(button, pressed, position, actions);
        }
    }

    pub fn mouse_out(&mut self, actions: &mut Actions) {
        if let Some(hook) = self.mouse_out.as_mut() {
            hook(actions);
        }
    }

    pub fn touched(&mut self, id: i32, pressed: bool, position: Vec2, actions: &mut Actions) {
        if let Some(hook) = self.touched.as_mut() {
            hook(id, pressed, position, actions);
        }
    }

    pub fn touch_moved(&mut self, id: i32, position: Vec2, actions: &mut Actions) {
        if let Some(hook) = self.touch_moved.as_mut() {
            hook(id, position, actions);
        }
    }

    pub fn touch_canceled(&mut self, id: i32, actions: &mut Actions) {
        if let Some(hook) = self.touch_canceled.as_mut() {
            hook(id, actions);
        }
    }

    pub fn shown(&mut self, actions: &mut Actions) {
        if let Some(hook) = self.shown.as_mut() {
            hook(actions);
        }
    }

    /// Clear to the background, then draw all roots in logical space
    pub fn draw(&self, surface: &mut dyn Surface, config: &EngineConfig) {
        let size = surface.size();
        let background = self.background.unwrap_or(config.background);
        surface.set_fill(&background);
        surface.fill_rect(0.0, 0.0, size.x, size.y);

        let viewport = Viewport::new(size, config.logical_size());
        let scale = viewport.scale();

        surface.save();
        surface.translate(size.x / 2.0, size.y / 2.0);
        surface.scale(scale, -scale);
        self.entities.for_each(|entity| draw_entity(surface, &entity.borrow()));
        surface.restore();

        if config.cover_margins {
            let margins = viewport.margins();
            surface.set_fill(&background);
            if margins.x > 0.0 {
                surface.fill_rect(0.0, 0.0, margins.x, size.y);
                surface.fill_rect(size.x - margins.x, 0.0, margins.x, size.y);
            }
            if margins.y > 0.0 {
                surface.fill_rect(0.0, 0.0, size.x, margins.y);
                surface.fill_rect(0.0, size.y - margins.y, size.x, margins.y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Entity, Rectangle};
    use crate::surface::{DrawOp, RecordingSurface};
    use std::cell::Cell;

    fn recording_entity(deltas: Rc<RefCell<Vec<f32>>>) -> Entity {
        Entity::new(0.0, 0.0).with_update(move |_, ms, _| deltas.borrow_mut().push(ms))
    }

    #[test]
    fn test_first_update_only_records_timestamp() {
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let mut layer = Layer::new("test");
        layer.add_entity(recording_entity(deltas.clone()));

        let config = EngineConfig::default();
        let mut actions = Actions::new();
        assert_eq!(layer.update(1000.0, &config, &mut actions), None);
        assert_eq!(layer.last_update(), Some(1000.0));
        assert!(deltas.borrow().is_empty());
    }

    #[test]
    fn test_delta_clamp() {
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let mut layer = Layer::new("test");
        layer.add_entity(recording_entity(deltas.clone()));

        let config = EngineConfig::default();
        let mut actions = Actions::new();
        layer.update(1000.0, &config, &mut actions);
        layer.update(1016.0, &config, &mut actions);
        // Backgrounded tab: 5 seconds become one fallback step
        layer.update(6016.0, &config, &mut actions);
        // Exactly at the threshold is not clamped
        layer.update(6116.0, &config, &mut actions);

        assert_eq!(*deltas.borrow(), vec![16.0, 50.0, 100.0]);
    }

    #[test]
    fn test_clock_going_backwards_skips_update() {
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let mut layer = Layer::new("test");
        layer.add_entity(recording_entity(deltas.clone()));

        let config = EngineConfig::default();
        let mut actions = Actions::new();
        layer.update(1000.0, &config, &mut actions);
        assert_eq!(layer.update(900.0, &config, &mut actions), None);
        assert_eq!(layer.update(916.0, &config, &mut actions), Some(16.0));
        assert_eq!(*deltas.borrow(), vec![16.0]);
    }

    #[test]
    fn test_dead_roots_removed() {
        let mut layer = Layer::new("test");
        let doomed = layer.add_entity(Entity::new(0.0, 0.0));
        layer.add_entity(Entity::new(1.0, 0.0));
        doomed.borrow_mut().dead = true;

        let config = EngineConfig::default();
        let mut actions = Actions::new();
        layer.update(0.0, &config, &mut actions);
        assert_eq!(layer.entities().len(), 2);
        layer.update(16.0, &config, &mut actions);
        assert_eq!(layer.entities().len(), 1);
    }

    #[test]
    fn test_unmatched_keys_ignored() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let mut layer = Layer::new("test").on_key(Key::Enter, move |pressed, _| {
            if pressed {
                counter.set(counter.get() + 1);
            }
        });

        let mut actions = Actions::new();
        layer.key_pressed(Key::Enter, true, &mut actions);
        layer.key_pressed(Key::Enter, false, &mut actions);
        layer.key_pressed(Key::Z, true, &mut actions);
        layer.mouse_moved(Vec2::ZERO, &mut actions);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_any_key_fallback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut layer = Layer::new("test")
            .on_key(Key::Escape, |_, _| {})
            .on_any_key(move |key, _, _| sink.borrow_mut().push(key));

        let mut actions = Actions::new();
        layer.key_pressed(Key::Escape, true, &mut actions);
        layer.key_pressed(Key::Up, true, &mut actions);
        assert_eq!(*seen.borrow(), vec![Key::Up]);
    }

    #[test]
    fn test_draw_sets_up_logical_space() {
        let mut surface = RecordingSurface::new(1280.0, 960.0);
        let layer = Layer::new("test");
        layer.add_entity(Entity::new(0.0, 0.0).with_element(Rectangle::default()));

        layer.draw(&mut surface, &EngineConfig::default());
        let ops = &surface.ops;
        assert_eq!(ops[0], DrawOp::Fill(Color::BLACK));
        assert_eq!(
            ops[1],
            DrawOp::FillRect { x: 0.0, y: 0.0, width: 1280.0, height: 960.0 }
        );
        assert_eq!(ops[2], DrawOp::Save);
        assert_eq!(ops[3], DrawOp::Translate(640.0, 480.0));
        assert_eq!(ops[4], DrawOp::Scale(2.0, -2.0));
        assert_eq!(surface.stack_depth(), 0);
    }

    #[test]
    fn test_letterbox_margins_covered() {
        let mut surface = RecordingSurface::new(1280.0, 480.0);
        let layer = Layer::new("test").with_background(Color::BLUE);

        layer.draw(&mut surface, &EngineConfig::default());
        assert!(surface.ops.contains(&DrawOp::FillRect { x: 0.0, y: 0.0, width: 320.0, height: 480.0 }));
        assert!(surface.ops.contains(&DrawOp::FillRect { x: 960.0, y: 0.0, width: 320.0, height: 480.0 }));
        assert!(surface.ops.iter().all(|op| !matches!(op, DrawOp::Fill(c) if *c == Color::BLACK)));
    }
}
