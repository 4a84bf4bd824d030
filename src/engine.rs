//! The Radius engine: layer stack and per-frame loop
//!
//! One call to [`Radius::frame`] is one iteration of the loop:
//!
//! 1. Snapshot the top layer as this frame's active layer
//! 2. Drain queued keys into it
//! 3. Build the device to logical transform for the current surface size
//! 4. Drain queued mouse and touch events through that transform
//! 5. Update the active layer
//! 6. Draw whatever layer is on top now
//! 7. Reset the active layer's timer if it was covered or popped this frame
//!
//! Input in steps 2 and 4 is only delivered while the active layer is still
//! on top; once a handler changes the stack, the rest of the frame's input is
//! dropped. Scheduling the next frame is the host's job.

use std::rc::Rc;

use glam::Vec2;

use crate::actions::{Actions, StackRequest};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::input::{InputQueues, MouseEvent, TouchPhase};
use crate::layer::LayerRef;
use crate::surface::{Font, Surface};
use crate::text;
use crate::transform::Transform2D;

/// Uniform letterbox fit of the logical space into a device surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    size: Vec2,
    logical: Vec2,
    scale: f32,
}

impl Viewport {
    pub fn new(size: Vec2, logical: Vec2) -> Self {
        let scale = (size.x / logical.x).min(size.y / logical.y);
        Self { size, logical, scale }
    }

    /// Device pixels per logical unit
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Device pixels (top-left origin, y-down) to logical units (center origin, y-up)
    pub fn device_to_logical(&self) -> Transform2D {
        let t = Transform2D::identity().translate(-self.size.x / 2.0, -self.size.y / 2.0);
        if self.scale > 0.0 {
            t.scale(1.0 / self.scale, -1.0 / self.scale)
        } else {
            t
        }
    }

    pub fn logical_to_device(&self) -> Transform2D {
        Transform2D::identity()
            .scale(self.scale, -self.scale)
            .translate(self.size.x / 2.0, self.size.y / 2.0)
    }

    pub fn to_logical(&self, device: Vec2) -> Vec2 {
        self.device_to_logical().transform_point(device)
    }

    /// Unused device space on each side of the logical area
    pub fn margins(&self) -> Vec2 {
        ((self.size - self.logical * self.scale) / 2.0).max(Vec2::ZERO)
    }
}

/// Engine context: owns the surface, the layer stack and the input queues
pub struct Radius<S: Surface> {
    surface: S,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    /// Top of the stack is the last element
    stack: Vec<LayerRef>,
    input: Rc<InputQueues>,
    fullscreen: bool,
    frames: u64,
}

impl<S: Surface> Radius<S> {
    pub fn new(surface: S, config: EngineConfig, clock: impl Clock + 'static) -> Self {
        let size = surface.size();
        log::info!(
            "Radius initialized: {}x{} surface, {}x{} logical",
            size.x,
            size.y,
            config.logical_width,
            config.logical_height
        );
        Self {
            surface,
            config,
            clock: Box::new(clock),
            stack: Vec::new(),
            input: Rc::new(InputQueues::default()),
            fullscreen: false,
            frames: 0,
        }
    }

    /// Queues shared with whatever feeds device events
    pub fn input(&self) -> &Rc<InputQueues> {
        &self.input
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn top(&self) -> Option<LayerRef> {
        self.stack.last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    fn is_top(&self, layer: &LayerRef) -> bool {
        self.stack.last().is_some_and(|top| Rc::ptr_eq(top, layer))
    }

    /// Cover the current top layer with `layer`
    pub fn push_layer(&mut self, layer: LayerRef) {
        if let Some(top) = self.stack.last() {
            top.borrow_mut().set_hidden();
        }
        log::info!("push layer '{}' (depth {})", layer.borrow().name(), self.stack.len() + 1);
        self.stack.push(layer.clone());
        self.show(&layer);
    }

    /// Remove the top layer and show the one below it. The popped layer is
    /// returned to the caller; the engine keeps no reference to it.
    pub fn pop_layer(&mut self) -> Option<LayerRef> {
        let popped = self.stack.pop()?;
        popped.borrow_mut().set_hidden();
        log::info!("pop layer '{}' (depth {})", popped.borrow().name(), self.stack.len());
        if let Some(top) = self.top() {
            self.show(&top);
        }
        Some(popped)
    }

    fn show(&mut self, layer: &LayerRef) {
        let mut actions = Actions::new();
        {
            let mut layer = layer.borrow_mut();
            layer.reset_timer();
            layer.shown(&mut actions);
        }
        self.apply(&mut actions);
    }

    fn apply(&mut self, actions: &mut Actions) {
        let requests: Vec<StackRequest> = actions.drain().collect();
        for request in requests {
            match request {
                StackRequest::Push(layer) => self.push_layer(layer),
                StackRequest::Pop => {
                    self.pop_layer();
                }
            }
        }
    }

    /// Push the first layer and run the first frame
    pub fn start(&mut self, layer: LayerRef) {
        self.push_layer(layer);
        self.frame();
    }

    /// Run one loop iteration
    pub fn frame(&mut self) {
        let Some(active) = self.top() else {
            return;
        };
        self.frames += 1;
        let mut actions = Actions::new();

        for event in self.input.keys.drain() {
            if !self.is_top(&active) {
                log::debug!("dropped {} for a layer that is no longer active", event.key);
                continue;
            }
            active.borrow_mut().key_pressed(event.key, event.pressed, &mut actions);
            self.apply(&mut actions);
        }

        let viewport = self.viewport();

        for event in self.input.mouse.drain() {
            if !self.is_top(&active) {
                log::debug!("dropped {event:?} for a layer that is no longer active");
                continue;
            }
            {
                let mut layer = active.borrow_mut();
                match event {
                    MouseEvent::Button { button, pressed, position } => {
                        layer.mouse_button_pressed(button, pressed, viewport.to_logical(position), &mut actions)
                    }
                    MouseEvent::Move { position } => layer.mouse_moved(viewport.to_logical(position), &mut actions),
                    MouseEvent::Leave => layer.mouse_out(&mut actions),
                }
            }
            self.apply(&mut actions);
        }

        for event in self.input.touch.drain() {
            if !self.is_top(&active) {
                log::debug!("dropped {event:?} for a layer that is no longer active");
                continue;
            }
            {
                let mut layer = active.borrow_mut();
                let position = viewport.to_logical(event.position);
                match event.phase {
                    TouchPhase::Start => layer.touched(event.id, true, position, &mut actions),
                    TouchPhase::End => layer.touched(event.id, false, position, &mut actions),
                    TouchPhase::Move => layer.touch_moved(event.id, position, &mut actions),
                    TouchPhase::Cancel => layer.touch_canceled(event.id, &mut actions),
                }
            }
            self.apply(&mut actions);
        }

        let now = self.clock.now_ms();
        active.borrow_mut().update(now, &self.config, &mut actions);
        self.apply(&mut actions);

        if let Some(current) = self.top() {
            current.borrow().draw(&mut self.surface, &self.config);
        }

        let mut original = active.borrow_mut();
        if original.is_hidden() {
            original.reset_timer();
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.surface.size(), self.config.logical_size())
    }

    /// Device pixels per logical unit
    pub fn scale(&self) -> f32 {
        self.viewport().scale()
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen != self.fullscreen {
            log::info!("fullscreen: {fullscreen}");
            self.surface.set_fullscreen(fullscreen);
            self.fullscreen = fullscreen;
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn measure_text_width(&self, font: &Font, text: &str) -> f32 {
        self.surface.measure_text(font, text)
    }

    pub fn wrap_text(&self, font: &Font, max_width: f32, text: &str) -> Vec<String> {
        text::wrap_text(&self.surface, font, max_width, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::input::{Key, MouseButton, TouchPhase};
    use crate::layer::Layer;
    use crate::scene::{Entity, Rectangle};
    use crate::surface::{Color, DrawOp, RecordingSurface};
    use std::cell::{Cell, RefCell};

    fn engine() -> (Radius<RecordingSurface>, ManualClock) {
        let clock = ManualClock::new(1000.0);
        let radius = Radius::new(
            RecordingSurface::new(640.0, 480.0),
            EngineConfig::default(),
            clock.clone(),
        );
        (radius, clock)
    }

    #[test]
    fn test_viewport_letterbox() {
        let viewport = Viewport::new(Vec2::new(1280.0, 480.0), Vec2::new(640.0, 480.0));
        assert_eq!(viewport.scale(), 1.0);
        assert_eq!(viewport.margins(), Vec2::new(320.0, 0.0));

        let center = viewport.to_logical(Vec2::new(640.0, 240.0));
        assert!(center.length() < 1e-5);
        let top_left = viewport.to_logical(Vec2::new(320.0, 0.0));
        assert!((top_left - Vec2::new(-320.0, 240.0)).length() < 1e-4);

        let back = viewport.logical_to_device().transform_point(top_left);
        assert!((back - Vec2::new(320.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_push_pop_shown_and_hidden() {
        let (mut radius, _) = engine();
        let shown = Rc::new(Cell::new(0));
        let counter = shown.clone();
        let menu = Layer::new("menu")
            .on_shown(move |_| counter.set(counter.get() + 1))
            .into_ref();
        let game = Layer::new("game").into_ref();

        radius.push_layer(menu.clone());
        assert_eq!(shown.get(), 1);

        radius.push_layer(game.clone());
        assert!(menu.borrow().is_hidden());
        assert!(Rc::ptr_eq(&radius.top().unwrap(), &game));

        let popped = radius.pop_layer().unwrap();
        assert!(Rc::ptr_eq(&popped, &game));
        assert_eq!(shown.get(), 2);
        assert_eq!(radius.depth(), 1);

        radius.pop_layer();
        assert!(radius.pop_layer().is_none());
        radius.frame();
        assert_eq!(radius.frame_count(), 0);
    }

    #[test]
    fn test_stale_layer_guard_drops_remaining_input() {
        let (mut radius, _) = engine();

        let menu_pointer = Rc::new(Cell::new(0));
        let next_pointer = Rc::new(Cell::new(0));
        let next = {
            let hits = next_pointer.clone();
            Layer::new("next")
                .on_mouse_button(move |_, _, _, _| hits.set(hits.get() + 1))
                .into_ref()
        };
        let menu = {
            let target = next.clone();
            let hits = menu_pointer.clone();
            Layer::new("menu")
                .on_key(Key::Enter, move |pressed, actions| {
                    if pressed {
                        actions.push_layer(target.clone());
                    }
                })
                .on_mouse_button(move |_, _, _, _| hits.set(hits.get() + 1))
                .into_ref()
        };
        radius.push_layer(menu);

        radius.input().keys.key(Key::Enter, true);
        radius.input().keys.key(Key::Enter, true);
        radius.input().mouse.button(MouseButton::Primary, true, 320.0, 240.0);
        radius.frame();

        assert!(Rc::ptr_eq(&radius.top().unwrap(), &next));
        // Second Enter and the click were dropped, not redirected
        assert_eq!(radius.depth(), 2);
        assert_eq!(menu_pointer.get(), 0);
        assert_eq!(next_pointer.get(), 0);

        radius.input().mouse.button(MouseButton::Primary, true, 320.0, 240.0);
        radius.frame();
        assert_eq!(next_pointer.get(), 1);
    }

    #[test]
    fn test_touch_routed_and_guarded() {
        let (mut radius, _) = engine();

        let next_moves = Rc::new(RefCell::new(Vec::new()));
        let next_cancels = Rc::new(Cell::new(0));
        let next = {
            let moves = next_moves.clone();
            let cancels = next_cancels.clone();
            Layer::new("next")
                .on_touch_moved(move |id, p, _| moves.borrow_mut().push((id, p)))
                .on_touch_canceled(move |_, _| cancels.set(cancels.get() + 1))
                .into_ref()
        };

        let starts = Rc::new(RefCell::new(Vec::new()));
        let first_moves = Rc::new(Cell::new(0));
        let first = {
            let target = next.clone();
            let starts = starts.clone();
            let moves = first_moves.clone();
            Layer::new("first")
                .on_touched(move |id, pressed, p, actions| {
                    starts.borrow_mut().push((id, pressed, p));
                    if pressed {
                        actions.push_layer(target.clone());
                    }
                })
                .on_touch_moved(move |_, _, _| moves.set(moves.get() + 1))
                .into_ref()
        };
        radius.push_layer(first);

        let touch = &radius.input().touch;
        touch.touch(3, TouchPhase::Start, 320.0, 240.0);
        touch.touch(3, TouchPhase::Move, 0.0, 0.0);
        touch.touch(3, TouchPhase::Cancel, 0.0, 0.0);
        radius.frame();

        {
            let starts = starts.borrow();
            assert_eq!(starts.len(), 1);
            assert_eq!((starts[0].0, starts[0].1), (3, true));
            assert!(starts[0].2.length() < 1e-4);
        }
        assert!(Rc::ptr_eq(&radius.top().unwrap(), &next));
        // The move and cancel were dropped, not redirected
        assert_eq!(first_moves.get(), 0);
        assert!(next_moves.borrow().is_empty());
        assert_eq!(next_cancels.get(), 0);

        let touch = &radius.input().touch;
        touch.touch(3, TouchPhase::Move, 0.0, 0.0);
        touch.touch(3, TouchPhase::Cancel, 0.0, 0.0);
        radius.frame();

        let moves = next_moves.borrow();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].0, 3);
        assert!((moves[0].1 - Vec2::new(-320.0, 240.0)).length() < 1e-4);
        assert_eq!(next_cancels.get(), 1);
    }

    #[test]
    fn test_mouse_out_pop_drops_remaining_pointer_input() {
        let (mut radius, _) = engine();

        let base_moves = Rc::new(Cell::new(0));
        let base = {
            let moves = base_moves.clone();
            Layer::new("base")
                .on_mouse_moved(move |_, _| moves.set(moves.get() + 1))
                .into_ref()
        };
        let outs = Rc::new(Cell::new(0));
        let popup = {
            let outs = outs.clone();
            Layer::new("popup")
                .on_mouse_out(move |actions| {
                    outs.set(outs.get() + 1);
                    actions.pop_layer();
                })
                .into_ref()
        };
        radius.push_layer(base.clone());
        radius.push_layer(popup);

        radius.input().mouse.left();
        radius.input().mouse.moved(10.0, 10.0);
        radius.frame();

        assert_eq!(outs.get(), 1);
        assert!(Rc::ptr_eq(&radius.top().unwrap(), &base));
        assert_eq!(base_moves.get(), 0);

        radius.input().mouse.moved(10.0, 10.0);
        radius.frame();
        assert_eq!(base_moves.get(), 1);
    }

    #[test]
    fn test_pointer_mapped_to_logical_space() {
        let (mut radius, _) = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        radius.push_layer(
            Layer::new("pointer")
                .on_mouse_moved(move |p, _| sink.borrow_mut().push(p))
                .into_ref(),
        );

        radius.input().mouse.moved(0.0, 0.0);
        radius.input().mouse.moved(320.0, 240.0);
        radius.frame();

        let seen = seen.borrow();
        assert!((seen[0] - Vec2::new(-320.0, 240.0)).length() < 1e-4);
        assert!(seen[1].length() < 1e-4);
    }

    #[test]
    fn test_keys_before_update_before_draw() {
        let (mut radius, clock) = engine();
        let velocity = Rc::new(Cell::new(0.0f32));
        let layer = {
            let velocity = velocity.clone();
            Layer::new("game")
                .on_key(Key::Right, move |pressed, _| velocity.set(if pressed { 1.0 } else { 0.0 }))
                .into_ref()
        };
        let player = layer.borrow().add_entity(
            Entity::new(0.0, 0.0)
                .with_element(Rectangle::default())
                .with_update(move |e, ms, _| e.position.x += velocity.get() * ms),
        );

        radius.start(layer);
        clock.advance(16.0);
        radius.input().keys.key(Key::Right, true);
        radius.surface_mut().clear_ops();
        radius.frame();

        assert!((player.borrow().position.x - 16.0).abs() < 1e-4);
        assert!(radius.surface().ops.contains(&DrawOp::Translate(16.0, 0.0)));
    }

    #[test]
    fn test_update_push_draws_new_top_and_resets_original() {
        let (mut radius, clock) = engine();
        let over = Layer::new("game over").with_background(Color::RED).into_ref();
        let game = Layer::new("game").into_ref();
        {
            let over = over.clone();
            let fired = Cell::new(false);
            game.borrow().add_entity(Entity::new(0.0, 0.0).with_update(move |_, _, actions| {
                if !fired.replace(true) {
                    actions.push_layer(over.clone());
                }
            }));
        }

        radius.start(game.clone());
        assert!(game.borrow().last_update().is_some());

        clock.advance(16.0);
        radius.surface_mut().clear_ops();
        radius.frame();

        assert!(radius.surface().ops.contains(&DrawOp::Fill(Color::RED)));
        let game = game.borrow();
        assert!(!game.is_hidden());
        assert_eq!(game.last_update(), None);
    }

    #[test]
    fn test_fullscreen_and_text_services() {
        let (mut radius, _) = engine();
        radius.set_fullscreen(true);
        radius.set_fullscreen(true);
        assert!(radius.is_fullscreen());
        let toggles = radius
            .surface()
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Fullscreen(_)))
            .count();
        assert_eq!(toggles, 1);

        let font = Font::default();
        assert_eq!(radius.measure_text_width(&font, "abc"), 18.0);
        assert_eq!(radius.wrap_text(&font, 40.0, "ab cd ef"), vec!["ab cd", "ef"]);
        assert_eq!(radius.wrap_text(&font, 25.0, "ab cd ef"), vec!["ab", "cd", "ef"]);
        assert_eq!(radius.scale(), 1.0);
    }
}
