//! Leaf components: static labels, buttons and option choosers

use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::component::{Component, FocusEntry};
use crate::actions::Actions;
use crate::audio::AudioClip;
use crate::event::Event;
use crate::scene::{Entity, EntityList, EntityRef, Text};
use crate::surface::{Color, Font, TextMetrics};

pub const DEFAULT_COLOR: Color = Color::WHITE;
pub const FOCUSED_COLOR: Color = Color::GREEN;
pub const DISABLED_COLOR: Color = Color::GRAY;

/// One line of text. Never takes focus.
pub struct Label {
    entity: EntityRef,
    font: Font,
    text: String,
    size: Vec2,
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label").field("text", &self.text).field("size", &self.size).finish()
    }
}

impl Label {
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        let text = text.into();
        let entity = Entity::new(0.0, 0.0)
            .with_element(Text::new(text.clone(), font.clone()).with_color(DEFAULT_COLOR));
        Self {
            entity: entity.into(),
            font,
            text,
            size: Vec2::ZERO,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        let mut entity = self.entity.borrow_mut();
        for element in entity.elements.iter_mut() {
            if let Some(t) = element.as_text_mut() {
                t.set_text(self.text.clone());
            }
        }
    }

    pub fn color(&self) -> Option<Color> {
        self.entity
            .borrow()
            .elements
            .iter()
            .find_map(|e| e.as_text().and_then(|t| t.color))
    }

    pub fn set_color(&mut self, color: Color) {
        for element in self.entity.borrow_mut().elements.iter_mut() {
            element.set_color(color);
        }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    fn height(&self) -> f32 {
        self.font.size
    }
}

impl Component for Label {
    fn minimum_size(&self, metrics: &dyn TextMetrics) -> Vec2 {
        Vec2::new(metrics.measure_text(&self.font, &self.text), self.height())
    }

    fn position(&self) -> Vec2 {
        let position = self.entity.borrow().position;
        Vec2::new(position.x, position.y + self.height())
    }

    /// The text baseline sits at the bottom of the component
    fn set_position(&mut self, position: Vec2, _metrics: &dyn TextMetrics) {
        self.entity.borrow_mut().position = Vec2::new(position.x, position.y - self.height());
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn set_size(&mut self, size: Vec2, _metrics: &dyn TextMetrics) {
        self.size = size;
    }

    fn attach(&self, list: &EntityList) {
        list.append(self.entity.clone());
    }
}

pub type ActivatedHook = Box<dyn FnMut(&mut Actions)>;

/// A label that can be focused and activated
pub struct Button {
    label: Label,
    active: bool,
    focused: bool,
    on_activated: Option<ActivatedHook>,
}

impl fmt::Debug for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button")
            .field("text", &self.label.text)
            .field("active", &self.active)
            .field("focused", &self.focused)
            .finish()
    }
}

impl Button {
    pub fn new(text: impl Into<String>, font: Font, on_activated: impl FnMut(&mut Actions) + 'static) -> Self {
        Self {
            label: Label::new(text, font),
            active: true,
            focused: false,
            on_activated: Some(Box::new(on_activated)),
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.refresh_color();
    }

    pub fn disabled(mut self) -> Self {
        self.set_active(false);
        self
    }

    fn refresh_color(&mut self) {
        let color = if !self.active {
            DISABLED_COLOR
        } else if self.focused {
            FOCUSED_COLOR
        } else {
            DEFAULT_COLOR
        };
        self.label.set_color(color);
    }
}

impl Component for Button {
    fn minimum_size(&self, metrics: &dyn TextMetrics) -> Vec2 {
        self.label.minimum_size(metrics)
    }

    fn position(&self) -> Vec2 {
        self.label.position()
    }

    fn set_position(&mut self, position: Vec2, metrics: &dyn TextMetrics) {
        self.label.set_position(position, metrics);
    }

    fn size(&self) -> Vec2 {
        self.label.size()
    }

    fn set_size(&mut self, size: Vec2, metrics: &dyn TextMetrics) {
        self.label.set_size(size, metrics);
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn focused(&mut self, _entry: FocusEntry) {
        self.focused = true;
        self.refresh_color();
    }

    fn unfocused(&mut self) {
        self.focused = false;
        self.refresh_color();
    }

    fn activated(&mut self, actions: &mut Actions) -> bool {
        if !self.active {
            return false;
        }
        match self.on_activated.as_mut() {
            Some(hook) => {
                hook(actions);
                true
            }
            None => false,
        }
    }

    fn attach(&self, list: &EntityList) {
        self.label.attach(list);
    }
}

/// Payload of [`Choice::changed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceChanged {
    pub index: usize,
    pub label: String,
}

/// Picks one of a fixed list of options with left/right
pub struct Choice {
    label: Label,
    options: Vec<String>,
    index: usize,
    focused: bool,
    changed: Event<ChoiceChanged>,
    click: Option<Rc<AudioClip>>,
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choice")
            .field("options", &self.options)
            .field("index", &self.index)
            .field("focused", &self.focused)
            .finish()
    }
}

impl Choice {
    /// Panics if `options` is empty. `on_changed` runs once immediately with the
    /// initial selection, and again on every change.
    pub fn new(
        options: Vec<String>,
        index: usize,
        font: Font,
        on_changed: impl Fn(&ChoiceChanged) + 'static,
    ) -> Self {
        assert!(!options.is_empty(), "choice needs at least one option");
        let index = index.min(options.len() - 1);
        let choice = Self {
            label: Label::new(options[index].clone(), font),
            options,
            index,
            focused: false,
            changed: Event::new(),
            click: None,
        };
        choice.changed.add_listener(on_changed);
        choice.notify();
        choice
    }

    /// Sound played on every change after the initial one
    pub fn with_click(mut self, clip: Rc<AudioClip>) -> Self {
        self.click = Some(clip);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn selected(&self) -> &str {
        &self.options[self.index]
    }

    pub fn max_index(&self) -> usize {
        self.options.len() - 1
    }

    pub fn changed(&self) -> &Event<ChoiceChanged> {
        &self.changed
    }

    fn notify(&self) {
        self.changed.fire(&ChoiceChanged {
            index: self.index,
            label: self.options[self.index].clone(),
        });
    }

    /// Select `index` (clamped). Returns false if the selection did not change.
    pub fn set_index(&mut self, index: usize) -> bool {
        let index = index.min(self.max_index());
        if index == self.index {
            return false;
        }

        self.index = index;
        let text = self.options[index].clone();
        self.label.set_text(text);
        self.notify();
        if let Some(click) = &self.click {
            click.play();
        }
        true
    }
}

impl Component for Choice {
    /// Wide enough for the longest option
    fn minimum_size(&self, metrics: &dyn TextMetrics) -> Vec2 {
        let width = self
            .options
            .iter()
            .map(|o| metrics.measure_text(&self.label.font, o))
            .fold(0.0, f32::max);
        Vec2::new(width, self.label.height())
    }

    fn position(&self) -> Vec2 {
        self.label.position()
    }

    fn set_position(&mut self, position: Vec2, metrics: &dyn TextMetrics) {
        self.label.set_position(position, metrics);
    }

    fn size(&self) -> Vec2 {
        self.label.size()
    }

    fn set_size(&mut self, size: Vec2, metrics: &dyn TextMetrics) {
        self.label.set_size(size, metrics);
    }

    fn is_active(&self) -> bool {
        true
    }

    fn focused(&mut self, _entry: FocusEntry) {
        self.focused = true;
        self.label.set_color(FOCUSED_COLOR);
    }

    fn unfocused(&mut self) {
        self.focused = false;
        self.label.set_color(DEFAULT_COLOR);
    }

    /// Cycles forwards, wrapping at the end
    fn activated(&mut self, _actions: &mut Actions) -> bool {
        let next = if self.index == self.max_index() { 0 } else { self.index + 1 };
        self.set_index(next)
    }

    fn moved_left(&mut self) -> bool {
        match self.index.checked_sub(1) {
            Some(index) => self.set_index(index),
            None => false,
        }
    }

    fn moved_right(&mut self) -> bool {
        self.set_index(self.index + 1)
    }

    fn attach(&self, list: &EntityList) {
        self.label.attach(list);
    }
}
