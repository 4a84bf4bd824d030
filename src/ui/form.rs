//! Forms: row/column layout of components and keyboard/pointer focus routing
//!
//! Components are placed in row-major order, `columns` per row, starting at the
//! form's top-left corner and moving down (y decreases) row by row. Row height
//! is the tallest minimum height in the row.
//!
//! - Flow: each component keeps its minimum width; rows may be centered.
//! - Grid: columns share the widest minimum width of their members, padded
//!   evenly to fill the desired width when one is set.
//! - Fixed: column widths are given up front.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::component::{Component, ComponentRef, FocusEntry};
use crate::actions::Actions;
use crate::input::{Key, MouseButton};
use crate::layer::Layer;
use crate::scene::EntityList;
use crate::surface::TextMetrics;

#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Flow { columns: usize, center: bool },
    Grid { columns: usize },
    Fixed { widths: Vec<f32> },
}

impl Layout {
    pub fn columns(&self) -> usize {
        match self {
            Layout::Flow { columns, .. } | Layout::Grid { columns } => (*columns).max(1),
            Layout::Fixed { widths } => widths.len().max(1),
        }
    }
}

/// Per-row and per-column minimums from one measuring pass
#[derive(Debug, Default)]
struct Measure {
    column_widths: Vec<f32>,
    row_widths: Vec<f32>,
    row_heights: Vec<f32>,
}

impl Measure {
    fn size(&self) -> Vec2 {
        Vec2::new(self.column_widths.iter().sum(), self.row_heights.iter().sum())
    }
}

pub type CancelHook = Box<dyn FnMut(&mut Actions)>;

pub struct Form {
    components: Vec<ComponentRef>,
    focused: Option<usize>,
    layout: Layout,
    position: Vec2,
    desired_width: Option<f32>,
    desired_height: Option<f32>,
    minimum: Vec2,
    on_cancel: Option<CancelHook>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("components", &self.components.len())
            .field("focused", &self.focused)
            .field("layout", &self.layout)
            .field("position", &self.position)
            .field("minimum", &self.minimum)
            .finish()
    }
}

impl Form {
    pub fn new(layout: Layout, position: Vec2) -> Self {
        Self {
            components: Vec::new(),
            focused: None,
            layout,
            position,
            desired_width: None,
            desired_height: None,
            minimum: Vec2::ZERO,
            on_cancel: None,
        }
    }

    pub fn flow(columns: usize, position: Vec2) -> Self {
        Self::new(Layout::Flow { columns, center: false }, position)
    }

    /// Single column, each row centered in the desired width
    pub fn centered(position: Vec2, desired_width: f32) -> Self {
        Self::new(Layout::Flow { columns: 1, center: true }, position).with_desired_size(Some(desired_width), None)
    }

    pub fn grid(columns: usize, position: Vec2) -> Self {
        Self::new(Layout::Grid { columns }, position)
    }

    pub fn fixed(widths: Vec<f32>, position: Vec2) -> Self {
        Self::new(Layout::Fixed { widths }, position)
    }

    pub fn with_desired_size(mut self, width: Option<f32>, height: Option<f32>) -> Self {
        self.desired_width = width;
        self.desired_height = height;
        self
    }

    /// Escape handler
    pub fn on_cancel(mut self, hook: impl FnMut(&mut Actions) + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn add(&mut self, component: ComponentRef) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn with(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Rc::new(RefCell::new(component)));
        self
    }

    pub fn components(&self) -> &[ComponentRef] {
        &self.components
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    pub fn layout_kind(&self) -> &Layout {
        &self.layout
    }

    fn measure(&self, metrics: &dyn TextMetrics) -> Measure {
        let columns = self.layout.columns();
        let mut measure = Measure {
            column_widths: vec![0.0; columns],
            ..Default::default()
        };

        for (i, component) in self.components.iter().enumerate() {
            let (row, column) = (i / columns, i % columns);
            if column == 0 {
                measure.row_widths.push(0.0);
                measure.row_heights.push(0.0);
            }

            let minimum = component.borrow().minimum_size(metrics);
            measure.column_widths[column] = measure.column_widths[column].max(minimum.x);
            measure.row_widths[row] += minimum.x;
            measure.row_heights[row] = measure.row_heights[row].max(minimum.y);
        }

        if let Layout::Fixed { widths } = &self.layout {
            if !widths.is_empty() {
                measure.column_widths = widths.clone();
            }
        }
        measure
    }

    /// Place every component; must run again after components or sizes change
    pub fn layout(&mut self, metrics: &dyn TextMetrics) {
        let measure = self.measure(metrics);
        let columns = self.layout.columns();
        let minimum = measure.size();

        let mut column_widths = measure.column_widths.clone();
        if let (Layout::Grid { .. }, Some(desired)) = (&self.layout, self.desired_width) {
            let padding = (desired - minimum.x) / columns as f32;
            for width in column_widths.iter_mut() {
                *width = (*width + padding).max(0.0);
            }
        }

        let available = self.desired_width.unwrap_or(minimum.x);
        let mut y = self.position.y;
        for (row, chunk) in self.components.chunks(columns).enumerate() {
            let row_height = measure.row_heights[row];
            let mut x = self.position.x;
            if let Layout::Flow { center: true, .. } = self.layout {
                x += ((available - measure.row_widths[row]) / 2.0).max(0.0);
            }

            for (column, component) in chunk.iter().enumerate() {
                let mut component = component.borrow_mut();
                let width = match self.layout {
                    Layout::Flow { .. } => component.minimum_size(metrics).x,
                    Layout::Grid { .. } | Layout::Fixed { .. } => column_widths[column],
                };
                component.set_position(Vec2::new(x, y), metrics);
                component.set_size(Vec2::new(width, row_height), metrics);
                x += width;
            }
            y -= row_height;
        }

        self.minimum = minimum;
    }

    /// Size from the last layout
    pub fn minimum(&self) -> Vec2 {
        self.minimum
    }

    /// Desired size where set, otherwise the minimum
    pub fn desired_size(&self, metrics: &dyn TextMetrics) -> Vec2 {
        let minimum = self.minimum_size(metrics);
        Vec2::new(
            self.desired_width.unwrap_or(minimum.x),
            self.desired_height.unwrap_or(minimum.y),
        )
    }

    fn change_focus(&mut self, index: Option<usize>, entry: FocusEntry) {
        let previous = self.focused;
        if previous == index {
            return;
        }
        self.focused = index;

        if let Some(previous) = previous {
            self.components[previous].borrow_mut().unfocused();
        }
        if let Some(index) = index {
            self.components[index].borrow_mut().focused(entry);
        }
    }

    /// Focus `component` directly, if it belongs to this form
    pub fn focus(&mut self, component: &ComponentRef) -> bool {
        match self.components.iter().position(|c| Rc::ptr_eq(c, component)) {
            Some(index) => {
                self.change_focus(Some(index), FocusEntry::First);
                true
            }
            None => false,
        }
    }

    pub fn clear_focus(&mut self) {
        self.change_focus(None, FocusEntry::First);
    }

    fn is_active_at(&self, index: usize) -> bool {
        self.components[index].borrow().is_active()
    }

    /// Active component whose bounds contain `position`
    fn component_at(&self, position: Vec2) -> Option<usize> {
        self.components.iter().position(|c| {
            let c = c.borrow();
            c.is_active() && c.bounds().contains(position)
        })
    }

    /// Route a key press; releases are ignored. Returns whether it was handled.
    pub fn key_pressed(&mut self, key: Key, pressed: bool, actions: &mut Actions) -> bool {
        if !pressed {
            return false;
        }
        match key {
            Key::Up => self.move_focus_up(),
            Key::Down | Key::Tab => self.move_focus_down(),
            Key::Left => self.moved_left(),
            Key::Right => self.moved_right(),
            Key::Enter | Key::Space => self.activated(actions),
            Key::Escape => match self.on_cancel.as_mut() {
                Some(hook) => {
                    hook(actions);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Focus follows the pointer; a press also activates
    pub fn pointer_pressed(&mut self, position: Vec2, actions: &mut Actions) -> bool {
        if self.pointer_focus(position) {
            self.activated(actions)
        } else {
            false
        }
    }
}

impl Component for Form {
    fn minimum_size(&self, metrics: &dyn TextMetrics) -> Vec2 {
        self.measure(metrics).size()
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2, metrics: &dyn TextMetrics) {
        if position != self.position {
            self.position = position;
            self.layout(metrics);
        }
    }

    fn size(&self) -> Vec2 {
        Vec2::new(
            self.desired_width.unwrap_or(self.minimum.x),
            self.desired_height.unwrap_or(self.minimum.y),
        )
    }

    fn set_size(&mut self, size: Vec2, metrics: &dyn TextMetrics) {
        if self.desired_width != Some(size.x) {
            self.desired_width = Some(size.x);
            self.layout(metrics);
        }
    }

    fn is_active(&self) -> bool {
        self.components.iter().any(|c| c.borrow().is_active())
    }

    fn focused(&mut self, entry: FocusEntry) {
        match entry {
            FocusEntry::First => {
                self.clear_focus();
                self.move_focus_down();
            }
            FocusEntry::Last => {
                self.clear_focus();
                self.move_focus_up();
            }
            FocusEntry::Pointer => {}
        }
    }

    fn unfocused(&mut self) {
        self.clear_focus();
    }

    fn activated(&mut self, actions: &mut Actions) -> bool {
        match self.focused {
            Some(index) => self.components[index].borrow_mut().activated(actions),
            None => false,
        }
    }

    fn moved_left(&mut self) -> bool {
        match self.focused {
            Some(index) => self.components[index].borrow_mut().moved_left(),
            None => false,
        }
    }

    fn moved_right(&mut self) -> bool {
        match self.focused {
            Some(index) => self.components[index].borrow_mut().moved_right(),
            None => false,
        }
    }

    /// Previous active component, entering nested forms at their last entry.
    /// Returns false when focus is already on the first active component.
    fn move_focus_up(&mut self) -> bool {
        if let Some(index) = self.focused {
            if self.components[index].borrow_mut().move_focus_up() {
                return true;
            }
        }

        let start = self.focused.unwrap_or(self.components.len());
        match (0..start).rev().find(|&i| self.is_active_at(i)) {
            Some(index) => {
                self.change_focus(Some(index), FocusEntry::Last);
                true
            }
            None => false,
        }
    }

    /// Next active component, entering nested forms at their first entry.
    /// Returns false when focus is already on the last active component.
    fn move_focus_down(&mut self) -> bool {
        if let Some(index) = self.focused {
            if self.components[index].borrow_mut().move_focus_down() {
                return true;
            }
        }

        let start = self.focused.map_or(0, |i| i + 1);
        match (start..self.components.len()).find(|&i| self.is_active_at(i)) {
            Some(index) => {
                self.change_focus(Some(index), FocusEntry::First);
                true
            }
            None => false,
        }
    }

    fn pointer_focus(&mut self, position: Vec2) -> bool {
        match self.component_at(position) {
            Some(index) => {
                self.change_focus(Some(index), FocusEntry::Pointer);
                self.components[index].borrow_mut().pointer_focus(position)
            }
            None => false,
        }
    }

    fn attach(&self, list: &EntityList) {
        for component in &self.components {
            component.borrow().attach(list);
        }
    }
}

/// A layer that shows `form` and routes keys, mouse and touch to it.
///
/// Lays the form out and focuses its first active component.
pub fn form_layer(name: impl Into<String>, form: Rc<RefCell<Form>>, metrics: &dyn TextMetrics) -> Layer {
    let layer = Layer::new(name);
    {
        let mut f = form.borrow_mut();
        f.layout(metrics);
        f.attach(layer.entities());
        f.focused(FocusEntry::First);
    }

    let keys = form.clone();
    let hover = form.clone();
    let click = form.clone();
    let touch = form;
    layer
        .on_any_key(move |key, pressed, actions| {
            keys.borrow_mut().key_pressed(key, pressed, actions);
        })
        .on_mouse_moved(move |position, _| {
            hover.borrow_mut().pointer_focus(position);
        })
        .on_mouse_button(move |button, pressed, position, actions| {
            if button == MouseButton::Primary && pressed {
                click.borrow_mut().pointer_pressed(position, actions);
            }
        })
        .on_touched(move |_, pressed, position, actions| {
            if pressed {
                touch.borrow_mut().pointer_pressed(position, actions);
            }
        })
}
