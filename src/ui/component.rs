//! The focusable component interface shared by widgets and nested forms

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::actions::Actions;
use crate::scene::EntityList;
use crate::surface::TextMetrics;
use crate::transform::Rect;

pub type ComponentRef = Rc<RefCell<dyn Component>>;

/// How focus arrived at a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEntry {
    /// Moving down or forwards
    First,
    /// Moving up or backwards
    Last,
    /// Pointer hovered or pressed; `pointer_focus` follows
    Pointer,
}

/// A rectangular UI element placed by a form.
///
/// Positions are the top-left corner in logical space (y-up), so a component
/// occupies `position.y - size.y ..= position.y` vertically.
pub trait Component {
    fn minimum_size(&self, metrics: &dyn TextMetrics) -> Vec2;

    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2, metrics: &dyn TextMetrics);

    /// Size assigned by the last layout
    fn size(&self) -> Vec2;
    fn set_size(&mut self, size: Vec2, metrics: &dyn TextMetrics);

    fn bounds(&self) -> Rect {
        Rect::from_top_left(self.position(), self.size())
    }

    /// Whether the component can take focus
    fn is_active(&self) -> bool {
        false
    }

    fn focused(&mut self, _entry: FocusEntry) {}
    fn unfocused(&mut self) {}

    /// Enter/space or a pointer press. Returns whether anything happened.
    fn activated(&mut self, _actions: &mut Actions) -> bool {
        false
    }

    fn moved_left(&mut self) -> bool {
        false
    }

    fn moved_right(&mut self) -> bool {
        false
    }

    /// Internal focus movement for containers; leaves have none
    fn move_focus_up(&mut self) -> bool {
        false
    }

    fn move_focus_down(&mut self) -> bool {
        false
    }

    /// Follow-up to `focused(FocusEntry::Pointer)` for containers
    fn pointer_focus(&mut self, _position: Vec2) -> bool {
        true
    }

    /// Add the component's entities to a layer or parent entity list
    fn attach(&self, list: &EntityList);
}
