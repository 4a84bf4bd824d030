//! Retained-mode UI: forms of labels, buttons and choices
//!
//! A form lays its components out in logical space, attaches their entities to
//! a layer, and keeps track of which component has focus. `form_layer` wires a
//! form to keyboard, mouse and touch input.

pub mod component;
pub mod form;
pub mod widgets;

pub use component::{Component, ComponentRef, FocusEntry};
pub use form::{Form, Layout, form_layer};
pub use widgets::{Button, Choice, ChoiceChanged, Label};
