//! Input serializers
//!
//! Device events arrive at arbitrary times; they are queued here and drained by
//! the engine once per frame, in arrival order within each queue. Only a fixed
//! set of named keys is recognized; everything else is dropped on entry.

use std::cell::RefCell;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Keys the engine routes to layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
    Enter,
    Escape,
    Space,
    Tab,
    Backspace,
    Z,
}

impl Key {
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Left => "left",
            Key::Up => "up",
            Key::Right => "right",
            Key::Down => "down",
            Key::Enter => "enter",
            Key::Escape => "escape",
            Key::Space => "space",
            Key::Tab => "tab",
            Key::Backspace => "backspace",
            Key::Z => "z",
        }
    }

    /// Legacy DOM `keyCode`
    pub fn from_key_code(code: u32) -> Option<Self> {
        match code {
            8 => Some(Key::Backspace),
            9 => Some(Key::Tab),
            13 => Some(Key::Enter),
            27 => Some(Key::Escape),
            32 => Some(Key::Space),
            37 => Some(Key::Left),
            38 => Some(Key::Up),
            39 => Some(Key::Right),
            40 => Some(Key::Down),
            90 => Some(Key::Z),
            _ => None,
        }
    }

    /// DOM `KeyboardEvent.key` value
    pub fn from_dom_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "Left" => Some(Key::Left),
            "ArrowUp" | "Up" => Some(Key::Up),
            "ArrowRight" | "Right" => Some(Key::Right),
            "ArrowDown" | "Down" => Some(Key::Down),
            "Enter" => Some(Key::Enter),
            "Escape" | "Esc" => Some(Key::Escape),
            " " | "Spacebar" => Some(Key::Space),
            "Tab" => Some(Key::Tab),
            "Backspace" => Some(Key::Backspace),
            "z" | "Z" => Some(Key::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

/// Mouse buttons as reported by `MouseEvent.button`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Primary,
    Tertiary,
    Secondary,
    Other(i16),
}

impl MouseButton {
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => MouseButton::Primary,
            1 => MouseButton::Tertiary,
            2 => MouseButton::Secondary,
            other => MouseButton::Other(other),
        }
    }
}

/// Pointer events in device pixels (origin top-left, y-down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEvent {
    Button {
        button: MouseButton,
        pressed: bool,
        position: Vec2,
    },
    Move {
        position: Vec2,
    },
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub id: i32,
    pub phase: TouchPhase,
    /// Device pixels
    pub position: Vec2,
}

#[derive(Debug, Default)]
pub struct KeySerializer {
    queue: RefCell<Vec<KeyEvent>>,
}

impl KeySerializer {
    pub fn key_code(&self, code: u32, pressed: bool) {
        if let Some(key) = Key::from_key_code(code) {
            self.key(key, pressed);
        }
    }

    pub fn dom_key(&self, name: &str, pressed: bool) {
        if let Some(key) = Key::from_dom_key(name) {
            self.key(key, pressed);
        }
    }

    pub fn key(&self, key: Key, pressed: bool) {
        self.queue.borrow_mut().push(KeyEvent { key, pressed });
    }

    pub fn drain(&self) -> Vec<KeyEvent> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MouseSerializer {
    queue: RefCell<Vec<MouseEvent>>,
}

impl MouseSerializer {
    pub fn button(&self, button: MouseButton, pressed: bool, x: f32, y: f32) {
        self.queue.borrow_mut().push(MouseEvent::Button {
            button,
            pressed,
            position: Vec2::new(x, y),
        });
    }

    pub fn moved(&self, x: f32, y: f32) {
        self.queue.borrow_mut().push(MouseEvent::Move {
            position: Vec2::new(x, y),
        });
    }

    pub fn left(&self) {
        self.queue.borrow_mut().push(MouseEvent::Leave);
    }

    pub fn drain(&self) -> Vec<MouseEvent> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}

#[derive(Debug, Default)]
pub struct TouchSerializer {
    queue: RefCell<Vec<TouchEvent>>,
}

impl TouchSerializer {
    pub fn touch(&self, id: i32, phase: TouchPhase, x: f32, y: f32) {
        self.queue.borrow_mut().push(TouchEvent {
            id,
            phase,
            position: Vec2::new(x, y),
        });
    }

    pub fn drain(&self) -> Vec<TouchEvent> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}

/// All device queues; shared between the platform listeners and the engine
#[derive(Debug, Default)]
pub struct InputQueues {
    pub keys: KeySerializer,
    pub mouse: MouseSerializer,
    pub touch: TouchSerializer,
}
