//! Immediate-mode 2D paint surface
//!
//! The engine draws through this trait: a transform/paint state stack
//! (`save`/`restore`), rectangle and text fills, and cached raster images.
//! `RecordingSurface` is a headless implementation that records draw calls.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::assets::ImageEntry;
use crate::transform::Rect;

/// RGBA paint color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha (0.0 - 1.0)
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color string, e.g. `rgba(0, 128, 0, 1)`
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Font description; `size` is the pixel height used for layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub size: f32,
    pub family: String,
}

impl Font {
    pub fn new(size: f32, family: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
        }
    }

    pub fn sans(size: f32) -> Self {
        Self::new(size, "sans-serif")
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::sans(10.0)
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size, self.family)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}

impl TextBaseline {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextBaseline::Top => "top",
            TextBaseline::Middle => "middle",
            TextBaseline::Alphabetic => "alphabetic",
            TextBaseline::Bottom => "bottom",
        }
    }
}

/// Text measurement service
pub trait TextMetrics {
    /// Advance width of `text` rendered in `font`, in logical units
    fn measure_text(&self, font: &Font, text: &str) -> f32;
}

/// A 2D paint context with a save/restore state stack
pub trait Surface: TextMetrics {
    /// Device size in pixels
    fn size(&self) -> Vec2;

    fn save(&mut self);
    fn restore(&mut self);

    fn translate(&mut self, x: f32, y: f32);
    fn scale(&mut self, sx: f32, sy: f32);
    fn rotate(&mut self, angle: f32);

    fn alpha(&self) -> f32;
    fn set_alpha(&mut self, alpha: f32);
    fn set_fill(&mut self, color: &Color);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn set_font(&mut self, font: &Font);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn fill_text(&mut self, text: &str, x: f32, y: f32);

    /// Draw a loaded image (or a `source` sub-region of it) into `dest`
    fn draw_image(&mut self, image: &ImageEntry, source: Option<Rect>, dest: Rect);

    /// Resize to fill the host window (or restore the original size)
    fn set_fullscreen(&mut self, _fullscreen: bool) {}
}

/// A draw call captured by [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Save,
    Restore,
    Translate(f32, f32),
    Scale(f32, f32),
    Rotate(f32),
    Alpha(f32),
    Fill(Color),
    FillRect { x: f32, y: f32, width: f32, height: f32 },
    Font(Font),
    Align(TextAlign),
    Baseline(TextBaseline),
    FillText { text: String, x: f32, y: f32 },
    Image { source: String, region: Option<Rect>, dest: Rect },
    Fullscreen(bool),
}

#[derive(Debug, Clone)]
struct PaintState {
    alpha: f32,
}

/// Headless surface with monospace text metrics (`char_width` per character)
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Vec2,
    char_width: f32,
    state: PaintState,
    stack: Vec<PaintState>,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            char_width: 6.0,
            state: PaintState { alpha: 1.0 },
            stack: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn with_char_width(mut self, char_width: f32) -> Self {
        self.char_width = char_width;
        self
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Text of every `FillText` op, in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Depth of the save/restore stack (0 when balanced)
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }
}

impl TextMetrics for RecordingSurface {
    fn measure_text(&self, _font: &Font, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn save(&mut self) {
        self.stack.push(self.state.clone());
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
        self.ops.push(DrawOp::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.ops.push(DrawOp::Translate(x, y));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.ops.push(DrawOp::Scale(sx, sy));
    }

    fn rotate(&mut self, angle: f32) {
        self.ops.push(DrawOp::Rotate(angle));
    }

    fn alpha(&self) -> f32 {
        self.state.alpha
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.state.alpha = alpha;
        self.ops.push(DrawOp::Alpha(alpha));
    }

    fn set_fill(&mut self, color: &Color) {
        self.ops.push(DrawOp::Fill(*color));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::FillRect { x, y, width, height });
    }

    fn set_font(&mut self, font: &Font) {
        self.ops.push(DrawOp::Font(font.clone()));
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.ops.push(DrawOp::Align(align));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ops.push(DrawOp::Baseline(baseline));
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn draw_image(&mut self, image: &ImageEntry, source: Option<Rect>, dest: Rect) {
        self.ops.push(DrawOp::Image {
            source: image.source().to_string(),
            region: source,
            dest,
        });
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.ops.push(DrawOp::Fullscreen(fullscreen));
    }
}
