//! Drawable elements attached to an entity
//!
//! Element coordinates are local to the owning entity (y-up). Rectangles and
//! images are positioned by their top-left corner; the default rectangle is the
//! unit square centered on the entity.

use crate::assets::ImageHandle;
use crate::surface::{Color, Font, TextAlign, TextBaseline, TextMetrics};
use crate::transform::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Option<Color>,
    pub opacity: f32,
}

impl Default for Rectangle {
    fn default() -> Self {
        Self {
            x: -0.5,
            y: 0.5,
            width: 1.0,
            height: 1.0,
            color: None,
            opacity: 1.0,
        }
    }
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// A whole cached image
#[derive(Debug, Clone)]
pub struct Image {
    pub image: ImageHandle,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: f32,
}

impl Image {
    /// Unit-square image centered on the entity
    pub fn new(image: ImageHandle) -> Self {
        Self {
            image,
            x: -0.5,
            y: 0.5,
            width: 1.0,
            height: 1.0,
            opacity: 1.0,
        }
    }
}

/// A pixel sub-region of a cached image (sprite sheets)
#[derive(Debug, Clone)]
pub struct ImageRegion {
    pub image: ImageHandle,
    /// Source rectangle in image pixels (y-down, `min` is the top-left)
    pub source: Rect,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub opacity: f32,
}

impl ImageRegion {
    pub fn new(image: ImageHandle, source: Rect) -> Self {
        Self {
            image,
            source,
            x: -0.5,
            y: 0.5,
            width: 1.0,
            height: 1.0,
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Line(String),
    /// Pre-wrapped lines drawn `line_height` apart, downwards
    Lines(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: TextContent,
    pub font: Option<Font>,
    pub x: f32,
    pub y: f32,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub line_height: f32,
    pub color: Option<Color>,
    pub opacity: f32,
}

impl Text {
    pub fn new(text: impl Into<String>, font: Font) -> Self {
        let line_height = font.size;
        Self {
            content: TextContent::Line(text.into()),
            font: Some(font),
            x: 0.0,
            y: 0.0,
            align: TextAlign::Left,
            baseline: TextBaseline::Alphabetic,
            line_height,
            color: None,
            opacity: 1.0,
        }
    }

    pub fn lines(lines: Vec<String>, font: Font, line_height: f32) -> Self {
        Self {
            content: TextContent::Lines(lines),
            line_height,
            ..Self::new(String::new(), font)
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn aligned(mut self, align: TextAlign, baseline: TextBaseline) -> Self {
        self.align = align;
        self.baseline = baseline;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = TextContent::Line(text.into());
    }

    /// Width of the widest line
    pub fn total_width(&self, metrics: &dyn TextMetrics) -> f32 {
        let font = self.font.clone().unwrap_or_default();
        match &self.content {
            TextContent::Line(text) => metrics.measure_text(&font, text),
            TextContent::Lines(lines) => lines
                .iter()
                .map(|l| metrics.measure_text(&font, l))
                .fold(0.0, f32::max),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Element {
    Rectangle(Rectangle),
    Image(Image),
    ImageRegion(ImageRegion),
    Text(Text),
}

impl Element {
    pub fn opacity(&self) -> f32 {
        match self {
            Element::Rectangle(r) => r.opacity,
            Element::Image(i) => i.opacity,
            Element::ImageRegion(i) => i.opacity,
            Element::Text(t) => t.opacity,
        }
    }

    /// Override the paint color (images ignore color)
    pub fn set_color(&mut self, color: Color) {
        match self {
            Element::Rectangle(r) => r.color = Some(color),
            Element::Text(t) => t.color = Some(color),
            Element::Image(_) | Element::ImageRegion(_) => {}
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Element::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Element::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Rectangle> for Element {
    fn from(r: Rectangle) -> Self {
        Element::Rectangle(r)
    }
}

impl From<Image> for Element {
    fn from(i: Image) -> Self {
        Element::Image(i)
    }
}

impl From<ImageRegion> for Element {
    fn from(i: ImageRegion) -> Self {
        Element::ImageRegion(i)
    }
}

impl From<Text> for Element {
    fn from(t: Text) -> Self {
        Element::Text(t)
    }
}
