//! Page content: strokes, text boxes and images.

mod image;
mod stroke;
mod text;

pub use image::Image;
pub use stroke::{Stroke, StrokeTool};
pub use text::Text;

use kurbo::{Affine, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::rects_overlap;

/// Unique identifier for page elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// A single piece of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Stroke(Stroke),
    Text(Text),
    Image(Image),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Stroke(s) => s.id(),
            Element::Text(t) => t.id(),
            Element::Image(i) => i.id(),
        }
    }

    /// Bounding box in page coordinates.
    pub fn bounds(&self) -> Rect {
        match self {
            Element::Stroke(s) => s.bounds(),
            Element::Text(t) => t.bounds(),
            Element::Image(i) => i.bounds(),
        }
    }

    /// Coarse bounding-box test used before any precise hit test.
    pub fn intersects_area(&self, area: Rect) -> bool {
        rects_overlap(self.bounds(), area)
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Element::Stroke(s) => s.transform(affine),
            Element::Text(t) => t.transform(affine),
            Element::Image(i) => i.transform(affine),
        }
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Element::Stroke(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stroke_mut(&mut self) -> Option<&mut Stroke> {
        match self {
            Element::Stroke(s) => Some(s),
            _ => None,
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

impl From<Stroke> for Element {
    fn from(stroke: Stroke) -> Self {
        Element::Stroke(stroke)
    }
}

impl From<Text> for Element {
    fn from(text: Text) -> Self {
        Element::Text(text)
    }
}

impl From<Image> for Element {
    fn from(image: Image) -> Self {
        Element::Image(image)
    }
}
