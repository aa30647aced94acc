//! Text box element.

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ElementId, SerializableColor};

/// Average glyph advance as a fraction of the font size.
pub const CHAR_WIDTH_FACTOR: f64 = 0.55;
/// Line pitch as a fraction of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// A block of text anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ElementId,
    pub position: Point,
    pub content: String,
    pub font_size: f64,
    pub color: SerializableColor,
}

impl Text {
    pub const DEFAULT_FONT_SIZE: f64 = 12.0;

    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content,
            font_size: Self::DEFAULT_FONT_SIZE,
            color: SerializableColor::black(),
        }
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn char_width(&self) -> f64 {
        self.font_size * CHAR_WIDTH_FACTOR
    }

    pub fn line_height(&self) -> f64 {
        self.font_size * LINE_HEIGHT_FACTOR
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Approximate layout box. An empty text still occupies one caret-wide line.
    pub fn bounds(&self) -> Rect {
        let lines: Vec<&str> = self.content.split('\n').collect();
        let max_chars = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = (max_chars as f64 * self.char_width()).max(self.char_width());
        let height = lines.len() as f64 * self.line_height();
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + width,
            self.position.y + height,
        )
    }

    /// Character index closest to a page-space point.
    pub fn char_index_at(&self, point: Point) -> usize {
        let row = ((point.y - self.position.y) / self.line_height()).floor().max(0.0) as usize;
        let col = ((point.x - self.position.x) / self.char_width()).round().max(0.0) as usize;
        self.index_for_line_col(row, col)
    }

    /// (line, column) of a character index, both zero-based.
    pub fn line_col(&self, index: usize) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for (i, c) in self.content.chars().enumerate() {
            if i == index {
                break;
            }
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// Character index for a (line, column) pair, clamped to the content.
    pub fn index_for_line_col(&self, line: usize, col: usize) -> usize {
        let mut index = 0;
        for (i, text_line) in self.content.split('\n').enumerate() {
            let len = text_line.chars().count();
            if i == line {
                return index + col.min(len);
            }
            index += len + 1;
        }
        self.content.chars().count()
    }

    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }

    pub fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let scale = affine.determinant().abs().sqrt();
        if scale.is_finite() && scale > 0.0 {
            self.font_size *= scale;
        }
    }
}
