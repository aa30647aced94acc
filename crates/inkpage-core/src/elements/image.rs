//! Embedded raster image element.

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ElementId;

/// An image placed on the page. Pixel data is opaque to the editing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ElementId,
    /// Top-left corner in page coordinates.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Encoded image bytes as base64, empty for placeholders.
    #[serde(default)]
    pub data_base64: String,
}

impl Image {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            data_base64: String::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    pub fn transform(&mut self, affine: Affine) {
        let rect = affine.transform_rect_bbox(self.bounds());
        self.position = Point::new(rect.x0, rect.y0);
        self.width = rect.width();
        self.height = rect.height();
    }
}
