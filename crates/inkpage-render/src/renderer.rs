//! Renderer trait abstraction.

use inkpage_core::{HandleKind, Page, Stroke, Text};
use kurbo::{Point, Rect, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Raster allocation failed: {0}")]
    Allocation(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Colors used for everything drawn above the page content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// Selection outline, handles and rubber band.
    pub selection_color: Color,
    /// Search match fill.
    pub search_color: Color,
    /// Text caret and selected-text highlight.
    pub caret_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            selection_color: Color::from_rgba8(59, 130, 246, 255),
            search_color: Color::from_rgba8(255, 230, 0, 100),
            caret_color: Color::from_rgba8(0, 0, 0, 255),
        }
    }
}

/// Something transient drawn on top of the cached page, in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay<'a> {
    /// Text being edited, with its caret and selected character range.
    TextEditor {
        text: &'a Text,
        caret: usize,
        selection: Option<(usize, usize)>,
    },
    /// A finalized selection with its drag handles.
    Selection {
        bounds: Rect,
        handles: Vec<(Point, HandleKind)>,
    },
    /// Closed outline of a rubber band being dragged.
    RubberBand(Vec<Point>),
    /// Search matches on this page.
    SearchHighlights(&'a [Rect]),
    /// A stroke still being drawn. Segments before point `from` are already
    /// on screen.
    Stroke { stroke: &'a Stroke, from: usize },
}

/// Trait for rendering backends.
///
/// The backend owns the actual rasterizer. The page view only decides when a
/// page raster is rebuilt, how it is blitted and which overlays go on top.
pub trait PageRenderer {
    /// A rendered page snapshot.
    type Raster;

    /// Render every visible layer of `page` into a raster of `size` pixels.
    fn render_page(&mut self, page: &Page, size: Size, zoom: f64) -> RenderResult<Self::Raster>;

    /// Width in pixels the raster was allocated with.
    fn raster_width(&self, raster: &Self::Raster) -> f64;

    /// Draw a raster to the target, scaled by `scale`.
    fn blit(&mut self, raster: &Self::Raster, scale: f64);

    /// Draw one overlay at the given zoom.
    fn draw_overlay(&mut self, overlay: &Overlay<'_>, zoom: f64, style: &OverlayStyle);
}
