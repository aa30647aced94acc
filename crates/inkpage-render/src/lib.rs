//! InkPage Render Library
//!
//! Keeps a rendered raster of each page and composites the transient editing
//! state on top of it. Rasterization itself is left to a [`PageRenderer`].

pub mod cache;
pub mod renderer;
pub mod view;

pub use cache::{IdleScheduler, PaintOutcome, RenderCache};
pub use renderer::{Overlay, OverlayStyle, PageRenderer, RenderResult, RendererError};
pub use view::PageView;
