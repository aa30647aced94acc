//! Lazily rebuilt page raster with idle-deferred refresh.

use inkpage_core::Page;
use kurbo::Size;

use crate::renderer::{PageRenderer, RenderResult};

/// Runs a callback later, when the host event loop is idle.
///
/// The host calls [`RenderCache::on_idle`] (usually through
/// [`PageView::on_idle`](crate::PageView::on_idle)) once the request fires.
pub trait IdleScheduler {
    fn schedule_idle(&mut self);
}

/// What [`RenderCache::paint`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    /// The cached raster was drawn as is.
    Cached,
    /// The raster was rebuilt before drawing.
    Rebuilt,
    /// The raster no longer matched the allocation and was drawn scaled; a
    /// rebuild was requested for when the host is idle.
    Scaled,
}

/// Cached raster of a page's committed content.
#[derive(Debug)]
pub struct RenderCache<T> {
    raster: Option<T>,
    idle_pending: bool,
}

impl<T> Default for RenderCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RenderCache<T> {
    pub fn new() -> Self {
        Self {
            raster: None,
            idle_pending: false,
        }
    }

    /// Drop the raster; the next paint rebuilds it.
    pub fn invalidate(&mut self) {
        self.raster = None;
    }

    pub fn is_valid(&self) -> bool {
        self.raster.is_some()
    }

    pub fn idle_pending(&self) -> bool {
        self.idle_pending
    }

    /// Request a rebuild when the host is idle. Requests made while one is
    /// already pending are dropped.
    pub fn repaint_later(&mut self, scheduler: &mut dyn IdleScheduler) {
        if self.idle_pending {
            return;
        }
        self.idle_pending = true;
        scheduler.schedule_idle();
    }

    /// Draw the page raster, rebuilding it first if it was invalidated.
    pub fn paint<R>(
        &mut self,
        renderer: &mut R,
        page: &Page,
        allocation: Size,
        zoom: f64,
        scheduler: &mut dyn IdleScheduler,
    ) -> RenderResult<PaintOutcome>
    where
        R: PageRenderer<Raster = T>,
    {
        let mut outcome = PaintOutcome::Cached;
        let raster = match self.raster.take() {
            Some(raster) => raster,
            None => {
                log::debug!("rebuilding page raster at {}x{}", allocation.width, allocation.height);
                outcome = PaintOutcome::Rebuilt;
                renderer.render_page(page, allocation, zoom)?
            }
        };

        let width = renderer.raster_width(&raster);
        if width > 0.0 && (width - allocation.width).abs() > f64::EPSILON {
            renderer.blit(&raster, allocation.width / width);
            self.raster = Some(raster);
            self.repaint_later(scheduler);
            return Ok(PaintOutcome::Scaled);
        }

        renderer.blit(&raster, 1.0);
        self.raster = Some(raster);
        Ok(outcome)
    }

    /// The idle request fired: rebuild and draw.
    pub fn on_idle<R>(
        &mut self,
        renderer: &mut R,
        page: &Page,
        allocation: Size,
        zoom: f64,
        scheduler: &mut dyn IdleScheduler,
    ) -> RenderResult<PaintOutcome>
    where
        R: PageRenderer<Raster = T>,
    {
        self.idle_pending = false;
        self.invalidate();
        self.paint(renderer, page, allocation, zoom, scheduler)
    }
}
