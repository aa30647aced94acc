//! Drives a [`PageView`] from a script.

use inkpage_core::{Page, Settings, ViewHost};
use inkpage_render::{IdleScheduler, Overlay, OverlayStyle, PageRenderer, PageView, RenderResult};
use kurbo::Size;

use crate::script::{ReplayResult, Script, ScriptEvent};

/// Host with an in-memory clipboard. Scroll requests are logged only.
#[derive(Debug, Default)]
pub struct ReplayHost {
    clipboard: Option<String>,
}

impl ViewHost for ReplayHost {
    fn scroll_relative(&mut self, dx: f64, dy: f64) {
        log::debug!("scroll by ({dx}, {dy})");
    }

    fn clipboard_text(&mut self) -> Option<String> {
        self.clipboard.clone()
    }

    fn set_clipboard_text(&mut self, text: String) {
        self.clipboard = Some(text);
    }
}

/// Renderer that rasterizes nothing and counts what it was asked to do.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    pub rasters: usize,
    pub overlays: usize,
}

impl PageRenderer for CountingRenderer {
    type Raster = Size;

    fn render_page(&mut self, page: &Page, size: Size, _zoom: f64) -> RenderResult<Size> {
        self.rasters += 1;
        log::debug!("render {} layers at {}x{}", page.layer_count(), size.width, size.height);
        Ok(size)
    }

    fn raster_width(&self, raster: &Size) -> f64 {
        raster.width
    }

    fn blit(&mut self, _raster: &Size, scale: f64) {
        log::trace!("blit at scale {scale}");
    }

    fn draw_overlay(&mut self, _overlay: &Overlay<'_>, _zoom: f64, _style: &OverlayStyle) {
        self.overlays += 1;
    }
}

#[derive(Debug, Default)]
struct Idle {
    pending: bool,
}

impl IdleScheduler for Idle {
    fn schedule_idle(&mut self) {
        self.pending = true;
    }
}

/// Replay every event of `script` on a fresh page and return the view.
///
/// Any text still being edited at the end is committed.
pub fn run(script: &Script, settings: Settings) -> ReplayResult<PageView<CountingRenderer>> {
    let page = Page::new(script.page_width, script.page_height);
    let mut view = PageView::new(page, settings, CountingRenderer::default());
    view.set_zoom(script.zoom);
    view.set_selected(true);

    let (mut host, mut idle) = (ReplayHost::default(), Idle::default());
    for event in &script.events {
        match event {
            ScriptEvent::Pointer { event } => {
                view.on_event(&mut host, event);
            }
            ScriptEvent::Key { event } => {
                if !view.on_key_press(&mut host, event) {
                    log::debug!("key {:?} not handled", event.key);
                }
            }
            ScriptEvent::Tool { tool } => {
                view.end_text(&mut host);
                view.tools_mut().select_tool(*tool);
            }
            ScriptEvent::Zoom { zoom } => view.set_zoom(*zoom),
            ScriptEvent::Idle => {
                if std::mem::take(&mut idle.pending) {
                    view.on_idle(&mut idle)?;
                }
            }
            ScriptEvent::Paint => {
                view.paint(&mut idle)?;
            }
            ScriptEvent::Undo => {
                if !view.undo(&mut host)? {
                    log::warn!("nothing to undo");
                }
            }
            ScriptEvent::Redo => {
                if !view.redo(&mut host)? {
                    log::warn!("nothing to redo");
                }
            }
            ScriptEvent::Cut => view.cut(&mut host),
            ScriptEvent::Copy => view.copy(&mut host),
            ScriptEvent::Paste => view.paste(&mut host),
            ScriptEvent::Delete => view.action_delete(&mut host),
        }
    }
    view.end_text(&mut host);
    Ok(view)
}
