//! A page view: one page, its input dispatcher and its render cache.

use std::collections::HashMap;

use inkpage_core::{
    EditContext, ElementId, InputDispatcher, KeyEvent, Page, PointerEvent, Repaint, Settings, ToolHandler,
    UndoHistory, UndoResult, ViewHost,
};
use kurbo::{Rect, Size};

use crate::cache::{IdleScheduler, PaintOutcome, RenderCache};
use crate::renderer::{Overlay, OverlayStyle, PageRenderer, RenderResult};

/// Wires input handling, the undo history and the page raster together.
///
/// Events go through [`InputDispatcher`]; the repaint each one asks for
/// invalidates the cache when committed content changed and is accumulated as
/// damage for the host to pick up with [`PageView::take_damage`].
pub struct PageView<R: PageRenderer> {
    page: Page,
    history: UndoHistory,
    tools: ToolHandler,
    settings: Settings,
    dispatcher: InputDispatcher,
    renderer: R,
    cache: RenderCache<R::Raster>,
    style: OverlayStyle,
    zoom: f64,
    search: Vec<Rect>,
    /// Last point of each in-progress stroke already on screen.
    drawn: HashMap<ElementId, usize>,
    damage: Repaint,
}

impl<R: PageRenderer> PageView<R> {
    pub fn new(page: Page, settings: Settings, renderer: R) -> Self {
        Self {
            page,
            history: UndoHistory::new(),
            tools: ToolHandler::new(),
            settings,
            dispatcher: InputDispatcher::new(),
            renderer,
            cache: RenderCache::new(),
            style: OverlayStyle::default(),
            zoom: 1.0,
            search: Vec::new(),
            drawn: HashMap::new(),
            damage: Repaint::None,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn tools(&self) -> &ToolHandler {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolHandler {
        &mut self.tools
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &InputDispatcher {
        &self.dispatcher
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn cache(&self) -> &RenderCache<R::Raster> {
        &self.cache
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Change the zoom. The cached raster is kept and drawn scaled until an
    /// idle rebuild replaces it.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom > 0.0 && zoom != self.zoom {
            self.zoom = zoom;
            self.damage = self.damage.merge(Repaint::Full);
        }
    }

    /// Size of the page at the current zoom, in widget pixels.
    pub fn display_size(&self) -> Size {
        Size::new(self.page.width * self.zoom, self.page.height * self.zoom)
    }

    /// A page-space rectangle in widget pixels.
    pub fn widget_rect(&self, rect: Rect) -> Rect {
        rect.scale_from_origin(self.zoom)
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.dispatcher.set_selected(selected);
    }

    pub fn search_results(&self) -> &[Rect] {
        &self.search
    }

    /// Replace the search matches highlighted on this page.
    pub fn set_search_results(&mut self, rects: Vec<Rect>) {
        self.search = rects;
        self.damage = self.damage.merge(Repaint::Overlay);
    }

    /// Damage accumulated since the last call.
    pub fn take_damage(&mut self) -> Repaint {
        std::mem::take(&mut self.damage)
    }

    fn dispatch<T>(
        &mut self,
        host: &mut dyn ViewHost,
        f: impl FnOnce(&mut InputDispatcher, &mut EditContext<'_>) -> T,
    ) -> T {
        let mut ctx = EditContext {
            page: &mut self.page,
            history: &mut self.history,
            tools: &mut self.tools,
            settings: &mut self.settings,
            host,
            zoom: self.zoom,
        };
        f(&mut self.dispatcher, &mut ctx)
    }

    fn apply(&mut self, repaint: Repaint) {
        if repaint.invalidates_content() {
            self.cache.invalidate();
        }
        if self.dispatcher.in_progress_strokes().next().is_none() {
            self.drawn.clear();
        }
        self.damage = self.damage.merge(repaint);
    }

    pub fn on_event(&mut self, host: &mut dyn ViewHost, event: &PointerEvent) -> Repaint {
        let repaint = self.dispatch(host, |d, ctx| d.on_event(ctx, event));
        self.apply(repaint);
        repaint
    }

    /// Returns whether the key was used by this page.
    pub fn on_key_press(&mut self, host: &mut dyn ViewHost, event: &KeyEvent) -> bool {
        match self.dispatch(host, |d, ctx| d.on_key_press(ctx, event)) {
            Some(repaint) => {
                self.apply(repaint);
                true
            }
            None => false,
        }
    }

    pub fn cut(&mut self, host: &mut dyn ViewHost) {
        if let Some(repaint) = self.dispatch(host, |d, ctx| d.cut(ctx)) {
            self.apply(repaint);
        }
    }

    pub fn copy(&mut self, host: &mut dyn ViewHost) {
        self.dispatch(host, |d, ctx| d.copy(ctx));
    }

    pub fn paste(&mut self, host: &mut dyn ViewHost) {
        if let Some(repaint) = self.dispatch(host, |d, ctx| d.paste(ctx)) {
            self.apply(repaint);
        }
    }

    pub fn action_delete(&mut self, host: &mut dyn ViewHost) {
        if let Some(repaint) = self.dispatch(host, |d, ctx| d.action_delete(ctx)) {
            self.apply(repaint);
        }
    }

    /// Commit any text being edited.
    pub fn end_text(&mut self, host: &mut dyn ViewHost) {
        let repaint = self.dispatch(host, |d, ctx| d.end_text(ctx));
        self.apply(repaint);
    }

    /// Undo the last edit. Text editing is committed and the selection
    /// dropped first, since both may refer to elements the undo touches.
    pub fn undo(&mut self, host: &mut dyn ViewHost) -> UndoResult<bool> {
        self.end_text(host);
        let cleared = self.dispatcher.clear_selection();
        self.apply(cleared);
        let done = self.history.undo(&mut self.page)?;
        if done {
            self.apply(Repaint::Full);
        }
        Ok(done)
    }

    pub fn redo(&mut self, host: &mut dyn ViewHost) -> UndoResult<bool> {
        self.end_text(host);
        let cleared = self.dispatcher.clear_selection();
        self.apply(cleared);
        let done = self.history.redo(&mut self.page)?;
        if done {
            self.apply(Repaint::Full);
        }
        Ok(done)
    }

    /// Draw the page raster and every overlay.
    pub fn paint(&mut self, scheduler: &mut dyn IdleScheduler) -> RenderResult<PaintOutcome> {
        let size = self.display_size();
        let outcome = self
            .cache
            .paint(&mut self.renderer, &self.page, size, self.zoom, scheduler)?;
        if outcome != PaintOutcome::Cached {
            self.drawn.clear();
        }
        self.draw_overlays();
        Ok(outcome)
    }

    /// The idle rebuild requested by an earlier paint fired.
    pub fn on_idle(&mut self, scheduler: &mut dyn IdleScheduler) -> RenderResult<PaintOutcome> {
        let size = self.display_size();
        let outcome = self
            .cache
            .on_idle(&mut self.renderer, &self.page, size, self.zoom, scheduler)?;
        self.drawn.clear();
        self.draw_overlays();
        Ok(outcome)
    }

    /// Draw only the new segments of in-progress strokes.
    pub fn draw_in_progress(&mut self) {
        for stroke in self.dispatcher.in_progress_strokes() {
            let from = self.drawn.get(&stroke.id()).copied().unwrap_or(0);
            self.renderer
                .draw_overlay(&Overlay::Stroke { stroke, from }, self.zoom, &self.style);
            self.drawn.insert(stroke.id(), stroke.point_count().saturating_sub(1));
        }
    }

    fn draw_overlays(&mut self) {
        let (zoom, style) = (self.zoom, self.style);

        if let Some(editor) = self.dispatcher.text_editor() {
            if let Some(text) = editor.text(&self.page) {
                let overlay = Overlay::TextEditor {
                    text,
                    caret: editor.caret(),
                    selection: editor.selection(),
                };
                self.renderer.draw_overlay(&overlay, zoom, &style);
            }
        }
        if let Some(selection) = self.dispatcher.selection() {
            let overlay = Overlay::Selection {
                bounds: selection.bounds(),
                handles: selection.handles(zoom),
            };
            self.renderer.draw_overlay(&overlay, zoom, &style);
        }
        if let Some(selector) = self.dispatcher.selector() {
            self.renderer
                .draw_overlay(&Overlay::RubberBand(selector.outline()), zoom, &style);
        }
        if !self.search.is_empty() {
            self.renderer
                .draw_overlay(&Overlay::SearchHighlights(&self.search), zoom, &style);
        }
        for stroke in self.dispatcher.in_progress_strokes() {
            self.renderer
                .draw_overlay(&Overlay::Stroke { stroke, from: 0 }, zoom, &style);
            self.drawn.insert(stroke.id(), stroke.point_count().saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkpage_core::{ButtonEvent, InputDevice, Key, MotionEvent, MouseButton, NullHost, ToolKind};
    use kurbo::Point;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Render(f64),
        Blit(f64),
        Overlay(&'static str, usize),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Recorder {
        fn overlays(&self) -> Vec<&'static str> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Overlay(kind, _) => Some(*kind),
                    _ => None,
                })
                .collect()
        }
    }

    impl PageRenderer for Recorder {
        type Raster = f64;

        fn render_page(&mut self, _page: &Page, size: Size, _zoom: f64) -> RenderResult<f64> {
            self.calls.push(Call::Render(size.width));
            Ok(size.width)
        }

        fn raster_width(&self, raster: &f64) -> f64 {
            *raster
        }

        fn blit(&mut self, _raster: &f64, scale: f64) {
            self.calls.push(Call::Blit(scale));
        }

        fn draw_overlay(&mut self, overlay: &Overlay<'_>, _zoom: f64, _style: &OverlayStyle) {
            let call = match overlay {
                Overlay::TextEditor { caret, .. } => Call::Overlay("text", *caret),
                Overlay::Selection { .. } => Call::Overlay("selection", 0),
                Overlay::RubberBand(_) => Call::Overlay("rubber band", 0),
                Overlay::SearchHighlights(rects) => Call::Overlay("search", rects.len()),
                Overlay::Stroke { from, .. } => Call::Overlay("stroke", *from),
            };
            self.calls.push(call);
        }
    }

    #[derive(Default)]
    struct Idle {
        requests: usize,
    }

    impl IdleScheduler for Idle {
        fn schedule_idle(&mut self) {
            self.requests += 1;
        }
    }

    fn view() -> PageView<Recorder> {
        PageView::new(Page::new(100.0, 100.0), Settings::default(), Recorder::default())
    }

    fn press(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Press(ButtonEvent::new(Point::new(x, y), MouseButton::Primary, InputDevice::core_pointer()))
    }

    fn motion(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Motion(MotionEvent::new(Point::new(x, y), InputDevice::core_pointer()))
    }

    fn release(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Release(ButtonEvent::new(Point::new(x, y), MouseButton::Primary, InputDevice::core_pointer()))
    }

    #[test]
    fn test_overlay_changes_keep_cached_raster() {
        let (mut view, mut host, mut idle) = (view(), NullHost, Idle::default());
        view.paint(&mut idle).unwrap();

        view.on_event(&mut host, &press(10.0, 10.0));
        view.on_event(&mut host, &motion(20.0, 10.0));
        assert_eq!(view.take_damage(), Repaint::Overlay);
        assert!(view.cache().is_valid());
        assert_eq!(view.paint(&mut idle).unwrap(), PaintOutcome::Cached);

        let repaint = view.on_event(&mut host, &release(20.0, 10.0));
        assert!(repaint.invalidates_content());
        assert!(!view.cache().is_valid());
        assert_eq!(view.paint(&mut idle).unwrap(), PaintOutcome::Rebuilt);
    }

    #[test]
    fn test_in_progress_stroke_drawn_incrementally() {
        let (mut view, mut host) = (view(), NullHost);
        view.on_event(&mut host, &press(10.0, 10.0));
        view.on_event(&mut host, &motion(20.0, 10.0));
        view.draw_in_progress();
        view.on_event(&mut host, &motion(30.0, 10.0));
        view.on_event(&mut host, &motion(40.0, 10.0));
        view.draw_in_progress();

        assert_eq!(
            view.renderer().calls,
            vec![Call::Overlay("stroke", 0), Call::Overlay("stroke", 1)]
        );
    }

    #[test]
    fn test_overlays_drawn_in_order() {
        let (mut view, mut host, mut idle) = (view(), NullHost, Idle::default());
        view.tools_mut().select_tool(ToolKind::Text);
        view.on_event(&mut host, &press(50.0, 50.0));
        view.on_event(&mut host, &release(50.0, 50.0));
        view.on_key_press(&mut host, &KeyEvent::new(Key::Character("ab".to_string())));
        view.set_search_results(vec![Rect::new(0.0, 0.0, 5.0, 5.0)]);

        view.paint(&mut idle).unwrap();
        assert_eq!(view.renderer().overlays(), vec!["text", "search"]);
        assert!(view.renderer().calls.contains(&Call::Overlay("text", 2)));
    }

    #[test]
    fn test_undo_and_redo_repaint_page() {
        let (mut view, mut host, mut idle) = (view(), NullHost, Idle::default());
        view.on_event(&mut host, &press(10.0, 10.0));
        view.on_event(&mut host, &release(10.0, 10.0));
        view.paint(&mut idle).unwrap();
        view.take_damage();

        assert!(view.undo(&mut host).unwrap());
        assert!(view.page().layer(1).unwrap().is_empty());
        assert_eq!(view.take_damage(), Repaint::Full);
        assert!(!view.cache().is_valid());

        assert!(view.redo(&mut host).unwrap());
        assert_eq!(view.page().layer(1).unwrap().len(), 1);
    }

    #[test]
    fn test_zoom_change_scales_until_idle() {
        let (mut view, mut idle) = (view(), Idle::default());
        view.paint(&mut idle).unwrap();
        view.set_zoom(2.0);

        assert_eq!(view.paint(&mut idle).unwrap(), PaintOutcome::Scaled);
        assert_eq!(idle.requests, 1);
        assert_eq!(view.on_idle(&mut idle).unwrap(), PaintOutcome::Rebuilt);
        assert_eq!(
            view.renderer().calls,
            vec![
                Call::Render(100.0),
                Call::Blit(1.0),
                Call::Blit(2.0),
                Call::Render(200.0),
                Call::Blit(1.0),
            ]
        );
    }

    #[test]
    fn test_widget_rect_scales_by_zoom() {
        let mut view = view();
        view.set_zoom(1.5);
        assert_eq!(
            view.widget_rect(Rect::new(10.0, 20.0, 30.0, 40.0)),
            Rect::new(15.0, 30.0, 45.0, 60.0)
        );
        assert_eq!(view.display_size(), Size::new(150.0, 150.0));
    }
}
