//! Input dispatcher: turns pointer and key events into page edits.
//!
//! The dispatcher owns every transient object of a page view (in-progress
//! strokes, the erase gesture, rubber bands, the finalized selection and the
//! text editor). Everything it touches outside of that arrives through an
//! [`EditContext`] for the duration of one event.

use kurbo::Point;

use crate::accumulator::{PressureMapping, SampleOutcome, StrokeBuilder, StrokeOptions};
use crate::config::{ButtonConfig, Settings};
use crate::elements::{Element, SerializableColor, Stroke, StrokeTool, Text};
use crate::eraser::EraseGesture;
use crate::geometry::{rects_overlap, square_around};
use crate::host::{Repaint, ViewHost};
use crate::input::{ButtonEvent, DeviceSource, KeyEvent, MotionEvent, MouseButton, PointerEvent};
use crate::page::Page;
use crate::recognizer::{LineRecognizer, ShapeRecognizer};
use crate::selection::{EditSelection, RectSelection, RegionSelect, Selector, find_object_at};
use crate::text_editor::{TextEditResult, TextEditor};
use crate::tools::{EraserMode, Tool, ToolHandler, ToolKind};
use crate::undo::{InsertAction, RecognizerAction, UndoAction, UndoHistory};

/// Half side of the box searched for text under a text tool press.
pub const TEXT_MATCH_HALF: f64 = 10.0;

/// Hand tool motion below this many widget pixels on both axes is ignored.
pub const PAN_THRESHOLD: f64 = 3.0;

/// Everything an event handler may read or change besides the dispatcher.
pub struct EditContext<'a> {
    pub page: &'a mut Page,
    pub history: &'a mut UndoHistory,
    pub tools: &'a mut ToolHandler,
    pub settings: &'a mut Settings,
    pub host: &'a mut dyn ViewHost,
    /// Widget pixels per page unit.
    pub zoom: f64,
}

impl EditContext<'_> {
    fn to_page(&self, widget: Point) -> Point {
        Point::new(widget.x / self.zoom, widget.y / self.zoom)
    }

    /// Tell the host about tool changes made while handling this event.
    fn flush_tool_change(&mut self) {
        if self.tools.take_change() {
            let tool = self.tools.active_tool();
            self.host.tool_changed(&tool);
        }
    }

    fn record(&mut self, action: Option<UndoAction>) {
        if let Some(action) = action {
            self.history.push(action);
        }
    }
}

/// Coarse state of the dispatcher, mostly for hosts choosing cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Drawing,
    Erasing,
    Scrolling,
    SelectingRubberBand,
    EditingSelection,
    EditingText,
}

/// Which configured override applies to a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Middle,
    Right,
    Eraser,
    Touch,
}

impl Binding {
    fn for_press(settings: &Settings, event: &ButtonEvent) -> Option<Self> {
        let touch = &settings.touch_button.device;
        match event.button {
            MouseButton::Middle => Some(Binding::Middle),
            MouseButton::Secondary => Some(Binding::Right),
            _ if event.device.source == DeviceSource::Eraser => Some(Binding::Eraser),
            _ if !touch.is_empty() && event.device.name == *touch => Some(Binding::Touch),
            _ => None,
        }
    }

    fn config(self, settings: &Settings) -> &ButtonConfig {
        match self {
            Binding::Middle => &settings.middle_button,
            Binding::Right => &settings.right_button,
            Binding::Eraser => &settings.eraser_button,
            Binding::Touch => &settings.touch_button,
        }
    }
}

/// The configured touch device with drawing disabled and no action of its
/// own does nothing while an ink tool is active.
fn touch_drawing_disabled(settings: &Settings, tools: &ToolHandler, event: &ButtonEvent) -> bool {
    let touch = &settings.touch_button;
    Binding::for_press(settings, event) == Some(Binding::Touch)
        && touch.action.is_none()
        && touch.disable_drawing
        && tools.current_kind().is_ink()
}

/// Temporarily switch to the tool a button is bound to. The previous state
/// is saved and comes back on release.
fn apply_button_config(tools: &mut ToolHandler, config: &ButtonConfig) {
    let Some(action) = config.action else {
        return;
    };
    tools.copy_current_config();
    tools.select_tool(action);

    if matches!(action, ToolKind::Pen | ToolKind::Highlighter) {
        tools.set_ruler(config.ruler);
        tools.set_shape_recognizer(config.shape_recognizer);
        if let Some(size) = config.size {
            tools.set_size(size);
        }
    }
    if matches!(action, ToolKind::Pen | ToolKind::Highlighter | ToolKind::Text) {
        if let Some(color) = config.color {
            tools.set_color(color);
        }
    }
    if action == ToolKind::Eraser {
        if let Some(mode) = config.eraser_mode {
            tools.set_eraser_mode(mode);
        }
    }
}

/// Stroke options for tools that draw through the accumulator, and whether
/// the finished stroke goes through the shape recognizer.
fn stroke_options(tool: &Tool, settings: &Settings) -> Option<(StrokeOptions, bool)> {
    match tool {
        Tool::Pen(ink) => Some((
            StrokeOptions {
                tool: StrokeTool::Pen,
                color: ink.color,
                width: ink.width,
                ruler: ink.ruler,
                pressure: Some(PressureMapping::from_settings(settings)),
            },
            ink.shape_recognizer,
        )),
        Tool::Highlighter(ink) => Some((
            StrokeOptions {
                tool: StrokeTool::Highlighter,
                color: ink.color,
                width: ink.width,
                ruler: ink.ruler,
                pressure: None,
            },
            ink.shape_recognizer,
        )),
        Tool::Eraser(eraser) if eraser.mode == EraserMode::Whiteout => Some((
            StrokeOptions {
                tool: StrokeTool::Eraser,
                color: SerializableColor::white(),
                width: eraser.radius,
                ruler: false,
                pressure: None,
            },
            false,
        )),
        _ => None,
    }
}

/// A stroke being drawn by one device.
struct ActiveStroke {
    builder: StrokeBuilder,
    recognize: bool,
}

enum Gesture {
    Idle,
    /// One accumulator per device drawing at the same time.
    Drawing(Vec<ActiveStroke>),
    Erasing(EraseGesture),
    /// Hand tool; `last` is in widget coordinates.
    Scrolling { last: Point },
    RubberBand(Selector),
}

/// Routes input for one page view.
pub struct InputDispatcher {
    gesture: Gesture,
    selection: Option<EditSelection>,
    text_editor: Option<TextEditor>,
    recognizer: Box<dyn ShapeRecognizer>,
    selected: bool,
    warned_negative: bool,
}

impl Default for InputDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            selection: None,
            text_editor: None,
            recognizer: Box::new(LineRecognizer::default()),
            selected: false,
            warned_negative: false,
        }
    }

    /// Mark this view's page as the document's current page.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn state(&self) -> DispatcherState {
        match &self.gesture {
            Gesture::Drawing(_) => DispatcherState::Drawing,
            Gesture::Erasing(_) => DispatcherState::Erasing,
            Gesture::Scrolling { .. } => DispatcherState::Scrolling,
            Gesture::RubberBand(_) => DispatcherState::SelectingRubberBand,
            Gesture::Idle => {
                if self.selection.as_ref().is_some_and(|s| s.edit_mode().is_some()) {
                    DispatcherState::EditingSelection
                } else if self.text_editor.is_some() {
                    DispatcherState::EditingText
                } else {
                    DispatcherState::Idle
                }
            }
        }
    }

    pub fn selection(&self) -> Option<&EditSelection> {
        self.selection.as_ref()
    }

    pub fn selector(&self) -> Option<&Selector> {
        match &self.gesture {
            Gesture::RubberBand(selector) => Some(selector),
            _ => None,
        }
    }

    pub fn text_editor(&self) -> Option<&TextEditor> {
        self.text_editor.as_ref()
    }

    /// Strokes still being drawn, none of which is on the page yet.
    pub fn in_progress_strokes(&self) -> impl Iterator<Item = &Stroke> {
        let strokes = match &self.gesture {
            Gesture::Drawing(strokes) => strokes.as_slice(),
            _ => &[],
        };
        strokes.iter().map(|s| s.builder.stroke())
    }

    /// Drop the finalized selection, if any.
    pub fn clear_selection(&mut self) -> Repaint {
        match self.selection.take() {
            Some(_) => Repaint::Overlay,
            None => Repaint::None,
        }
    }

    pub fn on_event(&mut self, ctx: &mut EditContext<'_>, event: &PointerEvent) -> Repaint {
        match event {
            PointerEvent::Press(e) => self.on_press(ctx, e),
            PointerEvent::Motion(e) => self.on_motion(ctx, e),
            PointerEvent::Release(e) => self.on_release(ctx, e),
        }
    }

    pub fn on_press(&mut self, ctx: &mut EditContext<'_>, event: &ButtonEvent) -> Repaint {
        log::trace!(
            "press: button {} from {:?} at {:?} pressure {:?}",
            event.button.index(),
            event.device.name,
            event.position,
            event.pressure
        );
        if event.click_count != 1 {
            return Repaint::None;
        }
        if !self.selected {
            ctx.host.page_selected();
            self.selected = true;
        }
        if let Some(direction) = event.button.scroll_direction() {
            ctx.host.scroll_parent(direction);
            return Repaint::None;
        }
        if event.modifiers.ctrl || event.modifiers.alt {
            return Repaint::None;
        }
        if touch_drawing_disabled(ctx.settings, ctx.tools, event) {
            log::info!("ignoring press from {}: drawing disabled for touch", event.device.name);
            return Repaint::None;
        }
        let binding = Binding::for_press(ctx.settings, event);
        if !matches!(self.gesture, Gesture::Idle) {
            return self.join_drawing(ctx, event, binding);
        }

        if let Some(binding) = binding {
            let config = binding.config(ctx.settings).clone();
            apply_button_config(ctx.tools, &config);
            ctx.flush_tool_change();
        }

        if (event.position.x < 0.0 || event.position.y < 0.0) && !self.warned_negative && ctx.settings.use_xinput {
            self.warned_negative = true;
            if ctx.host.confirm_disable_extended_input() {
                log::info!("extended input disabled after negative coordinates");
                ctx.settings.use_xinput = false;
                ctx.host.update_input_events(false);
            }
            return Repaint::None;
        }

        let point = ctx.to_page(event.position);
        let tool = ctx.tools.active_tool();
        let mut repaint = Repaint::None;
        if tool.kind() != ToolKind::Text {
            repaint = self.end_text(ctx);
        }

        if let Some((options, recognize)) = stroke_options(&tool, ctx.settings) {
            repaint = repaint.merge(self.start_stroke(event, point, options, recognize));
        } else {
            match tool {
                Tool::Eraser(eraser) => {
                    let mut gesture = EraseGesture::new(eraser);
                    repaint = repaint.merge(gesture.erase(ctx.page, point));
                    self.gesture = Gesture::Erasing(gesture);
                    log::debug!("erase gesture started");
                }
                Tool::Hand => {
                    self.gesture = Gesture::Scrolling { last: event.position };
                }
                Tool::SelectRect | Tool::SelectRegion => {
                    if let Some(selection) = self.selection.as_mut() {
                        if let Some(mode) = selection.get_selection_type_for_pos(event.position, ctx.zoom) {
                            log::debug!("selection edit started: {mode:?}");
                            selection.set_edit_mode(ctx.page, mode, point);
                            return repaint.merge(Repaint::Overlay);
                        }
                    }
                    repaint = repaint.merge(self.clear_selection());
                    let selector = if tool.kind() == ToolKind::SelectRect {
                        Selector::Rect(RectSelection::new(point))
                    } else {
                        Selector::Region(RegionSelect::new(point))
                    };
                    self.gesture = Gesture::RubberBand(selector);
                    repaint = repaint.merge(Repaint::Overlay);
                }
                Tool::SelectObject => {
                    repaint = repaint.merge(self.clear_selection());
                    self.selection = find_object_at(ctx.page, point)
                        .and_then(|(layer, id)| EditSelection::from_element(ctx.page, layer, id));
                    if self.selection.is_some() {
                        repaint = repaint.merge(Repaint::Overlay);
                    }
                }
                Tool::Text { color } => {
                    repaint = repaint.merge(self.start_text(ctx, point, color));
                }
                Tool::VerticalSpace | Tool::Image => {}
                Tool::Pen(_) | Tool::Highlighter(_) => {}
            }
        }

        ctx.host.set_mouse_down(true);
        repaint
    }

    /// A press arriving while another gesture runs. Only a second device
    /// joining an active drawing gesture is accepted.
    fn join_drawing(&mut self, ctx: &mut EditContext<'_>, event: &ButtonEvent, binding: Option<Binding>) -> Repaint {
        let Gesture::Drawing(strokes) = &self.gesture else {
            log::debug!("press from {} ignored: gesture in progress", event.device.name);
            return Repaint::None;
        };
        if strokes.iter().any(|s| s.builder.device() == event.device.id) {
            return Repaint::None;
        }
        let overridden = binding.is_some_and(|binding| binding.config(ctx.settings).action.is_some());
        if overridden {
            return Repaint::None;
        }

        let Some((options, recognize)) = stroke_options(&ctx.tools.active_tool(), ctx.settings) else {
            return Repaint::None;
        };
        let point = ctx.to_page(event.position);
        let repaint = self.start_stroke(event, point, options, recognize);
        ctx.host.set_mouse_down(true);
        repaint
    }

    fn start_stroke(&mut self, event: &ButtonEvent, point: Point, options: StrokeOptions, recognize: bool) -> Repaint {
        let active = ActiveStroke {
            builder: StrokeBuilder::begin(options, point, &event.device, event.pressure),
            recognize,
        };
        log::debug!("stroke started by {}", event.device.name);
        match &mut self.gesture {
            Gesture::Drawing(strokes) => strokes.push(active),
            _ => self.gesture = Gesture::Drawing(vec![active]),
        }
        Repaint::Overlay
    }

    fn start_text(&mut self, ctx: &mut EditContext<'_>, point: Point, color: SerializableColor) -> Repaint {
        let area = square_around(point, TEXT_MATCH_HALF);

        if let Some(editor) = self.text_editor.as_mut() {
            let hit = editor.text(ctx.page).is_some_and(|t| rects_overlap(t.bounds(), area));
            if hit {
                editor.mouse_pressed(ctx.page, point);
                return Repaint::Overlay;
            }
            return self.end_text(ctx);
        }

        let (layer_id, changed) = ctx.page.ensure_selected_layer();
        if changed {
            ctx.host.layers_changed();
        }
        let existing = ctx.page.layer(layer_id).and_then(|layer| {
            layer
                .elements()
                .iter()
                .filter_map(Element::as_text)
                .find(|t| rects_overlap(t.bounds(), area))
                .map(Text::id)
        });
        let mut editor = existing
            .and_then(|id| TextEditor::edit_existing(ctx.page, layer_id, id, point))
            .unwrap_or_else(|| TextEditor::new_text(layer_id, Text::new(point, String::new()).with_color(color)));
        editor.mouse_pressed(ctx.page, point);
        log::debug!("text editing started (new: {})", editor.is_new());
        self.text_editor = Some(editor);
        Repaint::Overlay
    }

    /// Commit the text being edited and record its undo action.
    pub fn end_text(&mut self, ctx: &mut EditContext<'_>) -> Repaint {
        let Some(editor) = self.text_editor.take() else {
            return Repaint::None;
        };
        log::debug!("text editing ended");
        let action = editor.finish(ctx.page);
        ctx.record(action);
        Repaint::Full
    }

    pub fn on_motion(&mut self, ctx: &mut EditContext<'_>, event: &MotionEvent) -> Repaint {
        log::trace!(
            "motion: {:?} at {:?} pressure {:?}",
            event.device.name,
            event.position,
            event.pressure
        );
        let point = ctx.to_page(event.position);
        if matches!(self.gesture, Gesture::Idle) {
            return self.idle_motion(ctx, event.position, point);
        }

        match &mut self.gesture {
            Gesture::Scrolling { last } => {
                let (dx, dy) = (last.x - event.position.x, last.y - event.position.y);
                if dx.abs() < PAN_THRESHOLD && dy.abs() < PAN_THRESHOLD {
                    return Repaint::None;
                }
                ctx.host.scroll_relative(dx, dy);
                *last = ctx.host.pointer_position().unwrap_or(event.position);
                Repaint::None
            }
            Gesture::Erasing(gesture) => gesture.erase(ctx.page, point),
            Gesture::Drawing(strokes) => {
                let Some(active) = strokes.iter_mut().find(|s| s.builder.device() == event.device.id) else {
                    log::trace!("motion from {} dropped: no stroke of its own", event.device.name);
                    return Repaint::None;
                };
                match active.builder.add_point(event.device.id, point, event.pressure) {
                    SampleOutcome::Accepted => Repaint::Overlay,
                    SampleOutcome::TooClose | SampleOutcome::ForeignDevice => Repaint::None,
                }
            }
            Gesture::RubberBand(selector) => selector.current_pos(point),
            Gesture::Idle => Repaint::None,
        }
    }

    fn idle_motion(&mut self, ctx: &mut EditContext<'_>, widget: Point, point: Point) -> Repaint {
        if let Some(selection) = self.selection.as_mut() {
            if selection.edit_mode().is_some() {
                return selection.move_to(ctx.page, point);
            }
            ctx.host
                .set_selection_cursor(selection.get_selection_type_for_pos(widget, ctx.zoom));
            return Repaint::None;
        }
        if let Some(editor) = self.text_editor.as_mut() {
            if editor.is_dragging() {
                editor.mouse_moved(ctx.page, point);
                return Repaint::Overlay;
            }
        }
        Repaint::None
    }

    pub fn on_release(&mut self, ctx: &mut EditContext<'_>, event: &ButtonEvent) -> Repaint {
        log::trace!("release: button {} from {:?}", event.button.index(), event.device.name);
        if !matches!(self.gesture, Gesture::Idle) && touch_drawing_disabled(ctx.settings, ctx.tools, event) {
            return Repaint::None;
        }
        let mut repaint = Repaint::None;

        // A release from a device that owns no stroke ends every stroke.
        let finished = match &mut self.gesture {
            Gesture::Drawing(strokes) => match strokes.iter().position(|s| s.builder.device() == event.device.id) {
                Some(index) => vec![strokes.remove(index)],
                None => std::mem::take(strokes),
            },
            _ => Vec::new(),
        };
        for active in finished {
            repaint = repaint.merge(self.commit_stroke(ctx, active));
        }
        if let Gesture::Drawing(strokes) = &self.gesture {
            if !strokes.is_empty() {
                return repaint;
            }
        }

        ctx.tools.restore_last_config();
        ctx.flush_tool_change();
        ctx.host.set_mouse_down(false);

        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Erasing(gesture) => {
                let action = gesture.finish(ctx.page);
                log::debug!("erase gesture sealed (changed: {})", action.is_some());
                ctx.record(action);
            }
            Gesture::RubberBand(selector) => {
                self.selection = selector
                    .finalize(ctx.page)
                    .and_then(|selected| EditSelection::new(ctx.page, selected));
                repaint = repaint.merge(Repaint::Overlay);
            }
            Gesture::Idle => {
                if let Some(selection) = self.selection.as_mut() {
                    let action = selection.finalize_editing(ctx.page);
                    if action.is_some() {
                        repaint = repaint.merge(Repaint::Overlay);
                    }
                    ctx.record(action);
                } else if let Some(editor) = self.text_editor.as_mut() {
                    editor.mouse_released();
                }
            }
            Gesture::Drawing(_) | Gesture::Scrolling { .. } => {}
        }
        repaint
    }

    /// Put a finished stroke on the selected layer, or its recognized shape.
    fn commit_stroke(&mut self, ctx: &mut EditContext<'_>, active: ActiveStroke) -> Repaint {
        let stroke = active.builder.finish();
        let (layer_id, changed) = ctx.page.ensure_selected_layer();
        let mut repaint = Repaint::None;
        if changed {
            ctx.host.layers_changed();
            repaint = Repaint::Full;
        }
        let Some(layer) = ctx.page.layer_mut(layer_id) else {
            return repaint;
        };

        let index = layer.len();
        ctx.history.push(UndoAction::Insert(InsertAction {
            layer: layer_id,
            index,
            element: Element::Stroke(stroke.clone()),
        }));

        if active.recognize {
            if let Some(recognized) = self.recognizer.recognize(&stroke) {
                layer.add_element(Element::Stroke(recognized.clone()));
                ctx.history.push(UndoAction::Recognizer(RecognizerAction {
                    layer: layer_id,
                    original: stroke,
                    recognized,
                }));
                return Repaint::Full;
            }
        }

        let bounds = stroke.bounds();
        layer.add_element(Element::Stroke(stroke));
        repaint.merge(Repaint::Region(bounds))
    }

    /// Forward a key to the text editor. Returns `None` when nothing on the
    /// page wants the key.
    pub fn on_key_press(&mut self, ctx: &mut EditContext<'_>, event: &KeyEvent) -> Option<Repaint> {
        let editor = self.text_editor.as_mut()?;
        let result = editor.handle_key(ctx.page, event);
        let repaint = text_repaint(editor);
        match result {
            TextEditResult::Handled => Some(repaint),
            TextEditResult::ExitEdit => Some(self.end_text(ctx)),
            TextEditResult::NotHandled => None,
        }
    }

    pub fn cut(&mut self, ctx: &mut EditContext<'_>) -> Option<Repaint> {
        let editor = self.text_editor.as_mut()?;
        editor.cut(ctx.page, &mut *ctx.host);
        Some(text_repaint(editor))
    }

    pub fn copy(&mut self, ctx: &mut EditContext<'_>) -> bool {
        match self.text_editor.as_ref() {
            Some(editor) => {
                editor.copy(ctx.page, &mut *ctx.host);
                true
            }
            None => false,
        }
    }

    pub fn paste(&mut self, ctx: &mut EditContext<'_>) -> Option<Repaint> {
        let editor = self.text_editor.as_mut()?;
        editor.paste(ctx.page, &mut *ctx.host);
        Some(text_repaint(editor))
    }

    /// Delete forward from the caret of the text being edited.
    pub fn action_delete(&mut self, ctx: &mut EditContext<'_>) -> Option<Repaint> {
        let editor = self.text_editor.as_mut()?;
        editor.delete_from_cursor(ctx.page, 1);
        Some(text_repaint(editor))
    }
}

/// A new text lives in the overlay until committed; an existing one is part
/// of the cached page.
fn text_repaint(editor: &TextEditor) -> Repaint {
    if editor.is_new() {
        Repaint::Overlay
    } else {
        Repaint::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DeviceId, InputDevice, Key, Modifiers, ScrollDirection};
    use crate::page::Layer;
    use crate::selection::EditMode;

    #[derive(Default)]
    struct RecordingHost {
        page_selected: usize,
        scrolls: Vec<ScrollDirection>,
        pans: Vec<(f64, f64)>,
        mouse_down: Vec<bool>,
        tool_changes: usize,
        confirms: usize,
        accept_disable: bool,
        input_updates: Vec<bool>,
        layers_changed: usize,
        clipboard: Option<String>,
    }

    impl ViewHost for RecordingHost {
        fn page_selected(&mut self) {
            self.page_selected += 1;
        }

        fn scroll_parent(&mut self, direction: ScrollDirection) {
            self.scrolls.push(direction);
        }

        fn scroll_relative(&mut self, dx: f64, dy: f64) {
            self.pans.push((dx, dy));
        }

        fn confirm_disable_extended_input(&mut self) -> bool {
            self.confirms += 1;
            self.accept_disable
        }

        fn update_input_events(&mut self, use_xinput: bool) {
            self.input_updates.push(use_xinput);
        }

        fn set_mouse_down(&mut self, down: bool) {
            self.mouse_down.push(down);
        }

        fn tool_changed(&mut self, _tool: &Tool) {
            self.tool_changes += 1;
        }

        fn layers_changed(&mut self) {
            self.layers_changed += 1;
        }

        fn clipboard_text(&mut self) -> Option<String> {
            self.clipboard.clone()
        }

        fn set_clipboard_text(&mut self, text: String) {
            self.clipboard = Some(text);
        }
    }

    struct Fixture {
        page: Page,
        history: UndoHistory,
        tools: ToolHandler,
        settings: Settings,
        host: RecordingHost,
        zoom: f64,
        dispatcher: InputDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                page: Page::new(200.0, 200.0),
                history: UndoHistory::new(),
                tools: ToolHandler::new(),
                settings: Settings::default(),
                host: RecordingHost::default(),
                zoom: 1.0,
                dispatcher: InputDispatcher::new(),
            }
        }

        fn with_strokes(strokes: Vec<Stroke>) -> Self {
            let mut fixture = Self::new();
            let mut layer = Layer::new();
            for stroke in strokes {
                layer.add_element(stroke.into());
            }
            fixture.page.add_layer(layer);
            fixture.page.set_selected_layer_id(1);
            fixture
        }

        fn run<R>(&mut self, f: impl FnOnce(&mut InputDispatcher, &mut EditContext<'_>) -> R) -> R {
            let mut ctx = EditContext {
                page: &mut self.page,
                history: &mut self.history,
                tools: &mut self.tools,
                settings: &mut self.settings,
                host: &mut self.host,
                zoom: self.zoom,
            };
            f(&mut self.dispatcher, &mut ctx)
        }

        fn press(&mut self, event: ButtonEvent) -> Repaint {
            self.run(|d, ctx| d.on_press(ctx, &event))
        }

        fn motion(&mut self, event: MotionEvent) -> Repaint {
            self.run(|d, ctx| d.on_motion(ctx, &event))
        }

        fn release(&mut self, event: ButtonEvent) -> Repaint {
            self.run(|d, ctx| d.on_release(ctx, &event))
        }

        fn key(&mut self, key: Key) -> Option<Repaint> {
            let event = KeyEvent::new(key);
            self.run(|d, ctx| d.on_key_press(ctx, &event))
        }

        /// Press, move through `path` and release with the core pointer.
        fn drag(&mut self, path: &[(f64, f64)]) {
            let (first, rest) = path.split_first().unwrap();
            self.press(mouse(first.0, first.1));
            for &(x, y) in rest {
                self.motion(moved(x, y));
            }
            let last = path.last().unwrap();
            self.release(mouse(last.0, last.1));
        }

        fn strokes(&self) -> Vec<Stroke> {
            self.page
                .layer(1)
                .map(|l| l.elements().iter().filter_map(Element::as_stroke).cloned().collect())
                .unwrap_or_default()
        }
    }

    fn mouse(x: f64, y: f64) -> ButtonEvent {
        ButtonEvent::new(Point::new(x, y), MouseButton::Primary, InputDevice::core_pointer())
    }

    fn moved(x: f64, y: f64) -> MotionEvent {
        MotionEvent::new(Point::new(x, y), InputDevice::core_pointer())
    }

    fn line(points: &[(f64, f64)]) -> Stroke {
        Stroke::from_points(
            StrokeTool::Pen,
            SerializableColor::black(),
            1.0,
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        )
    }

    #[test]
    fn test_pen_stroke_filters_close_samples_in_page_space() {
        let mut f = Fixture::new();
        f.zoom = 3.0;
        f.press(mouse(30.0, 30.0));
        assert_eq!(f.dispatcher.state(), DispatcherState::Drawing);
        assert_eq!(f.motion(moved(30.5, 30.5)), Repaint::None);
        assert_eq!(f.motion(moved(36.0, 39.0)), Repaint::Overlay);
        let repaint = f.release(mouse(36.0, 39.0));

        assert!(repaint.invalidates_content());
        let strokes = f.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points(), &[Point::new(10.0, 10.0), Point::new(12.0, 13.0)]);
        assert_eq!(f.host.layers_changed, 1);
        assert!(matches!(
            f.history.last(),
            Some(UndoAction::Insert(InsertAction { layer: 1, index: 0, .. }))
        ));
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
        assert_eq!(f.host.mouse_down, vec![true, false]);
    }

    #[test]
    fn test_single_point_stroke_becomes_dot() {
        let mut f = Fixture::new();
        f.press(mouse(5.0, 5.0));
        f.release(mouse(5.0, 5.0));
        let strokes = f.strokes();
        assert_eq!(strokes[0].points(), &[Point::new(5.0, 5.0), Point::new(5.0, 5.0)]);
        assert!(strokes[0].widths().is_empty());
    }

    #[test]
    fn test_delete_eraser_records_single_delete() {
        let far = line(&[(10.0, 150.0), (20.0, 150.0)]);
        let target = line(&[(50.0, 50.0), (52.0, 50.0), (54.0, 50.0)]);
        let mut f = Fixture::with_strokes(vec![far.clone(), target.clone()]);
        f.tools.select_tool(ToolKind::Eraser);
        f.tools.set_eraser_mode(EraserMode::DeleteStroke);

        assert!(f.press(mouse(52.0, 50.0)).invalidates_content());
        assert_eq!(f.dispatcher.state(), DispatcherState::Erasing);
        f.motion(moved(53.0, 50.0));
        f.release(mouse(53.0, 50.0));

        assert_eq!(f.page.layer(1).unwrap().element_ids(), vec![far.id()]);
        assert_eq!(f.history.len(), 1);
        let Some(UndoAction::Delete(action)) = f.history.last() else {
            panic!("expected a delete action");
        };
        assert_eq!(action.entries().len(), 1);
        assert_eq!(action.entries()[0].index, 1);
        assert_eq!(action.entries()[0].element.id(), target.id());
    }

    #[test]
    fn test_split_erase_gesture_is_one_undo_step() {
        let original = line(&[(0.0, 50.0), (10.0, 50.0), (20.0, 50.0), (30.0, 50.0), (40.0, 50.0)]);
        let mut f = Fixture::with_strokes(vec![original.clone()]);
        let before = f.page.clone();
        f.tools.select_tool(ToolKind::Eraser);

        f.drag(&[(20.0, 50.0), (20.5, 50.0), (20.0, 50.0)]);
        assert_eq!(f.strokes().len(), 2);
        assert_eq!(f.history.len(), 1);

        f.history.undo(&mut f.page).unwrap();
        assert_eq!(f.page, before);
    }

    #[test]
    fn test_whiteout_draws_white_eraser_stroke() {
        let existing = line(&[(0.0, 50.0), (40.0, 50.0)]);
        let mut f = Fixture::with_strokes(vec![existing.clone()]);
        f.tools.select_tool(ToolKind::Eraser);
        f.tools.set_eraser_mode(EraserMode::Whiteout);

        f.drag(&[(10.0, 40.0), (10.0, 60.0)]);
        let strokes = f.strokes();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0], existing);
        assert_eq!(strokes[1].tool, StrokeTool::Eraser);
        assert_eq!(strokes[1].color, SerializableColor::white());
        assert!((strokes[1].width - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_rect_press_outside_handles_replaces_selection() {
        let a = line(&[(10.0, 10.0), (30.0, 40.0)]);
        let b = line(&[(100.0, 100.0), (120.0, 100.0)]);
        let mut f = Fixture::with_strokes(vec![a.clone(), b.clone()]);
        f.tools.select_tool(ToolKind::SelectRect);

        f.drag(&[(5.0, 5.0), (40.0, 45.0)]);
        assert_eq!(f.dispatcher.selection().unwrap().ids(), &[a.id()]);

        f.press(mouse(150.0, 150.0));
        assert!(f.dispatcher.selection().is_none());
        assert_eq!(f.dispatcher.state(), DispatcherState::SelectingRubberBand);
        f.motion(moved(90.0, 90.0));
        f.release(mouse(90.0, 90.0));
        assert_eq!(f.dispatcher.selection().unwrap().ids(), &[b.id()]);
    }

    #[test]
    fn test_drag_inside_selection_moves_it() {
        let a = line(&[(10.0, 10.0), (30.0, 40.0)]);
        let mut f = Fixture::with_strokes(vec![a.clone()]);
        f.tools.select_tool(ToolKind::SelectRect);
        f.drag(&[(5.0, 5.0), (40.0, 45.0)]);
        f.host.mouse_down.clear();

        f.press(mouse(18.0, 30.0));
        assert_eq!(f.dispatcher.state(), DispatcherState::EditingSelection);
        assert_eq!(f.dispatcher.selection().unwrap().edit_mode(), Some(EditMode::Move));
        assert!(f.host.mouse_down.is_empty());

        assert!(f.motion(moved(23.0, 40.0)).invalidates_content());
        f.release(mouse(23.0, 40.0));

        let moved_stroke = &f.strokes()[0];
        assert_eq!(moved_stroke.points()[0], Point::new(15.0, 20.0));
        assert!(matches!(f.history.last(), Some(UndoAction::Transform(_))));

        f.history.undo(&mut f.page).unwrap();
        assert_eq!(f.strokes()[0].points(), a.points());
    }

    #[test]
    fn test_object_select_prefers_closer_stroke() {
        let far = line(&[(0.0, 50.0), (100.0, 50.0)]);
        let near = line(&[(0.0, 56.0), (100.0, 56.0)]);
        let mut f = Fixture::with_strokes(vec![far, near.clone()]);
        f.tools.select_tool(ToolKind::SelectObject);

        f.press(mouse(50.0, 54.0));
        f.release(mouse(50.0, 54.0));
        assert_eq!(f.dispatcher.selection().unwrap().ids(), &[near.id()]);
    }

    #[test]
    fn test_two_devices_draw_separate_strokes() {
        let mut f = Fixture::new();
        let pen_a = InputDevice::stylus(1, "pen-a");
        let pen_b = InputDevice::stylus(2, "pen-b");
        let press = |x, y, device: &InputDevice| {
            ButtonEvent::new(Point::new(x, y), MouseButton::Primary, device.clone()).with_pressure(0.5)
        };
        let motion = |x, y, device: &InputDevice| MotionEvent::new(Point::new(x, y), device.clone());

        f.press(press(10.0, 10.0, &pen_a));
        f.press(press(100.0, 100.0, &pen_b));
        f.motion(motion(20.0, 10.0, &pen_a));
        f.motion(motion(100.0, 120.0, &pen_b));
        f.motion(motion(30.0, 10.0, &pen_a));
        assert_eq!(f.dispatcher.in_progress_strokes().count(), 2);

        f.release(press(30.0, 10.0, &pen_a));
        assert_eq!(f.dispatcher.state(), DispatcherState::Drawing);
        f.release(press(100.0, 120.0, &pen_b));
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);

        let strokes = f.strokes();
        assert_eq!(strokes.len(), 2);
        assert_eq!(
            strokes[0].points(),
            &[Point::new(10.0, 10.0), Point::new(20.0, 10.0), Point::new(30.0, 10.0)]
        );
        assert_eq!(strokes[1].points(), &[Point::new(100.0, 100.0), Point::new(100.0, 120.0)]);
        assert!(strokes.iter().all(|s| s.widths().len() == s.point_count()));
        assert_eq!(f.history.len(), 2);
    }

    #[test]
    fn test_press_during_erase_is_ignored() {
        let mut f = Fixture::with_strokes(vec![line(&[(0.0, 50.0), (40.0, 50.0)])]);
        f.tools.select_tool(ToolKind::Eraser);
        f.press(mouse(100.0, 100.0));
        let other = ButtonEvent::new(Point::new(20.0, 50.0), MouseButton::Primary, InputDevice::stylus(3, "pen"));
        assert_eq!(f.press(other), Repaint::None);
        assert_eq!(f.strokes().len(), 1);
    }

    #[test]
    fn test_wheel_buttons_scroll_parent() {
        let mut f = Fixture::new();
        let wheel = ButtonEvent::new(Point::new(5.0, 5.0), MouseButton::Other(5), InputDevice::core_pointer());
        assert_eq!(f.press(wheel), Repaint::None);
        assert_eq!(f.host.scrolls, vec![ScrollDirection::Down]);
        assert_eq!(f.host.page_selected, 1);
        assert!(f.host.mouse_down.is_empty());
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
    }

    #[test]
    fn test_modifier_and_double_presses_ignored() {
        let mut f = Fixture::new();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        f.press(mouse(5.0, 5.0).with_modifiers(ctrl));
        let mut double = mouse(5.0, 5.0);
        double.click_count = 2;
        f.press(double);
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
        assert!(f.host.mouse_down.is_empty());
    }

    #[test]
    fn test_touch_with_drawing_disabled_is_ignored() {
        let mut f = Fixture::new();
        f.settings.touch_button = ButtonConfig {
            device: "Touchscreen".to_string(),
            disable_drawing: true,
            ..ButtonConfig::default()
        };
        let touch = InputDevice {
            name: "Touchscreen".to_string(),
            source: DeviceSource::Touch,
            ..InputDevice::core_pointer()
        };
        f.press(ButtonEvent::new(Point::new(5.0, 5.0), MouseButton::Primary, touch.clone()));
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);

        f.tools.select_tool(ToolKind::Hand);
        f.press(ButtonEvent::new(Point::new(5.0, 5.0), MouseButton::Primary, touch));
        assert_eq!(f.dispatcher.state(), DispatcherState::Scrolling);
    }

    fn touchscreen() -> InputDevice {
        InputDevice {
            id: DeviceId(7),
            name: "Touchscreen".to_string(),
            source: DeviceSource::Touch,
            ..InputDevice::core_pointer()
        }
    }

    #[test]
    fn test_disabled_touch_cannot_join_stroke() {
        let mut f = Fixture::new();
        f.settings.touch_button = ButtonConfig {
            device: "Touchscreen".to_string(),
            disable_drawing: true,
            ..ButtonConfig::default()
        };
        let pen = InputDevice::stylus(1, "pen");
        f.press(ButtonEvent::new(Point::new(10.0, 10.0), MouseButton::Primary, pen.clone()));

        let palm = ButtonEvent::new(Point::new(100.0, 100.0), MouseButton::Primary, touchscreen());
        assert_eq!(f.press(palm.clone()), Repaint::None);
        assert_eq!(f.dispatcher.in_progress_strokes().count(), 1);
        assert_eq!(f.release(palm), Repaint::None);
        assert_eq!(f.dispatcher.state(), DispatcherState::Drawing);

        f.motion(MotionEvent::new(Point::new(20.0, 10.0), pen.clone()));
        f.release(ButtonEvent::new(Point::new(20.0, 10.0), MouseButton::Primary, pen));
        let strokes = f.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points(), &[Point::new(10.0, 10.0), Point::new(20.0, 10.0)]);
        assert_eq!(f.host.mouse_down, vec![true, false]);
    }

    #[test]
    fn test_enabled_touch_joins_stroke() {
        let mut f = Fixture::new();
        f.settings.touch_button.device = "Touchscreen".to_string();
        let pen = InputDevice::stylus(1, "pen");
        f.press(ButtonEvent::new(Point::new(10.0, 10.0), MouseButton::Primary, pen.clone()));
        f.press(ButtonEvent::new(Point::new(100.0, 100.0), MouseButton::Primary, touchscreen()));
        assert_eq!(f.dispatcher.in_progress_strokes().count(), 2);

        f.release(ButtonEvent::new(Point::new(100.0, 100.0), MouseButton::Primary, touchscreen()));
        f.release(ButtonEvent::new(Point::new(10.0, 10.0), MouseButton::Primary, pen));
        assert_eq!(f.strokes().len(), 2);
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
    }

    #[test]
    fn test_release_from_unknown_device_commits_stroke() {
        let mut f = Fixture::new();
        f.settings.right_button = ButtonConfig::with_action(ToolKind::Highlighter);
        let pen = InputDevice::stylus(1, "pen");
        f.press(ButtonEvent::new(Point::new(10.0, 10.0), MouseButton::Secondary, pen.clone()));
        assert_eq!(f.tools.current_kind(), ToolKind::Highlighter);
        f.motion(MotionEvent::new(Point::new(30.0, 10.0), pen));

        let repaint = f.release(mouse(30.0, 10.0));
        assert!(repaint.invalidates_content());
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
        assert_eq!(f.strokes().len(), 1);
        assert_eq!(f.tools.current_kind(), ToolKind::Pen);
        assert_eq!(f.host.mouse_down.last(), Some(&false));
    }

    #[test]
    fn test_middle_button_override_is_restored() {
        let mut f = Fixture::new();
        let middle = ButtonEvent::new(Point::new(50.0, 50.0), MouseButton::Middle, InputDevice::core_pointer());
        f.press(middle.clone());
        assert_eq!(f.tools.current_kind(), ToolKind::Hand);
        assert_eq!(f.dispatcher.state(), DispatcherState::Scrolling);
        assert_eq!(f.host.tool_changes, 1);

        f.release(middle);
        assert_eq!(f.tools.current_kind(), ToolKind::Pen);
        assert_eq!(f.host.tool_changes, 2);
        assert!(f.strokes().is_empty());
    }

    #[test]
    fn test_eraser_device_uses_eraser_binding() {
        let points = [(0.0, 50.0), (10.0, 50.0), (20.0, 50.0), (30.0, 50.0), (40.0, 50.0)];
        let mut f = Fixture::with_strokes(vec![line(&points)]);
        let tip = InputDevice {
            source: DeviceSource::Eraser,
            ..InputDevice::stylus(4, "stylus eraser")
        };
        f.press(ButtonEvent::new(Point::new(20.0, 50.0), MouseButton::Primary, tip.clone()));
        assert_eq!(f.dispatcher.state(), DispatcherState::Erasing);
        f.release(ButtonEvent::new(Point::new(20.0, 50.0), MouseButton::Primary, tip));
        assert_eq!(f.tools.current_kind(), ToolKind::Pen);
        assert_eq!(f.strokes().len(), 2);
    }

    #[test]
    fn test_hand_pan_ignores_small_motion() {
        let mut f = Fixture::new();
        f.tools.select_tool(ToolKind::Hand);
        f.press(mouse(100.0, 100.0));
        f.motion(moved(101.0, 102.0));
        f.motion(moved(90.0, 100.0));
        f.motion(moved(89.0, 100.0));
        assert_eq!(f.host.pans, vec![(10.0, 0.0)]);
    }

    #[test]
    fn test_negative_coordinates_warn_once() {
        let mut f = Fixture::new();
        f.settings.use_xinput = true;
        f.press(mouse(-5.0, 10.0));
        assert_eq!(f.host.confirms, 1);
        assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
        assert!(f.host.mouse_down.is_empty());
        f.release(mouse(-5.0, 10.0));

        f.press(mouse(-5.0, 10.0));
        assert_eq!(f.host.confirms, 1);
        assert_eq!(f.dispatcher.state(), DispatcherState::Drawing);
        assert!(f.settings.use_xinput);
    }

    #[test]
    fn test_accepting_warning_disables_extended_input() {
        let mut f = Fixture::new();
        f.settings.use_xinput = true;
        f.host.accept_disable = true;
        f.press(mouse(3.0, -1.0));
        assert!(!f.settings.use_xinput);
        assert_eq!(f.host.input_updates, vec![false]);
    }

    #[test]
    fn test_recognized_stroke_undoes_in_two_steps() {
        let mut f = Fixture::new();
        f.tools.set_shape_recognizer(true);
        f.drag(&[(0.0, 0.0), (10.0, 0.1), (20.0, 0.0), (30.0, 0.1), (40.0, 0.0)]);

        let strokes = f.strokes();
        assert_eq!(strokes[0].points(), &[Point::new(0.0, 0.0), Point::new(40.0, 0.0)]);
        assert_eq!(f.history.len(), 2);

        f.history.undo(&mut f.page).unwrap();
        assert_eq!(f.strokes()[0].point_count(), 5);
        f.history.undo(&mut f.page).unwrap();
        assert!(f.strokes().is_empty());
    }

    #[test]
    fn test_text_tool_creates_text() {
        let mut f = Fixture::new();
        f.tools.select_tool(ToolKind::Text);
        f.press(mouse(50.0, 50.0));
        f.release(mouse(50.0, 50.0));
        assert_eq!(f.dispatcher.state(), DispatcherState::EditingText);

        assert_eq!(f.key(Key::Character("hi".to_string())), Some(Repaint::Overlay));
        assert_eq!(f.key(Key::Tab), None);
        assert_eq!(f.key(Key::Escape), Some(Repaint::Full));
        assert!(f.dispatcher.text_editor().is_none());

        let layer = f.page.layer(1).unwrap();
        assert_eq!(layer.elements()[0].as_text().unwrap().content, "hi");
        assert!(matches!(f.history.last(), Some(UndoAction::Insert(_))));
        assert_eq!(f.key(Key::Character("x".to_string())), None);
    }

    #[test]
    fn test_text_press_elsewhere_ends_editing() {
        let mut f = Fixture::new();
        f.tools.select_tool(ToolKind::Text);
        f.press(mouse(50.0, 50.0));
        f.release(mouse(50.0, 50.0));
        f.key(Key::Character("a".to_string()));

        f.press(mouse(150.0, 150.0));
        assert!(f.dispatcher.text_editor().is_none());
        assert_eq!(f.page.layer(1).unwrap().len(), 1);
    }

    #[test]
    fn test_text_press_on_existing_text_edits_it() {
        let mut f = Fixture::new();
        let text = Text::new(Point::new(50.0, 50.0), "hello".to_string());
        let id = text.id();
        let mut layer = Layer::new();
        layer.add_element(text.into());
        f.page.add_layer(layer);
        f.page.set_selected_layer_id(1);
        f.tools.select_tool(ToolKind::Text);

        f.press(mouse(51.0, 52.0));
        f.release(mouse(51.0, 52.0));
        let editor = f.dispatcher.text_editor().unwrap();
        assert!(!editor.is_new());
        assert_eq!(editor.element_id(), id);

        f.key(Key::End);
        assert_eq!(f.key(Key::Character("!".to_string())), Some(Repaint::Full));
        f.key(Key::Escape);
        assert_eq!(f.page.layer(1).unwrap().elements()[0].as_text().unwrap().content, "hello!");
        assert!(matches!(f.history.last(), Some(UndoAction::TextEdit(_))));
    }

    #[test]
    fn test_switching_tool_commits_text() {
        let mut f = Fixture::new();
        f.tools.select_tool(ToolKind::Text);
        f.press(mouse(50.0, 50.0));
        f.release(mouse(50.0, 50.0));
        f.key(Key::Character("note".to_string()));

        f.tools.select_tool(ToolKind::Pen);
        f.press(mouse(10.0, 10.0));
        assert!(f.dispatcher.text_editor().is_none());
        f.release(mouse(10.0, 10.0));
        assert_eq!(f.page.layer(1).unwrap().len(), 2);
    }

    #[test]
    fn test_clipboard_goes_through_host() {
        let mut f = Fixture::new();
        f.tools.select_tool(ToolKind::Text);
        f.press(mouse(50.0, 50.0));
        f.release(mouse(50.0, 50.0));
        f.host.clipboard = Some("pasted".to_string());
        assert!(f.run(|d, ctx| d.paste(ctx)).is_some());
        f.key(Key::Escape);
        assert_eq!(f.page.layer(1).unwrap().elements()[0].as_text().unwrap().content, "pasted");
        assert!(f.run(|d, ctx| d.cut(ctx)).is_none());
        assert!(!f.run(|d, ctx| d.copy(ctx)));
    }
}
