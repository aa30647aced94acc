//! Callbacks from the editing core into the view that embeds it.

use kurbo::{Point, Rect};

use crate::input::ScrollDirection;
use crate::selection::EditMode;
use crate::tools::Tool;

/// What part of the page view has to be redrawn after an event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Repaint {
    #[default]
    None,
    /// Only transient overlays changed; committed content is intact.
    Overlay,
    /// Committed content changed inside this page-space rectangle.
    Region(Rect),
    /// Committed content changed in an unknown area.
    Full,
}

impl Repaint {
    /// The smallest repaint covering both requests.
    pub fn merge(self, other: Repaint) -> Repaint {
        match (self, other) {
            (Repaint::Full, _) | (_, Repaint::Full) => Repaint::Full,
            (Repaint::Region(a), Repaint::Region(b)) => Repaint::Region(a.union(b)),
            (Repaint::Region(r), _) | (_, Repaint::Region(r)) => Repaint::Region(r),
            (Repaint::Overlay, _) | (_, Repaint::Overlay) => Repaint::Overlay,
            (Repaint::None, Repaint::None) => Repaint::None,
        }
    }

    /// Whether the cached page raster is stale.
    pub fn invalidates_content(&self) -> bool {
        matches!(self, Repaint::Region(_) | Repaint::Full)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Repaint::None)
    }
}

/// The host view, as seen by the input dispatcher.
///
/// Every method has a no-op default so hosts only implement what they support.
pub trait ViewHost {
    /// The page under the pointer became the selected page.
    fn page_selected(&mut self) {}

    /// A wheel button asked the enclosing scroll view to scroll.
    fn scroll_parent(&mut self, _direction: ScrollDirection) {}

    /// Pan the enclosing scroll view by a widget-space delta.
    fn scroll_relative(&mut self, _dx: f64, _dy: f64) {}

    /// Current pointer position in widget coordinates, if the host tracks it.
    fn pointer_position(&self) -> Option<Point> {
        None
    }

    /// Ask whether extended input should be disabled after negative
    /// coordinates were reported. `true` disables it.
    fn confirm_disable_extended_input(&mut self) -> bool {
        false
    }

    /// Re-subscribe to input events after the extended-input setting changed.
    fn update_input_events(&mut self, _use_xinput: bool) {}

    /// A button went down or up on this page.
    fn set_mouse_down(&mut self, _down: bool) {}

    /// Cursor shape for the selection handle under the pointer.
    fn set_selection_cursor(&mut self, _mode: Option<EditMode>) {}

    /// The active tool or its settings changed.
    fn tool_changed(&mut self, _tool: &Tool) {}

    /// A layer was created, so layer pickers need refreshing.
    fn layers_changed(&mut self) {}

    fn clipboard_text(&mut self) -> Option<String> {
        None
    }

    fn set_clipboard_text(&mut self, _text: String) {}
}

/// A host that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ViewHost for NullHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_regions() {
        let a = Repaint::Region(Rect::new(0.0, 0.0, 1.0, 1.0));
        let b = Repaint::Region(Rect::new(2.0, 2.0, 3.0, 3.0));
        assert_eq!(a.merge(b), Repaint::Region(Rect::new(0.0, 0.0, 3.0, 3.0)));
        assert_eq!(a.merge(Repaint::Overlay), a);
        assert_eq!(Repaint::Overlay.merge(Repaint::Full), Repaint::Full);
        assert_eq!(Repaint::None.merge(Repaint::Overlay), Repaint::Overlay);
    }

    #[test]
    fn test_invalidates_content() {
        assert!(!Repaint::Overlay.invalidates_content());
        assert!(Repaint::Full.invalidates_content());
    }
}
