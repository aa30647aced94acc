//! Inline editor for text elements.

use kurbo::Point;

use crate::elements::{Element, ElementId, Text};
use crate::host::ViewHost;
use crate::input::{Key, KeyEvent};
use crate::page::Page;
use crate::undo::{DeleteAction, InsertAction, TextEditAction, UndoAction};

/// Result of handling a text editing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEditResult {
    /// Event was handled, text or caret may have changed.
    Handled,
    /// Event was handled, user wants to exit editing.
    ExitEdit,
    /// Event was not handled (pass to other handlers).
    NotHandled,
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    /// A text the editor owns until it is committed.
    New(Text),
    /// A text living in its layer; only its id is held here.
    Existing { id: ElementId, original: String },
}

/// Caret, selection and target of an active text edit.
///
/// Caret and anchor are character indices; they are equal when nothing is
/// selected.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditor {
    layer: usize,
    target: Target,
    caret: usize,
    anchor: usize,
    dragging: bool,
}

fn byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices().nth(char_index).map(|(i, _)| i).unwrap_or(s.len())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextEditor {
    /// Start typing a new text that is not yet part of the page.
    pub fn new_text(layer: usize, text: Text) -> Self {
        Self {
            layer,
            target: Target::New(text),
            caret: 0,
            anchor: 0,
            dragging: false,
        }
    }

    /// Edit a text already on `layer`, placing the caret nearest `point`.
    pub fn edit_existing(page: &Page, layer: usize, id: ElementId, point: Point) -> Option<Self> {
        let text = page.layer(layer)?.get(id)?.as_text()?;
        let caret = text.char_index_at(point);
        Some(Self {
            layer,
            target: Target::Existing {
                id,
                original: text.content.clone(),
            },
            caret,
            anchor: caret,
            dragging: false,
        })
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn element_id(&self) -> ElementId {
        match &self.target {
            Target::New(text) => text.id(),
            Target::Existing { id, .. } => *id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self.target, Target::New(_))
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Selected character range, if any.
    pub fn selection(&self) -> Option<(usize, usize)> {
        (self.caret != self.anchor).then(|| (self.caret.min(self.anchor), self.caret.max(self.anchor)))
    }

    /// The text being edited.
    pub fn text<'a>(&'a self, page: &'a Page) -> Option<&'a Text> {
        match &self.target {
            Target::New(text) => Some(text),
            Target::Existing { id, .. } => page.layer(self.layer)?.get(*id)?.as_text(),
        }
    }

    fn text_mut<'a>(&'a mut self, page: &'a mut Page) -> Option<&'a mut Text> {
        match &mut self.target {
            Target::New(text) => Some(text),
            Target::Existing { id, .. } => page.layer_mut(self.layer)?.get_mut(*id)?.as_text_mut(),
        }
    }

    /// Whether a page-space point falls on the edited text.
    pub fn contains(&self, page: &Page, point: Point) -> bool {
        self.text(page).is_some_and(|t| t.bounds().contains(point))
    }

    fn content_len(&self, page: &Page) -> usize {
        self.text(page).map(|t| char_len(&t.content)).unwrap_or(0)
    }

    /// Replace the selection (or insert at the caret) with `insert`.
    fn replace_selection(&mut self, page: &mut Page, insert: &str) {
        let (start, end) = self.selection().unwrap_or((self.caret, self.caret));
        let Some(text) = self.text_mut(page) else {
            return;
        };
        let (b0, b1) = (byte_index(&text.content, start), byte_index(&text.content, end));
        text.content.replace_range(b0..b1, insert);
        self.caret = start + char_len(insert);
        self.anchor = self.caret;
    }

    /// Delete the selection, or `count` characters from the caret: forward
    /// for positive counts, backward for negative ones.
    pub fn delete_from_cursor(&mut self, page: &mut Page, count: isize) {
        if self.selection().is_none() {
            let len = self.content_len(page);
            if count < 0 {
                self.anchor = self.caret.saturating_sub(count.unsigned_abs());
            } else {
                self.anchor = (self.caret + count.unsigned_abs()).min(len);
            }
        }
        self.replace_selection(page, "");
    }

    fn move_caret(&mut self, to: usize, extend: bool) {
        self.caret = to;
        if !extend {
            self.anchor = to;
        }
    }

    pub fn handle_key(&mut self, page: &mut Page, event: &KeyEvent) -> TextEditResult {
        let shift = event.modifiers.shift;
        let action_mod = event.modifiers.ctrl || event.modifiers.meta;
        let Some(text) = self.text(page) else {
            return TextEditResult::NotHandled;
        };
        let len = char_len(&text.content);
        let (line, col) = text.line_col(self.caret);
        let line_count = text.line_count();
        let line_start = text.index_for_line_col(line, 0);
        let line_end = text.index_for_line_col(line, usize::MAX);
        let up = (line > 0).then(|| text.index_for_line_col(line - 1, col));
        let down = (line + 1 < line_count).then(|| text.index_for_line_col(line + 1, col));

        match &event.key {
            Key::Escape => return TextEditResult::ExitEdit,
            Key::Backspace => self.delete_from_cursor(page, -1),
            Key::Delete => self.delete_from_cursor(page, 1),
            Key::Enter => self.replace_selection(page, "\n"),
            Key::Left => self.move_caret(self.caret.saturating_sub(1), shift),
            Key::Right => self.move_caret((self.caret + 1).min(len), shift),
            Key::Up => self.move_caret(up.unwrap_or(0), shift),
            Key::Down => self.move_caret(down.unwrap_or(len), shift),
            Key::Home => self.move_caret(if action_mod { 0 } else { line_start }, shift),
            Key::End => self.move_caret(if action_mod { len } else { line_end }, shift),
            Key::Character(c) => {
                if action_mod && c.eq_ignore_ascii_case("a") {
                    self.anchor = 0;
                    self.caret = len;
                } else if action_mod {
                    return TextEditResult::NotHandled;
                } else {
                    self.replace_selection(page, c);
                }
            }
            Key::Tab | Key::Other(_) => return TextEditResult::NotHandled,
        }
        TextEditResult::Handled
    }

    pub fn mouse_pressed(&mut self, page: &Page, point: Point) {
        if let Some(text) = self.text(page) {
            let index = text.char_index_at(point);
            self.move_caret(index, false);
            self.dragging = true;
        }
    }

    pub fn mouse_moved(&mut self, page: &Page, point: Point) {
        if !self.dragging {
            return;
        }
        if let Some(text) = self.text(page) {
            let index = text.char_index_at(point);
            self.move_caret(index, true);
        }
    }

    pub fn mouse_released(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn selected_text(&self, page: &Page) -> Option<String> {
        let (start, end) = self.selection()?;
        let text = self.text(page)?;
        Some(text.content.chars().skip(start).take(end - start).collect())
    }

    pub fn copy(&self, page: &Page, host: &mut dyn ViewHost) {
        if let Some(selected) = self.selected_text(page) {
            host.set_clipboard_text(selected);
        }
    }

    pub fn cut(&mut self, page: &mut Page, host: &mut dyn ViewHost) {
        if let Some(selected) = self.selected_text(page) {
            host.set_clipboard_text(selected);
            self.replace_selection(page, "");
        }
    }

    pub fn paste(&mut self, page: &mut Page, host: &mut dyn ViewHost) {
        if let Some(clip) = host.clipboard_text() {
            self.replace_selection(page, &clip);
        }
    }

    /// End the edit and turn it into an undoable page change.
    ///
    /// A new text is inserted when non-empty and dropped otherwise. An
    /// existing text emptied by the edit is removed from its layer.
    pub fn finish(self, page: &mut Page) -> Option<UndoAction> {
        let layer_id = self.layer;
        match self.target {
            Target::New(text) => {
                if text.is_empty() {
                    return None;
                }
                let element = Element::Text(text);
                let index = page.layer_mut(layer_id)?.add_element(element.clone());
                Some(UndoAction::Insert(InsertAction {
                    layer: layer_id,
                    index,
                    element,
                }))
            }
            Target::Existing { id, original } => {
                let layer = page.layer_mut(layer_id)?;
                let content = layer.get(id)?.as_text()?.content.clone();
                if content.is_empty() {
                    let (index, element) = layer.remove_element(id)?;
                    let mut action = DeleteAction::new();
                    action.add_element(layer_id, index, element);
                    return Some(UndoAction::Delete(action));
                }
                (content != original).then_some(UndoAction::TextEdit(TextEditAction {
                    layer: layer_id,
                    id,
                    before: original,
                    after: content,
                }))
            }
        }
    }
}
