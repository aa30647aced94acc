//! Reversible page edits and the bounded undo history.

use thiserror::Error;

use crate::elements::{Element, ElementId, Stroke};
use crate::page::{Layer, Page};

/// Maximum number of undo steps to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Errors raised when an action no longer matches the page it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("Layer {0} does not exist")]
    MissingLayer(usize),
    #[error("Element {0} not found on layer {1}")]
    MissingElement(ElementId, usize),
}

/// Result type for undo operations.
pub type UndoResult<T> = Result<T, UndoError>;

fn layer_mut(page: &mut Page, layer: usize) -> UndoResult<&mut Layer> {
    page.layer_mut(layer).ok_or(UndoError::MissingLayer(layer))
}

fn take(layer: &mut Layer, layer_id: usize, id: ElementId) -> UndoResult<(usize, Element)> {
    layer
        .remove_element(id)
        .ok_or(UndoError::MissingElement(id, layer_id))
}

/// One element was added to a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertAction {
    pub layer: usize,
    pub index: usize,
    pub element: Element,
}

impl InsertAction {
    fn undo(&self, page: &mut Page) -> UndoResult<()> {
        let layer = layer_mut(page, self.layer)?;
        take(layer, self.layer, self.element.id())?;
        Ok(())
    }

    fn redo(&self, page: &mut Page) -> UndoResult<()> {
        layer_mut(page, self.layer)?.insert_element(self.element.clone(), self.index);
        Ok(())
    }
}

/// A removed element and where it sat.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedElement {
    pub layer: usize,
    pub index: usize,
    pub element: Element,
}

/// Whole elements removed from one or more layers, in removal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteAction {
    entries: Vec<DeletedElement>,
}

impl DeleteAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, layer: usize, index: usize, element: Element) {
        self.entries.push(DeletedElement { layer, index, element });
    }

    pub fn entries(&self) -> &[DeletedElement] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn undo(&self, page: &mut Page) -> UndoResult<()> {
        for entry in self.entries.iter().rev() {
            layer_mut(page, entry.layer)?.insert_element(entry.element.clone(), entry.index);
        }
        Ok(())
    }

    fn redo(&self, page: &mut Page) -> UndoResult<()> {
        for entry in &self.entries {
            let layer = layer_mut(page, entry.layer)?;
            take(layer, entry.layer, entry.element.id())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ErasedLayer {
    layer: usize,
    /// Element ids in paint order before the gesture touched this layer.
    before: Vec<ElementId>,
    /// Untouched originals with their index in `before`.
    originals: Vec<(usize, Stroke)>,
    /// Ids of the copies and fragments the gesture left behind.
    edited: Vec<ElementId>,
    /// Edited elements as they stood when the gesture ended, by final index.
    after: Vec<(usize, Element)>,
}

/// The net effect of one split-mode erase gesture.
///
/// Each touched stroke is recorded once, as it was before the gesture. The
/// surviving pieces are captured when the gesture is sealed, so undo and redo
/// restore exact paint order on every layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EraseAction {
    layers: Vec<ErasedLayer>,
}

impl EraseAction {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, layer_id: usize) -> Option<&mut ErasedLayer> {
        self.layers.iter_mut().find(|l| l.layer == layer_id)
    }

    /// Snapshot a layer's order the first time the gesture touches it.
    pub fn track_layer(&mut self, layer_id: usize, layer: &Layer) {
        if self.entry(layer_id).is_none() {
            self.layers.push(ErasedLayer {
                layer: layer_id,
                before: layer.element_ids(),
                originals: Vec::new(),
                edited: Vec::new(),
                after: Vec::new(),
            });
        }
    }

    pub fn add_original(&mut self, layer_id: usize, original: Stroke) {
        if let Some(entry) = self.entry(layer_id) {
            let index = entry
                .before
                .iter()
                .position(|id| *id == original.id())
                .unwrap_or(entry.before.len());
            entry.originals.push((index, original));
        }
    }

    pub fn add_edited(&mut self, layer_id: usize, id: ElementId) {
        if let Some(entry) = self.entry(layer_id) {
            if !entry.edited.contains(&id) {
                entry.edited.push(id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.originals.is_empty())
    }

    /// Capture the surviving pieces once the gesture is over.
    pub fn seal(&mut self, page: &Page) {
        for entry in &mut self.layers {
            entry.originals.sort_by_key(|(index, _)| *index);
            entry.after = match page.layer(entry.layer) {
                Some(layer) => {
                    let mut after: Vec<(usize, Element)> = entry
                        .edited
                        .iter()
                        .filter_map(|id| layer.index_of(*id).map(|i| (i, layer.elements()[i].clone())))
                        .collect();
                    after.sort_by_key(|(index, _)| *index);
                    after
                }
                None => Vec::new(),
            };
        }
    }

    fn undo(&self, page: &mut Page) -> UndoResult<()> {
        for entry in &self.layers {
            let layer = layer_mut(page, entry.layer)?;
            for (_, element) in &entry.after {
                take(layer, entry.layer, element.id())?;
            }
            for (index, original) in &entry.originals {
                layer.insert_element(Element::Stroke(original.clone()), *index);
            }
        }
        Ok(())
    }

    fn redo(&self, page: &mut Page) -> UndoResult<()> {
        for entry in &self.layers {
            let layer = layer_mut(page, entry.layer)?;
            for (_, original) in &entry.originals {
                take(layer, entry.layer, original.id())?;
            }
            for (index, element) in &entry.after {
                layer.insert_element(element.clone(), *index);
            }
        }
        Ok(())
    }
}

/// A drawn stroke was replaced by a recognized shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerAction {
    pub layer: usize,
    pub original: Stroke,
    pub recognized: Stroke,
}

impl RecognizerAction {
    fn swap(page: &mut Page, layer_id: usize, out: &Stroke, into: &Stroke) -> UndoResult<()> {
        let layer = layer_mut(page, layer_id)?;
        let (index, _) = take(layer, layer_id, out.id())?;
        layer.insert_element(Element::Stroke(into.clone()), index);
        Ok(())
    }
}

/// Selected elements were moved, resized or rotated.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformAction {
    pub layer: usize,
    pub before: Vec<Element>,
    pub after: Vec<Element>,
}

impl TransformAction {
    fn apply(page: &mut Page, layer_id: usize, elements: &[Element]) -> UndoResult<()> {
        let layer = layer_mut(page, layer_id)?;
        for element in elements {
            layer
                .replace_element(element.clone())
                .ok_or(UndoError::MissingElement(element.id(), layer_id))?;
        }
        Ok(())
    }
}

/// The content of an existing text element changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditAction {
    pub layer: usize,
    pub id: ElementId,
    pub before: String,
    pub after: String,
}

impl TextEditAction {
    fn apply(page: &mut Page, layer_id: usize, id: ElementId, content: &str) -> UndoResult<()> {
        let text = layer_mut(page, layer_id)?
            .get_mut(id)
            .and_then(Element::as_text_mut)
            .ok_or(UndoError::MissingElement(id, layer_id))?;
        text.content = content.to_string();
        Ok(())
    }
}

/// A reversible page edit.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    Insert(InsertAction),
    Delete(DeleteAction),
    Erase(EraseAction),
    Recognizer(RecognizerAction),
    Transform(TransformAction),
    TextEdit(TextEditAction),
}

impl UndoAction {
    pub fn name(&self) -> &'static str {
        match self {
            UndoAction::Insert(_) => "insert",
            UndoAction::Delete(_) => "delete",
            UndoAction::Erase(_) => "erase",
            UndoAction::Recognizer(_) => "recognize shape",
            UndoAction::Transform(_) => "transform",
            UndoAction::TextEdit(_) => "edit text",
        }
    }

    pub fn undo(&self, page: &mut Page) -> UndoResult<()> {
        match self {
            UndoAction::Insert(a) => a.undo(page),
            UndoAction::Delete(a) => a.undo(page),
            UndoAction::Erase(a) => a.undo(page),
            UndoAction::Recognizer(a) => RecognizerAction::swap(page, a.layer, &a.recognized, &a.original),
            UndoAction::Transform(a) => TransformAction::apply(page, a.layer, &a.before),
            UndoAction::TextEdit(a) => TextEditAction::apply(page, a.layer, a.id, &a.before),
        }
    }

    pub fn redo(&self, page: &mut Page) -> UndoResult<()> {
        match self {
            UndoAction::Insert(a) => a.redo(page),
            UndoAction::Delete(a) => a.redo(page),
            UndoAction::Erase(a) => a.redo(page),
            UndoAction::Recognizer(a) => RecognizerAction::swap(page, a.layer, &a.original, &a.recognized),
            UndoAction::Transform(a) => TransformAction::apply(page, a.layer, &a.after),
            UndoAction::TextEdit(a) => TextEditAction::apply(page, a.layer, a.id, &a.after),
        }
    }
}

/// Undo and redo stacks. Pushing a new action clears the redo stack.
#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    undo_stack: Vec<UndoAction>,
    redo_stack: Vec<UndoAction>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: UndoAction) {
        log::debug!("undo: recorded {}", action.name());
        self.undo_stack.push(action);
        self.redo_stack.clear();

        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last action. Returns `Ok(false)` when there is nothing to undo.
    /// An action that fails to apply is dropped.
    pub fn undo(&mut self, page: &mut Page) -> UndoResult<bool> {
        let Some(action) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = action.undo(page) {
            log::warn!("undo of {} failed: {err}", action.name());
            return Err(err);
        }
        self.redo_stack.push(action);
        Ok(true)
    }

    /// Redo the last undone action. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, page: &mut Page) -> UndoResult<bool> {
        let Some(action) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = action.redo(page) {
            log::warn!("redo of {} failed: {err}", action.name());
            return Err(err);
        }
        self.undo_stack.push(action);
        Ok(true)
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn last(&self) -> Option<&UndoAction> {
        self.undo_stack.last()
    }
}
