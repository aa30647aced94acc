//! Page and layer model.

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::elements::{Element, ElementId, Stroke};

/// An ordered stack of elements. Index order is paint order (back to front).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Elements in paint order.
    elements: Vec<Element>,
    /// Hidden layers are skipped when painting.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Result of making sure a stroke is private to the running erase gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedStroke {
    /// The stroke was already copied earlier in this gesture.
    Existing { index: usize },
    /// The stroke was swapped for a copy with a fresh id; `original` is the
    /// untouched stroke as it was before the gesture.
    Copied { index: usize, copy_id: ElementId, original: Stroke },
}

impl OwnedStroke {
    pub fn index(&self) -> usize {
        match self {
            OwnedStroke::Existing { index } | OwnedStroke::Copied { index, .. } => *index,
        }
    }
}

impl Layer {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            visible: true,
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element ids in paint order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(Element::id).collect()
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn element_at(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Append an element on top; returns its index.
    pub fn add_element(&mut self, element: Element) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Insert at `index`, clamped to the end of the layer.
    pub fn insert_element(&mut self, element: Element, index: usize) -> usize {
        let index = index.min(self.elements.len());
        self.elements.insert(index, element);
        index
    }

    /// Remove an element by id, returning where it was.
    pub fn remove_element(&mut self, id: ElementId) -> Option<(usize, Element)> {
        let index = self.index_of(id)?;
        Some((index, self.elements.remove(index)))
    }

    /// Swap the element with the same id for `element`.
    pub fn replace_element(&mut self, element: Element) -> Option<Element> {
        let index = self.index_of(element.id())?;
        Some(std::mem::replace(&mut self.elements[index], element))
    }

    /// Make the stroke `id` private to the current erase gesture.
    ///
    /// The first time a stroke is touched it is replaced in place by a copy
    /// flagged as copied and carrying a fresh id, so the original can be handed
    /// to the undo action untouched. Returns `None` if `id` is not a stroke here.
    pub fn ensure_owned_copy(&mut self, id: ElementId) -> Option<OwnedStroke> {
        let index = self.index_of(id)?;
        let stroke = self.elements[index].as_stroke_mut()?;
        if stroke.is_copied() {
            return Some(OwnedStroke::Existing { index });
        }

        let original = stroke.clone();
        let mut copy = original.clone();
        copy.id = uuid::Uuid::new_v4();
        copy.set_copied(true);
        let copy_id = copy.id();
        self.elements[index] = Element::Stroke(copy);
        Some(OwnedStroke::Copied { index, copy_id, original })
    }

    /// Clear erase ownership flags and release spare stroke storage.
    pub fn finish_erase(&mut self) {
        for element in &mut self.elements {
            if let Element::Stroke(stroke) = element {
                stroke.set_copied(false);
                stroke.free_unused();
            }
        }
    }
}

/// A page: a list of layers plus the currently selected layer.
///
/// Layers are addressed 1-based; a selected layer of 0 means no layer is
/// selected yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page width in page units.
    pub width: f64,
    /// Page height in page units.
    pub height: f64,
    /// Layers from bottom to top.
    layers: Vec<Layer>,
    /// 1-based selected layer, 0 when none.
    #[serde(default)]
    selected_layer: usize,
}

impl Page {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            selected_layer: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer by 1-based id.
    pub fn layer(&self, id: usize) -> Option<&Layer> {
        id.checked_sub(1).and_then(|i| self.layers.get(i))
    }

    /// Mutable layer by 1-based id.
    pub fn layer_mut(&mut self, id: usize) -> Option<&mut Layer> {
        id.checked_sub(1).and_then(|i| self.layers.get_mut(i))
    }

    /// Append a layer; returns its 1-based id.
    pub fn add_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len()
    }

    pub fn selected_layer_id(&self) -> usize {
        self.selected_layer
    }

    /// Select a layer; values beyond the layer count are clamped.
    pub fn set_selected_layer_id(&mut self, id: usize) {
        self.selected_layer = id.min(self.layers.len());
    }

    pub fn selected_layer(&self) -> Option<&Layer> {
        self.layer(self.selected_layer)
    }

    /// Make sure a layer is selected, creating layer 1 if the page has none.
    ///
    /// Returns the selected layer id and whether the selection had to change.
    pub fn ensure_selected_layer(&mut self) -> (usize, bool) {
        if self.selected_layer >= 1 {
            return (self.selected_layer, false);
        }
        if self.layers.is_empty() {
            self.layers.push(Layer::new());
        }
        self.selected_layer = 1;
        (1, true)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut page: Page = serde_json::from_str(json)?;
        page.selected_layer = page.selected_layer.min(page.layers.len());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{SerializableColor, StrokeTool};
    use kurbo::Point;

    fn stroke() -> Stroke {
        Stroke::from_points(
            StrokeTool::Pen,
            SerializableColor::black(),
            1.0,
            vec![Point::ZERO, Point::new(10.0, 0.0)],
        )
    }

    #[test]
    fn test_ensure_selected_layer_creates_layer() {
        let mut page = Page::new(100.0, 100.0);
        assert_eq!(page.selected_layer_id(), 0);
        assert_eq!(page.ensure_selected_layer(), (1, true));
        assert_eq!(page.layer_count(), 1);
        assert_eq!(page.ensure_selected_layer(), (1, false));
    }

    #[test]
    fn test_remove_absent_element_is_noop() {
        let mut layer = Layer::new();
        let (a, b) = (Element::Stroke(stroke()), Element::Stroke(stroke()));
        let (a_id, b_id) = (a.id(), b.id());
        layer.add_element(a);
        layer.add_element(b);

        assert!(layer.remove_element(a_id).is_some());
        assert!(layer.remove_element(a_id).is_none());
        assert_eq!(layer.element_ids(), vec![b_id]);
    }

    #[test]
    fn test_layer_ids_are_one_based() {
        let mut page = Page::new(100.0, 100.0);
        page.add_layer(Layer::new());
        assert!(page.layer(0).is_none());
        assert!(page.layer(1).is_some());
        assert!(page.layer(2).is_none());
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut layer = Layer::new();
        let index = layer.insert_element(stroke().into(), 10);
        assert_eq!(index, 0);
    }

    #[test]
    fn test_ensure_owned_copy_once() {
        let mut layer = Layer::new();
        let s = stroke();
        let id = s.id();
        layer.add_element(s.clone().into());

        let owned = layer.ensure_owned_copy(id).unwrap();
        let OwnedStroke::Copied { copy_id, original, .. } = owned else {
            panic!("expected a fresh copy");
        };
        assert_eq!(original, s);
        assert!(layer.get(id).is_none());
        assert!(matches!(
            layer.ensure_owned_copy(copy_id),
            Some(OwnedStroke::Existing { index: 0 })
        ));

        layer.finish_erase();
        let copy = layer.get(copy_id).and_then(Element::as_stroke).unwrap();
        assert!(!copy.is_copied());
    }

    #[test]
    fn test_page_json() {
        let mut page = Page::new(200.0, 300.0);
        let (layer_id, _) = page.ensure_selected_layer();
        page.layer_mut(layer_id).unwrap().add_element(stroke().into());
        let restored = Page::from_json(&page.to_json().unwrap()).unwrap();
        assert_eq!(restored, page);
    }
}
