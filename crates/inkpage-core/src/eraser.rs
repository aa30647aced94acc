//! Eraser engine: removes or cuts strokes under the eraser.

use kurbo::Point;

use crate::elements::ElementId;
use crate::geometry::square_around;
use crate::host::Repaint;
use crate::page::{OwnedStroke, Page};
use crate::tools::{EraserMode, EraserTool};
use crate::undo::{DeleteAction, EraseAction, UndoAction};

/// State of one erase gesture, from button press to release.
///
/// The gesture accumulates exactly one undo action, which becomes visible to
/// the history only when [`EraseGesture::finish`] seals it.
#[derive(Debug, Clone)]
pub struct EraseGesture {
    mode: EraserMode,
    radius: f64,
    delete: DeleteAction,
    erase: EraseAction,
}

impl EraseGesture {
    /// Whiteout is drawn rather than erased, so it is treated as standard mode here.
    pub fn new(tool: EraserTool) -> Self {
        Self {
            mode: tool.mode,
            radius: tool.radius,
            delete: DeleteAction::new(),
            erase: EraseAction::new(),
        }
    }

    /// Erase at a page-space point on every layer up to the selected one.
    pub fn erase(&mut self, page: &mut Page, center: Point) -> Repaint {
        let area = square_around(center, self.radius);
        let top = page.selected_layer_id().min(page.layer_count());
        let mut repaint = Repaint::None;

        for layer_id in 1..=top {
            let Some(layer) = page.layer(layer_id) else {
                continue;
            };
            let hits: Vec<ElementId> = layer
                .elements()
                .iter()
                .filter(|e| e.intersects_area(area))
                .filter_map(|e| e.as_stroke())
                .filter(|s| s.hit_gap(center, self.radius).is_some())
                .map(|s| s.id())
                .collect();
            if hits.is_empty() {
                continue;
            }
            log::trace!("eraser hit {} strokes on layer {layer_id}", hits.len());

            match self.mode {
                EraserMode::DeleteStroke => {
                    for id in hits {
                        repaint = repaint.merge(self.delete_stroke(page, layer_id, id));
                    }
                }
                EraserMode::Standard | EraserMode::Whiteout => {
                    self.erase.track_layer(layer_id, layer);
                    for id in hits {
                        repaint = repaint.merge(self.split_stroke(page, layer_id, id, center));
                    }
                }
            }
        }
        repaint
    }

    fn delete_stroke(&mut self, page: &mut Page, layer_id: usize, id: ElementId) -> Repaint {
        let Some(layer) = page.layer_mut(layer_id) else {
            return Repaint::None;
        };
        match layer.remove_element(id) {
            Some((index, element)) => {
                let bounds = element.bounds();
                self.delete.add_element(layer_id, index, element);
                Repaint::Region(bounds)
            }
            None => Repaint::None,
        }
    }

    /// Cut the stroke `id` at the eraser. The cut-off tail goes in at the
    /// stroke's own index, so it paints below the remaining head.
    fn split_stroke(&mut self, page: &mut Page, layer_id: usize, id: ElementId, center: Point) -> Repaint {
        let Some(layer) = page.layer_mut(layer_id) else {
            return Repaint::None;
        };
        let Some(owned) = layer.ensure_owned_copy(id) else {
            return Repaint::None;
        };
        let index = owned.index();
        if let OwnedStroke::Copied { copy_id, original, .. } = owned {
            self.erase.add_original(layer_id, original);
            self.erase.add_edited(layer_id, copy_id);
        }

        let Some(stroke) = layer.element_at_mut(index).and_then(|e| e.as_stroke_mut()) else {
            return Repaint::None;
        };
        let stroke_id = stroke.id();
        let bounds = stroke.bounds();
        let tail = stroke.split_on_last_intersect(center, self.radius);
        let head_len = stroke.point_count();

        if let Some(mut tail) = tail {
            tail.set_copied(true);
            self.erase.add_edited(layer_id, tail.id());
            layer.insert_element(tail.into(), index);
        }
        if head_len < 2 {
            layer.remove_element(stroke_id);
        }
        Repaint::Region(bounds)
    }

    /// End the gesture: clear erase bookkeeping on every stroke of the page
    /// and hand back the undo action, if anything was erased.
    pub fn finish(mut self, page: &mut Page) -> Option<UndoAction> {
        for layer_id in 1..=page.layer_count() {
            if let Some(layer) = page.layer_mut(layer_id) {
                layer.finish_erase();
            }
        }

        match self.mode {
            EraserMode::DeleteStroke => (!self.delete.is_empty()).then_some(UndoAction::Delete(self.delete)),
            EraserMode::Standard | EraserMode::Whiteout => {
                self.erase.seal(page);
                (!self.erase.is_empty()).then_some(UndoAction::Erase(self.erase))
            }
        }
    }
}
