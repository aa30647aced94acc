//! Rubber-band selection, object picking and the editable selection.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::elements::{Element, ElementId};
use crate::geometry::{polygon_contains, rect_contains_rect, rect_corners};
use crate::host::Repaint;
use crate::page::Page;
use crate::undo::{TransformAction, UndoAction};

/// Handle hit tolerance in widget pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;
/// Distance from the top edge to the rotation handle, in widget pixels.
pub const ROTATE_HANDLE_OFFSET: f64 = 25.0;
/// Half the side of the square probed when picking a single object.
const OBJECT_MATCH_HALF: f64 = 10.0;
/// Stroke hit radius when picking a single object.
const OBJECT_STROKE_RADIUS: f64 = 20.0;
/// Smallest width or height a resize may produce.
const MIN_EXTENT: f64 = 1.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
    Rotate,
}

/// What dragging at a position of the selection would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditMode {
    Move,
    Handle(HandleKind),
}

/// Elements picked by a finished rubber band.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedElements {
    pub layer: usize,
    pub ids: Vec<ElementId>,
}

/// Ids of elements on the selected layer matching a predicate.
fn pick_on_selected_layer(page: &Page, matches: impl Fn(&Element) -> bool) -> Option<SelectedElements> {
    let layer_id = page.selected_layer_id();
    let layer = page.layer(layer_id)?;
    let ids: Vec<ElementId> = layer
        .elements()
        .iter()
        .filter(|e| matches(e))
        .map(Element::id)
        .collect();
    (!ids.is_empty()).then_some(SelectedElements { layer: layer_id, ids })
}

/// Axis-aligned rubber band.
#[derive(Debug, Clone, PartialEq)]
pub struct RectSelection {
    start: Point,
    current: Point,
}

impl RectSelection {
    pub fn new(start: Point) -> Self {
        Self { start, current: start }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }

    /// Elements whose bounds lie entirely inside the band.
    pub fn finalize(&self, page: &Page) -> Option<SelectedElements> {
        let rect = self.rect();
        pick_on_selected_layer(page, |e| rect_contains_rect(rect, e.bounds()))
    }
}

/// Freehand lasso, closed implicitly from the last point to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSelect {
    points: Vec<Point>,
}

impl RegionSelect {
    pub fn new(start: Point) -> Self {
        Self { points: vec![start] }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn contains_element(&self, element: &Element) -> bool {
        match element {
            Element::Stroke(s) => !s.points().is_empty() && s.points().iter().all(|p| polygon_contains(&self.points, *p)),
            _ => rect_corners(element.bounds())
                .iter()
                .all(|p| polygon_contains(&self.points, *p)),
        }
    }

    /// Elements lying entirely inside the lasso.
    pub fn finalize(&self, page: &Page) -> Option<SelectedElements> {
        if self.points.len() < 3 {
            return None;
        }
        pick_on_selected_layer(page, |e| self.contains_element(e))
    }
}

/// An in-progress rubber-band selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Rect(RectSelection),
    Region(RegionSelect),
}

impl Selector {
    /// Track the pointer. Only the overlay changes.
    pub fn current_pos(&mut self, point: Point) -> Repaint {
        match self {
            Selector::Rect(r) => r.current = point,
            Selector::Region(r) => {
                if r.points.last() != Some(&point) {
                    r.points.push(point);
                }
            }
        }
        Repaint::Overlay
    }

    pub fn finalize(&self, page: &Page) -> Option<SelectedElements> {
        match self {
            Selector::Rect(r) => r.finalize(page),
            Selector::Region(r) => r.finalize(page),
        }
    }

    /// Outline to draw, as a closed polygon.
    pub fn outline(&self) -> Vec<Point> {
        match self {
            Selector::Rect(r) => rect_corners(r.rect()).to_vec(),
            Selector::Region(r) => r.points.clone(),
        }
    }
}

/// Pick the element under a point on layers up to the selected one.
///
/// The nearest stroke within reach wins. Without a stroke, the last other
/// element in paint order whose bounds meet the probe square is picked; no
/// distance comparison is made among non-strokes.
pub fn find_object_at(page: &Page, point: Point) -> Option<(usize, ElementId)> {
    let area = Rect::new(
        point.x - OBJECT_MATCH_HALF,
        point.y - OBJECT_MATCH_HALF,
        point.x + OBJECT_MATCH_HALF,
        point.y + OBJECT_MATCH_HALF,
    );
    let top = page.selected_layer_id().min(page.layer_count());
    let mut stroke_match: Option<(f64, usize, ElementId)> = None;
    let mut other_match = None;

    for layer_id in 1..=top {
        let Some(layer) = page.layer(layer_id) else {
            continue;
        };
        for element in layer.elements().iter().filter(|e| e.intersects_area(area)) {
            match element {
                Element::Stroke(s) => {
                    if let Some(gap) = s.hit_gap(point, OBJECT_STROKE_RADIUS) {
                        if stroke_match.is_none_or(|(best, _, _)| gap < best) {
                            stroke_match = Some((gap, layer_id, s.id()));
                        }
                    }
                }
                _ => other_match = Some((layer_id, element.id())),
            }
        }
    }

    stroke_match.map(|(_, layer, id)| (layer, id)).or(other_match)
}

fn union_bounds<'a>(elements: impl Iterator<Item = &'a Element>) -> Option<Rect> {
    elements.map(Element::bounds).reduce(|a, b| a.union(b))
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveEdit {
    mode: EditMode,
    start: Point,
    start_bounds: Rect,
    originals: Vec<Element>,
    affine: Affine,
}

/// A committed selection that can be moved, resized and rotated.
///
/// Selected elements stay in their layer; an edit re-applies one transform to
/// snapshots taken when the edit started, so dragging never accumulates error.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSelection {
    layer: usize,
    ids: Vec<ElementId>,
    bounds: Rect,
    edit: Option<ActiveEdit>,
}

impl EditSelection {
    pub fn new(page: &Page, selected: SelectedElements) -> Option<Self> {
        let layer = page.layer(selected.layer)?;
        let bounds = union_bounds(selected.ids.iter().filter_map(|id| layer.get(*id)))?;
        Some(Self {
            layer: selected.layer,
            ids: selected.ids,
            bounds,
            edit: None,
        })
    }

    pub fn from_element(page: &Page, layer: usize, id: ElementId) -> Option<Self> {
        Self::new(page, SelectedElements { layer, ids: vec![id] })
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn edit_mode(&self) -> Option<EditMode> {
        self.edit.as_ref().map(|e| e.mode)
    }

    /// Handle positions in page coordinates at the given zoom.
    pub fn handles(&self, zoom: f64) -> Vec<(Point, HandleKind)> {
        let b = self.bounds;
        let c = b.center();
        vec![
            (Point::new(c.x, b.y0 - ROTATE_HANDLE_OFFSET / zoom), HandleKind::Rotate),
            (Point::new(b.x0, b.y0), HandleKind::Corner(Corner::TopLeft)),
            (Point::new(b.x1, b.y0), HandleKind::Corner(Corner::TopRight)),
            (Point::new(b.x0, b.y1), HandleKind::Corner(Corner::BottomLeft)),
            (Point::new(b.x1, b.y1), HandleKind::Corner(Corner::BottomRight)),
            (Point::new(c.x, b.y0), HandleKind::Edge(Edge::Top)),
            (Point::new(b.x1, c.y), HandleKind::Edge(Edge::Right)),
            (Point::new(c.x, b.y1), HandleKind::Edge(Edge::Bottom)),
            (Point::new(b.x0, c.y), HandleKind::Edge(Edge::Left)),
        ]
    }

    /// What a drag starting at a widget-space position would do.
    pub fn get_selection_type_for_pos(&self, widget: Point, zoom: f64) -> Option<EditMode> {
        let point = Point::new(widget.x / zoom, widget.y / zoom);
        let tolerance = HANDLE_HIT_TOLERANCE / zoom;
        for (position, kind) in self.handles(zoom) {
            if position.distance(point) <= tolerance {
                return Some(EditMode::Handle(kind));
            }
        }
        self.bounds
            .inflate(tolerance, tolerance)
            .contains(point)
            .then_some(EditMode::Move)
    }

    /// Start an edit at a page-space point.
    pub fn set_edit_mode(&mut self, page: &Page, mode: EditMode, point: Point) {
        let Some(layer) = page.layer(self.layer) else {
            return;
        };
        let originals: Vec<Element> = self.ids.iter().filter_map(|id| layer.get(*id)).cloned().collect();
        self.edit = Some(ActiveEdit {
            mode,
            start: point,
            start_bounds: self.bounds,
            originals,
            affine: Affine::IDENTITY,
        });
    }

    /// Drag the active edit to a page-space point.
    pub fn move_to(&mut self, page: &mut Page, point: Point) -> Repaint {
        let Some(edit) = self.edit.as_mut() else {
            return Repaint::None;
        };
        let Some(layer) = page.layer_mut(self.layer) else {
            return Repaint::None;
        };

        let affine = edit_transform(edit.mode, edit.start_bounds, edit.start, point);
        edit.affine = affine;

        let mut damage = self.bounds;
        for original in &edit.originals {
            let mut element = original.clone();
            element.transform(affine);
            damage = damage.union(element.bounds());
            layer.replace_element(element);
        }
        self.bounds = affine.transform_rect_bbox(edit.start_bounds);
        Repaint::Region(damage.union(self.bounds))
    }

    /// Finish the active edit, returning the undo action when anything moved.
    pub fn finalize_editing(&mut self, page: &Page) -> Option<UndoAction> {
        let edit = self.edit.take()?;
        let layer = page.layer(self.layer)?;
        if let Some(bounds) = union_bounds(self.ids.iter().filter_map(|id| layer.get(*id))) {
            self.bounds = bounds;
        }
        if edit.affine == Affine::IDENTITY {
            return None;
        }
        let after = self.ids.iter().filter_map(|id| layer.get(*id)).cloned().collect();
        Some(UndoAction::Transform(TransformAction {
            layer: self.layer,
            before: edit.originals,
            after,
        }))
    }
}

/// Transform produced by dragging a handle from `start` to `point`.
fn edit_transform(mode: EditMode, bounds: Rect, start: Point, point: Point) -> Affine {
    let delta = point - start;
    match mode {
        EditMode::Move => Affine::translate(delta),
        EditMode::Handle(HandleKind::Rotate) => {
            let center = bounds.center();
            let a0 = (start - center).atan2();
            let a1 = (point - center).atan2();
            Affine::rotate_about(a1 - a0, center)
        }
        EditMode::Handle(HandleKind::Corner(corner)) => {
            let (x0, y0, x1, y1) = match corner {
                Corner::TopLeft => (bounds.x0 + delta.x, bounds.y0 + delta.y, bounds.x1, bounds.y1),
                Corner::TopRight => (bounds.x0, bounds.y0 + delta.y, bounds.x1 + delta.x, bounds.y1),
                Corner::BottomLeft => (bounds.x0 + delta.x, bounds.y0, bounds.x1, bounds.y1 + delta.y),
                Corner::BottomRight => (bounds.x0, bounds.y0, bounds.x1 + delta.x, bounds.y1 + delta.y),
            };
            resize_transform(bounds, Rect::new(x0, y0, x1, y1))
        }
        EditMode::Handle(HandleKind::Edge(edge)) => {
            let target = match edge {
                Edge::Top => Rect::new(bounds.x0, bounds.y0 + delta.y, bounds.x1, bounds.y1),
                Edge::Bottom => Rect::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1 + delta.y),
                Edge::Left => Rect::new(bounds.x0 + delta.x, bounds.y0, bounds.x1, bounds.y1),
                Edge::Right => Rect::new(bounds.x0, bounds.y0, bounds.x1 + delta.x, bounds.y1),
            };
            resize_transform(bounds, target)
        }
    }
}

/// Map `from` onto `to`, with `to` normalized and kept at least `MIN_EXTENT` wide.
fn resize_transform(from: Rect, to: Rect) -> Affine {
    let to = to.abs();
    let sx = to.width().max(MIN_EXTENT) / from.width().max(MIN_EXTENT);
    let sy = to.height().max(MIN_EXTENT) / from.height().max(MIN_EXTENT);
    Affine::translate(Vec2::new(to.x0, to.y0))
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(Vec2::new(-from.x0, -from.y0))
}
