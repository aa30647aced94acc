//! Freehand stroke element.

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ElementId, SerializableColor};
use crate::geometry::{bounds_of, point_to_polyline_dist, segment_intersects_circle};

/// The drawing tool a stroke was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeTool {
    #[default]
    Pen,
    Highlighter,
    /// Whiteout strokes, painted in the page background color.
    Eraser,
}

/// An ordered polyline with an optional per-point width sequence.
///
/// When `widths` is non-empty it has exactly one entry per point; otherwise
/// the stroke is drawn with the uniform `width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: ElementId,
    points: Vec<Point>,
    #[serde(default)]
    widths: Vec<f64>,
    pub width: f64,
    pub color: SerializableColor,
    pub tool: StrokeTool,
    /// Set while an erase gesture owns a private copy of this stroke.
    #[serde(skip)]
    copied: bool,
}

impl Stroke {
    pub fn new(tool: StrokeTool, color: SerializableColor, width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            widths: Vec::new(),
            width,
            color,
            tool,
            copied: false,
        }
    }

    pub fn from_points(tool: StrokeTool, color: SerializableColor, width: f64, points: Vec<Point>) -> Self {
        let mut stroke = Self::new(tool, color, width);
        stroke.points = points;
        stroke
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn add_width(&mut self, width: f64) {
        self.widths.push(width);
    }

    /// Replace the final point, used by ruler mode to keep a two-point line.
    pub fn set_last_point(&mut self, point: Point) {
        if let Some(last) = self.points.last_mut() {
            *last = point;
        }
    }

    /// Replace the final width entry, if any.
    pub fn set_last_width(&mut self, width: f64) {
        if let Some(last) = self.widths.last_mut() {
            *last = width;
        }
    }

    pub fn clear_widths(&mut self) {
        self.widths.clear();
    }

    pub fn has_pressure(&self) -> bool {
        !self.widths.is_empty()
    }

    pub fn is_copied(&self) -> bool {
        self.copied
    }

    pub fn set_copied(&mut self, copied: bool) {
        self.copied = copied;
    }

    /// Release spare capacity once the stroke stops growing.
    pub fn free_unused(&mut self) {
        self.points.shrink_to_fit();
        self.widths.shrink_to_fit();
    }

    /// Widest width the stroke is ever drawn with.
    pub fn max_width(&self) -> f64 {
        self.widths.iter().copied().fold(self.width, f64::max)
    }

    /// Bounding box including half the line width on every side.
    pub fn bounds(&self) -> Rect {
        let half = self.max_width() / 2.0;
        bounds_of(&self.points)
            .map(|r| r.inflate(half, half))
            .unwrap_or(Rect::ZERO)
    }

    /// Precise hit test against a circle; returns the gap to the polyline.
    pub fn hit_gap(&self, center: Point, radius: f64) -> Option<f64> {
        let gap = point_to_polyline_dist(center, &self.points);
        (gap <= radius).then_some(gap)
    }

    pub fn intersects(&self, center: Point, radius: f64) -> bool {
        self.hit_gap(center, radius).is_some()
    }

    /// Cut this stroke at the last place it meets the circle.
    ///
    /// Points inside the circle are removed; a segment that merely crosses it
    /// is cut between its endpoints. `self` keeps the head. The tail is returned
    /// as a new stroke with a fresh id, or `None` when fewer than two points
    /// remain after the cut (or nothing was hit).
    pub fn split_on_last_intersect(&mut self, center: Point, radius: f64) -> Option<Stroke> {
        let inside = |p: Point| p.distance(center) <= radius;
        let mut cut = None;

        for i in (0..self.points.len()).rev() {
            if inside(self.points[i]) {
                let mut first = i;
                while first > 0 && inside(self.points[first - 1]) {
                    first -= 1;
                }
                cut = Some((first, i + 1));
                break;
            }
            if i > 0
                && !inside(self.points[i - 1])
                && segment_intersects_circle(self.points[i - 1], self.points[i], center, radius)
            {
                cut = Some((i, i));
                break;
            }
        }

        let (head_end, tail_start) = cut?;
        let tail_points = self.points.split_off(tail_start);
        self.points.truncate(head_end);
        let tail_widths = if self.widths.len() >= tail_start {
            let tail = self.widths.split_off(tail_start);
            self.widths.truncate(head_end);
            tail
        } else {
            Vec::new()
        };

        if tail_points.len() < 2 {
            return None;
        }

        Some(Stroke {
            id: Uuid::new_v4(),
            points: tail_points,
            widths: tail_widths,
            width: self.width,
            color: self.color,
            tool: self.tool,
            copied: false,
        })
    }

    pub fn transform(&mut self, affine: Affine) {
        for p in &mut self.points {
            *p = affine * *p;
        }
    }
}
