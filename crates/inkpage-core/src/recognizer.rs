//! Shape recognition applied to finished strokes.

use crate::elements::Stroke;
use crate::geometry::perpendicular_distance;

/// Replaces a freshly drawn stroke with an idealized shape.
pub trait ShapeRecognizer {
    /// Returns the recognized replacement, or `None` to keep the stroke.
    fn recognize(&mut self, stroke: &Stroke) -> Option<Stroke>;
}

/// Straightens strokes that are already nearly a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRecognizer {
    /// Largest allowed deviation as a fraction of the chord length.
    pub tolerance_ratio: f64,
    /// Chords shorter than this are never straightened.
    pub min_length: f64,
}

impl Default for LineRecognizer {
    fn default() -> Self {
        Self {
            tolerance_ratio: 0.04,
            min_length: 10.0,
        }
    }
}

impl ShapeRecognizer for LineRecognizer {
    fn recognize(&mut self, stroke: &Stroke) -> Option<Stroke> {
        let points = stroke.points();
        if points.len() < 3 {
            return None;
        }
        let (first, last) = (points[0], points[points.len() - 1]);
        let length = first.distance(last);
        if length < self.min_length {
            return None;
        }

        let max_deviation = points[1..points.len() - 1]
            .iter()
            .map(|p| perpendicular_distance(*p, first, last))
            .fold(0.0, f64::max);
        if max_deviation > length * self.tolerance_ratio {
            return None;
        }

        log::debug!("recognized line of length {length:.1}");
        Some(Stroke::from_points(stroke.tool, stroke.color, stroke.width, vec![first, last]))
    }
}
