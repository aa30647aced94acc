//! Hit-test primitives shared by the eraser, selection and text engines.

use kurbo::{Point, Rect, Vec2};

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
///
/// A single-point polyline degenerates to the distance to that point; an empty
/// one is infinitely far away.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Perpendicular distance from a point to the infinite line through two points.
pub fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;

    let line_len_sq = dx * dx + dy * dy;
    if line_len_sq < f64::EPSILON {
        return point.distance(line_start);
    }

    // Area of triangle * 2 / base = height
    let area2 = ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs();
    area2 / line_len_sq.sqrt()
}

/// Whether the segment a→b passes within `radius` of `center`.
pub fn segment_intersects_circle(a: Point, b: Point, center: Point, radius: f64) -> bool {
    point_to_segment_dist(center, a, b) <= radius
}

/// Axis-aligned square of side `2 * half` centered on `center`.
pub fn square_around(center: Point, half: f64) -> Rect {
    Rect::new(center.x - half, center.y - half, center.x + half, center.y + half)
}

/// Overlap test that also accepts touching edges and zero-width boxes.
///
/// `Rect::intersect` reports zero area for a perfectly vertical stroke, which
/// would make such strokes impossible to erase or select.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    let (a, b) = (a.abs(), b.abs());
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Whether `inner` lies entirely inside `outer`.
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    let (outer, inner) = (outer.abs(), inner.abs());
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Even-odd point-in-polygon test. The polygon is implicitly closed.
pub fn polygon_contains(polygon: &[Point], point: Point) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Bounding box of a point set, or `None` when empty.
pub fn bounds_of(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::from_points(*first, *first);
    for p in &points[1..] {
        rect = rect.union_pt(*p);
    }
    Some(rect)
}

/// The four corners of a rectangle, clockwise from the top-left.
pub fn rect_corners(rect: Rect) -> [Point; 4] {
    [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ]
}
