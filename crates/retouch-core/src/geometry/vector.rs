//! Line and vector helpers used by the crop widgets.

use super::matrix::Point;

/// Infinite line through two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub a: Point,
    pub b: Point,
}

impl Line {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }
}

pub fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Unit vector along `v`, or `None` for the zero vector.
pub fn normalize(v: Point) -> Option<Point> {
    let len = v.length();
    if len == 0.0 || !len.is_finite() {
        return None;
    }
    Some(Point::new(v.x / len, v.y / len))
}

/// Length of the projection of `a` onto `b`.
pub fn scalar_projection(a: Point, b: Point) -> Option<f64> {
    let len = b.length();
    if len == 0.0 {
        return None;
    }
    Some(dot(a, b) / len)
}

/// Vector from `point` to its foot on `line`.
///
/// Returns `None` when both line points coincide.
pub fn shortest_vector_to_line(point: Point, line: &Line) -> Option<Point> {
    let delta = line.b - line.a;
    let denom = dot(delta, delta);
    if denom == 0.0 {
        return None;
    }
    let u = dot(point - line.a, delta) / denom;
    let foot = Point::new(line.a.x + u * delta.x, line.a.y + u * delta.y);
    Some(foot - point)
}

/// Intersection of two infinite lines, `None` when they are parallel.
pub fn line_intersect(l1: &Line, l2: &Line) -> Option<Point> {
    let t0 = l1.a.x - l1.b.x;
    let t1 = l1.a.y - l1.b.y;
    let t2 = l1.b.x - l2.b.x;
    let t3 = l2.b.y - l1.b.y;
    let t4 = l2.a.x - l2.b.x;
    let t5 = l2.a.y - l2.b.y;

    let denom = t1 * t4 - t0 * t5;
    if denom == 0.0 {
        return None;
    }
    let u = (t3 * t4 + t5 * t2) / denom;
    Some(Point::new(l1.b.x + u * t0, l1.b.y + u * t1))
}

/// Distance from `point` to the segment between the line's two points.
pub fn distance_to_segment(point: Point, segment: &Line) -> f64 {
    let delta = segment.b - segment.a;
    let denom = dot(delta, delta);
    if denom == 0.0 {
        return point.distance(segment.a);
    }
    let u = (dot(point - segment.a, delta) / denom).clamp(0.0, 1.0);
    point.distance(Point::new(
        segment.a.x + u * delta.x,
        segment.a.y + u * delta.y,
    ))
}

/// Side of a closed polygon nearest to `point`.
///
/// `corners` is walked in order, the last corner closing back to the first.
/// Sides are measured as segments, so a point beyond a corner picks the
/// side it actually faces.
pub fn closest_side(point: Point, corners: &[Point]) -> Option<Line> {
    let n = corners.len();
    let mut best: Option<(f64, Line)> = None;
    for i in 0..n {
        let side = Line::new(corners[i], corners[(i + 1) % n]);
        if side.a == side.b {
            continue;
        }
        let mag = distance_to_segment(point, &side);
        if best.map_or(true, |(m, _)| mag < m) {
            best = Some((mag, side));
        }
    }
    best.map(|(_, side)| side)
}
