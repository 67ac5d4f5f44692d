//! 2-D affine matrices, points and rectangles.
//!
//! # Conventions
//!
//! - The y axis grows downward (screen and bitmap coordinates).
//! - Positive angles rotate counter-clockwise on screen.
//! - Composition reads left to right: `a.then(b)` applies `a` first.

use serde::{Deserialize, Serialize};

/// A point in bitmap, view or normalized space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn approx_eq(self, other: Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle stored as edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    pub fn is_empty(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Scale every edge about the origin.
    pub fn scale(&self, factor: f64) -> Rect {
        Rect::new(
            self.left * factor,
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
        )
    }

    /// Smallest integer rectangle that contains this one.
    pub fn round_out(&self) -> Rect {
        Rect::new(
            self.left.floor(),
            self.top.floor(),
            self.right.ceil(),
            self.bottom.ceil(),
        )
    }

    /// Corners in top-left, top-right, bottom-right, bottom-left order.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    /// Axis-aligned bounds of a set of points.
    pub fn from_points(points: &[Point]) -> Rect {
        let mut r = Rect::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for p in points {
            r.left = r.left.min(p.x);
            r.top = r.top.min(p.y);
            r.right = r.right.max(p.x);
            r.bottom = r.bottom.max(p.y);
        }
        r
    }

    /// Containment including the edges.
    pub fn contains_inclusive(&self, p: Point) -> bool {
        !(p.x > self.right || p.x < self.left || p.y > self.bottom || p.y < self.top)
    }

    /// Clamp a point onto this rectangle.
    pub fn clamp_point(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.left, self.right),
            p.y.clamp(self.top, self.bottom),
        )
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    pub fn approx_eq(&self, other: &Rect, eps: f64) -> bool {
        (self.left - other.left).abs() <= eps
            && (self.top - other.top).abs() <= eps
            && (self.right - other.right).abs() <= eps
            && (self.bottom - other.bottom).abs() <= eps
    }
}

/// Affine transform `x' = sx*x + kx*y + tx`, `y' = ky*x + sy*y + ty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub sx: f64,
    pub kx: f64,
    pub tx: f64,
    pub ky: f64,
    pub sy: f64,
    pub ty: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

/// Determinants below this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

impl Matrix {
    pub const fn identity() -> Self {
        Self {
            sx: 1.0,
            kx: 0.0,
            tx: 0.0,
            ky: 0.0,
            sy: 1.0,
            ty: 0.0,
        }
    }

    pub const fn translation(dx: f64, dy: f64) -> Self {
        Self {
            sx: 1.0,
            kx: 0.0,
            tx: dx,
            ky: 0.0,
            sy: 1.0,
            ty: dy,
        }
    }

    pub const fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            sx,
            kx: 0.0,
            tx: 0.0,
            ky: 0.0,
            sy,
            ty: 0.0,
        }
    }

    /// Counter-clockwise rotation about the origin.
    pub fn rotation(degrees: f64) -> Self {
        let (sin, cos) = sin_cos_degrees(degrees);
        Self {
            sx: cos,
            kx: sin,
            tx: 0.0,
            ky: -sin,
            sy: cos,
            ty: 0.0,
        }
    }

    /// Counter-clockwise rotation about `(px, py)`.
    pub fn rotation_about(degrees: f64, px: f64, py: f64) -> Self {
        Self::translation(-px, -py)
            .then(Self::rotation(degrees))
            .then(Self::translation(px, py))
    }

    /// Apply `self`, then `next`.
    pub fn then(self, next: Matrix) -> Matrix {
        Matrix {
            sx: next.sx * self.sx + next.kx * self.ky,
            kx: next.sx * self.kx + next.kx * self.sy,
            tx: next.sx * self.tx + next.kx * self.ty + next.tx,
            ky: next.ky * self.sx + next.sy * self.ky,
            sy: next.ky * self.kx + next.sy * self.sy,
            ty: next.ky * self.tx + next.sy * self.ty + next.ty,
        }
    }

    pub fn post_translate(self, dx: f64, dy: f64) -> Matrix {
        self.then(Matrix::translation(dx, dy))
    }

    pub fn post_scale(self, sx: f64, sy: f64) -> Matrix {
        self.then(Matrix::scaling(sx, sy))
    }

    /// Scale about a pivot after this transform.
    pub fn post_scale_about(self, sx: f64, sy: f64, px: f64, py: f64) -> Matrix {
        self.post_translate(-px, -py)
            .post_scale(sx, sy)
            .post_translate(px, py)
    }

    pub fn post_rotate(self, degrees: f64) -> Matrix {
        self.then(Matrix::rotation(degrees))
    }

    pub fn determinant(&self) -> f64 {
        self.sx * self.sy - self.kx * self.ky
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix {
            sx: self.sy * inv,
            kx: -self.kx * inv,
            tx: (self.kx * self.ty - self.sy * self.tx) * inv,
            ky: -self.ky * inv,
            sy: self.sx * inv,
            ty: (self.ky * self.tx - self.sx * self.ty) * inv,
        })
    }

    pub fn map_point(&self, p: Point) -> Point {
        Point::new(
            self.sx * p.x + self.kx * p.y + self.tx,
            self.ky * p.x + self.sy * p.y + self.ty,
        )
    }

    /// Map a displacement (translation ignored).
    pub fn map_vector(&self, v: Point) -> Point {
        Point::new(self.sx * v.x + self.kx * v.y, self.ky * v.x + self.sy * v.y)
    }

    pub fn map_points(&self, points: &mut [Point]) {
        for p in points.iter_mut() {
            *p = self.map_point(*p);
        }
    }

    /// Axis-aligned bounds of the mapped corners.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        let mut corners = r.corners();
        self.map_points(&mut corners);
        Rect::from_points(&corners)
    }

    /// Map a distance: geometric mean of the mapped unit axes.
    pub fn map_radius(&self, radius: f64) -> f64 {
        let d0 = self.map_vector(Point::new(radius, 0.0)).length();
        let d1 = self.map_vector(Point::new(0.0, radius)).length();
        (d0 * d1).sqrt()
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        self.approx_eq(&Matrix::identity(), eps)
    }

    pub fn approx_eq(&self, other: &Matrix, eps: f64) -> bool {
        (self.sx - other.sx).abs() <= eps
            && (self.kx - other.kx).abs() <= eps
            && (self.tx - other.tx).abs() <= eps
            && (self.ky - other.ky).abs() <= eps
            && (self.sy - other.sy).abs() <= eps
            && (self.ty - other.ty).abs() <= eps
    }

    /// Coefficients as `[sx, kx, tx, ky, sy, ty]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.sx, self.kx, self.tx, self.ky, self.sy, self.ty]
    }
}

/// Sine and cosine of an angle in degrees, exact for multiples of 90.
fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 {
        (0.0, 1.0)
    } else if normalized == 90.0 {
        (1.0, 0.0)
    } else if normalized == 180.0 {
        (0.0, -1.0)
    } else if normalized == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_rotation_90_is_counter_clockwise() {
        // Right of center moves up on screen (y grows downward).
        let m = Matrix::rotation(90.0);
        let p = m.map_point(Point::new(1.0, 0.0));
        assert!(p.approx_eq(Point::new(0.0, -1.0), EPS), "got {:?}", p);
    }

    #[test]
    fn test_rotation_360_is_identity() {
        assert!(Matrix::rotation(360.0).is_identity(EPS));
        assert!(Matrix::rotation(-720.0).is_identity(EPS));
    }

    #[test]
    fn test_then_applies_left_first() {
        let m = Matrix::translation(10.0, 0.0).then(Matrix::scaling(2.0, 2.0));
        let p = m.map_point(Point::new(1.0, 1.0));
        assert!(p.approx_eq(Point::new(22.0, 2.0), EPS));
    }

    #[test]
    fn test_invert_round_trip() {
        let m = Matrix::rotation_about(17.0, 40.0, 30.0)
            .post_scale(1.5, 1.5)
            .post_translate(-3.0, 8.0);
        let inv = m.invert().expect("invertible");
        let p = Point::new(12.5, -4.25);
        assert!(inv.map_point(m.map_point(p)).approx_eq(p, EPS));
        assert!(m.then(inv).is_identity(EPS));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        assert!(Matrix::scaling(0.0, 1.0).invert().is_none());
        assert!(Matrix::scaling(f64::NAN, 1.0).invert().is_none());
    }

    #[test]
    fn test_map_rect_bounds_rotated_corners() {
        let r = Rect::new(-2.0, -1.0, 2.0, 1.0);
        let mapped = Matrix::rotation(90.0).map_rect(&r);
        assert!(mapped.approx_eq(&Rect::new(-1.0, -2.0, 1.0, 2.0), EPS));
    }

    #[test]
    fn test_map_radius_uses_mean_scale() {
        let m = Matrix::scaling(2.0, 8.0);
        assert!((m.map_radius(1.0) - 4.0).abs() < EPS);
        assert!((Matrix::rotation(33.0).map_radius(5.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_rect_round_out_and_intersect() {
        let r = Rect::new(0.2, 0.7, 9.1, 4.0).round_out();
        assert_eq!(r, Rect::new(0.0, 0.0, 10.0, 4.0));

        let a = Rect::from_size(10.0, 10.0);
        assert_eq!(
            a.intersect(&Rect::new(5.0, 5.0, 20.0, 20.0)),
            Some(Rect::new(5.0, 5.0, 10.0, 10.0))
        );
        assert_eq!(a.intersect(&Rect::new(11.0, 0.0, 12.0, 1.0)), None);
    }
}
