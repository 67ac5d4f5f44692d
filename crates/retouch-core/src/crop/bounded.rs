//! An axis-aligned crop rectangle kept inside a rotated image rectangle.
//!
//! The inner rectangle lives in the straightened frame. The outer rectangle
//! is the bitmap, which appears rotated by the straighten angle in that
//! frame. Constraint checks map the inner corners back into bitmap space.

use crate::geometry::{
    closest_side, line_intersect, shortest_vector_to_line, Line, Matrix, Point, Rect,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BoundedRect {
    rot: f64,
    outer: Rect,
    inner: Rect,
    /// Inner corners in bitmap space.
    inner_rotated: [Point; 4],
}

impl BoundedRect {
    pub fn new(rotation: f64, outer: Rect, inner: Rect) -> Self {
        let mut bounded = Self {
            rot: rotation,
            outer,
            inner,
            inner_rotated: inner.corners(),
        };
        bounded.rotate_inner();
        if !bounded.is_constrained() {
            bounded.reconstrain();
        }
        bounded
    }

    pub fn reset_to(&mut self, rotation: f64, outer: Rect, inner: Rect) {
        *self = Self::new(rotation, outer, inner);
    }

    pub fn set_rotation(&mut self, rotation: f64) {
        if rotation == self.rot {
            return;
        }
        self.rot = rotation;
        self.set_inner(self.inner);
    }

    /// Replace the inner rectangle, shrinking it into bounds if needed.
    pub fn set_inner(&mut self, inner: Rect) {
        self.inner = inner;
        self.inner_rotated = inner.corners();
        self.rotate_inner();
        if !self.is_constrained() {
            self.reconstrain();
        }
    }

    pub fn rotation(&self) -> f64 {
        self.rot
    }

    pub fn inner(&self) -> Rect {
        self.inner
    }

    pub fn outer(&self) -> Rect {
        self.outer
    }

    /// Translate the inner rectangle, sliding it back along the outer
    /// sides it would cross.
    pub fn move_inner(&mut self, dx: f64, dy: f64) {
        let m0 = self.inverse_rot_matrix();
        let mut corners = self.inner.offset(dx, dy).corners();
        m0.map_points(&mut corners);
        let outer_corners = self.outer.corners();

        let mut correction = Point::default();
        for c in &corners {
            let corrected = *c + correction;
            if self.outer.contains_inclusive(corrected) {
                continue;
            }
            let vec = closest_side(corrected, &outer_corners)
                .and_then(|side| shortest_vector_to_line(corrected, &side));
            if let Some(v) = vec {
                correction = correction + v;
            }
        }
        // Second pass for corners still outside after the side corrections.
        for c in &corners {
            let corrected = *c + correction;
            if !self.outer.contains_inclusive(corrected) {
                correction = correction + (self.outer.clamp_point(corrected) - corrected);
            }
        }

        for c in corners.iter_mut() {
            *c = *c + correction;
        }
        self.inner_rotated = corners;
        self.reconstrain();
    }

    /// Resize to `new_inner`, stopping each escaping corner where its path
    /// meets the nearest outer side.
    pub fn resize_inner(&mut self, new_inner: Rect) {
        let m = self.rot_matrix();
        let m0 = self.inverse_rot_matrix();
        let mut outer_corners = self.outer.corners();
        m.map_points(&mut outer_corners);
        let old = self.inner.corners();
        let new = new_inner.corners();

        let mut ret = new_inner;
        for i in 0..4 {
            if self.outer.contains_inclusive(m0.map_point(new[i])) {
                continue;
            }
            let p = self.stop_point(new[i], old[i], &outer_corners);
            match i {
                0 => {
                    ret.left = ret.left.max(p.x);
                    ret.top = ret.top.max(p.y);
                }
                1 => {
                    ret.right = ret.right.min(p.x);
                    ret.top = ret.top.max(p.y);
                }
                2 => {
                    ret.right = ret.right.min(p.x);
                    ret.bottom = ret.bottom.min(p.y);
                }
                _ => {
                    ret.left = ret.left.max(p.x);
                    ret.bottom = ret.bottom.min(p.y);
                }
            }
        }

        let mut corners = ret.corners();
        m0.map_points(&mut corners);
        self.inner_rotated = corners;
        self.reconstrain();
    }

    /// Resize keeping the current aspect ratio. The corner shared by the old
    /// and new rectangles stays fixed; without one the call is a no-op.
    pub fn fixed_aspect_resize_inner(&mut self, new_inner: Rect) {
        let m = self.rot_matrix();
        let m0 = self.inverse_rot_matrix();
        let aspect = self.inner.width() / self.inner.height();
        let mut outer_corners = self.outer.corners();
        m.map_points(&mut outer_corners);
        let old = self.inner.corners();
        let new = new_inner.corners();

        let inner = self.inner;
        let fixed = if inner.top == new_inner.top {
            if inner.left == new_inner.left {
                Some(0)
            } else if inner.right == new_inner.right {
                Some(1)
            } else {
                None
            }
        } else if inner.bottom == new_inner.bottom {
            if inner.right == new_inner.right {
                Some(2)
            } else if inner.left == new_inner.left {
                Some(3)
            } else {
                None
            }
        } else {
            None
        };
        let Some(fixed) = fixed else {
            return;
        };

        let mut width = new_inner.width();
        for i in 0..4 {
            if i == fixed || self.outer.contains_inclusive(m0.map_point(new[i])) {
                continue;
            }
            let p = self.stop_point(new[i], old[i], &outer_corners);
            let anchor = old[fixed];
            let w = (anchor.x - p.x).abs();
            let h = (anchor.y - p.y).abs();
            let w = w.max(aspect * h);
            if w < width {
                width = w;
            }
        }
        let height = width / aspect;

        let mut ret = inner;
        match fixed {
            0 => {
                ret.right = ret.left + width;
                ret.bottom = ret.top + height;
            }
            1 => {
                ret.left = ret.right - width;
                ret.bottom = ret.top + height;
            }
            2 => {
                ret.left = ret.right - width;
                ret.top = ret.bottom - height;
            }
            _ => {
                ret.right = ret.left + width;
                ret.top = ret.bottom - height;
            }
        }

        let mut corners = ret.corners();
        m0.map_points(&mut corners);
        self.inner_rotated = corners;
        self.reconstrain();
    }

    /// Where a corner moving from `old` to `new` meets the nearest outer
    /// side. Parallel paths keep the old corner.
    fn stop_point(&self, new: Point, old: Point, outer_corners: &[Point; 4]) -> Point {
        closest_side(new, outer_corners)
            .and_then(|side| line_intersect(&Line::new(new, old), &side))
            .unwrap_or(old)
    }

    fn is_constrained(&self) -> bool {
        self.inner_rotated
            .iter()
            .all(|c| self.outer.contains_inclusive(*c))
    }

    fn reconstrain(&mut self) {
        for c in self.inner_rotated.iter_mut() {
            *c = self.outer.clamp_point(*c);
        }
        let mut unrotated = self.inner_rotated;
        self.rot_matrix().map_points(&mut unrotated);
        self.inner = Rect::from_points(&unrotated);
    }

    fn rotate_inner(&mut self) {
        let m = self.inverse_rot_matrix();
        m.map_points(&mut self.inner_rotated);
    }

    fn rot_matrix(&self) -> Matrix {
        let c = self.outer.center();
        Matrix::rotation_about(self.rot, c.x, c.y)
    }

    fn inverse_rot_matrix(&self) -> Matrix {
        let c = self.outer.center();
        Matrix::rotation_about(-self.rot, c.x, c.y)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn inside(outer: &Rect, inner: &Rect) -> bool {
        inner.left >= outer.left - 1e-6
            && inner.top >= outer.top - 1e-6
            && inner.right <= outer.right + 1e-6
            && inner.bottom <= outer.bottom + 1e-6
    }

    proptest! {
        #[test]
        fn prop_unrotated_move_stays_inside(
            dx in -500.0f64..500.0,
            dy in -500.0f64..500.0,
        ) {
            let outer = Rect::from_size(300.0, 200.0);
            let mut b = BoundedRect::new(0.0, outer, Rect::new(100.0, 50.0, 200.0, 150.0));
            b.move_inner(dx, dy);
            prop_assert!(inside(&outer, &b.inner()), "{:?}", b.inner());
        }

        #[test]
        fn prop_unrotated_resize_stays_inside(
            l in -200.0f64..150.0,
            t in -200.0f64..100.0,
            r in 151.0f64..600.0,
            bo in 101.0f64..500.0,
        ) {
            let outer = Rect::from_size(300.0, 200.0);
            let mut b = BoundedRect::new(0.0, outer, Rect::new(100.0, 50.0, 200.0, 150.0));
            b.resize_inner(Rect::new(l, t, r, bo));
            prop_assert!(inside(&outer, &b.inner()), "{:?}", b.inner());
        }
    }
}
