//! Interactive crop editing driven by drag gestures.
//!
//! The engine works in the straightened frame: bitmap pixels with the fine
//! straighten rotation applied. Screen points come in through the inverse of
//! the geometry-to-screen matrix computed without straighten, so the crop
//! rectangle stays axis-aligned on screen while the image rotates under it.
//!
//! Distances configured in screen pixels (touch tolerance, minimum side) are
//! mapped through that inverse so they look the same at any zoom.

use super::bounded::BoundedRect;
use super::edges::Edges;
use crate::config::EditorConfig;
use crate::error::DomainError;
use crate::geometry::{
    distance_to_segment, full_geometry_to_screen_matrix, normalize, scalar_projection,
    GeometryState, Line, Matrix, NormalizedRect, Point, Rect,
};

/// Gesture state of the crop engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        edges: Edges,
        /// Last pointer position in the straightened frame.
        last: Point,
        /// Bounds at drag start, restored on cancel.
        snapshot: BoundedRect,
    },
}

#[derive(Debug, Clone)]
pub struct CropEngine {
    geometry: GeometryState,
    bitmap_w: u32,
    bitmap_h: u32,
    view_w: u32,
    view_h: u32,
    display_scale: f64,
    touch_tolerance: f64,
    min_crop_side: f64,
    bounds: BoundedRect,
    aspect: Option<(f64, f64)>,
    image_to_screen: Matrix,
    crop_to_screen: Matrix,
    screen_to_crop: Matrix,
    state: DragState,
}

fn check_dimensions(width: u32, height: u32) -> Result<(), DomainError> {
    if width == 0 || height == 0 {
        return Err(DomainError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Largest rectangle of aspect `w:h` centered inside `r`.
pub fn fix_aspect_ratio(r: &Rect, w: f64, h: f64) -> Rect {
    let scale = (r.width() / w).min(r.height() / h);
    let c = r.center();
    let (hw, hh) = (scale * w / 2.0, scale * h / 2.0);
    Rect::new(c.x - hw, c.y - hh, c.x + hw, c.y + hh)
}

/// Move one corner by `(dx, dy)` keeping the opposite corner in place.
fn fixed_corner_resize(r: &Rect, corner: Edges, dx: f64, dy: f64) -> Option<Rect> {
    let (w, h) = (r.width(), r.height());
    match corner {
        Edges::BOTTOM_RIGHT => Some(Rect::new(r.left, r.top, r.left + w + dx, r.top + h + dy)),
        Edges::BOTTOM_LEFT => Some(Rect::new(r.right - w + dx, r.top, r.right, r.top + h + dy)),
        Edges::TOP_LEFT => Some(Rect::new(
            r.right - w + dx,
            r.bottom - h + dy,
            r.right,
            r.bottom,
        )),
        Edges::TOP_RIGHT => Some(Rect::new(r.left, r.bottom - h + dy, r.left + w + dx, r.bottom)),
        _ => None,
    }
}

impl CropEngine {
    pub fn new(
        geometry: GeometryState,
        bitmap_w: u32,
        bitmap_h: u32,
        view_w: u32,
        view_h: u32,
        config: &EditorConfig,
    ) -> Result<Self, DomainError> {
        check_dimensions(bitmap_w, bitmap_h)?;
        check_dimensions(view_w, view_h)?;

        let (bw, bh) = (f64::from(bitmap_w), f64::from(bitmap_h));
        let bounds = BoundedRect::new(
            geometry.straighten,
            Rect::from_size(bw, bh),
            geometry.crop.to_pixels(bw, bh),
        );
        let mut engine = Self {
            geometry,
            bitmap_w,
            bitmap_h,
            view_w,
            view_h,
            display_scale: config.crop_display_scale,
            touch_tolerance: config.touch_tolerance,
            min_crop_side: config.min_crop_side,
            bounds,
            aspect: None,
            image_to_screen: Matrix::identity(),
            crop_to_screen: Matrix::identity(),
            screen_to_crop: Matrix::identity(),
            state: DragState::Idle,
        };
        engine.update_matrices()?;
        Ok(engine)
    }

    fn update_matrices(&mut self) -> Result<(), DomainError> {
        let screen = |g: &GeometryState| {
            full_geometry_to_screen_matrix(
                g,
                self.bitmap_w,
                self.bitmap_h,
                self.view_w,
                self.view_h,
                self.display_scale,
            )
        };
        let flat = GeometryState {
            straighten: 0.0,
            ..self.geometry
        };
        let image_to_screen = screen(&self.geometry);
        let crop_to_screen = screen(&flat);
        let screen_to_crop = crop_to_screen
            .invert()
            .ok_or(DomainError::NonInvertibleMatrix)?;

        self.image_to_screen = image_to_screen;
        self.crop_to_screen = crop_to_screen;
        self.screen_to_crop = screen_to_crop;
        Ok(())
    }

    /// Start over from a new geometry, dropping any gesture in progress.
    pub fn reset(&mut self, geometry: GeometryState) -> Result<(), DomainError> {
        let previous = self.geometry;
        self.geometry = geometry;
        if let Err(err) = self.update_matrices() {
            self.geometry = previous;
            return Err(err);
        }
        let (bw, bh) = (f64::from(self.bitmap_w), f64::from(self.bitmap_h));
        self.bounds.reset_to(
            geometry.straighten,
            Rect::from_size(bw, bh),
            geometry.crop.to_pixels(bw, bh),
        );
        self.state = DragState::Idle;
        Ok(())
    }

    pub fn set_view_size(&mut self, width: u32, height: u32) -> Result<(), DomainError> {
        check_dimensions(width, height)?;
        let previous = (self.view_w, self.view_h);
        (self.view_w, self.view_h) = (width, height);
        if let Err(err) = self.update_matrices() {
            (self.view_w, self.view_h) = previous;
            return Err(err);
        }
        self.cancel_drag();
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn geometry(&self) -> &GeometryState {
        &self.geometry
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn aspect_ratio(&self) -> Option<(f64, f64)> {
        self.aspect
    }

    /// Crop rectangle in the straightened frame.
    pub fn inner_bounds(&self) -> Rect {
        self.bounds.inner()
    }

    /// Bitmap rectangle.
    pub fn outer_bounds(&self) -> Rect {
        self.bounds.outer()
    }

    /// Matrix drawing the bitmap, straighten included.
    pub fn image_to_screen(&self) -> Matrix {
        self.image_to_screen
    }

    pub fn screen_to_crop(&self) -> Matrix {
        self.screen_to_crop
    }

    /// Crop rectangle as drawn on screen.
    pub fn screen_crop_rect(&self) -> Rect {
        self.crop_to_screen.map_rect(&self.bounds.inner())
    }

    /// Touch tolerance in straightened-frame units.
    pub fn touch_tolerance(&self) -> f64 {
        self.screen_to_crop.map_radius(self.touch_tolerance)
    }

    /// Minimum crop side in straightened-frame units.
    pub fn min_side(&self) -> f64 {
        self.screen_to_crop.map_radius(self.min_crop_side)
    }

    /// Current crop as a normalized rectangle.
    pub fn normalized_crop(&self) -> Result<NormalizedRect, DomainError> {
        let outer = self.bounds.outer();
        let inner = self
            .bounds
            .inner()
            .intersect(&outer)
            .ok_or(DomainError::ZeroAreaCrop)?;
        NormalizedRect::from_pixels(&inner, outer.width(), outer.height())
    }

    // ========================================================================
    // Aspect ratio
    // ========================================================================

    /// Lock the crop to `width:height` as seen on screen.
    ///
    /// Returns `Ok(false)` when the locked crop would fall below the minimum
    /// side; the lock is not applied in that case.
    pub fn set_aspect_ratio(&mut self, width: f64, height: f64) -> Result<bool, DomainError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(DomainError::InvalidAspectRatio { width, height });
        }
        if self.geometry.rotation.swaps_dimensions() {
            Ok(self.apply_aspect(height, width))
        } else {
            Ok(self.apply_aspect(width, height))
        }
    }

    /// Lock the crop to the bitmap's own aspect ratio.
    pub fn set_original_aspect(&mut self) -> bool {
        let outer = self.bounds.outer();
        self.apply_aspect(outer.width(), outer.height())
    }

    pub fn clear_aspect_ratio(&mut self) {
        self.aspect = None;
        self.cancel_drag();
    }

    fn apply_aspect(&mut self, width: f64, height: f64) -> bool {
        let inner = fix_aspect_ratio(&self.bounds.inner(), width, height);
        let min = self.min_side();
        if inner.width() < min || inner.height() < min {
            tracing::debug!(width, height, "aspect lock would shrink crop below minimum");
            return false;
        }
        self.aspect = Some((width, height));
        self.cancel_drag();
        self.bounds.set_inner(inner);
        true
    }

    // ========================================================================
    // Hit testing
    // ========================================================================

    /// Nearest handle within the touch tolerance: corners first, then sides.
    fn nearest_handle(&self, p: Point) -> Edges {
        let r = self.bounds.inner();
        let tol = self.touch_tolerance();
        let [tl, tr, br, bl] = r.corners();

        let corners = [
            (Edges::TOP_LEFT, tl),
            (Edges::TOP_RIGHT, tr),
            (Edges::BOTTOM_RIGHT, br),
            (Edges::BOTTOM_LEFT, bl),
        ];
        let corner = corners
            .iter()
            .map(|&(e, c)| (e, p.distance(c)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((e, d)) = corner {
            if d <= tol {
                return e;
            }
        }

        let sides = [
            (Edges::LEFT, Line::new(tl, bl)),
            (Edges::TOP, Line::new(tl, tr)),
            (Edges::RIGHT, Line::new(tr, br)),
            (Edges::BOTTOM, Line::new(bl, br)),
        ];
        let side = sides
            .iter()
            .map(|(e, line)| (*e, distance_to_segment(p, line)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match side {
            Some((e, d)) if d <= tol => e,
            _ => Edges::NONE,
        }
    }

    fn hit_test(&self, p: Point) -> Edges {
        let edges = self.nearest_handle(p);
        if edges.is_none() {
            return if self.bounds.inner().contains_inclusive(p) {
                Edges::MOVE
            } else {
                Edges::NONE
            };
        }
        if self.aspect.is_some() {
            edges.to_corner()
        } else {
            edges
        }
    }

    /// Handle under a screen point, for hover feedback. Never MOVE.
    pub fn hovered_edge(&self, screen: Point) -> Edges {
        self.nearest_handle(self.screen_to_crop.map_point(screen))
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    /// Start a drag at a screen point. Returns the selected edges, NONE when
    /// the point misses the crop.
    pub fn begin_drag(&mut self, screen: Point) -> Edges {
        let p = self.screen_to_crop.map_point(screen);
        let edges = self.hit_test(p);
        self.start(edges, p);
        edges
    }

    /// Start a drag on a handle identified by its on-screen side.
    pub fn begin_handle_drag(&mut self, screen_handle: Edges, screen: Point) -> Edges {
        let mut edges = screen_handle.decode(self.geometry.rotation, self.geometry.mirror);
        if !(edges.is_side() || edges.is_corner() || edges.is_move()) {
            edges = Edges::NONE;
        }
        if self.aspect.is_some() && edges.is_side() {
            edges = edges.to_corner();
        }
        let p = self.screen_to_crop.map_point(screen);
        self.start(edges, p);
        edges
    }

    fn start(&mut self, edges: Edges, p: Point) {
        self.state = if edges.is_none() {
            DragState::Idle
        } else {
            DragState::Dragging {
                edges,
                last: p,
                snapshot: self.bounds.clone(),
            }
        };
    }

    /// Continue the drag. Returns false when no drag is in progress.
    pub fn drag_to(&mut self, screen: Point) -> bool {
        let p = self.screen_to_crop.map_point(screen);
        let (edges, last) = match &self.state {
            DragState::Dragging { edges, last, .. } => (*edges, *last),
            DragState::Idle => return false,
        };
        self.move_selection(edges, p - last);
        if let DragState::Dragging { last, .. } = &mut self.state {
            *last = p;
        }
        true
    }

    /// Finish the drag and commit the crop into the geometry.
    pub fn end_drag(&mut self) -> Result<GeometryState, DomainError> {
        self.state = DragState::Idle;
        self.geometry.crop = self.normalized_crop()?;
        Ok(self.geometry)
    }

    /// Abandon the drag, restoring the bounds it started from.
    pub fn cancel_drag(&mut self) {
        if let DragState::Dragging { snapshot, .. } =
            std::mem::replace(&mut self.state, DragState::Idle)
        {
            self.bounds = snapshot;
        }
    }

    fn move_selection(&mut self, edges: Edges, delta: Point) {
        if edges.is_move() {
            self.bounds.move_inner(delta.x, delta.y);
            return;
        }

        let mut crop = self.bounds.inner();
        let min = self.min_side();
        let (mut dx, mut dy) = (0.0, 0.0);
        if edges.contains(Edges::LEFT) {
            dx = (crop.left + delta.x).min(crop.right - min) - crop.left;
        }
        if edges.contains(Edges::TOP) {
            dy = (crop.top + delta.y).min(crop.bottom - min) - crop.top;
        }
        if edges.contains(Edges::RIGHT) {
            dx = (crop.right + delta.x).max(crop.left + min) - crop.right;
        }
        if edges.contains(Edges::BOTTOM) {
            dy = (crop.bottom + delta.y).max(crop.top + min) - crop.bottom;
        }

        if self.aspect.is_some() {
            // Project the motion onto the diagonal through the dragged corner.
            let diagonal = if edges == Edges::TOP_LEFT || edges == Edges::BOTTOM_RIGHT {
                Point::new(crop.left - crop.right, crop.top - crop.bottom)
            } else {
                Point::new(crop.left - crop.right, crop.bottom - crop.top)
            };
            let Some(unit) = normalize(diagonal) else {
                return;
            };
            let Some(sp) = scalar_projection(Point::new(dx, dy), unit) else {
                return;
            };
            if let Some(resized) = fixed_corner_resize(&crop, edges, sp * unit.x, sp * unit.y) {
                self.bounds.fixed_aspect_resize_inner(resized);
            }
        } else {
            if edges.contains(Edges::LEFT) {
                crop.left += dx;
            }
            if edges.contains(Edges::TOP) {
                crop.top += dy;
            }
            if edges.contains(Edges::RIGHT) {
                crop.right += dx;
            }
            if edges.contains(Edges::BOTTOM) {
                crop.bottom += dy;
            }
            self.bounds.resize_inner(crop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;

    const EPS: f64 = 1e-6;

    fn config() -> EditorConfig {
        EditorConfig {
            crop_display_scale: 1.0,
            ..EditorConfig::default()
        }
    }

    fn centered_crop() -> NormalizedRect {
        NormalizedRect::new(0.25, 0.25, 0.75, 0.75).unwrap()
    }

    /// 200x100 bitmap in a 400x200 view: screen = 2 * crop space.
    fn engine(geometry: GeometryState) -> CropEngine {
        CropEngine::new(geometry, 200, 100, 400, 200, &config()).unwrap()
    }

    #[test]
    fn test_rejects_empty_dimensions() {
        let err = CropEngine::new(GeometryState::new(), 0, 100, 400, 200, &config()).unwrap_err();
        assert_eq!(err, DomainError::InvalidDimensions { width: 0, height: 100 });
    }

    #[test]
    fn test_screen_distances_scale_with_view() {
        let e = engine(GeometryState::new());
        assert!((e.touch_tolerance() - 22.5).abs() < EPS);
        assert!((e.min_side() - 10.0).abs() < EPS);
        assert!(e
            .screen_crop_rect()
            .approx_eq(&Rect::new(0.0, 0.0, 400.0, 200.0), EPS));
    }

    #[test]
    fn test_corner_drag_commits_normalized_crop() {
        let mut e = engine(GeometryState::new());
        assert_eq!(e.begin_drag(Point::new(0.0, 0.0)), Edges::TOP_LEFT);
        assert!(e.drag_to(Point::new(40.0, 20.0)));
        let g = e.end_drag().unwrap();
        let expected = NormalizedRect::new(0.1, 0.1, 1.0, 1.0).unwrap();
        assert!(g.crop.approx_eq(&expected, EPS), "{:?}", g.crop);
        assert_eq!(e.state(), &DragState::Idle);
    }

    #[test]
    fn test_move_drag_clamps_to_image() {
        let mut e = engine(GeometryState::new().with_crop(centered_crop()));
        assert_eq!(e.begin_drag(Point::new(200.0, 100.0)), Edges::MOVE);
        e.drag_to(Point::new(240.0, 100.0));
        assert!(e
            .inner_bounds()
            .approx_eq(&Rect::new(70.0, 25.0, 170.0, 75.0), EPS));
        e.drag_to(Point::new(600.0, 100.0));
        assert!(e
            .inner_bounds()
            .approx_eq(&Rect::new(100.0, 25.0, 200.0, 75.0), EPS));
    }

    #[test]
    fn test_edge_drag_respects_min_side() {
        let mut e = engine(GeometryState::new().with_crop(centered_crop()));
        assert_eq!(e.begin_drag(Point::new(100.0, 100.0)), Edges::LEFT);
        e.drag_to(Point::new(1000.0, 100.0));
        let inner = e.inner_bounds();
        assert!((inner.width() - e.min_side()).abs() < EPS, "{:?}", inner);
        assert!((inner.right - 150.0).abs() < EPS);
    }

    #[test]
    fn test_miss_outside_crop_stays_idle() {
        let mut e = engine(GeometryState::new().with_crop(centered_crop()));
        assert_eq!(e.begin_drag(Point::new(5.0, 5.0)), Edges::NONE);
        assert!(!e.drag_to(Point::new(50.0, 50.0)));
    }

    #[test]
    fn test_hovered_edge_never_moves() {
        let e = engine(GeometryState::new().with_crop(centered_crop()));
        assert_eq!(e.hovered_edge(Point::new(200.0, 100.0)), Edges::NONE);
        assert_eq!(e.hovered_edge(Point::new(300.0, 150.0)), Edges::BOTTOM_RIGHT);
    }

    #[test]
    fn test_cancel_restores_bounds() {
        let mut e = engine(GeometryState::new().with_crop(centered_crop()));
        let before = e.inner_bounds();
        e.begin_drag(Point::new(200.0, 100.0));
        e.drag_to(Point::new(260.0, 120.0));
        assert_ne!(e.inner_bounds(), before);
        e.cancel_drag();
        assert_eq!(e.inner_bounds(), before);
    }

    #[test]
    fn test_aspect_lock_promotes_sides_and_keeps_ratio() {
        let mut e = engine(GeometryState::new().with_crop(centered_crop()));
        assert_eq!(e.set_aspect_ratio(1.0, 1.0), Ok(true));
        assert!(e
            .inner_bounds()
            .approx_eq(&Rect::new(75.0, 25.0, 125.0, 75.0), EPS));

        assert_eq!(e.begin_drag(Point::new(200.0, 50.0)), Edges::TOP_LEFT);
        e.drag_to(Point::new(180.0, 30.0));
        let inner = e.inner_bounds();
        assert!((inner.width() - inner.height()).abs() < EPS, "{:?}", inner);
        assert!(inner.approx_eq(&Rect::new(65.0, 15.0, 125.0, 75.0), EPS));
    }

    #[test]
    fn test_aspect_ratio_validation_and_swap() {
        let mut e = engine(GeometryState::new());
        assert_eq!(
            e.set_aspect_ratio(0.0, 1.0),
            Err(DomainError::InvalidAspectRatio {
                width: 0.0,
                height: 1.0
            })
        );

        let mut rotated = engine(GeometryState::new().with_rotation(Rotation::Ninety));
        assert_eq!(rotated.set_aspect_ratio(4.0, 3.0), Ok(true));
        let inner = rotated.inner_bounds();
        assert!((inner.width() / inner.height() - 0.75).abs() < EPS);
        assert_eq!(rotated.aspect_ratio(), Some((3.0, 4.0)));

        e.clear_aspect_ratio();
        assert_eq!(e.aspect_ratio(), None);
    }

    #[test]
    fn test_north_handle_under_quarter_turn_moves_east_edge() {
        let geometry = GeometryState::new()
            .with_rotation(Rotation::Ninety)
            .with_crop(centered_crop());
        let mut e = CropEngine::new(geometry, 200, 100, 200, 400, &config()).unwrap();
        assert!(e
            .screen_crop_rect()
            .approx_eq(&Rect::new(50.0, 100.0, 150.0, 300.0), EPS));

        assert_eq!(e.hovered_edge(Point::new(100.0, 100.0)), Edges::RIGHT);
        assert_eq!(
            e.begin_handle_drag(Edges::TOP, Point::new(100.0, 100.0)),
            Edges::RIGHT
        );
        e.drag_to(Point::new(100.0, 120.0));
        assert!(e
            .inner_bounds()
            .approx_eq(&Rect::new(50.0, 25.0, 140.0, 75.0), EPS));

        let g = e.end_drag().unwrap();
        let expected = NormalizedRect::new(0.25, 0.25, 0.7, 0.75).unwrap();
        assert!(g.crop.approx_eq(&expected, EPS));
    }

    #[test]
    fn test_straightened_crop_stays_inside_rotated_image() {
        let geometry = GeometryState::new().with_straighten(10.0);
        let mut e = engine(geometry);
        e.begin_drag(Point::new(200.0, 100.0));
        e.drag_to(Point::new(260.0, 100.0));
        let crop = e.end_drag().unwrap().crop;
        assert!(crop.left() >= 0.0 && crop.right() <= 1.0);
    }
}
