//! Turn a [`GeometryState`] plus bitmap and view sizes into transform matrices.
//!
//! All functions here are pure. The central one is [`full_geometry_matrix`],
//! which maps original pixel coordinates into a frame centered on the origin
//! with rotation, straighten and mirror applied. Every screen matrix is built
//! on top of it by scaling and translating into the view.

use super::matrix::{Matrix, Rect};
use super::state::{GeometryState, Mirror, NormalizedRect, Rotation};
use crate::error::DomainError;

/// True when width and height must be swapped before fitting to a viewport.
pub fn needs_dimension_swap(rotation: Rotation) -> bool {
    rotation.swaps_dimensions()
}

/// Uniform scale that fits `old` inside `new`.
///
/// Returns 1 when the old size is empty or both sizes are equal.
pub fn fit_scale(old_w: f64, old_h: f64, new_w: f64, new_h: f64) -> f64 {
    if old_w == 0.0 || old_h == 0.0 || (old_w == new_w && old_h == new_h) {
        return 1.0;
    }
    (new_w / old_w).min(new_h / old_h)
}

/// Map original pixels into the geometry-neutral centered frame.
///
/// About the bitmap center, rotates by `straighten + rotation` degrees, then
/// mirrors along the screen axis the mirror refers to after rotation.
pub fn full_geometry_matrix(state: &GeometryState, bitmap_w: u32, bitmap_h: u32) -> Matrix {
    let cx = f64::from(bitmap_w) / 2.0;
    let cy = f64::from(bitmap_h) / 2.0;
    let m = Matrix::translation(-cx, -cy).post_rotate(state.total_rotation());
    concat_mirror(m, state.mirror.effective_for(state.rotation))
}

fn concat_mirror(m: Matrix, mirror: Mirror) -> Matrix {
    match mirror {
        Mirror::None => m,
        Mirror::Horizontal => m.post_scale(-1.0, 1.0),
        Mirror::Vertical => m.post_scale(1.0, -1.0),
        Mirror::Both => m.post_scale(1.0, -1.0).post_scale(-1.0, 1.0),
    }
}

/// Axis-aligned extent of the crop in the centered frame.
///
/// The crop is defined in the straightened frame, so it is mapped with the
/// straighten angle held at zero. Rotation and mirror still apply, which
/// swaps width and height for quarter turns.
pub fn true_crop_rect(state: &GeometryState, bitmap_w: u32, bitmap_h: u32) -> Rect {
    let crop = state
        .crop
        .to_pixels(f64::from(bitmap_w), f64::from(bitmap_h));
    let unstraightened = GeometryState {
        straighten: 0.0,
        ..*state
    };
    full_geometry_matrix(&unstraightened, bitmap_w, bitmap_h).map_rect(&crop)
}

/// Pixel bounds of the final output, rounded out to whole pixels.
pub fn final_geometry_rect(state: &GeometryState, bitmap_w: u32, bitmap_h: u32) -> Rect {
    let crop = true_crop_rect(state, bitmap_w, bitmap_h);
    Rect::from_size(crop.width(), crop.height()).round_out()
}

/// Matrix placing the crop selection centered in a `view_w` x `view_h` view,
/// together with the crop rectangle in view coordinates.
///
/// With a view equal to the crop size the scale is 1, which gives the
/// pixel-exact matrix used to extract the final crop.
pub fn crop_selection_to_screen(
    state: &GeometryState,
    bitmap_w: u32,
    bitmap_h: u32,
    view_w: u32,
    view_h: u32,
) -> (Matrix, Rect) {
    let (vw, vh) = (f64::from(view_w), f64::from(view_h));
    let crop = true_crop_rect(state, bitmap_w, bitmap_h);
    let scale = fit_scale(crop.width(), crop.height(), vw, vh);

    let crop = crop.scale(scale);
    let center = crop.center();
    let (dx, dy) = (vw / 2.0 - center.x, vh / 2.0 - center.y);

    let m = full_geometry_matrix(state, bitmap_w, bitmap_h)
        .post_scale(scale, scale)
        .post_translate(dx, dy);
    (m, crop.offset(dx, dy))
}

/// [`crop_selection_to_screen`] without the crop rectangle.
pub fn crop_selection_to_screen_matrix(
    state: &GeometryState,
    bitmap_w: u32,
    bitmap_h: u32,
    view_w: u32,
    view_h: u32,
) -> Matrix {
    crop_selection_to_screen(state, bitmap_w, bitmap_h, view_w, view_h).0
}

/// Matrix fitting the whole, uncropped image into the view.
///
/// `display_scale` leaves a margin around the image (the crop editor uses
/// 0.9 so handles on the border stay reachable).
pub fn full_geometry_to_screen_matrix(
    state: &GeometryState,
    bitmap_w: u32,
    bitmap_h: u32,
    view_w: u32,
    view_h: u32,
    display_scale: f64,
) -> Matrix {
    let (mut bw, mut bh) = (f64::from(bitmap_w), f64::from(bitmap_h));
    if needs_dimension_swap(state.rotation) {
        std::mem::swap(&mut bw, &mut bh);
    }
    let (vw, vh) = (f64::from(view_w), f64::from(view_h));
    let scale = fit_scale(bw, bh, vw, vh) * display_scale;

    full_geometry_matrix(state, bitmap_w, bitmap_h)
        .post_scale(scale, scale)
        .post_translate(vw / 2.0, vh / 2.0)
}

/// Largest rectangle with the bitmap's aspect ratio that fits inside the
/// bitmap once it is rotated by `straighten` degrees about its center.
///
/// # Arguments
///
/// * `width`, `height` - Bitmap size in pixels
/// * `straighten` - Fine rotation in degrees
///
/// # Returns
///
/// The centered rectangle in bitmap pixel coordinates.
pub fn straighten_crop_bounds(width: f64, height: f64, straighten: f64) -> Rect {
    let a = straighten.abs().to_radians();
    let (sin, cos) = a.sin_cos();
    let (rw, rh) = (width, height);

    let h1 = rh * rh / (rw * sin + rh * cos);
    let h2 = rh * rw / (rw * cos + rh * sin);
    let hh = h1.min(h2);
    let ww = hh * rw / rh;

    let left = (rw - ww) * 0.5;
    let top = (rh - hh) * 0.5;
    Rect::new(left, top, left + ww, top + hh)
}

/// [`straighten_crop_bounds`] expressed as a normalized crop.
pub fn straightened_crop(
    bitmap_w: u32,
    bitmap_h: u32,
    straighten: f64,
) -> Result<NormalizedRect, DomainError> {
    if bitmap_w == 0 || bitmap_h == 0 {
        return Err(DomainError::InvalidDimensions {
            width: bitmap_w,
            height: bitmap_h,
        });
    }
    let (w, h) = (f64::from(bitmap_w), f64::from(bitmap_h));
    NormalizedRect::from_pixels(&straighten_crop_bounds(w, h, straighten), w, h)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::matrix::Point;
    use proptest::prelude::*;

    fn arb_rotation() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Zero),
            Just(Rotation::Ninety),
            Just(Rotation::OneEighty),
            Just(Rotation::TwoSeventy),
        ]
    }

    fn arb_mirror() -> impl Strategy<Value = Mirror> {
        prop_oneof![
            Just(Mirror::None),
            Just(Mirror::Horizontal),
            Just(Mirror::Vertical),
            Just(Mirror::Both),
        ]
    }

    proptest! {
        #[test]
        fn prop_screen_round_trip(
            rotation in arb_rotation(),
            mirror in arb_mirror(),
            straighten in -45.0f64..=45.0,
            l in 0.0f64..0.4,
            t in 0.0f64..0.4,
            r in 0.6f64..=1.0,
            b in 0.6f64..=1.0,
            bw in 1u32..4000,
            bh in 1u32..4000,
            vw in 1u32..2000,
            vh in 1u32..2000,
            px in -500.0f64..500.0,
            py in -500.0f64..500.0,
        ) {
            let state = GeometryState {
                rotation,
                straighten,
                crop: NormalizedRect::new(l, t, r, b).unwrap(),
                mirror,
            };
            let m = crop_selection_to_screen_matrix(&state, bw, bh, vw, vh);
            let inv = m.invert().unwrap();
            let p = Point::new(px, py);
            let back = inv.map_point(m.map_point(p));
            prop_assert!(back.approx_eq(p, 1e-6), "{:?} -> {:?}", p, back);
        }

        #[test]
        fn prop_dimension_swap_iff_quarter_turn(rotation in arb_rotation()) {
            let d = rotation.degrees();
            prop_assert_eq!(needs_dimension_swap(rotation), d == 90 || d == 270);
        }

        #[test]
        fn prop_straighten_bounds_stay_inside(
            w in 1.0f64..4000.0,
            h in 1.0f64..4000.0,
            angle in -45.0f64..=45.0,
        ) {
            let r = straighten_crop_bounds(w, h, angle);
            prop_assert!(r.left >= -1e-9 && r.top >= -1e-9);
            prop_assert!(r.right <= w + 1e-9 && r.bottom <= h + 1e-9);
            prop_assert!(((r.width() / r.height()) - (w / h)).abs() < 1e-6 * (w / h).max(1.0));
        }
    }
}
