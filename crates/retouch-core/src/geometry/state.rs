//! The composed geometry of an edit: rotation, straighten, crop and mirror.

use serde::{Deserialize, Serialize};

use super::matrix::Rect;
use crate::error::DomainError;

/// Largest straighten angle in either direction, in degrees.
pub const MAX_STRAIGHTEN_ANGLE: f64 = 45.0;

// ============================================================================
// Rotation
// ============================================================================

/// Coarse rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Zero,
    Ninety,
    OneEighty,
    TwoSeventy,
}

impl Rotation {
    /// Rotation one quarter turn further.
    pub fn next(self) -> Self {
        match self {
            Rotation::Zero => Rotation::Ninety,
            Rotation::Ninety => Rotation::OneEighty,
            Rotation::OneEighty => Rotation::TwoSeventy,
            Rotation::TwoSeventy => Rotation::Zero,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Zero => 0,
            Rotation::Ninety => 90,
            Rotation::OneEighty => 180,
            Rotation::TwoSeventy => 270,
        }
    }

    /// Quarter turns from zero (0..=3).
    pub fn quarter_turns(self) -> u32 {
        self.degrees() / 90
    }

    /// Parse any multiple of 90 degrees, including negative ones.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Zero),
            90 => Some(Rotation::Ninety),
            180 => Some(Rotation::OneEighty),
            270 => Some(Rotation::TwoSeventy),
            _ => None,
        }
    }

    /// Width and height trade places for quarter and three-quarter turns.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Ninety | Rotation::TwoSeventy)
    }
}

// ============================================================================
// Mirror
// ============================================================================

/// Mirror mode, expressed relative to the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Mirror {
    /// Step through the mirror modes the way the mirror button does:
    /// none, horizontal, both, vertical, none.
    pub fn cycle(self) -> Self {
        match self {
            Mirror::None => Mirror::Horizontal,
            Mirror::Horizontal => Mirror::Both,
            Mirror::Both => Mirror::Vertical,
            Mirror::Vertical => Mirror::None,
        }
    }

    pub fn toggle_horizontal(self) -> Self {
        match self {
            Mirror::None => Mirror::Horizontal,
            Mirror::Horizontal => Mirror::None,
            Mirror::Vertical => Mirror::Both,
            Mirror::Both => Mirror::Vertical,
        }
    }

    pub fn toggle_vertical(self) -> Self {
        match self {
            Mirror::None => Mirror::Vertical,
            Mirror::Vertical => Mirror::None,
            Mirror::Horizontal => Mirror::Both,
            Mirror::Both => Mirror::Horizontal,
        }
    }

    /// The screen axis this mirror flips once `rotation` has been applied.
    ///
    /// A quarter turn exchanges the horizontal and vertical axes.
    pub fn effective_for(self, rotation: Rotation) -> Self {
        if !rotation.swaps_dimensions() {
            return self;
        }
        match self {
            Mirror::Horizontal => Mirror::Vertical,
            Mirror::Vertical => Mirror::Horizontal,
            other => other,
        }
    }

    pub fn flips_horizontal(self) -> bool {
        matches!(self, Mirror::Horizontal | Mirror::Both)
    }

    pub fn flips_vertical(self) -> bool {
        matches!(self, Mirror::Vertical | Mirror::Both)
    }
}

/// Single mirror axis for toggle edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorAxis {
    Horizontal,
    Vertical,
}

// ============================================================================
// Normalized crop
// ============================================================================

/// Crop rectangle as fractions of the unrotated image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Default for NormalizedRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Slack used when pulling pixel crops back into the unit square.
const NORMALIZE_EPSILON: f64 = 1e-9;

impl NormalizedRect {
    /// The whole image.
    pub const FULL: NormalizedRect = NormalizedRect {
        left: 0.0,
        top: 0.0,
        right: 1.0,
        bottom: 1.0,
    };

    /// Validate `0 <= left < right <= 1` and `0 <= top < bottom <= 1`.
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Result<Self, DomainError> {
        let invalid = DomainError::InvalidCrop {
            left,
            top,
            right,
            bottom,
        };
        if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
            return Err(DomainError::NotFinite);
        }
        if left == right || top == bottom {
            return Err(DomainError::ZeroAreaCrop);
        }
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(left) && in_unit(top) && in_unit(right) && in_unit(bottom)) {
            return Err(invalid);
        }
        if left > right || top > bottom {
            return Err(invalid);
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right, self.bottom)
    }

    /// Denormalize into pixels of a `width` x `height` bitmap.
    pub fn to_pixels(&self, width: f64, height: f64) -> Rect {
        Rect::new(
            self.left * width,
            self.top * height,
            self.right * width,
            self.bottom * height,
        )
    }

    /// Normalize a pixel rectangle of a `width` x `height` bitmap.
    ///
    /// Values within floating-point noise of the unit square are pulled
    /// back into it.
    pub fn from_pixels(rect: &Rect, width: f64, height: f64) -> Result<Self, DomainError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(DomainError::InvalidDimensions {
                width: width.max(0.0) as u32,
                height: height.max(0.0) as u32,
            });
        }
        let snap = |v: f64| {
            if (-NORMALIZE_EPSILON..0.0).contains(&v) {
                0.0
            } else if v > 1.0 && v <= 1.0 + NORMALIZE_EPSILON {
                1.0
            } else {
                v
            }
        };
        Self::new(
            snap(rect.left / width),
            snap(rect.top / height),
            snap(rect.right / width),
            snap(rect.bottom / height),
        )
    }

    pub fn approx_eq(&self, other: &NormalizedRect, eps: f64) -> bool {
        self.as_rect().approx_eq(&other.as_rect(), eps)
    }
}

// ============================================================================
// Geometry state
// ============================================================================

/// All geometric edits of an image, composed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryState {
    pub rotation: Rotation,
    /// Fine rotation in degrees, within +/-45.
    pub straighten: f64,
    pub crop: NormalizedRect,
    pub mirror: Mirror,
}

impl GeometryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the state leaves the image untouched.
    pub fn is_nil(&self) -> bool {
        self.rotation == Rotation::Zero
            && self.straighten == 0.0
            && self.crop.is_full()
            && self.mirror == Mirror::None
    }

    /// Set the straighten angle, clamped to +/-45 degrees.
    pub fn set_straighten(&mut self, degrees: f64) -> Result<(), DomainError> {
        if !degrees.is_finite() {
            return Err(DomainError::NotFinite);
        }
        self.straighten = degrees.clamp(-MAX_STRAIGHTEN_ANGLE, MAX_STRAIGHTEN_ANGLE);
        Ok(())
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_crop(mut self, crop: NormalizedRect) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_straighten(mut self, degrees: f64) -> Self {
        if degrees.is_finite() {
            self.straighten = degrees.clamp(-MAX_STRAIGHTEN_ANGLE, MAX_STRAIGHTEN_ANGLE);
        }
        self
    }

    /// Total rotation fed into the geometry matrix.
    pub fn total_rotation(&self) -> f64 {
        self.straighten + f64::from(self.rotation.degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_steps_wrap() {
        let mut r = Rotation::Zero;
        for _ in 0..4 {
            r = r.next();
        }
        assert_eq!(r, Rotation::Zero);
        assert_eq!(Rotation::Zero.next(), Rotation::Ninety);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::TwoSeventy));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Ninety));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_swaps_dimensions_only_for_quarter_turns() {
        assert!(!Rotation::Zero.swaps_dimensions());
        assert!(Rotation::Ninety.swaps_dimensions());
        assert!(!Rotation::OneEighty.swaps_dimensions());
        assert!(Rotation::TwoSeventy.swaps_dimensions());
    }

    #[test]
    fn test_mirror_cycle_order() {
        let seq: Vec<Mirror> = std::iter::successors(Some(Mirror::None), |m| Some(m.cycle()))
            .take(5)
            .collect();
        assert_eq!(
            seq,
            vec![
                Mirror::None,
                Mirror::Horizontal,
                Mirror::Both,
                Mirror::Vertical,
                Mirror::None
            ]
        );
    }

    #[test]
    fn test_mirror_effective_swaps_under_quarter_turn() {
        assert_eq!(
            Mirror::Horizontal.effective_for(Rotation::Ninety),
            Mirror::Vertical
        );
        assert_eq!(
            Mirror::Vertical.effective_for(Rotation::TwoSeventy),
            Mirror::Horizontal
        );
        assert_eq!(
            Mirror::Horizontal.effective_for(Rotation::OneEighty),
            Mirror::Horizontal
        );
        assert_eq!(Mirror::Both.effective_for(Rotation::Ninety), Mirror::Both);
    }

    #[test]
    fn test_mirror_toggles() {
        assert_eq!(Mirror::Vertical.toggle_horizontal(), Mirror::Both);
        assert_eq!(Mirror::Both.toggle_vertical(), Mirror::Horizontal);
        assert_eq!(Mirror::Vertical.toggle_vertical(), Mirror::None);
    }

    #[test]
    fn test_normalized_rect_validation() {
        assert!(NormalizedRect::new(0.1, 0.1, 0.9, 0.9).is_ok());
        assert_eq!(
            NormalizedRect::new(0.5, 0.1, 0.5, 0.9),
            Err(DomainError::ZeroAreaCrop)
        );
        assert!(matches!(
            NormalizedRect::new(0.6, 0.1, 0.5, 0.9),
            Err(DomainError::InvalidCrop { .. })
        ));
        assert!(matches!(
            NormalizedRect::new(-0.1, 0.0, 0.5, 1.0),
            Err(DomainError::InvalidCrop { .. })
        ));
        assert_eq!(
            NormalizedRect::new(f64::NAN, 0.0, 0.5, 1.0),
            Err(DomainError::NotFinite)
        );
    }

    #[test]
    fn test_scaled_crop_round_trip() {
        let crop = NormalizedRect::new(0.125, 0.2, 0.75, 0.9).unwrap();
        let px = crop.to_pixels(640.0, 480.0);
        assert_eq!(px, Rect::new(80.0, 96.0, 480.0, 432.0));
        let back = NormalizedRect::from_pixels(&px, 640.0, 480.0).unwrap();
        assert!(back.approx_eq(&crop, 1e-12));
    }

    #[test]
    fn test_from_pixels_snaps_noise() {
        let r = Rect::new(-1e-12, 0.0, 100.0 + 1e-10, 50.0);
        let n = NormalizedRect::from_pixels(&r, 100.0, 50.0).unwrap();
        assert!(n.is_full());
    }

    #[test]
    fn test_straighten_is_clamped() {
        let mut g = GeometryState::new();
        g.set_straighten(80.0).unwrap();
        assert_eq!(g.straighten, 45.0);
        g.set_straighten(-60.0).unwrap();
        assert_eq!(g.straighten, -45.0);
        assert_eq!(g.set_straighten(f64::INFINITY), Err(DomainError::NotFinite));
    }

    #[test]
    fn test_nil_state() {
        assert!(GeometryState::new().is_nil());
        assert!(!GeometryState::new().with_mirror(Mirror::Vertical).is_nil());
        assert!(!GeometryState::new().with_straighten(1.0).is_nil());
    }
}
