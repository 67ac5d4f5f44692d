//! Tone curve WASM bindings.
//!
//! [`JsSpline`] is the editable curve behind the curve widget: points are
//! inserted, dragged and deleted from JavaScript, and the solved curve is
//! read back for drawing or turned into a lookup table.

use retouch_core::curve::{apply_tone_curve as core_apply, ToneCurveLut};
use retouch_core::{ControlPoint, CurveEdit, DomainError, Spline};
use wasm_bindgen::prelude::*;

use crate::js_error;
use crate::types::JsBitmap;

/// JavaScript-accessible natural cubic spline.
///
/// # Example (TypeScript)
/// ```typescript
/// const spline = new JsSpline();
/// const index = spline.insert(0.25, 0.85);
/// spline.move_point(index, 0.25, 0.9);
/// const samples = spline.applied_curve(); // 256 values in [0, 1]
/// const darker = apply_spline(image, spline);
/// ```
#[wasm_bindgen]
#[derive(Debug, Clone, Default)]
pub struct JsSpline {
    inner: Spline,
}

#[wasm_bindgen]
impl JsSpline {
    /// The identity curve.
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsSpline {
        JsSpline::default()
    }

    /// Build from an array of `{x, y}` objects.
    ///
    /// # Errors
    /// Returns an error when the points cannot be deserialized, there are
    /// fewer than two, two share an x, or one lies outside the unit square.
    pub fn from_points(points: JsValue) -> Result<JsSpline, JsValue> {
        let points: Vec<ControlPoint> = serde_wasm_bindgen::from_value(points)
            .map_err(|e| js_error("Invalid curve points", e))?;
        let inner = Spline::from_points(points).map_err(|e| js_error("Invalid curve", e))?;
        Ok(JsSpline { inner })
    }

    pub fn points(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.inner.points()).map_err(|e| js_error("Serialize failed", e))
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.inner.len()
    }

    pub fn is_identity(&self) -> bool {
        self.inner.is_identity()
    }

    /// Add a point and return its index.
    pub fn insert(&mut self, x: f32, y: f32) -> Result<usize, JsValue> {
        self.inner
            .insert(ControlPoint::new(x, y))
            .map_err(|e| js_error("Insert failed", e))
    }

    /// Move a point. A point may not reach or pass its neighbours.
    pub fn move_point(&mut self, index: usize, x: f32, y: f32) -> Result<(), JsValue> {
        self.edit(CurveEdit::Move { index, x, y })
            .map_err(|e| js_error("Move failed", e))
    }

    /// Remove a point; fewer than two points resets to identity.
    pub fn delete(&mut self, index: usize) -> Result<(), JsValue> {
        self.edit(CurveEdit::Delete { index })
            .map_err(|e| js_error("Delete failed", e))
    }

    /// Whether `x` may be used for the point at `index` without crossing a
    /// neighbour.
    pub fn is_point_contained(&self, x: f32, index: usize) -> bool {
        self.inner.is_point_contained(x, index)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// The curve sampled at 256 evenly spaced inputs, clamped to `[0, 1]`.
    pub fn applied_curve(&self) -> Result<Vec<f32>, JsValue> {
        self.samples().map_err(|e| js_error("Curve solve failed", e))
    }

    /// 256-entry lookup table, `lut[i]` = output for input `i`.
    pub fn lut(&self) -> Result<Vec<u8>, JsValue> {
        self.to_lut()
            .map(|lut| lut.lut.to_vec())
            .map_err(|e| js_error("Curve solve failed", e))
    }

    pub fn free(self) {}
}

impl JsSpline {
    fn edit(&mut self, edit: CurveEdit) -> Result<(), DomainError> {
        self.inner.apply_edit(&edit)
    }

    fn samples(&self) -> Result<Vec<f32>, DomainError> {
        Ok(self.inner.solve()?.applied_curve().to_vec())
    }

    fn to_lut(&self) -> Result<ToneCurveLut, DomainError> {
        if self.inner.is_identity() {
            return Ok(ToneCurveLut::identity());
        }
        Ok(ToneCurveLut::from_spline(&self.inner.solve()?))
    }
}

/// Apply a curve to every channel of an image.
///
/// # Errors
/// Returns an error when the pixel buffer does not match the dimensions.
#[wasm_bindgen]
pub fn apply_spline(image: &JsBitmap, spline: &JsSpline) -> Result<JsBitmap, JsValue> {
    curve_bitmap(image, spline).map_err(|e| js_error("Apply curve failed", e))
}

fn curve_bitmap(image: &JsBitmap, spline: &JsSpline) -> Result<JsBitmap, DomainError> {
    let mut bitmap = image.to_bitmap()?;
    core_apply(&mut bitmap.pixels, &spline.to_lut()?);
    Ok(JsBitmap::from_bitmap(bitmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_identity() {
        let spline = JsSpline::new();
        assert!(spline.is_identity());
        assert_eq!(spline.length(), 2);
    }

    #[test]
    fn test_identity_lut_values() {
        let lut = JsSpline::new().to_lut().unwrap();
        for (i, &val) in lut.lut.iter().enumerate() {
            assert_eq!(val, i as u8);
        }
    }

    #[test]
    fn test_edit_points() {
        let mut spline = JsSpline::new();
        let index = spline.inner.insert(ControlPoint::new(0.5, 0.3)).unwrap();
        assert_eq!(index, 1);
        assert!(spline.is_point_contained(0.6, 1));
        assert!(!spline.is_point_contained(1.0, 1));

        spline.edit(CurveEdit::Move { index: 1, x: 0.4, y: 0.2 }).unwrap();
        assert_eq!(spline.inner.points()[1], ControlPoint::new(0.4, 0.2));

        spline.edit(CurveEdit::Delete { index: 1 }).unwrap();
        assert!(spline.is_identity());
    }

    #[test]
    fn test_samples_endpoints() {
        let samples = JsSpline::new().samples().unwrap();
        assert_eq!(samples.len(), 256);
        assert!(samples[0].abs() < 1e-6);
        assert!((samples[255] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_raised_curve_brightens() {
        let mut spline = JsSpline::new();
        // y is inverted: 0.3 is above the identity line at x = 0.5.
        spline.inner.insert(ControlPoint::new(0.5, 0.3)).unwrap();
        let image = JsBitmap::new(1, 1, vec![128, 128, 128]);
        let out = curve_bitmap(&image, &spline).unwrap();
        assert!(out.pixels()[0] > 160);
    }

    #[test]
    fn test_apply_rejects_bad_buffer() {
        let image = JsBitmap::new(2, 2, vec![0; 3]);
        assert!(curve_bitmap(&image, &JsSpline::new()).is_err());
    }
}
