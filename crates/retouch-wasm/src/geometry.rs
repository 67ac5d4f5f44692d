//! WASM bindings for geometric edits.
//!
//! [`JsGeometry`] holds rotation, straighten, mirror and crop for one image
//! and hands out the matrices the web UI needs to draw it. Matrices are
//! returned as `[sx, kx, tx, ky, sy, ty]`; canvas `setTransform` takes them
//! as `(sx, ky, kx, sy, tx, ty)`.

use retouch_core::geometry::{
    crop_selection_to_screen_matrix, final_geometry_rect, full_geometry_matrix,
};
use retouch_core::{DomainError, EditOp, EditPreset, GeometryState, Mirror, NormalizedRect};
use wasm_bindgen::prelude::*;

use crate::js_error;

#[wasm_bindgen]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JsGeometry {
    inner: GeometryState,
}

#[wasm_bindgen]
impl JsGeometry {
    /// Unedited geometry: no rotation, no mirror, full crop.
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsGeometry {
        JsGeometry::default()
    }

    /// Read a geometry from its serialized form.
    ///
    /// # Errors
    /// Returns an error when the value is not a valid geometry.
    pub fn from_js(value: JsValue) -> Result<JsGeometry, JsValue> {
        let inner: GeometryState = serde_wasm_bindgen::from_value(value)
            .map_err(|e| js_error("Invalid geometry", e))?;
        Ok(JsGeometry { inner })
    }

    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner).map_err(|e| js_error("Serialize failed", e))
    }

    #[wasm_bindgen(getter)]
    pub fn rotation(&self) -> u32 {
        self.inner.rotation.degrees()
    }

    #[wasm_bindgen(getter)]
    pub fn straighten(&self) -> f64 {
        self.inner.straighten
    }

    /// 0 = none, 1 = horizontal, 2 = vertical, 3 = both
    #[wasm_bindgen(getter)]
    pub fn mirror(&self) -> u8 {
        match self.inner.mirror {
            Mirror::None => 0,
            Mirror::Horizontal => 1,
            Mirror::Vertical => 2,
            Mirror::Both => 3,
        }
    }

    /// Normalized crop as `[left, top, right, bottom]`.
    pub fn crop(&self) -> Vec<f64> {
        let c = self.inner.crop;
        vec![c.left(), c.top(), c.right(), c.bottom()]
    }

    pub fn is_nil(&self) -> bool {
        self.inner.is_nil()
    }

    /// Turn a quarter counter-clockwise.
    pub fn rotate_step(&mut self, bitmap_w: u32, bitmap_h: u32) -> Result<(), JsValue> {
        self.apply(&EditOp::RotateStep, bitmap_w, bitmap_h)
            .map_err(|e| js_error("Rotate failed", e))
    }

    /// Move to the next mirror mode.
    pub fn cycle_mirror(&mut self, bitmap_w: u32, bitmap_h: u32) -> Result<(), JsValue> {
        self.apply(&EditOp::CycleMirror, bitmap_w, bitmap_h)
            .map_err(|e| js_error("Mirror failed", e))
    }

    /// Set the straighten angle; the crop is reset to the largest rectangle
    /// that fits inside the tilted image.
    pub fn set_straighten(&mut self, degrees: f64, bitmap_w: u32, bitmap_h: u32) -> Result<(), JsValue> {
        self.apply(&EditOp::Straighten(degrees), bitmap_w, bitmap_h)
            .map_err(|e| js_error("Invalid straighten angle", e))
    }

    pub fn set_crop(&mut self, left: f64, top: f64, right: f64, bottom: f64) -> Result<(), JsValue> {
        let crop = NormalizedRect::new(left, top, right, bottom)
            .map_err(|e| js_error("Invalid crop", e))?;
        self.inner.crop = crop;
        Ok(())
    }

    /// Bitmap pixels to the rotated, mirrored frame at the origin.
    pub fn geometry_matrix(&self, bitmap_w: u32, bitmap_h: u32) -> Vec<f64> {
        full_geometry_matrix(&self.inner, bitmap_w, bitmap_h)
            .to_array()
            .to_vec()
    }

    /// Bitmap pixels to a view that shows the crop fitted and centered.
    pub fn screen_matrix(&self, bitmap_w: u32, bitmap_h: u32, view_w: u32, view_h: u32) -> Vec<f64> {
        crop_selection_to_screen_matrix(&self.inner, bitmap_w, bitmap_h, view_w, view_h)
            .to_array()
            .to_vec()
    }

    /// Pixel size of the fully edited image as `[width, height]`.
    pub fn final_size(&self, bitmap_w: u32, bitmap_h: u32) -> Vec<u32> {
        let r = final_geometry_rect(&self.inner, bitmap_w, bitmap_h);
        vec![r.width().round() as u32, r.height().round() as u32]
    }
}

impl JsGeometry {
    pub(crate) fn from_state(inner: GeometryState) -> Self {
        Self { inner }
    }

    pub(crate) fn state(&self) -> GeometryState {
        self.inner
    }

    /// Run one edit through a preset so the core rules for each operation
    /// apply here too.
    fn apply(&mut self, op: &EditOp, bitmap_w: u32, bitmap_h: u32) -> Result<(), DomainError> {
        let mut preset = EditPreset::new();
        preset.set_geometry(&self.inner);
        preset.apply_op(op, bitmap_w, bitmap_h)?;
        self.inner = preset.geometry();
        Ok(())
    }
}
