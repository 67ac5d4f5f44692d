//! WASM bindings for the interactive crop editor.
//!
//! Handles are exchanged as edge bit flags: 1 = left, 2 = top, 4 = right,
//! 8 = bottom, 16 = move. Corners combine two sides.

use retouch_core::{CropEngine, DomainError, Edges, EditorConfig, GeometryState, Point, Rect};
use wasm_bindgen::prelude::*;

use crate::geometry::JsGeometry;
use crate::js_error;

#[wasm_bindgen]
#[derive(Debug)]
pub struct JsCropEngine {
    inner: CropEngine,
}

#[wasm_bindgen]
impl JsCropEngine {
    /// # Arguments
    /// * `geometry` - Geometry the crop starts from
    /// * `bitmap_w`, `bitmap_h` - Bitmap size in pixels
    /// * `view_w`, `view_h` - Size of the view the editor is drawn in
    ///
    /// # Errors
    /// Returns an error for empty sizes.
    #[wasm_bindgen(constructor)]
    pub fn new(
        geometry: &JsGeometry,
        bitmap_w: u32,
        bitmap_h: u32,
        view_w: u32,
        view_h: u32,
    ) -> Result<JsCropEngine, JsValue> {
        Self::create(geometry.state(), bitmap_w, bitmap_h, view_w, view_h)
            .map_err(|e| js_error("Crop editor failed", e))
    }

    pub fn set_view_size(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        self.inner
            .set_view_size(width, height)
            .map_err(|e| js_error("Invalid view size", e))
    }

    /// Crop as drawn on screen, `[left, top, right, bottom]`.
    pub fn screen_crop_rect(&self) -> Vec<f64> {
        rect_to_vec(&self.inner.screen_crop_rect())
    }

    /// Bitmap to screen matrix, `[sx, kx, tx, ky, sy, ty]`.
    pub fn image_to_screen(&self) -> Vec<f64> {
        self.inner.image_to_screen().to_array().to_vec()
    }

    /// Handle under the pointer, for hover feedback.
    pub fn hovered_edge(&self, x: f64, y: f64) -> u8 {
        self.inner.hovered_edge(Point::new(x, y)).bits()
    }

    /// Start a drag; returns the selected edges, 0 when the pointer misses.
    pub fn begin_drag(&mut self, x: f64, y: f64) -> u8 {
        self.inner.begin_drag(Point::new(x, y)).bits()
    }

    /// Start a drag on a handle named by its on-screen side.
    pub fn begin_handle_drag(&mut self, handle: u8, x: f64, y: f64) -> u8 {
        let handle = Edges::from_bits(handle).unwrap_or(Edges::NONE);
        self.inner.begin_handle_drag(handle, Point::new(x, y)).bits()
    }

    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        self.inner.drag_to(Point::new(x, y))
    }

    /// Finish the drag and return the geometry with the new crop.
    pub fn end_drag(&mut self) -> Result<JsGeometry, JsValue> {
        self.inner
            .end_drag()
            .map(JsGeometry::from_state)
            .map_err(|e| js_error("Crop failed", e))
    }

    pub fn cancel_drag(&mut self) {
        self.inner.cancel_drag();
    }

    /// Lock the crop to `width:height` as seen on screen. Returns false
    /// when the locked crop would be too small.
    pub fn set_aspect_ratio(&mut self, width: f64, height: f64) -> Result<bool, JsValue> {
        self.inner
            .set_aspect_ratio(width, height)
            .map_err(|e| js_error("Invalid aspect ratio", e))
    }

    pub fn set_original_aspect(&mut self) -> bool {
        self.inner.set_original_aspect()
    }

    pub fn clear_aspect_ratio(&mut self) {
        self.inner.clear_aspect_ratio();
    }

    pub fn geometry(&self) -> JsGeometry {
        JsGeometry::from_state(*self.inner.geometry())
    }
}

impl JsCropEngine {
    pub(crate) fn from_engine(inner: CropEngine) -> Self {
        Self { inner }
    }

    fn create(
        geometry: GeometryState,
        bitmap_w: u32,
        bitmap_h: u32,
        view_w: u32,
        view_h: u32,
    ) -> Result<Self, DomainError> {
        let config = EditorConfig::default();
        CropEngine::new(geometry, bitmap_w, bitmap_h, view_w, view_h, &config).map(Self::from_engine)
    }
}

fn rect_to_vec(r: &Rect) -> Vec<f64> {
    vec![r.left, r.top, r.right, r.bottom]
}
