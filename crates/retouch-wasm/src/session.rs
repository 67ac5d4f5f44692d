//! WASM bindings for the edit session.
//!
//! The browser has no worker pool here, so renders run inline on the
//! calling thread and are applied before each call returns.

use std::sync::Arc;

use retouch_core::{
    EditOp, EditPreset, EditSession, EditorConfig, InlineExecutor, Point, RenderTier,
    SessionError,
};
use wasm_bindgen::prelude::*;

use crate::crop::JsCropEngine;
use crate::js_error;
use crate::types::JsBitmap;

#[wasm_bindgen]
pub struct JsEditSession {
    inner: EditSession,
}

#[wasm_bindgen]
impl JsEditSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsEditSession {
        Self::with_editor_config(EditorConfig::default())
    }

    /// Create a session from a JSON editor config; missing keys take their
    /// defaults.
    pub fn with_config(json: &str) -> Result<JsEditSession, JsValue> {
        let config = EditorConfig::from_json(json).map_err(|e| js_error("Invalid config", e))?;
        Ok(Self::with_editor_config(config))
    }

    /// Start editing `image` with no edits applied.
    pub fn load_image(&self, image: &JsBitmap) -> Result<(), JsValue> {
        self.load(image, EditPreset::new())
            .map_err(|e| js_error("Load failed", e))
    }

    /// Start editing `image` from a saved preset.
    pub fn load_image_with_preset(&self, image: &JsBitmap, preset: JsValue) -> Result<(), JsValue> {
        let preset: EditPreset = serde_wasm_bindgen::from_value(preset)
            .map_err(|e| js_error("Invalid preset", e))?;
        self.load(image, preset)
            .map_err(|e| js_error("Load failed", e))
    }

    pub fn preset(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.preset())
            .map_err(|e| js_error("Serialize failed", e))
    }

    /// Apply one edit, e.g. `"RotateStep"` or `{ Straighten: 4.5 }`.
    /// Returns whether the preset changed.
    pub fn apply_edit(&self, op: JsValue) -> Result<bool, JsValue> {
        let op: EditOp =
            serde_wasm_bindgen::from_value(op).map_err(|e| js_error("Invalid edit", e))?;
        self.edit(op).map_err(|e| js_error("Edit failed", e))
    }

    pub fn undo(&self) -> Result<bool, JsValue> {
        self.settled(self.inner.undo())
            .map_err(|e| js_error("Undo failed", e))
    }

    pub fn redo(&self) -> Result<bool, JsValue> {
        self.settled(self.inner.redo())
            .map_err(|e| js_error("Redo failed", e))
    }

    pub fn reset_history(&self) -> Result<(), JsValue> {
        self.settled(self.inner.reset_history())
            .map_err(|e| js_error("Reset failed", e))
    }

    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    pub fn has_modifications(&self) -> bool {
        self.inner.has_modifications()
    }

    pub fn set_view_size(&self, width: u32, height: u32) {
        self.inner.set_view_size(width, height);
        self.inner.process_completed();
    }

    /// Returns the zoom actually applied after clamping.
    pub fn set_scale_factor(&self, scale_factor: f64) -> f64 {
        let applied = self.inner.set_scale_factor(scale_factor);
        self.inner.process_completed();
        applied
    }

    pub fn set_translation(&self, x: f64, y: f64) {
        self.inner.set_translation(Point::new(x, y));
        self.inner.process_completed();
    }

    pub fn set_show_original(&self, show: bool) {
        self.inner.set_show_original(show);
    }

    /// Bitmap to draw now, or undefined before the first render.
    pub fn display_bitmap(&self) -> Option<JsBitmap> {
        self.inner
            .display_bitmap()
            .map(|shown| JsBitmap::from_pooled(&shown.bitmap))
    }

    /// Tier of [`display_bitmap`](Self::display_bitmap): 0 = geometry,
    /// 1 = filters, 2 = partial, 3 = high resolution.
    pub fn display_tier(&self) -> Option<u8> {
        self.inner.display_bitmap().map(|shown| tier_code(shown.tier))
    }

    /// A crop editor for the current geometry and view size.
    pub fn crop_engine(&self) -> Result<JsCropEngine, JsValue> {
        self.inner
            .crop_engine()
            .map(JsCropEngine::from_engine)
            .map_err(|e| js_error("Crop editor failed", e))
    }
}

impl Default for JsEditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEditSession {
    fn with_editor_config(config: EditorConfig) -> Self {
        Self {
            inner: EditSession::new(config, Arc::new(InlineExecutor)),
        }
    }

    fn load(&self, image: &JsBitmap, preset: EditPreset) -> Result<(), SessionError> {
        let bitmap = image.to_bitmap()?;
        self.settled(self.inner.load_image(bitmap, preset))
    }

    fn edit(&self, op: EditOp) -> Result<bool, SessionError> {
        self.settled(self.inner.apply_edit(op))
    }

    /// Apply the renders the call just ran, then hand back its result.
    fn settled<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        self.inner.process_completed();
        result
    }
}

fn tier_code(tier: RenderTier) -> u8 {
    match tier {
        RenderTier::Geometry => 0,
        RenderTier::Filters => 1,
        RenderTier::Partial => 2,
        RenderTier::HighRes => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> JsBitmap {
        JsBitmap::new(40, 20, vec![90u8; 40 * 20 * 3])
    }

    #[test]
    fn test_load_renders_immediately() {
        let session = JsEditSession::new();
        assert!(session.display_bitmap().is_none());
        session.load(&image(), EditPreset::new()).unwrap();
        // Not zoomed and no high resolution source: the preview-sized
        // HIGHRES render is shown.
        assert_eq!(session.display_tier(), Some(3));
        let shown = session.display_bitmap().unwrap();
        assert_eq!((shown.width(), shown.height()), (40, 20));
    }

    #[test]
    fn test_rotate_and_undo() {
        let session = JsEditSession::new();
        session.load(&image(), EditPreset::new()).unwrap();
        assert!(session.edit(EditOp::RotateStep).unwrap());
        let shown = session.display_bitmap().unwrap();
        assert_eq!((shown.width(), shown.height()), (20, 40));
        assert!(session.has_modifications());

        assert!(session.undo().unwrap());
        assert!(!session.has_modifications());
        assert!(session.can_redo());
    }

    #[test]
    fn test_edit_before_load_fails() {
        let session = JsEditSession::new();
        assert_eq!(session.edit(EditOp::RotateStep), Err(SessionError::NoImage));
    }

    #[test]
    fn test_load_rejects_bad_buffer() {
        let session = JsEditSession::new();
        let bad = JsBitmap::new(4, 4, vec![0; 10]);
        assert!(matches!(
            session.load(&bad, EditPreset::new()),
            Err(SessionError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_zoom_shows_partial() {
        let session = JsEditSession::new();
        session.load(&image(), EditPreset::new()).unwrap();
        session.set_view_size(80, 40);
        assert_eq!(session.set_scale_factor(2.0), 2.0);
        assert_eq!(session.display_tier(), Some(2));
    }

    #[test]
    fn test_tier_codes() {
        let codes: Vec<u8> = RenderTier::ALL.iter().map(|t| tier_code(*t)).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
    }
}
