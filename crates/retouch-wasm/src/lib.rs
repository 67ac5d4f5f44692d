//! Retouch WASM - WebAssembly bindings for Retouch
//!
//! This crate exposes the retouch-core editing model to JavaScript/TypeScript.
//!
//! # Module Structure
//!
//! - `types` - Bitmap wrapper and resizing
//! - `geometry` - Rotation, straighten, mirror and crop with their matrices
//! - `curve` - Editable tone curve splines
//! - `crop` - Interactive crop editor
//! - `session` - Edit session with undo history and tiered rendering
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsBitmap, JsEditSession } from '@retouch/wasm';
//!
//! await init();
//!
//! const session = new JsEditSession();
//! session.load_image(new JsBitmap(width, height, rgbPixels));
//! session.set_view_size(canvas.width, canvas.height);
//! session.apply_edit("RotateStep");
//! const shown = session.display_bitmap();
//! ```

use wasm_bindgen::prelude::*;

mod crop;
mod curve;
mod geometry;
mod session;
mod types;

pub use crop::JsCropEngine;
pub use curve::{apply_spline, JsSpline};
pub use geometry::JsGeometry;
pub use session::JsEditSession;
pub use types::{resize_to_fit, JsBitmap};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Error value handed to JavaScript.
pub(crate) fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}
