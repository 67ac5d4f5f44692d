//! WASM-compatible wrapper types for bitmap data.
//!
//! This module converts between JavaScript pixel buffers and the core
//! [`Bitmap`] type.

use retouch_core::bitmap::{resize_to_fit as core_resize_to_fit, FilterType};
use retouch_core::{Bitmap, DomainError, PooledBitmap};
use wasm_bindgen::prelude::*;

use crate::js_error;

/// An RGB bitmap for JavaScript.
///
/// # Memory Management
///
/// The pixel data lives in WASM memory. `pixels()` copies it out as a
/// `Uint8Array`; keep bitmaps in WASM memory between edits and only copy
/// when drawing.
#[wasm_bindgen]
pub struct JsBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsBitmap {
    /// # Arguments
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `pixels` - RGB data, 3 bytes per pixel, row-major
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsBitmap {
        JsBitmap {
            width,
            height,
            pixels,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in the pixel buffer (width * height * 3)
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Copy of the RGB pixel data as a Uint8Array.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Release WASM memory now instead of waiting for the finalizer.
    pub fn free(self) {}
}

impl JsBitmap {
    pub(crate) fn from_bitmap(bitmap: Bitmap) -> Self {
        Self {
            width: bitmap.width,
            height: bitmap.height,
            pixels: bitmap.pixels,
        }
    }

    pub(crate) fn from_pooled(bitmap: &PooledBitmap) -> Self {
        Self::from_bitmap(bitmap.to_bitmap())
    }

    /// Copy into a core bitmap, checking the buffer length.
    pub(crate) fn to_bitmap(&self) -> Result<Bitmap, DomainError> {
        if self.width == 0
            || self.height == 0
            || self.pixels.len() != Bitmap::byte_len(self.width, self.height)
        {
            return Err(DomainError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(Bitmap::new(self.width, self.height, self.pixels.clone()))
    }
}

/// Convert a u8 filter value to the core FilterType.
///
/// Values:
/// - 0 = Nearest
/// - 1 = Bilinear
/// - 2 = Lanczos3
///
/// Any other value defaults to Bilinear.
pub(crate) fn filter_from_u8(value: u8) -> FilterType {
    match value {
        0 => FilterType::Nearest,
        2 => FilterType::Lanczos3,
        _ => FilterType::Bilinear,
    }
}

pub(crate) fn fit_bitmap(image: &JsBitmap, max_edge: u32, filter: u8) -> Result<JsBitmap, DomainError> {
    let src = image.to_bitmap()?;
    let out = core_resize_to_fit(&src, max_edge, filter_from_u8(filter))?;
    Ok(JsBitmap::from_bitmap(out))
}

/// Scale an image so its longer side is at most `max_edge`, keeping its
/// aspect ratio.
///
/// # Arguments
/// * `image` - Source bitmap
/// * `max_edge` - Longest allowed side in pixels
/// * `filter` - 0 = Nearest, 1 = Bilinear, 2 = Lanczos3
///
/// # Errors
/// Returns an error when the pixel buffer does not match the dimensions.
#[wasm_bindgen]
pub fn resize_to_fit(image: &JsBitmap, max_edge: u32, filter: u8) -> Result<JsBitmap, JsValue> {
    fit_bitmap(image, max_edge, filter).map_err(|e| js_error("Resize failed", e))
}
