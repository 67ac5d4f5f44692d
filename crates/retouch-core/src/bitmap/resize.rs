//! Bitmap resizing for preview and high-resolution sources.
//!
//! Uses the `image` crate's resampling filters. All functions return new
//! bitmaps without modifying the input.

use serde::{Deserialize, Serialize};

use super::Bitmap;
use crate::error::DomainError;

/// Filter type for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Resize a bitmap to exact dimensions.
///
/// # Errors
///
/// Returns `DomainError::InvalidDimensions` for a zero target size or a
/// source whose pixel data does not match its dimensions.
pub fn resize(
    bitmap: &Bitmap,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Bitmap, DomainError> {
    if width == 0 || height == 0 {
        return Err(DomainError::InvalidDimensions { width, height });
    }

    if bitmap.width == width && bitmap.height == height {
        return Ok(bitmap.clone());
    }

    let rgb_image = bitmap.to_rgb_image().ok_or(DomainError::InvalidDimensions {
        width: bitmap.width,
        height: bitmap.height,
    })?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(Bitmap::from_rgb_image(resized))
}

/// Resize so the longest edge is at most `max_edge`, preserving aspect ratio.
///
/// Bitmaps that already fit are returned unchanged; nothing is upscaled.
pub fn resize_to_fit(
    bitmap: &Bitmap,
    max_edge: u32,
    filter: FilterType,
) -> Result<Bitmap, DomainError> {
    if max_edge == 0 {
        return Err(DomainError::InvalidDimensions {
            width: max_edge,
            height: max_edge,
        });
    }

    if bitmap.width <= max_edge && bitmap.height <= max_edge {
        return Ok(bitmap.clone());
    }

    let (new_width, new_height) = calculate_fit_dimensions(bitmap.width, bitmap.height, max_edge);
    resize(bitmap, new_width, new_height, filter)
}

/// Dimensions that fit within `max_edge` while preserving aspect ratio.
pub fn calculate_fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = width as f64 / height as f64;

    if width >= height {
        let new_height = (max_edge as f64 / ratio).round() as u32;
        (max_edge, new_height.max(1))
    } else {
        let new_width = (max_edge as f64 * ratio).round() as u32;
        (new_width.max(1), max_edge)
    }
}
