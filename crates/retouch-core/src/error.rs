//! Error types shared across the editing core.
//!
//! Errors fall into three groups:
//! - [`DomainError`]: invalid geometric or curve input. Callers treat these as
//!   a no-op and skip the affected frame.
//! - [`CacheError`]: the bitmap pool could not provide a buffer. Rendering
//!   cannot continue, so these end the edit session.
//! - [`RenderError`] / [`SessionError`]: wrappers used by the renderer and the
//!   edit session.

use thiserror::Error;

/// Invalid geometric or curve input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// A spline needs at least two control points.
    #[error("spline needs at least 2 control points, got {count}")]
    InsufficientPoints { count: usize },

    /// Two control points share the same x, which would divide by zero.
    #[error("duplicate control point at x = {x}")]
    DuplicateX { x: f32 },

    /// Control points are not strictly increasing in x.
    #[error("control point {index} is out of order")]
    PointOutOfOrder { index: usize },

    /// Index does not address an existing control point.
    #[error("index {index} out of range for {len} control points")]
    IndexOutOfRange { index: usize, len: usize },

    /// Control point lies outside the unit square.
    #[error("control point ({x}, {y}) is outside the unit square")]
    PointOutOfRange { x: f32, y: f32 },

    /// A NaN or infinite value reached a geometric operation.
    #[error("non-finite value in geometric input")]
    NotFinite,

    /// The crop rectangle has no area.
    #[error("crop rectangle has zero area")]
    ZeroAreaCrop,

    /// A normalized rectangle violates `0 <= left < right <= 1` (same for y).
    #[error("invalid normalized rectangle ({left}, {top}, {right}, {bottom})")]
    InvalidCrop {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },

    /// Aspect ratio components must be positive.
    #[error("invalid aspect ratio {width}:{height}")]
    InvalidAspectRatio { width: f64, height: f64 },

    /// Bitmap or view dimensions must be non-zero.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A transform could not be inverted.
    #[error("matrix is not invertible")]
    NonInvertibleMatrix,
}

/// The bitmap pool could not provide a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The configured memory budget is exhausted even after evicting idle buffers.
    #[error("bitmap cache exhausted: requested {requested} bytes with a budget of {budget}")]
    Exhausted { requested: usize, budget: usize },

    /// The allocator refused the request.
    #[error("failed to allocate {bytes} bytes for a bitmap")]
    AllocationFailed { bytes: usize },
}

/// Failure while computing a render tier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Fatal: no buffer available.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Skipped frame.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Failure of an edit-session operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The session was aborted after the bitmap pool ran out of memory.
    #[error("edit session aborted: {0}")]
    Aborted(CacheError),

    /// The operation needs a loaded image.
    #[error("no image loaded")]
    NoImage,

    /// The image handed to the session cannot be edited.
    #[error(transparent)]
    InvalidImage(#[from] DomainError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display() {
        let err = DomainError::InsufficientPoints { count: 1 };
        assert_eq!(err.to_string(), "spline needs at least 2 control points, got 1");

        let err = DomainError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of range for 2 control points");
    }

    #[test]
    fn test_render_error_wraps_cache_error() {
        let err: RenderError = CacheError::AllocationFailed { bytes: 12 }.into();
        assert!(matches!(err, RenderError::Cache(_)));
        assert_eq!(err.to_string(), "failed to allocate 12 bytes for a bitmap");
    }
}
