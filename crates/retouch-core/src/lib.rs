//! Retouch Core - photo editing geometry and rendering library
//!
//! This crate provides the editing core for Retouch: geometric edits
//! composed into matrices, tone curve splines, the interactive crop editor,
//! edit presets and the tiered background renderer coordinated by an
//! [`EditSession`].

pub mod bitmap;
pub mod config;
pub mod crop;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod preset;
pub mod render;
pub mod session;

pub use bitmap::{Bitmap, BitmapCache, BitmapTag, PooledBitmap};
pub use config::{ConfigError, EditorConfig};
pub use crop::{CropEngine, DragState, Edges};
pub use curve::{Channel, CurveEdit, SolvedSpline, Spline, ToneCurveLut};
pub use error::{CacheError, DomainError, RenderError, SessionError};
pub use geometry::{GeometryState, Matrix, Mirror, MirrorAxis, NormalizedRect, Point, Rect, Rotation};
pub use preset::{CurvesRepresentation, CustomFilter, EditOp, EditPreset, EditRepresentation};
pub use render::{
    FilterStage, InlineExecutor, PoolExecutor, RenderExecutor, RenderRequest, RenderTier,
    Renderer, RequestStamp,
};
pub use session::{DisplayBitmap, EditSession, ObserverId, RenderDisposition, SessionEvent};

/// Tone curve control point in the unit square.
///
/// `y` is inverted: `y = 1` is the bottom of the curve editor, so the
/// identity curve runs from `(0, 1)` to `(1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ControlPoint {
    /// Input value (0.0 to 1.0)
    pub x: f32,
    /// Output value (0.0 to 1.0, inverted)
    pub y: f32,
}

impl ControlPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
