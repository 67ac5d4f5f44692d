//! Tiered background rendering.
//!
//! Each edit produces up to four render requests, one per [`RenderTier`].
//! Requests carry a [`RequestStamp`] so the edit session can tell, when a
//! result arrives, whether it still matches the live state.

mod draw;
mod executor;
mod renderer;

pub use draw::{draw_transformed, Interpolation, BACKGROUND};
pub use executor::{InlineExecutor, PoolExecutor, RenderExecutor, RenderJob};
pub use renderer::{FilterStage, PassThrough, Renderer};

use crate::bitmap::{BitmapTag, PooledBitmap};
use crate::error::RenderError;
use crate::geometry::{Matrix, Rect};
use crate::preset::EditPreset;

/// The four independently cached render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTier {
    /// Preview with geometry applied and no filters.
    Geometry,
    /// Preview with filters applied and no geometry.
    Filters,
    /// The visible region at the current zoom.
    Partial,
    /// The whole crop at the current zoom, from the high-resolution source.
    HighRes,
}

impl RenderTier {
    pub const ALL: [RenderTier; 4] = [
        RenderTier::Geometry,
        RenderTier::Filters,
        RenderTier::Partial,
        RenderTier::HighRes,
    ];

    pub fn index(self) -> usize {
        match self {
            RenderTier::Geometry => 0,
            RenderTier::Filters => 1,
            RenderTier::Partial => 2,
            RenderTier::HighRes => 3,
        }
    }

    pub fn bitmap_tag(self) -> BitmapTag {
        match self {
            RenderTier::Geometry => BitmapTag::Geometry,
            RenderTier::Filters => BitmapTag::Filters,
            RenderTier::Partial => BitmapTag::Partial,
            RenderTier::HighRes => BitmapTag::HighRes,
        }
    }

    /// Whether results are matched against the zoom and preset epoch rather
    /// than by sequence alone.
    pub fn is_view_dependent(self) -> bool {
        matches!(self, RenderTier::Partial | RenderTier::HighRes)
    }
}

/// Identifies the session state a request was issued against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestStamp {
    /// Session-wide, strictly increasing.
    pub sequence: u64,
    /// Bumped on every preset change.
    pub preset_epoch: u64,
    /// Bumped on every viewport, translation or zoom change.
    pub view_epoch: u64,
    pub scale_factor: f64,
}

/// One render pass to compute in the background.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub tier: RenderTier,
    pub preset: EditPreset,
    pub stamp: RequestStamp,
    /// Original image to screen (PARTIAL only).
    pub matrix: Matrix,
    /// Viewport size (PARTIAL only).
    pub view_size: (u32, u32),
    /// Region of the original image visible in the viewport (PARTIAL only).
    pub source_bounds: Option<Rect>,
}

impl RenderRequest {
    /// A GEOMETRY, FILTERS or HIGHRES request.
    pub fn new(tier: RenderTier, preset: EditPreset, stamp: RequestStamp) -> Self {
        let preset = match tier {
            RenderTier::Geometry => preset.geometry_only(),
            RenderTier::Filters => preset.filters_only(),
            RenderTier::Partial | RenderTier::HighRes => preset,
        };
        Self {
            tier,
            preset,
            stamp,
            matrix: Matrix::identity(),
            view_size: (0, 0),
            source_bounds: None,
        }
    }

    pub fn partial(
        preset: EditPreset,
        stamp: RequestStamp,
        matrix: Matrix,
        view_size: (u32, u32),
        source_bounds: Rect,
    ) -> Self {
        Self {
            tier: RenderTier::Partial,
            preset,
            stamp,
            matrix,
            view_size,
            source_bounds: Some(source_bounds),
        }
    }
}

/// A finished request and its outcome. `Ok(None)` means no bitmap was
/// produced and the tier stays as it is.
#[derive(Debug)]
pub struct CompletedRender {
    pub request: RenderRequest,
    pub result: Result<Option<PooledBitmap>, RenderError>,
}
