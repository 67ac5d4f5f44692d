//! Compute render tiers from the preview and high-resolution sources.

use std::sync::Arc;

use super::draw::{draw_transformed, Interpolation};
use super::{RenderRequest, RenderTier};
use crate::bitmap::{Bitmap, BitmapCache, BitmapTag, PooledBitmap};
use crate::curve::apply_channel_curves;
use crate::error::{DomainError, RenderError};
use crate::geometry::{crop_selection_to_screen_matrix, final_geometry_rect, true_crop_rect, Matrix};
use crate::preset::{CustomFilter, EditPreset, EditRepresentation};

/// Applies host-defined filters.
pub trait FilterStage: Send + Sync {
    fn apply(&self, filter: &CustomFilter, bitmap: &mut Bitmap) -> Result<(), DomainError>;
}

/// Leaves pixels untouched for every custom filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl FilterStage for PassThrough {
    fn apply(&self, _filter: &CustomFilter, _bitmap: &mut Bitmap) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Renders requests for one loaded image.
pub struct Renderer {
    preview: Arc<Bitmap>,
    highres: Option<Arc<Bitmap>>,
    original_size: (u32, u32),
    cache: BitmapCache,
    stage: Arc<dyn FilterStage>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("preview", &(self.preview.width, self.preview.height))
            .field(
                "highres",
                &self.highres.as_ref().map(|h| (h.width, h.height)),
            )
            .field("original_size", &self.original_size)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// # Arguments
    ///
    /// * `preview` - Downscaled source for the GEOMETRY and FILTERS tiers
    /// * `highres` - Larger source for PARTIAL and HIGHRES, if kept
    /// * `original_size` - Size of the image the session's matrices refer to
    pub fn new(
        preview: Arc<Bitmap>,
        highres: Option<Arc<Bitmap>>,
        original_size: (u32, u32),
        cache: BitmapCache,
        stage: Arc<dyn FilterStage>,
    ) -> Self {
        Self {
            preview,
            highres,
            original_size,
            cache,
            stage,
        }
    }

    pub fn preview(&self) -> &Bitmap {
        &self.preview
    }

    pub fn original_size(&self) -> (u32, u32) {
        self.original_size
    }

    /// Render one request.
    ///
    /// Invalid geometry (zero-area crop, singular matrix) yields `Ok(None)`
    /// so the frame is skipped. Only pool failures are errors.
    pub fn render(&self, request: &RenderRequest) -> Result<Option<PooledBitmap>, RenderError> {
        let result = match request.tier {
            RenderTier::Geometry | RenderTier::Filters => {
                self.render_frame(&self.preview, &request.preset, request.tier, 1.0, Interpolation::Bilinear)
            }
            RenderTier::Partial => self.render_partial(request),
            RenderTier::HighRes => self.render_highres(request),
        };

        match result {
            Ok(bitmap) => Ok(Some(bitmap)),
            Err(RenderError::Domain(err)) => {
                tracing::debug!(tier = ?request.tier, %err, "skipping frame");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn best_source(&self) -> &Bitmap {
        self.highres.as_deref().unwrap_or(self.preview.as_ref())
    }

    /// Draw the preset's crop of `source` at `scale` into a new bitmap,
    /// then run its filters.
    fn render_frame(
        &self,
        source: &Bitmap,
        preset: &EditPreset,
        tier: RenderTier,
        scale: f64,
        interpolation: Interpolation,
    ) -> Result<PooledBitmap, RenderError> {
        let tag = tier.bitmap_tag();
        let mut out = if preset.applies_geometry() {
            let geometry = preset.geometry();
            let (w, h) = if scale == 1.0 {
                let rect = final_geometry_rect(&geometry, source.width, source.height);
                frame_size(rect.width(), rect.height())
            } else {
                let crop = true_crop_rect(&geometry, source.width, source.height).scale(scale);
                frame_size(crop.width(), crop.height())
            };
            if w == 0 || h == 0 {
                return Err(DomainError::ZeroAreaCrop.into());
            }
            let matrix = crop_selection_to_screen_matrix(&geometry, source.width, source.height, w, h);
            let mut out = self.cache.checkout(w, h, tag)?;
            draw_transformed(source, &mut out, &matrix, interpolation)?;
            out
        } else {
            let mut out = self.cache.checkout(source.width, source.height, tag)?;
            out.pixels.copy_from_slice(&source.pixels);
            out
        };

        if preset.applies_filters() {
            self.apply_filters(preset, &mut out)?;
        }
        Ok(out)
    }

    fn render_partial(&self, request: &RenderRequest) -> Result<PooledBitmap, RenderError> {
        let (view_w, view_h) = request.view_size;
        if view_w == 0 || view_h == 0 {
            return Err(DomainError::InvalidDimensions {
                width: view_w,
                height: view_h,
            }
            .into());
        }

        let source = self.best_source();
        let (orig_w, orig_h) = self.original_size;
        let to_original = Matrix::scaling(
            f64::from(orig_w) / f64::from(source.width),
            f64::from(orig_h) / f64::from(source.height),
        );
        let matrix = to_original.then(request.matrix);

        let mut out = self.cache.checkout(view_w, view_h, BitmapTag::Partial)?;
        draw_transformed(source, &mut out, &matrix, Interpolation::Bilinear)?;
        self.apply_filters(&request.preset, &mut out)?;
        Ok(out)
    }

    fn render_highres(&self, request: &RenderRequest) -> Result<PooledBitmap, RenderError> {
        let source = self.best_source();
        let ratio = f64::from(self.preview.width) / f64::from(source.width);
        let scale = (request.stamp.scale_factor * ratio).min(1.0);
        self.render_frame(source, &request.preset, RenderTier::HighRes, scale, Interpolation::Lanczos3)
    }

    fn apply_filters(&self, preset: &EditPreset, bitmap: &mut Bitmap) -> Result<(), RenderError> {
        for rep in preset.filters() {
            match rep {
                EditRepresentation::Curves(curves) => {
                    let luts = curves.luts()?;
                    apply_channel_curves(&mut bitmap.pixels, &luts);
                }
                EditRepresentation::Custom(filter) => self.stage.apply(filter, bitmap)?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Pixel size of a frame, rounded to absorb floating point error.
fn frame_size(width: f64, height: f64) -> (u32, u32) {
    (width.round() as u32, height.round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Channel, CurveEdit};
    use crate::error::CacheError;
    use crate::geometry::{Mirror, NormalizedRect};
    use crate::preset::EditOp;
    use crate::render::RequestStamp;

    fn numbered(width: u32, height: u32) -> Bitmap {
        let mut pixels = Vec::with_capacity(Bitmap::byte_len(width, height));
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 20) as u8, (y * 20) as u8, 100]);
            }
        }
        Bitmap::new(width, height, pixels)
    }

    fn renderer(preview: Bitmap, stage: Arc<dyn FilterStage>) -> Renderer {
        let size = (preview.width, preview.height);
        Renderer::new(
            Arc::new(preview),
            None,
            size,
            BitmapCache::new(1 << 20, 2),
            stage,
        )
    }

    fn stamp(scale_factor: f64) -> RequestStamp {
        RequestStamp {
            sequence: 1,
            preset_epoch: 0,
            view_epoch: 0,
            scale_factor,
        }
    }

    fn request(tier: RenderTier, preset: EditPreset) -> RenderRequest {
        RenderRequest::new(tier, preset, stamp(1.0))
    }

    #[test]
    fn test_geometry_tier_applies_crop() {
        let r = renderer(numbered(8, 4), Arc::new(PassThrough));
        let mut preset = EditPreset::new();
        let crop = NormalizedRect::new(0.25, 0.5, 0.75, 1.0).unwrap();
        preset.apply_op(&EditOp::Crop(crop), 8, 4).unwrap();

        let out = r.render(&request(RenderTier::Geometry, preset)).unwrap().unwrap();
        assert_eq!((out.width, out.height), (4, 2));
        assert_eq!(out.pixel(0, 0), r.preview().pixel(2, 2));
        assert_eq!(out.pixel(3, 1), r.preview().pixel(5, 3));
        assert_eq!(out.tag(), BitmapTag::Geometry);
    }

    #[test]
    fn test_geometry_tier_ignores_filters() {
        let r = renderer(numbered(4, 4), Arc::new(PassThrough));
        let mut preset = EditPreset::new();
        preset
            .apply_op(
                &EditOp::Curve {
                    channel: Channel::Rgb,
                    edit: CurveEdit::Insert { x: 0.5, y: 0.2 },
                },
                4,
                4,
            )
            .unwrap();
        let out = r.render(&request(RenderTier::Geometry, preset)).unwrap().unwrap();
        assert_eq!(out.to_bitmap(), *r.preview());
    }

    #[test]
    fn test_filters_tier_keeps_geometry_out() {
        let r = renderer(numbered(4, 2), Arc::new(PassThrough));
        let mut preset = EditPreset::new();
        preset.apply_op(&EditOp::CycleMirror, 4, 2).unwrap();
        assert_eq!(preset.geometry().mirror, Mirror::Horizontal);

        let out = r.render(&request(RenderTier::Filters, preset)).unwrap().unwrap();
        assert_eq!(out.to_bitmap(), *r.preview());
    }

    struct Invert;

    impl FilterStage for Invert {
        fn apply(&self, filter: &CustomFilter, bitmap: &mut Bitmap) -> Result<(), DomainError> {
            if filter.name == "invert" {
                bitmap.pixels.iter_mut().for_each(|p| *p = 255 - *p);
            }
            Ok(())
        }
    }

    #[test]
    fn test_custom_filter_stage_runs() {
        let r = renderer(Bitmap::filled(2, 2, [10, 20, 30]), Arc::new(Invert));
        let mut preset = EditPreset::new();
        preset
            .apply_op(&EditOp::SetFilter(CustomFilter::new("invert")), 2, 2)
            .unwrap();
        let out = r.render(&request(RenderTier::Filters, preset)).unwrap().unwrap();
        assert_eq!(out.pixel(1, 1), [245, 235, 225]);
    }

    #[test]
    fn test_partial_renders_viewport() {
        let r = renderer(numbered(4, 4), Arc::new(PassThrough));
        // Original pixels scaled by 2 into an 8x8 viewport.
        let req = RenderRequest::partial(
            EditPreset::new(),
            stamp(2.0),
            Matrix::scaling(2.0, 2.0),
            (8, 8),
            crate::geometry::Rect::from_size(4.0, 4.0),
        );
        let out = r.render(&req).unwrap().unwrap();
        assert_eq!((out.width, out.height), (8, 8));
        assert_eq!(out.pixel(0, 0), r.preview().pixel(0, 0));
        assert_eq!(out.tag(), BitmapTag::Partial);
    }

    #[test]
    fn test_singular_partial_matrix_skips_frame() {
        let r = renderer(numbered(4, 4), Arc::new(PassThrough));
        let req = RenderRequest::partial(
            EditPreset::new(),
            stamp(1.0),
            Matrix::scaling(0.0, 0.0),
            (4, 4),
            crate::geometry::Rect::from_size(4.0, 4.0),
        );
        assert!(r.render(&req).unwrap().is_none());
    }

    #[test]
    fn test_highres_from_preview_at_unit_zoom() {
        let r = renderer(numbered(6, 4), Arc::new(PassThrough));
        let out = r
            .render(&request(RenderTier::HighRes, EditPreset::new()))
            .unwrap()
            .unwrap();
        assert_eq!((out.width, out.height), (6, 4));
        assert_eq!(out.tag(), BitmapTag::HighRes);
    }

    #[test]
    fn test_highres_scales_down_large_source() {
        let preview = numbered(4, 4);
        let highres = Bitmap::filled(16, 16, [50, 60, 70]);
        let r = Renderer::new(
            Arc::new(preview),
            Some(Arc::new(highres)),
            (16, 16),
            BitmapCache::new(1 << 20, 2),
            Arc::new(PassThrough),
        );
        // scale 2 x (4 / 16) = 0.5 of the 16x16 crop.
        let req = RenderRequest::new(RenderTier::HighRes, EditPreset::new(), stamp(2.0));
        let out = r.render(&req).unwrap().unwrap();
        assert_eq!((out.width, out.height), (8, 8));
        assert_eq!(out.pixel(4, 4), [50, 60, 70]);
    }

    #[test]
    fn test_frame_size_rounds_near_integers() {
        assert_eq!(frame_size(6.9999999, 3.0000001), (7, 3));
        assert_eq!(frame_size(4.0, 2.0), (4, 2));
    }

    #[test]
    fn test_scaled_frame_matches_unscaled_rounding() {
        let preview = numbered(4, 4);
        let highres = Bitmap::filled(10, 10, [50, 60, 70]);
        let r = Renderer::new(
            Arc::new(preview),
            Some(Arc::new(highres)),
            (10, 10),
            BitmapCache::new(1 << 20, 2),
            Arc::new(PassThrough),
        );
        // scale 1.5 x (4 / 10) = 0.6 of the 10x10 crop, up to float error.
        let req = RenderRequest::new(RenderTier::HighRes, EditPreset::new(), stamp(1.5));
        let out = r.render(&req).unwrap().unwrap();
        assert_eq!((out.width, out.height), (6, 6));
    }

    #[test]
    fn test_render_reports_cache_exhaustion() {
        let r = Renderer::new(
            Arc::new(numbered(8, 8)),
            None,
            (8, 8),
            BitmapCache::new(16, 2),
            Arc::new(PassThrough),
        );
        let err = r
            .render(&request(RenderTier::Geometry, EditPreset::new()))
            .unwrap_err();
        assert!(matches!(err, RenderError::Cache(CacheError::Exhausted { .. })));
    }
}
