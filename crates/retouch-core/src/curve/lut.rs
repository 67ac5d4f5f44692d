//! Lookup tables built from solved tone curves, and their application to
//! RGB pixels.

use super::spline::SolvedSpline;

// ============================================================================
// LUT Type
// ============================================================================

/// Pre-computed 256-entry lookup table for efficient curve application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneCurveLut {
    /// LUT values: lut[input] = output
    pub lut: [u8; 256],
}

impl ToneCurveLut {
    /// Quantize a solved curve to bytes.
    pub fn from_spline(spline: &SolvedSpline) -> Self {
        Self::from_applied_curve(&spline.applied_curve())
    }

    /// Quantize 256 output intensities in [0, 1].
    pub fn from_applied_curve(curve: &[f32; 256]) -> Self {
        let mut lut = [0u8; 256];
        for (out, &v) in lut.iter_mut().zip(curve.iter()) {
            *out = (v * 255.0).clamp(0.0, 255.0).round() as u8;
        }
        Self { lut }
    }

    /// Create identity LUT (no change).
    pub fn identity() -> Self {
        let mut lut = [0u8; 256];
        for (i, lut_value) in lut.iter_mut().enumerate() {
            *lut_value = i as u8;
        }
        Self { lut }
    }

    /// Check if this LUT is identity.
    pub fn is_identity(&self) -> bool {
        self.lut.iter().enumerate().all(|(i, &v)| v == i as u8)
    }

    /// `self` followed by `next`.
    pub fn then(&self, next: &ToneCurveLut) -> ToneCurveLut {
        let mut lut = [0u8; 256];
        for (out, &v) in lut.iter_mut().zip(self.lut.iter()) {
            *out = next.lut[v as usize];
        }
        ToneCurveLut { lut }
    }
}

impl Default for ToneCurveLut {
    fn default() -> Self {
        Self::identity()
    }
}

/// Master curve plus one curve per color channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLuts {
    pub master: ToneCurveLut,
    pub red: ToneCurveLut,
    pub green: ToneCurveLut,
    pub blue: ToneCurveLut,
}

impl ChannelLuts {
    pub fn is_identity(&self) -> bool {
        self.master.is_identity()
            && self.red.is_identity()
            && self.green.is_identity()
            && self.blue.is_identity()
    }

    /// Fold the master curve into each channel.
    pub fn combined(&self) -> [ToneCurveLut; 3] {
        [
            self.master.then(&self.red),
            self.master.then(&self.green),
            self.master.then(&self.blue),
        ]
    }
}

// ============================================================================
// Curve Application
// ============================================================================

/// Apply tone curve LUT to RGB pixels in place.
///
/// # Arguments
/// * `pixels` - RGB pixel data (3 bytes per pixel)
/// * `lut` - Pre-computed lookup table
pub fn apply_tone_curve(pixels: &mut [u8], lut: &ToneCurveLut) {
    // Early exit for identity
    if lut.is_identity() {
        return;
    }

    for chunk in pixels.chunks_exact_mut(3) {
        chunk[0] = lut.lut[chunk[0] as usize];
        chunk[1] = lut.lut[chunk[1] as usize];
        chunk[2] = lut.lut[chunk[2] as usize];
    }
}

/// Apply the master curve, then the per-channel curves, to RGB pixels.
pub fn apply_channel_curves(pixels: &mut [u8], luts: &ChannelLuts) {
    if luts.is_identity() {
        return;
    }
    let [r, g, b] = luts.combined();

    for chunk in pixels.chunks_exact_mut(3) {
        chunk[0] = r.lut[chunk[0] as usize];
        chunk[1] = g.lut[chunk[1] as usize];
        chunk[2] = b.lut[chunk[2] as usize];
    }
}
