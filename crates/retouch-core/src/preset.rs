//! Edit presets: the ordered list of edits applied to an image.
//!
//! Geometry edits (rotate, straighten, crop, mirror) appear at most once
//! each and always precede filter edits. Filters are identified by name and
//! replaced in place when edited again. Equality is structural, which is how
//! the edit session decides whether a render tier is out of date.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::curve::{Channel, ChannelLuts, CurveEdit, Spline, ToneCurveLut};
use crate::error::DomainError;
use crate::geometry::{
    straightened_crop, GeometryState, Mirror, MirrorAxis, NormalizedRect, Rotation,
};

const ROTATION_NAME: &str = "ROTATION";
const STRAIGHTEN_NAME: &str = "STRAIGHTEN";
const CROP_NAME: &str = "CROP";
const MIRROR_NAME: &str = "MIRROR";
const CURVES_NAME: &str = "CURVES";

// ============================================================================
// Representations
// ============================================================================

/// Master and per-channel tone curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurvesRepresentation {
    splines: [Spline; 4],
}

impl CurvesRepresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spline(&self, channel: Channel) -> &Spline {
        &self.splines[channel.index()]
    }

    pub fn set_spline(&mut self, channel: Channel, spline: Spline) {
        self.splines[channel.index()] = spline;
    }

    pub fn apply_edit(&mut self, channel: Channel, edit: &CurveEdit) -> Result<(), DomainError> {
        self.splines[channel.index()].apply_edit(edit)
    }

    pub fn is_nil(&self) -> bool {
        self.splines.iter().all(Spline::is_identity)
    }

    /// Lookup tables for every channel; identity curves skip the solve.
    pub fn luts(&self) -> Result<ChannelLuts, DomainError> {
        let lut = |channel: Channel| -> Result<ToneCurveLut, DomainError> {
            let spline = self.spline(channel);
            if spline.is_identity() {
                return Ok(ToneCurveLut::identity());
            }
            Ok(ToneCurveLut::from_spline(&spline.solve()?))
        };
        Ok(ChannelLuts {
            master: lut(Channel::Rgb)?,
            red: lut(Channel::Red)?,
            green: lut(Channel::Green)?,
            blue: lut(Channel::Blue)?,
        })
    }
}

/// A filter whose pixels are produced by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFilter {
    pub name: String,
    pub parameters: BTreeMap<String, f64>,
    /// Whether the filter can render a sub-region of the image on its own.
    pub supports_partial: bool,
}

impl CustomFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
            supports_partial: true,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// One edit in a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditRepresentation {
    Rotate(Rotation),
    Straighten(f64),
    Crop(NormalizedRect),
    Mirror(Mirror),
    Curves(CurvesRepresentation),
    Custom(CustomFilter),
}

impl EditRepresentation {
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            EditRepresentation::Rotate(_)
                | EditRepresentation::Straighten(_)
                | EditRepresentation::Crop(_)
                | EditRepresentation::Mirror(_)
        )
    }

    /// Position among the geometry edits: rotate, straighten, crop, mirror.
    fn geometry_rank(&self) -> Option<u8> {
        match self {
            EditRepresentation::Rotate(_) => Some(0),
            EditRepresentation::Straighten(_) => Some(1),
            EditRepresentation::Crop(_) => Some(2),
            EditRepresentation::Mirror(_) => Some(3),
            _ => None,
        }
    }

    /// True when the edit leaves the image untouched.
    pub fn is_nil(&self) -> bool {
        match self {
            EditRepresentation::Rotate(r) => *r == Rotation::Zero,
            EditRepresentation::Straighten(a) => *a == 0.0,
            EditRepresentation::Crop(c) => c.is_full(),
            EditRepresentation::Mirror(m) => *m == Mirror::None,
            EditRepresentation::Curves(c) => c.is_nil(),
            EditRepresentation::Custom(_) => false,
        }
    }

    /// Identity of the edit within a preset.
    pub fn name(&self) -> &str {
        match self {
            EditRepresentation::Rotate(_) => ROTATION_NAME,
            EditRepresentation::Straighten(_) => STRAIGHTEN_NAME,
            EditRepresentation::Crop(_) => CROP_NAME,
            EditRepresentation::Mirror(_) => MIRROR_NAME,
            EditRepresentation::Curves(_) => CURVES_NAME,
            EditRepresentation::Custom(f) => &f.name,
        }
    }

    pub fn supports_partial_rendering(&self) -> bool {
        match self {
            EditRepresentation::Custom(f) => f.supports_partial,
            _ => true,
        }
    }
}

// ============================================================================
// User edits
// ============================================================================

/// A discrete edit issued by the user interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditOp {
    /// Rotate a quarter turn.
    RotateStep,
    /// Set the straighten angle; resets the crop to the inscribed rectangle.
    Straighten(f64),
    Crop(NormalizedRect),
    CycleMirror,
    ToggleMirror(MirrorAxis),
    Curve { channel: Channel, edit: CurveEdit },
    SetFilter(CustomFilter),
    RemoveFilter(String),
    ResetGeometry,
}

// ============================================================================
// Preset
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditPreset {
    representations: Vec<EditRepresentation>,
    apply_geometry: bool,
    apply_filters: bool,
}

impl Default for EditPreset {
    fn default() -> Self {
        Self {
            representations: Vec::new(),
            apply_geometry: true,
            apply_filters: true,
        }
    }
}

/// Geometry compares by the state it unpacks to, so the order geometry
/// edits were stored in does not matter. Filters compare in order.
impl PartialEq for EditPreset {
    fn eq(&self, other: &Self) -> bool {
        self.apply_geometry == other.apply_geometry
            && self.apply_filters == other.apply_filters
            && self.same_geometry(other)
            && self.same_filters(other)
    }
}

impl EditPreset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn representations(&self) -> &[EditRepresentation] {
        &self.representations
    }

    pub fn get(&self, name: &str) -> Option<&EditRepresentation> {
        self.representations.iter().find(|r| r.name() == name)
    }

    pub fn applies_geometry(&self) -> bool {
        self.apply_geometry
    }

    pub fn applies_filters(&self) -> bool {
        self.apply_filters
    }

    /// Copy that renders geometry only.
    pub fn geometry_only(&self) -> EditPreset {
        EditPreset {
            apply_geometry: true,
            apply_filters: false,
            ..self.clone()
        }
    }

    /// Copy that renders filters only.
    pub fn filters_only(&self) -> EditPreset {
        EditPreset {
            apply_geometry: false,
            apply_filters: true,
            ..self.clone()
        }
    }

    /// Insert or replace an edit.
    ///
    /// Geometry edits replace the one with the same name and are kept ahead
    /// of all filters, in rotate, straighten, crop, mirror order. Edits that
    /// do nothing are removed instead.
    pub fn add(&mut self, rep: EditRepresentation) {
        if let Some(rank) = rep.geometry_rank() {
            self.representations.retain(|r| r.name() != rep.name());
            if !rep.is_nil() {
                let index = self
                    .representations
                    .iter()
                    .position(|r| r.geometry_rank().map_or(true, |other| other > rank))
                    .unwrap_or(self.representations.len());
                self.representations.insert(index, rep);
            }
            return;
        }

        let existing = self
            .representations
            .iter()
            .position(|r| r.name() == rep.name());
        match (existing, rep.is_nil()) {
            (Some(i), true) => {
                self.representations.remove(i);
            }
            (Some(i), false) => self.representations[i] = rep,
            (None, true) => {}
            (None, false) => self.representations.push(rep),
        }
    }

    /// Remove a filter by name. Returns whether one was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.representations.len();
        self.representations.retain(|r| r.name() != name);
        self.representations.len() != before
    }

    fn geometry_reps(&self) -> impl Iterator<Item = &EditRepresentation> {
        self.representations.iter().filter(|r| r.is_geometry())
    }

    pub fn filters(&self) -> impl Iterator<Item = &EditRepresentation> {
        self.representations.iter().filter(|r| !r.is_geometry())
    }

    /// Unpack the geometry edits into one state.
    pub fn geometry(&self) -> GeometryState {
        let mut state = GeometryState::new();
        for rep in self.geometry_reps() {
            match rep {
                EditRepresentation::Rotate(r) => state.rotation = *r,
                EditRepresentation::Straighten(a) => state = state.with_straighten(*a),
                EditRepresentation::Crop(c) => state.crop = *c,
                EditRepresentation::Mirror(m) => state.mirror = *m,
                _ => {}
            }
        }
        state
    }

    pub fn set_geometry(&mut self, state: &GeometryState) {
        self.add(EditRepresentation::Rotate(state.rotation));
        self.add(EditRepresentation::Straighten(state.straighten));
        self.add(EditRepresentation::Crop(state.crop));
        self.add(EditRepresentation::Mirror(state.mirror));
    }

    pub fn curves(&self) -> Option<&CurvesRepresentation> {
        self.representations.iter().find_map(|r| match r {
            EditRepresentation::Curves(c) => Some(c),
            _ => None,
        })
    }

    pub fn same_geometry(&self, other: &EditPreset) -> bool {
        self.geometry() == other.geometry()
    }

    pub fn same_filters(&self, other: &EditPreset) -> bool {
        self.filters().eq(other.filters())
    }

    /// True when any edit changes the image.
    pub fn has_modifications(&self) -> bool {
        self.representations.iter().any(|r| !r.is_nil())
    }

    /// True when every edit can render a sub-region independently.
    pub fn can_do_partial_rendering(&self) -> bool {
        self.representations
            .iter()
            .all(EditRepresentation::supports_partial_rendering)
    }

    /// Apply a user edit. On error the preset is left unchanged.
    pub fn apply_op(&mut self, op: &EditOp, bitmap_w: u32, bitmap_h: u32) -> Result<(), DomainError> {
        let mut geometry = self.geometry();
        match op {
            EditOp::RotateStep => {
                geometry.rotation = geometry.rotation.next();
                self.set_geometry(&geometry);
            }
            EditOp::Straighten(angle) => {
                geometry.set_straighten(*angle)?;
                geometry.crop = straightened_crop(bitmap_w, bitmap_h, geometry.straighten)?;
                self.set_geometry(&geometry);
            }
            EditOp::Crop(crop) => {
                geometry.crop = *crop;
                self.set_geometry(&geometry);
            }
            EditOp::CycleMirror => {
                geometry.mirror = geometry.mirror.cycle();
                self.set_geometry(&geometry);
            }
            EditOp::ToggleMirror(axis) => {
                geometry.mirror = match axis {
                    MirrorAxis::Horizontal => geometry.mirror.toggle_horizontal(),
                    MirrorAxis::Vertical => geometry.mirror.toggle_vertical(),
                };
                self.set_geometry(&geometry);
            }
            EditOp::Curve { channel, edit } => {
                let mut curves = self.curves().cloned().unwrap_or_default();
                curves.apply_edit(*channel, edit)?;
                self.add(EditRepresentation::Curves(curves));
            }
            EditOp::SetFilter(filter) => self.add(EditRepresentation::Custom(filter.clone())),
            EditOp::RemoveFilter(name) => {
                self.remove(name);
            }
            EditOp::ResetGeometry => self.representations.retain(|r| !r.is_geometry()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(preset: &EditPreset) -> Vec<&str> {
        preset.representations().iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_geometry_kept_ahead_of_filters() {
        let mut preset = EditPreset::new();
        preset.add(EditRepresentation::Custom(CustomFilter::new("vignette")));
        preset.add(EditRepresentation::Mirror(Mirror::Horizontal));
        preset.add(EditRepresentation::Rotate(Rotation::Ninety));
        assert_eq!(names(&preset), vec!["ROTATION", "MIRROR", "vignette"]);
    }

    #[test]
    fn test_nil_geometry_is_dropped() {
        let mut preset = EditPreset::new();
        preset.add(EditRepresentation::Rotate(Rotation::Ninety));
        preset.add(EditRepresentation::Rotate(Rotation::Zero));
        assert!(preset.representations().is_empty());
        assert!(!preset.has_modifications());
    }

    #[test]
    fn test_filter_replaced_in_place() {
        let mut preset = EditPreset::new();
        preset.add(EditRepresentation::Custom(CustomFilter::new("a")));
        preset.add(EditRepresentation::Custom(CustomFilter::new("b")));
        preset.add(EditRepresentation::Custom(
            CustomFilter::new("a").with_parameter("amount", 0.5),
        ));
        assert_eq!(names(&preset), vec!["a", "b"]);
        match &preset.representations()[0] {
            EditRepresentation::Custom(f) => assert_eq!(f.parameters.get("amount"), Some(&0.5)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rotate_four_times_is_unmodified() {
        let mut preset = EditPreset::new();
        for _ in 0..4 {
            preset.apply_op(&EditOp::RotateStep, 100, 100).unwrap();
        }
        assert_eq!(preset, EditPreset::new());
    }

    #[test]
    fn test_straighten_resets_crop() {
        let mut preset = EditPreset::new();
        preset.apply_op(&EditOp::Straighten(45.0), 100, 100).unwrap();
        let g = preset.geometry();
        assert_eq!(g.straighten, 45.0);
        let side = 1.0 / std::f64::consts::SQRT_2;
        assert!((g.crop.width() - side).abs() < 1e-6);

        assert_eq!(
            preset.apply_op(&EditOp::Straighten(f64::NAN), 100, 100),
            Err(DomainError::NotFinite)
        );
        assert_eq!(preset.geometry().straighten, 45.0);
    }

    #[test]
    fn test_geometry_round_trip() {
        let state = GeometryState::new()
            .with_rotation(Rotation::TwoSeventy)
            .with_mirror(Mirror::Both)
            .with_straighten(-3.5)
            .with_crop(NormalizedRect::new(0.1, 0.2, 0.8, 0.9).unwrap());
        let mut preset = EditPreset::new();
        preset.set_geometry(&state);
        assert_eq!(preset.geometry(), state);
    }

    #[test]
    fn test_geometry_order_does_not_affect_equality() {
        let stored = EditPreset {
            representations: vec![
                EditRepresentation::Mirror(Mirror::Horizontal),
                EditRepresentation::Rotate(Rotation::Ninety),
            ],
            ..EditPreset::new()
        };
        let mut rebuilt = stored.clone();
        rebuilt
            .apply_op(&EditOp::Crop(NormalizedRect::FULL), 10, 10)
            .unwrap();
        assert_eq!(names(&rebuilt), vec!["ROTATION", "MIRROR"]);
        assert!(rebuilt.same_geometry(&stored));
        assert_eq!(rebuilt, stored);
    }

    #[test]
    fn test_same_geometry_and_filters() {
        let mut a = EditPreset::new();
        a.apply_op(&EditOp::CycleMirror, 10, 10).unwrap();
        let mut b = a.clone();
        b.apply_op(&EditOp::SetFilter(CustomFilter::new("grain")), 10, 10)
            .unwrap();
        assert!(a.same_geometry(&b));
        assert!(!a.same_filters(&b));

        b.apply_op(&EditOp::RotateStep, 10, 10).unwrap();
        assert!(!a.same_geometry(&b));
    }

    #[test]
    fn test_curve_edit_and_reset_restores_equality() {
        let mut preset = EditPreset::new();
        let insert = EditOp::Curve {
            channel: Channel::Red,
            edit: CurveEdit::Insert { x: 0.5, y: 0.3 },
        };
        preset.apply_op(&insert, 10, 10).unwrap();
        assert!(preset.curves().is_some());
        assert!(preset.has_modifications());

        let delete = EditOp::Curve {
            channel: Channel::Red,
            edit: CurveEdit::Delete { index: 1 },
        };
        preset.apply_op(&delete, 10, 10).unwrap();
        assert_eq!(preset, EditPreset::new());
    }

    #[test]
    fn test_failed_curve_edit_leaves_preset() {
        let mut preset = EditPreset::new();
        let bad = EditOp::Curve {
            channel: Channel::Rgb,
            edit: CurveEdit::Move {
                index: 9,
                x: 0.5,
                y: 0.5,
            },
        };
        assert!(preset.apply_op(&bad, 10, 10).is_err());
        assert_eq!(preset, EditPreset::new());
    }

    #[test]
    fn test_partial_rendering_support() {
        let mut preset = EditPreset::new();
        assert!(preset.can_do_partial_rendering());
        let mut blur = CustomFilter::new("blur");
        blur.supports_partial = false;
        preset.add(EditRepresentation::Custom(blur));
        assert!(!preset.can_do_partial_rendering());
    }

    #[test]
    fn test_tier_variants() {
        let preset = EditPreset::new();
        let g = preset.geometry_only();
        assert!(g.applies_geometry() && !g.applies_filters());
        let f = preset.filters_only();
        assert!(!f.applies_geometry() && f.applies_filters());
        assert_ne!(g, f);
    }

    #[test]
    fn test_reset_geometry_keeps_filters() {
        let mut preset = EditPreset::new();
        preset.apply_op(&EditOp::RotateStep, 10, 10).unwrap();
        preset
            .apply_op(&EditOp::SetFilter(CustomFilter::new("grain")), 10, 10)
            .unwrap();
        preset.apply_op(&EditOp::ResetGeometry, 10, 10).unwrap();
        assert_eq!(names(&preset), vec!["grain"]);
    }

    #[test]
    fn test_preset_serializes() {
        let mut preset = EditPreset::new();
        preset.apply_op(&EditOp::RotateStep, 10, 10).unwrap();
        let json = serde_json::to_string(&preset).unwrap();
        let back: EditPreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, preset);
    }
}
