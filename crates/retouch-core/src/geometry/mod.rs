//! Geometric edits and the matrices derived from them.
//!
//! - [`matrix`]: affine matrices, points and rectangles
//! - [`state`]: rotation, straighten, crop and mirror as one value
//! - [`math`]: geometry state to display and render matrices
//! - [`vector`]: line helpers for the crop widgets

pub mod math;
pub mod matrix;
pub mod state;
pub mod vector;

pub use math::{
    crop_selection_to_screen, crop_selection_to_screen_matrix, final_geometry_rect, fit_scale,
    full_geometry_matrix, full_geometry_to_screen_matrix, needs_dimension_swap,
    straighten_crop_bounds, straightened_crop, true_crop_rect,
};
pub use matrix::{Matrix, Point, Rect};
pub use state::{
    GeometryState, Mirror, MirrorAxis, NormalizedRect, Rotation, MAX_STRAIGHTEN_ANGLE,
};
pub use vector::{
    closest_side, distance_to_segment, line_intersect, normalize, scalar_projection,
    shortest_vector_to_line, Line,
};
