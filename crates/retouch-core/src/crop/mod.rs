//! Interactive crop rectangle editing.

pub mod bounded;
pub mod edges;
pub mod engine;

pub use bounded::BoundedRect;
pub use edges::Edges;
pub use engine::{fix_aspect_ratio, CropEngine, DragState};
