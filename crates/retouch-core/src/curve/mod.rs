//! Tone curves: spline fitting and lookup tables.

pub mod lut;
pub mod spline;

use serde::{Deserialize, Serialize};

pub use lut::{apply_channel_curves, apply_tone_curve, ChannelLuts, ToneCurveLut};
pub use spline::{solve_natural_spline, CurveEdit, SolvedSpline, Spline};

/// Which curve of the curves filter an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Master curve applied to all three channels.
    Rgb,
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Rgb, Channel::Red, Channel::Green, Channel::Blue];

    pub fn index(self) -> usize {
        match self {
            Channel::Rgb => 0,
            Channel::Red => 1,
            Channel::Green => 2,
            Channel::Blue => 3,
        }
    }
}
