//! Crop handle identifiers as bit flags.

use serde::{Deserialize, Serialize};

use crate::geometry::{Mirror, Rotation};

/// Set of crop rectangle sides being dragged, or the whole rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Edges(u8);

const SIDE_MASK: u8 = 0b1111;

impl Edges {
    pub const NONE: Edges = Edges(0);
    pub const LEFT: Edges = Edges(1);
    pub const TOP: Edges = Edges(2);
    pub const RIGHT: Edges = Edges(4);
    pub const BOTTOM: Edges = Edges(8);
    /// Drag the whole rectangle.
    pub const MOVE: Edges = Edges(16);

    pub const TOP_LEFT: Edges = Edges(1 | 2);
    pub const TOP_RIGHT: Edges = Edges(2 | 4);
    pub const BOTTOM_RIGHT: Edges = Edges(4 | 8);
    pub const BOTTOM_LEFT: Edges = Edges(1 | 8);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Accept only a single side, a corner, MOVE or NONE.
    pub fn from_bits(bits: u8) -> Option<Edges> {
        let e = Edges(bits);
        (e.is_none() || e.is_move() || e.is_side() || e.is_corner()).then_some(e)
    }

    pub fn contains(self, other: Edges) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_move(self) -> bool {
        self == Edges::MOVE
    }

    pub fn is_side(self) -> bool {
        matches!(
            self,
            Edges::LEFT | Edges::TOP | Edges::RIGHT | Edges::BOTTOM
        )
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Edges::TOP_LEFT | Edges::TOP_RIGHT | Edges::BOTTOM_RIGHT | Edges::BOTTOM_LEFT
        )
    }

    /// Promote a single side to a corner, for aspect-locked dragging.
    pub fn to_corner(self) -> Edges {
        match self {
            Edges::LEFT | Edges::TOP => Edges::TOP_LEFT,
            Edges::RIGHT | Edges::BOTTOM => Edges::BOTTOM_RIGHT,
            other => other,
        }
    }

    /// Map a handle picked on screen to the bitmap-space sides it moves.
    ///
    /// Mirroring happens after rotation on screen, so it is undone first;
    /// each quarter turn then cycles the four side bits one step left
    /// (top becomes right at 90 degrees).
    pub fn decode(self, rotation: Rotation, mirror: Mirror) -> Edges {
        let mirror = mirror.effective_for(rotation);
        let mut e = self;
        if mirror.flips_horizontal() {
            e = e.swap(Edges::LEFT, Edges::RIGHT);
        }
        if mirror.flips_vertical() {
            e = e.swap(Edges::TOP, Edges::BOTTOM);
        }
        e.cycle_left(rotation.quarter_turns())
    }

    fn swap(self, a: Edges, b: Edges) -> Edges {
        let mut bits = self.0 & !(a.0 | b.0);
        if self.0 & a.0 != 0 {
            bits |= b.0;
        }
        if self.0 & b.0 != 0 {
            bits |= a.0;
        }
        Edges(bits)
    }

    fn cycle_left(self, times: u32) -> Edges {
        let times = times % 4;
        let sides = self.0 & SIDE_MASK;
        let hi = sides >> (4 - times);
        let low = (sides << times) & SIDE_MASK;
        Edges((self.0 & !SIDE_MASK) | low | hi)
    }
}

impl std::ops::BitOr for Edges {
    type Output = Edges;

    fn bitor(self, rhs: Edges) -> Edges {
        Edges(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Edges {
    fn bitor_assign(&mut self, rhs: Edges) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_cycles_with_rotation() {
        assert_eq!(Edges::TOP.decode(Rotation::Zero, Mirror::None), Edges::TOP);
        assert_eq!(Edges::TOP.decode(Rotation::Ninety, Mirror::None), Edges::RIGHT);
        assert_eq!(
            Edges::TOP.decode(Rotation::OneEighty, Mirror::None),
            Edges::BOTTOM
        );
        assert_eq!(
            Edges::TOP.decode(Rotation::TwoSeventy, Mirror::None),
            Edges::LEFT
        );
        assert_eq!(
            Edges::BOTTOM.decode(Rotation::Ninety, Mirror::None),
            Edges::LEFT
        );
    }

    #[test]
    fn test_decode_corners_and_move() {
        assert_eq!(
            Edges::TOP_LEFT.decode(Rotation::Ninety, Mirror::None),
            Edges::TOP_RIGHT
        );
        assert_eq!(Edges::MOVE.decode(Rotation::Ninety, Mirror::Both), Edges::MOVE);
    }

    #[test]
    fn test_decode_undoes_mirror_first() {
        assert_eq!(
            Edges::LEFT.decode(Rotation::Zero, Mirror::Horizontal),
            Edges::RIGHT
        );
        // Horizontal mirror under a quarter turn flips the screen vertically.
        assert_eq!(
            Edges::TOP.decode(Rotation::Ninety, Mirror::Horizontal),
            Edges::LEFT
        );
    }

    #[test]
    fn test_to_corner() {
        assert_eq!(Edges::LEFT.to_corner(), Edges::TOP_LEFT);
        assert_eq!(Edges::TOP.to_corner(), Edges::TOP_LEFT);
        assert_eq!(Edges::RIGHT.to_corner(), Edges::BOTTOM_RIGHT);
        assert_eq!(Edges::BOTTOM.to_corner(), Edges::BOTTOM_RIGHT);
        assert_eq!(Edges::TOP_RIGHT.to_corner(), Edges::TOP_RIGHT);
    }

    #[test]
    fn test_from_bits_validation() {
        assert_eq!(Edges::from_bits(6), Some(Edges::TOP_RIGHT));
        assert_eq!(Edges::from_bits(16), Some(Edges::MOVE));
        assert_eq!(Edges::from_bits(5), None);
        assert_eq!(Edges::from_bits(17), None);
    }

    #[test]
    fn test_contains() {
        assert!(Edges::TOP_LEFT.contains(Edges::LEFT));
        assert!(!Edges::TOP_LEFT.contains(Edges::RIGHT));
        assert!(!Edges::TOP_LEFT.contains(Edges::NONE));
    }
}
