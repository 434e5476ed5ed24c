//! Stone colors.
//!
//! Two-valued color type with a table-driven `opposite` mapping and the
//! signed numeric convention used by the feature encoder.

use serde::{Deserialize, Serialize};

/// The color of a stone or of the player to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
}

/// Both colors in index order.
pub const ALL_COLORS: [Color; 2] = [Color::Black, Color::White];

/// Opposite color, indexed by `Color as usize`.
const OPPOSITE: [Color; 2] = [Color::White, Color::Black];

impl Color {
    /// Returns the other color.
    #[inline]
    pub const fn opposite(self) -> Color {
        OPPOSITE[self as usize]
    }

    /// Signed cell value: +1.0 for black, -1.0 for white.
    #[inline]
    pub const fn sign(self) -> f32 {
        match self {
            Color::Black => 1.0,
            Color::White => -1.0,
        }
    }

    /// Returns the SGF property letter for moves of this color.
    pub const fn sgf_char(self) -> char {
        match self {
            Color::Black => 'B',
            Color::White => 'W',
        }
    }

    /// Parses a color from an SGF property letter (`B`/`W`, either case).
    pub fn from_sgf_char(c: char) -> Option<Color> {
        match c {
            'B' | 'b' => Some(Color::Black),
            'W' | 'w' => Some(Color::White),
            _ => None,
        }
    }

    /// Lowercase English name.
    pub const fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}
