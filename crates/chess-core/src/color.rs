//! Player color representation.

use serde::{Deserialize, Serialize};

/// Represents the two players in chess.
///
/// White is the first player: its piece codes are positive and the ply
/// counter advances on its moves. Black is the second player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    /// Returns the opposite color.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Returns the index (0 for White, 1 for Black).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the sign used by piece codes (+1 for White, -1 for Black).
    #[inline]
    pub const fn sign(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Returns the color owning a signed value, or `None` for zero.
    #[inline]
    pub const fn from_sign(value: i8) -> Option<Self> {
        if value > 0 {
            Some(Color::White)
        } else if value < 0 {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Returns the protocol character (`'1'` for White, `'-'` for Black).
    #[inline]
    pub const fn wire_char(self) -> char {
        match self {
            Color::White => '1',
            Color::Black => '-',
        }
    }

    /// Parses a protocol character.
    #[inline]
    pub const fn from_wire_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Color::White),
            '-' => Some(Color::Black),
            _ => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}
