//! Board square and orientation representation.
//!
//! A [`Square`] is a `(rank, file)` grid coordinate: rank 0 is the top row of
//! the grid and file 0 its left column. What those rows and columns mean in
//! chess terms depends on the [`Orientation`] the grid is expressed in.

use crate::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A square on the 8x8 grid, stored as row and column indices (0-7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    rank: u8,
    file: u8,
}

impl Square {
    /// Creates a square from grid row and column.
    #[inline]
    pub const fn new(rank: u8, file: u8) -> Option<Self> {
        if rank < 8 && file < 8 {
            Some(Square { rank, file })
        } else {
            None
        }
    }

    /// Creates a square from a row-major index (0-63).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Square {
                rank: index / 8,
                file: index % 8,
            })
        } else {
            None
        }
    }

    /// Returns the row-major index (0-63).
    #[inline]
    pub const fn index(self) -> u8 {
        self.rank * 8 + self.file
    }

    /// Returns the grid row.
    #[inline]
    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// Returns the grid column.
    #[inline]
    pub const fn file(self) -> u8 {
        self.file
    }

    /// Returns the same square seen from the other side of the board.
    #[inline]
    pub const fn flipped(self) -> Self {
        Square {
            rank: 7 - self.rank,
            file: 7 - self.file,
        }
    }

    /// Iterates over all squares in row-major order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64u8).map(|i| Square {
            rank: i / 8,
            file: i % 8,
        })
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({}, {})", self.rank, self.file)
    }
}

/// Castling wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wing {
    KingSide,
    QueenSide,
}

/// Which side's perspective a grid is expressed in.
///
/// With `White` orientation White's pieces start on rows 6 and 7, ranks are
/// labelled 8 down to 1 and files a to h left to right. `Black` orientation
/// is the same board rotated by 180 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    White,
    Black,
}

impl Orientation {
    /// The orientation with `color` at the bottom of the grid.
    #[inline]
    pub const fn of(color: Color) -> Self {
        match color {
            Color::White => Orientation::White,
            Color::Black => Orientation::Black,
        }
    }

    /// The color at the bottom of the grid.
    #[inline]
    pub const fn color(self) -> Color {
        match self {
            Orientation::White => Color::White,
            Orientation::Black => Color::Black,
        }
    }

    #[inline]
    pub const fn flipped(self) -> Self {
        match self {
            Orientation::White => Orientation::Black,
            Orientation::Black => Orientation::White,
        }
    }

    /// Protocol character, shared with [`Color::wire_char`].
    #[inline]
    pub const fn wire_char(self) -> char {
        self.color().wire_char()
    }

    #[inline]
    pub const fn from_wire_char(c: char) -> Option<Self> {
        match Color::from_wire_char(c) {
            Some(color) => Some(Orientation::of(color)),
            None => None,
        }
    }

    /// Re-expresses a square given in this orientation in `target`.
    #[inline]
    pub const fn convert(self, square: Square, target: Orientation) -> Square {
        if self as u8 == target as u8 {
            square
        } else {
            square.flipped()
        }
    }

    /// File letter of a grid column.
    pub const fn file_char(self, file: u8) -> char {
        match self {
            Orientation::White => (b'a' + file) as char,
            Orientation::Black => (b'h' - file) as char,
        }
    }

    /// Rank digit of a grid row.
    pub const fn rank_char(self, rank: u8) -> char {
        match self {
            Orientation::White => (b'8' - rank) as char,
            Orientation::Black => (b'1' + rank) as char,
        }
    }

    /// Algebraic name of a grid square, e.g. `e4`.
    pub fn square_name(self, square: Square) -> String {
        let mut name = String::with_capacity(2);
        name.push(self.file_char(square.file()));
        name.push(self.rank_char(square.rank()));
        name
    }

    /// Parses an algebraic square name into grid coordinates.
    pub fn parse_square(self, s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].to_ascii_lowercase();
        let rank = bytes[1];
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return None;
        }
        match self {
            Orientation::White => Square::new(b'8' - rank, file - b'a'),
            Orientation::Black => Square::new(rank - b'1', b'h' - file),
        }
    }

    /// Grid row holding `color`'s back rank.
    pub const fn back_rank(self, color: Color) -> u8 {
        if self as u8 == Orientation::of(color) as u8 {
            7
        } else {
            0
        }
    }

    /// Grid column of the kings' starting file.
    pub const fn king_file(self) -> u8 {
        match self {
            Orientation::White => 4,
            Orientation::Black => 3,
        }
    }

    /// Rook origin and destination columns for a castling move on `wing`.
    pub const fn castling_rook_files(self, wing: Wing) -> (u8, u8) {
        match (self, wing) {
            (Orientation::White, Wing::KingSide) => (7, 5),
            (Orientation::White, Wing::QueenSide) => (0, 3),
            (Orientation::Black, Wing::KingSide) => (0, 2),
            (Orientation::Black, Wing::QueenSide) => (7, 4),
        }
    }

    /// The wing a king move towards `to_file` from `from_file` castles on.
    pub const fn castling_wing(self, from_file: u8, to_file: u8) -> Wing {
        let towards_h = match self {
            Orientation::White => to_file > from_file,
            Orientation::Black => to_file < from_file,
        };
        if towards_h {
            Wing::KingSide
        } else {
            Wing::QueenSide
        }
    }

    /// The castling wing whose rook starts on grid column `file`, if any.
    pub const fn corner_wing(self, file: u8) -> Option<Wing> {
        let (king_side, _) = self.castling_rook_files(Wing::KingSide);
        let (queen_side, _) = self.castling_rook_files(Wing::QueenSide);
        if file == king_side {
            Some(Wing::KingSide)
        } else if file == queen_side {
            Some(Wing::QueenSide)
        } else {
            None
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color())
    }
}
