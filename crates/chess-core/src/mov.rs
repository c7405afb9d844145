//! Move representation.

use crate::{Orientation, PieceKind, Square};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A move from one grid square to another.
///
/// The move carries no frame of its own: the squares are meaningful only
/// together with the [`Orientation`] of the grid they were taken from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    #[inline]
    pub const fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }

    /// Returns the move as seen from the other side of the board.
    #[inline]
    pub const fn flipped(self) -> Self {
        Move {
            from: self.from.flipped(),
            to: self.to.flipped(),
        }
    }

    /// Re-expresses the move from `source` into `target` orientation.
    #[inline]
    pub const fn convert(self, source: Orientation, target: Orientation) -> Self {
        Move {
            from: source.convert(self.from, target),
            to: source.convert(self.to, target),
        }
    }

    /// Absolute number of files crossed.
    #[inline]
    pub const fn file_span(self) -> u8 {
        self.from.file().abs_diff(self.to.file())
    }

    /// Coordinate notation, e.g. `e2e4`.
    pub fn to_coordinate(self, orientation: Orientation) -> String {
        let mut s = orientation.square_name(self.from);
        s.push_str(&orientation.square_name(self.to));
        s
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move({},{} -> {},{})",
            self.from.rank(),
            self.from.file(),
            self.to.rank(),
            self.to.file()
        )
    }
}

/// A move reported legal by the oracle, with its promotion piece if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegalMove {
    pub mv: Move,
    pub promotion: Option<PieceKind>,
}

impl LegalMove {
    #[inline]
    pub const fn new(mv: Move, promotion: Option<PieceKind>) -> Self {
        LegalMove { mv, promotion }
    }

    /// A legal move without promotion.
    #[inline]
    pub const fn plain(mv: Move) -> Self {
        LegalMove {
            mv,
            promotion: None,
        }
    }

    #[inline]
    pub const fn flipped(self) -> Self {
        LegalMove {
            mv: self.mv.flipped(),
            promotion: self.promotion,
        }
    }

    /// Parses coordinate notation with an optional promotion letter
    /// (`e2e4`, `e7e8q`).
    pub fn parse_coordinate(s: &str, orientation: Orientation) -> Option<Self> {
        let s = s.trim();
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return None;
        }
        let from = orientation.parse_square(&s[0..2])?;
        let to = orientation.parse_square(&s[2..4])?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => {
                let kind = PieceKind::from_letter(c)?;
                if !kind.is_promotable() {
                    return None;
                }
                Some(kind)
            }
        };
        Some(LegalMove::new(Move::new(from, to), promotion))
    }

    /// Coordinate notation including a lower-case promotion letter.
    pub fn to_coordinate(self, orientation: Orientation) -> String {
        let mut s = self.mv.to_coordinate(orientation);
        if let Some(kind) = self.promotion {
            s.push(kind.letter().to_ascii_lowercase());
        }
        s
    }
}
