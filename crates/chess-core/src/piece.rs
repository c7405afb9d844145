//! Chess piece representation.
//!
//! Pieces are exchanged with the rest of the application as small signed
//! codes: the magnitude names the piece type (pawn 1, knight 2, bishop 3,
//! rook 5, queen 9, king 10) and the sign names the side. Zero is an empty
//! square.

use crate::Color;
use serde::{Deserialize, Serialize};

/// The six types of chess pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 5,
    Queen = 9,
    King = 10,
}

impl PieceKind {
    /// All piece types in order of value.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Returns the unsigned code magnitude of this piece type.
    #[inline]
    pub const fn magnitude(self) -> i8 {
        self as i8
    }

    /// Parses a code magnitude.
    pub const fn from_magnitude(value: i8) -> Option<Self> {
        match value {
            1 => Some(PieceKind::Pawn),
            2 => Some(PieceKind::Knight),
            3 => Some(PieceKind::Bishop),
            5 => Some(PieceKind::Rook),
            9 => Some(PieceKind::Queen),
            10 => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Returns the upper-case letter used in notation and on the wire.
    pub const fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// Parses a piece letter in either case.
    pub const fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    /// Returns the promotion code (knight 1 .. queen 4), if this piece can be
    /// promoted to.
    pub const fn promotion_code(self) -> Option<u8> {
        match self {
            PieceKind::Knight => Some(1),
            PieceKind::Bishop => Some(2),
            PieceKind::Rook => Some(3),
            PieceKind::Queen => Some(4),
            PieceKind::Pawn | PieceKind::King => None,
        }
    }

    /// Parses a promotion code. Zero and anything above four mean no promotion.
    pub const fn from_promotion_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PieceKind::Knight),
            2 => Some(PieceKind::Bishop),
            3 => Some(PieceKind::Rook),
            4 => Some(PieceKind::Queen),
            _ => None,
        }
    }

    /// Returns true for the pieces a pawn may promote to.
    #[inline]
    pub const fn is_promotable(self) -> bool {
        self.promotion_code().is_some()
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PieceKind::Pawn => "Pawn",
            PieceKind::Knight => "Knight",
            PieceKind::Bishop => "Bishop",
            PieceKind::Rook => "Rook",
            PieceKind::Queen => "Queen",
            PieceKind::King => "King",
        };
        write!(f, "{}", name)
    }
}

/// A piece of a given type and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Piece { kind, color }
    }

    /// Returns the signed piece code.
    #[inline]
    pub const fn code(self) -> i8 {
        self.kind.magnitude() * self.color.sign()
    }

    /// Parses a signed piece code. Zero and unknown magnitudes yield `None`.
    pub const fn from_code(code: i8) -> Option<Self> {
        let color = match Color::from_sign(code) {
            Some(c) => c,
            None => return None,
        };
        match PieceKind::from_magnitude(code.wrapping_abs()) {
            Some(kind) => Some(Piece { kind, color }),
            None => None,
        }
    }

    /// Returns the FEN-style character: upper case for White, lower for Black.
    pub const fn to_fen_char(self) -> char {
        let c = self.kind.letter();
        match self.color {
            Color::White => c,
            Color::Black => c.to_ascii_lowercase(),
        }
    }

    /// Parses a FEN-style character into a piece.
    pub const fn from_fen_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        match PieceKind::from_letter(c) {
            Some(kind) => Some(Piece { kind, color }),
            None => None,
        }
    }

    #[inline]
    pub const fn is(self, kind: PieceKind) -> bool {
        self.kind as u8 == kind as u8
    }
}
