//! Castling-rights bookkeeping.

use crate::{Board, Color, Orientation, Piece, PieceKind, Square, Wing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Castling rights packed as `(white << 2) | black`.
///
/// Within a side's two bits `0b10` is king-side and `0b01` queen-side.
/// Rights are only ever cleared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights(0b1111);
    pub const NONE: CastlingRights = CastlingRights(0);

    /// Creates rights from the packed value. Bits above the low four are
    /// discarded.
    #[inline]
    pub const fn new(raw: u8) -> Self {
        CastlingRights(raw & 0b1111)
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    const fn bit(color: Color, wing: Wing) -> u8 {
        let side = match wing {
            Wing::KingSide => 0b10,
            Wing::QueenSide => 0b01,
        };
        match color {
            Color::White => side << 2,
            Color::Black => side,
        }
    }

    /// The two bits belonging to `color`.
    #[inline]
    pub const fn side(self, color: Color) -> u8 {
        match color {
            Color::White => self.0 >> 2,
            Color::Black => self.0 & 0b11,
        }
    }

    #[inline]
    pub const fn has(self, color: Color, wing: Wing) -> bool {
        self.0 & Self::bit(color, wing) != 0
    }

    #[inline]
    pub const fn clear(self, color: Color, wing: Wing) -> Self {
        CastlingRights(self.0 & !Self::bit(color, wing))
    }

    #[inline]
    pub const fn clear_side(self, color: Color) -> Self {
        self.clear(color, Wing::KingSide).clear(color, Wing::QueenSide)
    }

    /// Drops every right whose king or rook is not on its home square.
    pub fn sanitize(self, board: &Board, orientation: Orientation) -> Self {
        let mut rights = self;
        for color in [Color::White, Color::Black] {
            let back = orientation.back_rank(color);
            let king_home = Square::new(back, orientation.king_file())
                .and_then(|sq| board.get(sq))
                == Some(Piece::new(PieceKind::King, color));
            for wing in [Wing::KingSide, Wing::QueenSide] {
                let (rook_file, _) = orientation.castling_rook_files(wing);
                let rook_home = Square::new(back, rook_file).and_then(|sq| board.get(sq))
                    == Some(Piece::new(PieceKind::Rook, color));
                if !king_home || !rook_home {
                    rights = rights.clear(color, wing);
                }
            }
        }
        rights
    }
}

impl fmt::Debug for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastlingRights({:04b})", self.0)
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "-");
        }
        let flags = [
            (Color::White, Wing::KingSide, 'K'),
            (Color::White, Wing::QueenSide, 'Q'),
            (Color::Black, Wing::KingSide, 'k'),
            (Color::Black, Wing::QueenSide, 'q'),
        ];
        for (color, wing, c) in flags {
            if self.has(color, wing) {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing() {
        assert_eq!(CastlingRights::ALL.side(Color::White), 0b11);
        assert_eq!(CastlingRights::new(0b1001).side(Color::White), 0b10);
        assert_eq!(CastlingRights::new(0b1001).side(Color::Black), 0b01);
        assert!(CastlingRights::new(0b1000).has(Color::White, Wing::KingSide));
        assert!(!CastlingRights::new(0b1000).has(Color::White, Wing::QueenSide));
        assert_eq!(CastlingRights::new(0xff), CastlingRights::ALL);
    }

    #[test]
    fn clearing_never_regrants() {
        let r = CastlingRights::ALL.clear(Color::Black, Wing::QueenSide);
        assert_eq!(r.raw(), 0b1110);
        assert_eq!(r.clear(Color::Black, Wing::QueenSide).raw(), 0b1110);
        assert_eq!(r.clear_side(Color::White).raw(), 0b0010);
        assert_eq!(CastlingRights::NONE.clear_side(Color::White).raw(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(CastlingRights::ALL.to_string(), "KQkq");
        assert_eq!(CastlingRights::new(0b0110).to_string(), "Qk");
        assert_eq!(CastlingRights::NONE.to_string(), "-");
    }

    #[test]
    fn sanitize_against_board() {
        let board = Board::startpos(Orientation::White);
        assert_eq!(
            CastlingRights::ALL.sanitize(&board, Orientation::White),
            CastlingRights::ALL
        );

        let mut board = Board::startpos(Orientation::White);
        board.take(Square::new(7, 7).unwrap());
        let r = CastlingRights::ALL.sanitize(&board, Orientation::White);
        assert!(!r.has(Color::White, Wing::KingSide));
        assert!(r.has(Color::White, Wing::QueenSide));

        let flipped = Board::startpos(Orientation::Black);
        assert_eq!(
            CastlingRights::ALL.sanitize(&flipped, Orientation::Black),
            CastlingRights::ALL
        );
        assert_eq!(
            CastlingRights::ALL.sanitize(&flipped, Orientation::White),
            CastlingRights::NONE
        );
    }
}
