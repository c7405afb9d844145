//! The 8x8 board grid.

use crate::{Color, Orientation, Piece, PieceKind, Square};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// An 8x8 grid of optional pieces, indexed `[rank][file]`.
///
/// The grid has no orientation of its own; callers pair it with one.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board([[Option<Piece>; 8]; 8]);

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    pub const fn empty() -> Self {
        Board([[None; 8]; 8])
    }

    /// The standard starting position expressed in `orientation`.
    pub fn startpos(orientation: Orientation) -> Self {
        let mut board = Board::empty();
        for (file, kind) in BACK_RANK.iter().enumerate() {
            board.0[0][file] = Some(Piece::new(*kind, Color::Black));
            board.0[1][file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            board.0[6][file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            board.0[7][file] = Some(Piece::new(*kind, Color::White));
        }
        match orientation {
            Orientation::White => board,
            Orientation::Black => board.flipped(),
        }
    }

    #[inline]
    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.0[sq.rank() as usize][sq.file() as usize]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.0[sq.rank() as usize][sq.file() as usize] = piece;
    }

    /// Removes and returns the piece on `sq`.
    #[inline]
    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.0[sq.rank() as usize][sq.file() as usize].take()
    }

    #[inline]
    pub fn is_empty(&self, sq: Square) -> bool {
        self.get(sq).is_none()
    }

    /// The same position rotated by 180 degrees.
    pub fn flipped(&self) -> Self {
        let mut out = Board::empty();
        for sq in Square::all() {
            out.set(sq.flipped(), self.get(sq));
        }
        out
    }

    /// Re-expresses a grid recorded in `source` in `target` orientation.
    pub fn convert(&self, source: Orientation, target: Orientation) -> Self {
        if source == target {
            self.clone()
        } else {
            self.flipped()
        }
    }

    /// Number of squares holding exactly `piece`.
    pub fn count(&self, piece: Piece) -> usize {
        self.pieces().filter(|(_, p)| *p == piece).count()
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    /// Renders the grid with rank and file labels for `orientation`.
    pub fn render(&self, orientation: Orientation) -> String {
        let mut out = String::new();
        for rank in 0..8u8 {
            out.push(orientation.rank_char(rank));
            out.push(' ');
            for file in 0..8u8 {
                let c = Square::new(rank, file)
                    .and_then(|sq| self.get(sq))
                    .map(Piece::to_fen_char)
                    .unwrap_or('.');
                out.push(' ');
                out.push(c);
            }
            out.push('\n');
        }
        out.push_str("  ");
        for file in 0..8u8 {
            let _ = write!(out, " {}", orientation.file_char(file));
        }
        out.push('\n');
        out
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Board {{")?;
        for row in &self.0 {
            let line: String = row
                .iter()
                .map(|p| p.map(Piece::to_fen_char).unwrap_or('.'))
                .collect();
            writeln!(f, "    {}", line)?;
        }
        write!(f, "}}")
    }
}
