//! Immutable position snapshots stored in the variation tree.

use crate::notation::{Notation, StatusMark};
use chess_core::{Board, CastlingRights, Color, Move, Orientation, Piece};
use serde::{Deserialize, Serialize};

/// A board snapshot plus the bookkeeping recorded with the move that
/// produced it.
///
/// The board and move are stored in the orientation that was live when the
/// position was recorded; use [`Position::board_in`] and
/// [`Position::move_in`] to view them from another side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    board: Board,
    turn: Color,
    orientation: Orientation,
    mv: Option<Move>,
    notation: Notation,
    ply: u32,
    castling: CastlingRights,
    captured: Vec<Piece>,
    promotion_pending: bool,
}

impl Position {
    /// A tree root: `side_to_move` is the side that plays first from it.
    pub fn root(
        board: Board,
        side_to_move: Color,
        orientation: Orientation,
        castling: CastlingRights,
    ) -> Self {
        Position {
            board,
            turn: side_to_move.opposite(),
            orientation,
            mv: None,
            notation: Notation::default(),
            ply: 0,
            castling,
            captured: Vec::new(),
            promotion_pending: false,
        }
    }

    /// The standard starting position with White to move.
    pub fn startpos(orientation: Orientation) -> Self {
        Position::root(
            Board::startpos(orientation),
            Color::White,
            orientation,
            CastlingRights::ALL,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn after_move(
        board: Board,
        mover: Color,
        orientation: Orientation,
        mv: Move,
        notation: Notation,
        castling: CastlingRights,
        captured: Vec<Piece>,
        promotion_pending: bool,
    ) -> Self {
        Position {
            board,
            turn: mover,
            orientation,
            mv: Some(mv),
            notation,
            ply: 0,
            castling,
            captured,
            promotion_pending,
        }
    }

    /// The grid in the orientation it was recorded in.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The grid as seen from `orientation`.
    pub fn board_in(&self, orientation: Orientation) -> Board {
        self.board.convert(self.orientation, orientation)
    }

    /// The side that made the move leading here.
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn side_to_move(&self) -> Color {
        self.turn.opposite()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The move that produced this position, `None` for a root.
    pub fn last_move(&self) -> Option<Move> {
        self.mv
    }

    pub fn move_in(&self, orientation: Orientation) -> Option<Move> {
        self.mv.map(|mv| mv.convert(self.orientation, orientation))
    }

    pub fn notation(&self) -> &Notation {
        &self.notation
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// Captured pieces in the order they were taken.
    pub fn captured(&self) -> &[Piece] {
        &self.captured
    }

    /// True when a pawn reached the last rank and no promotion piece has
    /// been chosen yet.
    pub fn promotion_pending(&self) -> bool {
        self.promotion_pending
    }

    pub fn is_root(&self) -> bool {
        self.mv.is_none()
    }

    /// Notation with its move-number prefix, e.g. `1. e4`, `... e5`, `Nf6`.
    pub fn label(&self, parent_is_root: bool) -> String {
        if self.is_root() {
            return String::new();
        }
        match self.turn {
            Color::White => format!("{}. {}", self.ply, self.notation),
            Color::Black if parent_is_root => format!("... {}", self.notation),
            Color::Black => self.notation.to_string(),
        }
    }

    pub(crate) fn set_ply(&mut self, ply: u32) {
        self.ply = ply;
    }

    pub(crate) fn prepend_captured(&mut self, earlier: &[Piece]) {
        let mut all = Vec::with_capacity(earlier.len() + self.captured.len());
        all.extend_from_slice(earlier);
        all.append(&mut self.captured);
        self.captured = all;
    }

    pub(crate) fn set_mark(&mut self, mark: StatusMark) -> bool {
        self.notation.set_mark(mark)
    }
}
