//! Algebraic-style move notation.
//!
//! Notation is computed from the pre-move board and the oracle's legal-move
//! list rather than from a board scan, so disambiguation is only as good as
//! the list it is given. Examples: "e4", "Nbd2", "exd6", "R1e4", "0-0-0",
//! "e8=Q+".

use chess_core::{Board, LegalMove, Move, Orientation, Piece, PieceKind, Wing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Game-status suffix attached to a notation once the oracle reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMark {
    Check,
    Mate,
    Stalemate,
}

impl StatusMark {
    pub const fn symbol(self) -> char {
        match self {
            StatusMark::Check => '+',
            StatusMark::Mate => '#',
            StatusMark::Stalemate => '=',
        }
    }
}

/// Structured move notation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Notation {
    core: String,
    promotion: Option<PieceKind>,
    mark: Option<StatusMark>,
}

impl Notation {
    pub fn new(core: impl Into<String>) -> Self {
        Notation {
            core: core.into(),
            promotion: None,
            mark: None,
        }
    }

    /// `0-0` for the king side, `0-0-0` for the queen side.
    pub fn castle(wing: Wing) -> Self {
        match wing {
            Wing::KingSide => Notation::new("0-0"),
            Wing::QueenSide => Notation::new("0-0-0"),
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> Self {
        self.promotion = Some(kind);
        self
    }

    pub fn core(&self) -> &str {
        &self.core
    }

    pub fn promotion(&self) -> Option<PieceKind> {
        self.promotion
    }

    pub fn mark(&self) -> Option<StatusMark> {
        self.mark
    }

    /// Attaches a status mark. A notation carries at most one mark; returns
    /// false and leaves the notation untouched if one is already set.
    pub fn set_mark(&mut self, mark: StatusMark) -> bool {
        if self.mark.is_some() {
            return false;
        }
        self.mark = Some(mark);
        true
    }

    /// True when `incoming` names the same move as `self`.
    ///
    /// An incoming notation normally has no mark yet, since marks are only
    /// learned after the oracle has seen the resulting position.
    pub fn same_move(&self, incoming: &Notation) -> bool {
        self.core == incoming.core
            && self.promotion == incoming.promotion
            && (incoming.mark.is_none() || incoming.mark == self.mark)
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core)?;
        if let Some(kind) = self.promotion {
            write!(f, "={}", kind.letter())?;
        }
        if let Some(mark) = self.mark {
            write!(f, "{}", mark.symbol())?;
        }
        Ok(())
    }
}

/// Encodes `mv` played on `board`, or `None` if the origin square is empty.
pub fn encode(
    board: &Board,
    mv: Move,
    legal_moves: &[LegalMove],
    orientation: Orientation,
) -> Option<Notation> {
    let piece = board.get(mv.from)?;
    Some(encode_piece(board, piece, mv, legal_moves, orientation))
}

pub(crate) fn encode_piece(
    board: &Board,
    piece: Piece,
    mv: Move,
    legal_moves: &[LegalMove],
    orientation: Orientation,
) -> Notation {
    let mut core = String::with_capacity(6);
    let is_pawn = piece.is(PieceKind::Pawn);

    if !is_pawn {
        core.push(piece.kind.letter());
        if let Some(c) = disambiguation(board, piece, mv, legal_moves, orientation) {
            core.push(c);
        }
    }

    // A pawn changing file onto an empty square is an en-passant capture.
    let is_capture = !board.is_empty(mv.to) || (is_pawn && mv.from.file() != mv.to.file());
    if is_capture {
        if is_pawn {
            core.push(orientation.file_char(mv.from.file()));
        }
        core.push('x');
    }

    core.push_str(&orientation.square_name(mv.to));
    Notation::new(core)
}

fn disambiguation(
    board: &Board,
    piece: Piece,
    mv: Move,
    legal_moves: &[LegalMove],
    orientation: Orientation,
) -> Option<char> {
    let other = legal_moves.iter().map(|lm| lm.mv).find(|other| {
        other.to == mv.to && other.from != mv.from && board.get(other.from) == Some(piece)
    })?;
    if other.from.file() != mv.from.file() {
        Some(orientation.file_char(mv.from.file()))
    } else {
        Some(orientation.rank_char(mv.from.rank()))
    }
}
