//! Board mutation for a single move.
//!
//! Legality is the oracle's business: [`apply_move`] trusts that the move is
//! in the legal list it is given and only carries out the board effects
//! (captures, castling, en passant, promotion and castling-rights updates).

use crate::notation::{self, Notation};
use crate::Position;
use chess_core::{
    Board, CastlingRights, Color, LegalMove, Move, Orientation, Piece, PieceKind, Square, Wing,
};
use thiserror::Error;

/// Errors raised by [`apply_move`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("no piece on origin square {0:?}")]
    EmptyOrigin(Square),

    #[error("cannot promote to {kind} with this move")]
    InvalidPromotion { kind: PieceKind },
}

/// Everything besides the board that a move needs to be applied.
#[derive(Debug, Clone, Copy)]
pub struct MoveContext<'a> {
    pub side_to_move: Color,
    /// Orientation the board and move are expressed in.
    pub orientation: Orientation,
    pub castling: CastlingRights,
    /// Legal moves of the pre-move position, used for disambiguation.
    pub legal_moves: &'a [LegalMove],
    pub promotion: Option<PieceKind>,
}

/// Applies `mv` to `board` and returns the resulting position.
///
/// The returned position carries only this move's captures and an unset ply;
/// the variation tree fills both in on insertion.
pub fn apply_move(board: &Board, mv: Move, ctx: &MoveContext<'_>) -> Result<Position, ApplyError> {
    let piece = board.get(mv.from).ok_or(ApplyError::EmptyOrigin(mv.from))?;
    let reaches_last_row = mv.to.rank() == 0 || mv.to.rank() == 7;

    if let Some(kind) = ctx.promotion {
        if !piece.is(PieceKind::Pawn) || !reaches_last_row || !kind.is_promotable() {
            return Err(ApplyError::InvalidPromotion { kind });
        }
    }

    let mut notation =
        notation::encode_piece(board, piece, mv, ctx.legal_moves, ctx.orientation);
    let mut next = board.clone();
    let mut captured = Vec::new();

    let target = next.take(mv.to);
    if let Some(target) = target {
        captured.push(recorded_capture(board, target));
    }
    next.take(mv.from);

    if piece.is(PieceKind::King) && mv.file_span() > 1 {
        let wing = ctx.orientation.castling_wing(mv.from.file(), mv.to.file());
        let (rook_from, rook_to) = ctx.orientation.castling_rook_files(wing);
        let rank = mv.from.rank();
        if let (Some(from), Some(to)) = (Square::new(rank, rook_from), Square::new(rank, rook_to)) {
            let rook = next.take(from);
            next.set(to, rook);
        }
        notation = Notation::castle(wing);
    } else if piece.is(PieceKind::Pawn) && mv.from.file() != mv.to.file() && target.is_none() {
        if let Some(passed) = Square::new(mv.from.rank(), mv.to.file()) {
            next.take(passed);
        }
        captured.push(Piece::new(PieceKind::Pawn, piece.color.opposite()));
    }

    let castling = update_castling(ctx.castling, ctx.orientation, piece, mv, target);

    let landed = match ctx.promotion {
        Some(kind) => {
            notation = notation.with_promotion(kind);
            Piece::new(kind, piece.color)
        }
        None => piece,
    };
    next.set(mv.to, Some(landed));

    let promotion_pending = landed.is(PieceKind::Pawn) && reaches_last_row;

    Ok(Position::after_move(
        next,
        ctx.side_to_move,
        ctx.orientation,
        mv,
        notation,
        castling,
        captured,
        promotion_pending,
    ))
}

/// A captured piece that may have come from a promotion is recorded as the
/// pawn it started out as.
fn recorded_capture(board: &Board, captured: Piece) -> Piece {
    let count = board.count(captured);
    let promoted = match captured.kind {
        PieceKind::Queen => count > 1,
        PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook => count > 2,
        PieceKind::Pawn | PieceKind::King => false,
    };
    if promoted {
        Piece::new(PieceKind::Pawn, captured.color)
    } else {
        captured
    }
}

fn update_castling(
    rights: CastlingRights,
    orientation: Orientation,
    piece: Piece,
    mv: Move,
    target: Option<Piece>,
) -> CastlingRights {
    let mut rights = rights;
    if piece.is(PieceKind::Rook) {
        if let Some(wing) = home_corner(orientation, piece.color, mv.from) {
            rights = rights.clear(piece.color, wing);
        }
    }
    if piece.is(PieceKind::King) {
        rights = rights.clear_side(piece.color);
    }
    if let Some(target) = target.filter(|t| t.is(PieceKind::Rook)) {
        if let Some(wing) = home_corner(orientation, target.color, mv.to) {
            rights = rights.clear(target.color, wing);
        }
    }
    rights
}

fn home_corner(orientation: Orientation, color: Color, sq: Square) -> Option<Wing> {
    if sq.rank() != orientation.back_rank(color) {
        return None;
    }
    orientation.corner_wing(sq.file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(o: Orientation, name: &str) -> Square {
        o.parse_square(name).unwrap()
    }

    fn mv(o: Orientation, from: &str, to: &str) -> Move {
        Move::new(sq(o, from), sq(o, to))
    }

    fn ctx(o: Orientation, side: Color, castling: CastlingRights) -> MoveContext<'static> {
        MoveContext {
            side_to_move: side,
            orientation: o,
            castling,
            legal_moves: &[],
            promotion: None,
        }
    }

    fn place(board: &mut Board, o: Orientation, name: &str, kind: PieceKind, color: Color) {
        board.set(sq(o, name), Some(Piece::new(kind, color)));
    }

    #[test]
    fn pawn_push_from_start() {
        let o = Orientation::White;
        let board = Board::startpos(o);
        let pos = apply_move(&board, mv(o, "e2", "e4"), &ctx(o, Color::White, CastlingRights::ALL))
            .unwrap();
        assert_eq!(pos.notation().to_string(), "e4");
        assert!(pos.captured().is_empty());
        assert_eq!(pos.castling(), CastlingRights::ALL);
        assert_eq!(pos.turn(), Color::White);
        assert!(pos.board().is_empty(sq(o, "e2")));
        assert_eq!(
            pos.board().get(sq(o, "e4")),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
        assert!(!pos.promotion_pending());
    }

    #[test]
    fn empty_origin_is_an_error() {
        let o = Orientation::White;
        let board = Board::startpos(o);
        let err = apply_move(&board, mv(o, "e4", "e5"), &ctx(o, Color::White, CastlingRights::ALL));
        assert_eq!(err, Err(ApplyError::EmptyOrigin(sq(o, "e4"))));
    }

    #[test]
    fn king_side_castle_both_orientations() {
        for o in [Orientation::White, Orientation::Black] {
            let mut board = Board::empty();
            place(&mut board, o, "e1", PieceKind::King, Color::White);
            place(&mut board, o, "h1", PieceKind::Rook, Color::White);
            place(&mut board, o, "a1", PieceKind::Rook, Color::White);
            let pos = apply_move(&board, mv(o, "e1", "g1"), &ctx(o, Color::White, CastlingRights::ALL))
                .unwrap();
            assert_eq!(pos.notation().to_string(), "0-0");
            assert_eq!(
                pos.board().get(sq(o, "f1")),
                Some(Piece::new(PieceKind::Rook, Color::White))
            );
            assert!(pos.board().is_empty(sq(o, "h1")));
            assert_eq!(pos.castling().side(Color::White), 0);
            assert_eq!(pos.castling().side(Color::Black), 0b11);
        }
    }

    #[test]
    fn queen_side_castle_black() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "e8", PieceKind::King, Color::Black);
        place(&mut board, o, "a8", PieceKind::Rook, Color::Black);
        let pos = apply_move(&board, mv(o, "e8", "c8"), &ctx(o, Color::Black, CastlingRights::ALL))
            .unwrap();
        assert_eq!(pos.notation().to_string(), "0-0-0");
        assert_eq!(
            pos.board().get(sq(o, "d8")),
            Some(Piece::new(PieceKind::Rook, Color::Black))
        );
        assert_eq!(pos.castling().raw(), 0b1100);
    }

    #[test]
    fn en_passant_removes_passed_pawn() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "e5", PieceKind::Pawn, Color::White);
        place(&mut board, o, "d5", PieceKind::Pawn, Color::Black);
        let pos = apply_move(&board, mv(o, "e5", "d6"), &ctx(o, Color::White, CastlingRights::NONE))
            .unwrap();
        assert_eq!(pos.notation().core(), "exd6");
        assert!(pos.board().is_empty(sq(o, "d5")));
        assert!(pos.board().is_empty(sq(o, "e5")));
        assert_eq!(
            pos.board().get(sq(o, "d6")),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
        assert_eq!(pos.captured(), &[Piece::new(PieceKind::Pawn, Color::Black)]);
    }

    #[test]
    fn rook_moves_clear_single_right() {
        let o = Orientation::Black;
        let mut board = Board::startpos(o);
        board.take(sq(o, "h2"));
        let pos = apply_move(&board, mv(o, "h1", "h3"), &ctx(o, Color::White, CastlingRights::ALL))
            .unwrap();
        assert!(!pos.castling().has(Color::White, Wing::KingSide));
        assert!(pos.castling().has(Color::White, Wing::QueenSide));
        assert_eq!(pos.castling().side(Color::Black), 0b11);
    }

    #[test]
    fn capturing_home_rook_clears_opponent_right() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "b7", PieceKind::Bishop, Color::White);
        place(&mut board, o, "a8", PieceKind::Rook, Color::Black);
        let pos = apply_move(&board, mv(o, "b7", "a8"), &ctx(o, Color::White, CastlingRights::ALL))
            .unwrap();
        assert_eq!(pos.castling().raw(), 0b1110);
        assert_eq!(pos.captured(), &[Piece::new(PieceKind::Rook, Color::Black)]);
    }

    #[test]
    fn rook_off_home_rank_keeps_rights() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "h4", PieceKind::Rook, Color::White);
        let pos = apply_move(&board, mv(o, "h4", "h5"), &ctx(o, Color::White, CastlingRights::ALL))
            .unwrap();
        assert_eq!(pos.castling(), CastlingRights::ALL);
    }

    #[test]
    fn promotion_choice_and_pending() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "a7", PieceKind::Pawn, Color::White);
        let base = ctx(o, Color::White, CastlingRights::NONE);

        let pending = apply_move(&board, mv(o, "a7", "a8"), &base).unwrap();
        assert!(pending.promotion_pending());

        let chosen = MoveContext {
            promotion: Some(PieceKind::Knight),
            ..base
        };
        let pos = apply_move(&board, mv(o, "a7", "a8"), &chosen).unwrap();
        assert!(!pos.promotion_pending());
        assert_eq!(pos.notation().to_string(), "a8=N");
        assert_eq!(
            pos.board().get(sq(o, "a8")),
            Some(Piece::new(PieceKind::Knight, Color::White))
        );
    }

    #[test]
    fn invalid_promotions() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "a6", PieceKind::Pawn, Color::White);
        place(&mut board, o, "b7", PieceKind::Pawn, Color::White);
        place(&mut board, o, "d1", PieceKind::Rook, Color::White);
        let queen = MoveContext {
            promotion: Some(PieceKind::Queen),
            ..ctx(o, Color::White, CastlingRights::NONE)
        };
        assert!(apply_move(&board, mv(o, "a6", "a7"), &queen).is_err());
        assert!(apply_move(&board, mv(o, "d1", "d8"), &queen).is_err());
        let king = MoveContext {
            promotion: Some(PieceKind::King),
            ..queen
        };
        assert_eq!(
            apply_move(&board, mv(o, "b7", "b8"), &king),
            Err(ApplyError::InvalidPromotion {
                kind: PieceKind::King
            })
        );
    }

    #[test]
    fn promoted_pieces_are_captured_as_pawns() {
        let o = Orientation::White;
        let mut board = Board::empty();
        place(&mut board, o, "d1", PieceKind::Rook, Color::White);
        place(&mut board, o, "d5", PieceKind::Queen, Color::Black);
        place(&mut board, o, "h8", PieceKind::Queen, Color::Black);
        let pos = apply_move(&board, mv(o, "d1", "d5"), &ctx(o, Color::White, CastlingRights::NONE))
            .unwrap();
        assert_eq!(pos.captured(), &[Piece::new(PieceKind::Pawn, Color::Black)]);

        let mut board = Board::empty();
        place(&mut board, o, "d1", PieceKind::Rook, Color::White);
        place(&mut board, o, "d5", PieceKind::Knight, Color::Black);
        place(&mut board, o, "h8", PieceKind::Knight, Color::Black);
        let pos = apply_move(&board, mv(o, "d1", "d5"), &ctx(o, Color::White, CastlingRights::NONE))
            .unwrap();
        assert_eq!(pos.captured(), &[Piece::new(PieceKind::Knight, Color::Black)]);
    }
}
