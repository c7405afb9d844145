//! Rules state and move history for the analysis board.
//!
//! This crate provides:
//! - [`apply_move`] - board effects of a single move (captures, castling,
//!   en passant, promotion, castling rights)
//! - [`Notation`] - algebraic-style notation computed from the oracle's
//!   legal-move list
//! - [`Position`] - immutable snapshot stored per tree node
//! - [`VariationTree`] - the main line and its variations, with projection of
//!   nested lines for display
//!
//! Move legality is not decided here; callers pass the legal-move list they
//! obtained from the oracle.
//!
//! # Example
//!
//! ```
//! use chess_board::{apply_move, MoveContext, Position, TreeLimits, VariationTree};
//! use chess_core::{CastlingRights, Color, LegalMove, Move, Orientation};
//!
//! let o = Orientation::White;
//! let root = Position::startpos(o);
//! let e2e4 = Move::new(o.parse_square("e2").unwrap(), o.parse_square("e4").unwrap());
//! let legal = [LegalMove::plain(e2e4)];
//! let ctx = MoveContext {
//!     side_to_move: Color::White,
//!     orientation: o,
//!     castling: CastlingRights::ALL,
//!     legal_moves: &legal,
//!     promotion: None,
//! };
//! let next = apply_move(root.board(), e2e4, &ctx).unwrap();
//! assert_eq!(next.notation().to_string(), "e4");
//!
//! let mut tree = VariationTree::new(root, TreeLimits::default());
//! let id = tree.add_move(next, tree.root()).unwrap().id();
//! assert_eq!(tree.position(id).unwrap().ply(), 1);
//! ```

mod apply;
pub mod notation;
mod position;
pub mod tree;

pub use apply::{apply_move, ApplyError, MoveContext};
pub use notation::{Notation, StatusMark};
pub use position::Position;
pub use tree::{AddOutcome, Node, NodeId, SliceEntry, TreeError, TreeLimits, VariationTree, VisibleSlice};
