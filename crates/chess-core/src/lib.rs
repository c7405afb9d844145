//! Core types for chess.
//!
//! This crate provides the fundamental types used across the analysis board:
//! - [`Piece`], [`PieceKind`] and [`Color`] for piece representation and the
//!   signed piece codes exchanged with the oracle
//! - [`Square`], [`Orientation`] and [`Wing`] for grid coordinates
//! - [`Move`] and [`LegalMove`] for move representation
//! - [`Board`] and [`CastlingRights`] for position state

mod board;
mod castling;
mod color;
mod mov;
mod piece;
mod square;

pub use board::Board;
pub use castling::CastlingRights;
pub use color::Color;
pub use mov::{LegalMove, Move};
pub use piece::{Piece, PieceKind};
pub use square::{Orientation, Square, Wing};
