//! 64-character board encoding.
//!
//! Squares are written row-major in the frame of the request. Empty squares
//! are `0`, White pieces `PNBRQK` and Black pieces `pnbrqk`.

use crate::ProtocolError;
use chess_core::{Board, Piece, Square};

/// Number of characters in an encoded board.
pub const BOARD_LEN: usize = 64;

pub fn encode_board(board: &Board) -> String {
    Square::all()
        .map(|sq| board.get(sq).map(Piece::to_fen_char).unwrap_or('0'))
        .collect()
}

pub fn decode_board(s: &str) -> Result<Board, ProtocolError> {
    let len = s.chars().count();
    if len != BOARD_LEN {
        return Err(ProtocolError::Desync(format!(
            "board must be {} characters, got {}",
            BOARD_LEN, len
        )));
    }
    let mut board = Board::empty();
    for (sq, c) in Square::all().zip(s.chars()) {
        if c == '0' {
            continue;
        }
        let piece = Piece::from_fen_char(c)
            .ok_or_else(|| ProtocolError::Desync(format!("invalid board character '{}'", c)))?;
        board.set(sq, Some(piece));
    }
    Ok(board)
}
