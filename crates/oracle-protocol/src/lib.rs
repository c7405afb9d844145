//! Wire protocol spoken with the legality and search oracle.
//!
//! The oracle is a separate process. Each exchange is a request, an `ok`
//! acknowledgement and, for `get` and `find`, a result. Messages travel as
//! length-prefixed frames (see [`frame`]).
//!
//! # Requests
//!
//! - `get` - legal moves and status flags of a position
//! - `find` - start a best-move search for a position
//! - `stop` - abort a running search
//! - `term` - shut the oracle down
//!
//! `get` and `find` carry four more lines: the 64-character board, the side
//! to move and orientation characters (`1` White, `-` Black), the last move
//! as four grid digits (`-1-1-1-1` for none) and the castling rights as a
//! decimal number.
//!
//! # Responses
//!
//! - `ok` - acknowledgement
//! - `/` + 5-digit move blocks + `\n` + 4 status flags - result of `get`
//! - `f/` + 4 move digits + move type - result of `find`

mod encoding;
pub mod frame;
mod request;
mod response;

pub use encoding::{decode_board, encode_board, BOARD_LEN};
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use request::{PositionRequest, Request, NO_MOVE};
pub use response::{LegalMovesReport, Response, SearchResult, StatusFlags, ACK, SEARCH_PREFIX};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("protocol desync: {0}")]
    Desync(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
