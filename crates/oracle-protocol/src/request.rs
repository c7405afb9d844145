//! Requests sent to the oracle.

use crate::encoding::{decode_board, encode_board};
use crate::ProtocolError;
use chess_core::{Board, CastlingRights, Color, Move, Orientation, Square};

/// Move line sent for a position without a previous move.
pub const NO_MOVE: &str = "-1-1-1-1";

/// The position a `get` or `find` request is about, expressed in
/// `orientation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRequest {
    pub board: Board,
    pub side_to_move: Color,
    pub orientation: Orientation,
    /// The move that led to the position, needed for en passant.
    pub last_move: Option<Move>,
    pub castling: CastlingRights,
}

/// Commands understood by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Legal moves and game status of a position.
    Get(PositionRequest),
    /// Start searching for the best move of a position.
    Find(PositionRequest),
    /// Abort a running search.
    Stop,
    /// Shut the oracle down.
    Term,
}

impl Request {
    pub fn tag(&self) -> &'static str {
        match self {
            Request::Get(_) => "get",
            Request::Find(_) => "find",
            Request::Stop => "stop",
            Request::Term => "term",
        }
    }

    /// Formats the request for the wire.
    pub fn encode(&self) -> String {
        match self {
            Request::Get(pos) | Request::Find(pos) => {
                let mut out = String::with_capacity(96);
                out.push_str(self.tag());
                out.push('\n');
                out.push_str(&encode_board(&pos.board));
                out.push('\n');
                out.push(pos.side_to_move.wire_char());
                out.push(pos.orientation.wire_char());
                out.push('\n');
                match pos.last_move {
                    Some(mv) => {
                        for digit in [mv.from.rank(), mv.from.file(), mv.to.rank(), mv.to.file()] {
                            out.push(char::from(b'0' + digit));
                        }
                    }
                    None => out.push_str(NO_MOVE),
                }
                out.push('\n');
                out.push_str(&pos.castling.raw().to_string());
                out
            }
            Request::Stop | Request::Term => self.tag().to_string(),
        }
    }

    /// Parses a request as the oracle receives it.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let mut lines = input.trim_end().split('\n').map(|l| l.trim_end_matches('\r'));
        let tag = lines.next().unwrap_or("");
        match tag {
            "stop" => Ok(Request::Stop),
            "term" => Ok(Request::Term),
            "get" => Ok(Request::Get(Self::parse_position(lines)?)),
            "find" => Ok(Request::Find(Self::parse_position(lines)?)),
            other => Err(ProtocolError::Desync(format!("unknown request '{}'", other))),
        }
    }

    fn parse_position<'a>(
        mut lines: impl Iterator<Item = &'a str>,
    ) -> Result<PositionRequest, ProtocolError> {
        let mut next = |what: &str| {
            lines
                .next()
                .ok_or_else(|| ProtocolError::Desync(format!("missing {} line", what)))
        };

        let board = decode_board(next("board")?)?;

        let sides: Vec<char> = next("side")?.chars().collect();
        let (side_to_move, orientation) = match sides.as_slice() {
            [s, o] => (
                Color::from_wire_char(*s),
                Orientation::from_wire_char(*o),
            ),
            _ => (None, None),
        };
        let (Some(side_to_move), Some(orientation)) = (side_to_move, orientation) else {
            return Err(ProtocolError::Desync(format!(
                "invalid side line '{}'",
                sides.iter().collect::<String>()
            )));
        };

        let move_line = next("move")?;
        let last_move = if move_line == NO_MOVE {
            None
        } else {
            Some(parse_move_digits(move_line)?)
        };

        let castling_line = next("castling")?;
        let castling = castling_line
            .parse::<u8>()
            .ok()
            .filter(|c| *c < 16)
            .map(CastlingRights::new)
            .ok_or_else(|| {
                ProtocolError::Desync(format!("invalid castling rights '{}'", castling_line))
            })?;

        Ok(PositionRequest {
            board,
            side_to_move,
            orientation,
            last_move,
            castling,
        })
    }
}

/// Parses four grid digits `from rank, from file, to rank, to file`.
pub(crate) fn parse_move_digits(s: &str) -> Result<Move, ProtocolError> {
    let digits: Vec<u8> = s
        .bytes()
        .map(|b| b.wrapping_sub(b'0'))
        .filter(|d| *d < 8)
        .collect();
    let square = |rank: u8, file: u8| Square::new(rank, file);
    match (s.len(), digits.as_slice()) {
        (4, [fr, ff, tr, tf]) => match (square(*fr, *ff), square(*tr, *tf)) {
            (Some(from), Some(to)) => Ok(Move::new(from, to)),
            _ => Err(ProtocolError::Desync(format!("invalid move digits '{}'", s))),
        },
        _ => Err(ProtocolError::Desync(format!("invalid move digits '{}'", s))),
    }
}
