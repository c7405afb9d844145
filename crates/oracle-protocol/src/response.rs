//! Responses received from the oracle.

use crate::request::parse_move_digits;
use crate::ProtocolError;
use chess_core::{LegalMove, Move, PieceKind};
use serde::{Deserialize, Serialize};

/// Acknowledgement token sent for every request.
pub const ACK: &str = "ok";

/// Prefix of a search result.
pub const SEARCH_PREFIX: &str = "f/";

/// Game-status flags reported with the legal moves of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub check: bool,
    pub checkmate: bool,
    pub stalemate: bool,
    pub insufficient_material: bool,
}

impl StatusFlags {
    /// True when no further moves can be played.
    pub fn is_game_over(&self) -> bool {
        self.checkmate || self.stalemate
    }

    fn encode(&self) -> String {
        [self.check, self.checkmate, self.stalemate, self.insufficient_material]
            .iter()
            .map(|f| if *f { '1' } else { '0' })
            .collect()
    }

    fn parse(s: &str) -> Result<Self, ProtocolError> {
        let bits: Vec<bool> = s
            .chars()
            .map(|c| c.to_digit(10).map(|d| d != 0))
            .collect::<Option<_>>()
            .ok_or_else(|| ProtocolError::Desync(format!("invalid status flags '{}'", s)))?;
        match bits.as_slice() {
            [check, checkmate, stalemate, insufficient_material] => Ok(StatusFlags {
                check: *check,
                checkmate: *checkmate,
                stalemate: *stalemate,
                insufficient_material: *insufficient_material,
            }),
            _ => Err(ProtocolError::Desync(format!(
                "expected 4 status flags, got '{}'",
                s
            ))),
        }
    }
}

/// Result of a `get` request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegalMovesReport {
    pub moves: Vec<LegalMove>,
    pub flags: StatusFlags,
}

/// Result of a `find` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub mv: Move,
    /// Raw move-type code; 1 to 4 name a promotion piece.
    pub move_type: u8,
}

impl SearchResult {
    pub fn promotion(&self) -> Option<PieceKind> {
        PieceKind::from_promotion_code(self.move_type)
    }

    pub fn legal_move(&self) -> LegalMove {
        LegalMove::new(self.mv, self.promotion())
    }
}

/// Messages sent by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ack,
    LegalMoves(LegalMovesReport),
    BestMove(SearchResult),
}

impl Response {
    /// Formats the response for the wire.
    pub fn encode(&self) -> String {
        match self {
            Response::Ack => ACK.to_string(),
            Response::LegalMoves(report) => {
                let mut out = String::with_capacity(2 + report.moves.len() * 5 + 4);
                out.push('/');
                for lm in &report.moves {
                    push_move_digits(&mut out, lm.mv);
                    let code = lm.promotion.and_then(PieceKind::promotion_code).unwrap_or(0);
                    out.push(char::from(b'0' + code));
                }
                out.push('\n');
                out.push_str(&report.flags.encode());
                out
            }
            Response::BestMove(result) => {
                let mut out = String::from(SEARCH_PREFIX);
                push_move_digits(&mut out, result.mv);
                out.push_str(&result.move_type.to_string());
                out
            }
        }
    }

    /// Parses a response as the client receives it.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let input = input.trim_end_matches(['\r', '\n']);
        if input == ACK {
            Ok(Response::Ack)
        } else if let Some(rest) = input.strip_prefix(SEARCH_PREFIX) {
            Self::parse_search(rest).map(Response::BestMove)
        } else if input.starts_with('/') || input.contains('\n') {
            Self::parse_legal_moves(input).map(Response::LegalMoves)
        } else {
            Err(ProtocolError::Desync(format!("unexpected response '{}'", input)))
        }
    }

    fn parse_search(rest: &str) -> Result<SearchResult, ProtocolError> {
        if !(5..=6).contains(&rest.len()) || !rest.is_ascii() {
            return Err(ProtocolError::Desync(format!("invalid search result 'f/{}'", rest)));
        }
        let mv = parse_move_digits(&rest[..4])?;
        let move_type = rest[4..]
            .parse::<u8>()
            .map_err(|_| ProtocolError::Desync(format!("invalid move type '{}'", &rest[4..])))?;
        Ok(SearchResult { mv, move_type })
    }

    fn parse_legal_moves(input: &str) -> Result<LegalMovesReport, ProtocolError> {
        let body = input.strip_prefix('/').unwrap_or(input);
        let (moves_part, flags_part) = body
            .split_once('\n')
            .ok_or_else(|| ProtocolError::Desync("missing status flags".to_string()))?;
        if moves_part.len() % 5 != 0 || !moves_part.is_ascii() {
            return Err(ProtocolError::Desync(format!(
                "legal move list of length {} is not made of 5-digit blocks",
                moves_part.len()
            )));
        }

        let mut moves = Vec::with_capacity(moves_part.len() / 5);
        for start in (0..moves_part.len()).step_by(5) {
            let block = &moves_part[start..start + 5];
            let mv = parse_move_digits(&block[..4])?;
            let code = block[4..]
                .parse::<u8>()
                .map_err(|_| ProtocolError::Desync(format!("invalid move block '{}'", block)))?;
            moves.push(LegalMove::new(mv, PieceKind::from_promotion_code(code)));
        }

        let flags = StatusFlags::parse(flags_part.trim_end())?;
        Ok(LegalMovesReport { moves, flags })
    }
}

fn push_move_digits(out: &mut String, mv: Move) {
    for digit in [mv.from.rank(), mv.from.file(), mv.to.rank(), mv.to.file()] {
        out.push(char::from(b'0' + digit));
    }
}
