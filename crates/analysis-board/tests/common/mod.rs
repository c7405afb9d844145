//! An in-memory oracle for driving `Game` in tests.
//!
//! Legal moves come from a fixed pool of coordinate moves: a pool move is
//! offered whenever its origin holds a piece of the side to move. Search
//! results are taken from a queue; with an empty queue a search stays
//! outstanding.

#![allow(dead_code)]

use analysis_board::{ClientSettings, Game, GameSettings, OracleClient, OracleError, Transport};
use chess_board::TreeLimits;
use chess_core::{Color, LegalMove};
use oracle_protocol::{LegalMovesReport, PositionRequest, Request, Response, SearchResult, StatusFlags};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
pub struct FakeState {
    pub requests: Vec<Request>,
    inbox: VecDeque<String>,
    pool: Vec<String>,
    best_moves: VecDeque<String>,
    pub flags: StatusFlags,
    /// Drop every request without answering.
    pub silent: bool,
    /// Answer `get` with this text instead of a move list.
    pub garbage: Option<String>,
    pub shut_down: bool,
}

impl FakeState {
    fn answer(&mut self, request: &Request) {
        match request {
            Request::Get(position) => {
                self.inbox.push_back("ok".to_string());
                let reply = match &self.garbage {
                    Some(text) => text.clone(),
                    None => Response::LegalMoves(self.legal_moves(position)).encode(),
                };
                self.inbox.push_back(reply);
            }
            Request::Find(position) => {
                self.inbox.push_back("ok".to_string());
                if let Some(best) = self.best_moves.pop_front() {
                    if let Some(lm) = LegalMove::parse_coordinate(&best, position.orientation) {
                        let move_type = lm
                            .promotion
                            .and_then(|kind| kind.promotion_code())
                            .unwrap_or(0);
                        let found = SearchResult {
                            mv: lm.mv,
                            move_type,
                        };
                        self.inbox.push_back(Response::BestMove(found).encode());
                    }
                }
            }
            Request::Stop | Request::Term => self.inbox.push_back("ok".to_string()),
        }
    }

    fn legal_moves(&self, position: &PositionRequest) -> LegalMovesReport {
        let moves = self
            .pool
            .iter()
            .filter_map(|text| LegalMove::parse_coordinate(text, position.orientation))
            .filter(|lm| {
                position
                    .board
                    .get(lm.mv.from)
                    .is_some_and(|piece| piece.color == position.side_to_move)
            })
            .collect();
        LegalMovesReport {
            moves,
            flags: self.flags,
        }
    }
}

/// The transport half, moved into the client.
pub struct FakeOracle {
    state: Rc<RefCell<FakeState>>,
}

/// The test's view of the same state.
#[derive(Clone)]
pub struct FakeHandle {
    state: Rc<RefCell<FakeState>>,
}

impl FakeOracle {
    pub fn new(pool: &[&str]) -> (Self, FakeHandle) {
        let state = Rc::new(RefCell::new(FakeState {
            pool: pool.iter().map(|s| s.to_string()).collect(),
            ..FakeState::default()
        }));
        (
            FakeOracle {
                state: Rc::clone(&state),
            },
            FakeHandle { state },
        )
    }
}

impl FakeHandle {
    pub fn queue_best_move(&self, coordinate: &str) {
        self.state
            .borrow_mut()
            .best_moves
            .push_back(coordinate.to_string());
    }

    pub fn set_flags(&self, flags: StatusFlags) {
        self.state.borrow_mut().flags = flags;
    }

    pub fn set_silent(&self, silent: bool) {
        self.state.borrow_mut().silent = silent;
    }

    pub fn set_garbage(&self, garbage: Option<&str>) {
        self.state.borrow_mut().garbage = garbage.map(str::to_string);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.state.borrow().requests.iter().map(Request::tag).collect()
    }

    pub fn count(&self, tag: &str) -> usize {
        self.tags().into_iter().filter(|t| *t == tag).count()
    }

    pub fn last_position(&self) -> Option<PositionRequest> {
        self.state
            .borrow()
            .requests
            .iter()
            .rev()
            .find_map(|r| match r {
                Request::Get(p) | Request::Find(p) => Some(p.clone()),
                _ => None,
            })
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }
}

impl Transport for FakeOracle {
    fn send(&mut self, payload: &str) -> Result<(), OracleError> {
        let request = Request::parse(payload)?;
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());
        if !state.silent {
            state.answer(&request);
        }
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<String>, OracleError> {
        Ok(self.state.borrow_mut().inbox.pop_front())
    }

    fn try_recv(&mut self) -> Result<Option<String>, OracleError> {
        Ok(self.state.borrow_mut().inbox.pop_front())
    }

    fn shutdown(&mut self, _timeout: Duration) -> Result<(), OracleError> {
        self.state.borrow_mut().shut_down = true;
        Ok(())
    }
}

pub fn fast_settings() -> ClientSettings {
    ClientSettings {
        request_timeout: Duration::from_millis(1),
        search_timeout: Duration::from_millis(1),
        retries: 1,
        backoff: Duration::from_millis(1),
        exit_timeout: Duration::from_millis(1),
    }
}

pub fn analysis() -> GameSettings {
    GameSettings::default()
}

pub fn versus_engine(user_color: Color) -> GameSettings {
    GameSettings {
        engine_on: true,
        user_color,
        limits: TreeLimits::default(),
    }
}

/// Starts a game over a fake oracle offering `pool`.
pub fn game(pool: &[&str], settings: GameSettings) -> (Game<FakeOracle>, FakeHandle) {
    let (oracle, handle) = FakeOracle::new(pool);
    let client = OracleClient::new(oracle, fast_settings());
    let game = Game::new(client, settings).expect("game starts");
    (game, handle)
}

/// Plays a coordinate move in the live orientation.
pub fn play(
    game: &mut Game<FakeOracle>,
    coordinate: &str,
) -> Result<analysis_board::MoveOutcome, analysis_board::GameError> {
    let lm = LegalMove::parse_coordinate(coordinate, game.orientation())
        .expect("valid coordinate");
    game.play(lm.mv, lm.promotion)
}

pub fn notation(game: &Game<FakeOracle>) -> String {
    game.current_position()
        .expect("current position")
        .notation()
        .to_string()
}
