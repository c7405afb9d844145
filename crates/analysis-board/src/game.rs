//! The game orchestrator.
//!
//! [`Game`] owns the variation tree, the node being looked at and the
//! oracle's answers for it: the legal moves (in the live orientation) and
//! the status flags. Positions are stored in the orientation they were
//! recorded in; flipping the board only changes the live view.

use crate::config::BoardConfig;
use crate::oracle::{OracleClient, OracleError};
use crate::transport::Transport;
use chess_board::{
    apply_move, AddOutcome, ApplyError, MoveContext, NodeId, Position, StatusMark, TreeError,
    TreeLimits, VariationTree, VisibleSlice,
};
use chess_core::{Board, CastlingRights, Color, LegalMove, Move, Orientation, Piece, PieceKind};
use oracle_protocol::{encode_board, PositionRequest, SearchResult, StatusFlags};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Occurrences of a position that allow a draw claim.
pub const REPETITION_LIMIT: u32 = 3;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("illegal move: {0}")]
    InvalidMove(String),
    #[error("it is the engine's turn to move")]
    EngineTurn,
    #[error("no room for another variation at node {at}")]
    TreeFull { at: NodeId },
    #[error("unknown node {0}")]
    UnknownKey(NodeId),
    #[error("the oracle failed; restart the game")]
    Faulted,
    #[error("invalid setup: {0}")]
    Setup(String),
    #[error(transparent)]
    Tree(TreeError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl From<TreeError> for GameError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::UnknownKey(id) => GameError::UnknownKey(id),
            TreeError::TreeFull { at } => GameError::TreeFull { at },
            other => GameError::Tree(other),
        }
    }
}

/// What the board currently shows, derived from the oracle's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    DrawClaimed,
}

impl BoardStatus {
    /// Insufficient material only ends games played against the oracle.
    pub fn from_flags(flags: &StatusFlags, engine_on: bool) -> Self {
        if engine_on && flags.insufficient_material {
            BoardStatus::InsufficientMaterial
        } else if flags.checkmate {
            BoardStatus::Checkmate
        } else if flags.check {
            BoardStatus::Check
        } else if flags.stalemate {
            BoardStatus::Stalemate
        } else {
            BoardStatus::Ongoing
        }
    }

    pub fn is_game_over(self) -> bool {
        matches!(
            self,
            BoardStatus::Checkmate
                | BoardStatus::Stalemate
                | BoardStatus::InsufficientMaterial
                | BoardStatus::DrawClaimed
        )
    }

    fn mark(self) -> Option<StatusMark> {
        match self {
            BoardStatus::Check => Some(StatusMark::Check),
            BoardStatus::Checkmate => Some(StatusMark::Mate),
            BoardStatus::Stalemate => Some(StatusMark::Stalemate),
            _ => None,
        }
    }
}

/// Result of playing a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Played {
        node: NodeId,
        /// The move already existed and the game moved to it.
        redirected: bool,
        /// The position has now occurred [`REPETITION_LIMIT`] times.
        draw_claimable: bool,
    },
    /// A pawn reached the last rank; play it again with a piece.
    PromotionRequired,
}

/// A finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineReply {
    /// The oracle's side moved.
    Played(MoveOutcome),
    /// The best move for the user, in the live orientation.
    Hint(LegalMove),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    /// The oracle plays the side opposite `user_color`.
    pub engine_on: bool,
    pub user_color: Color,
    pub limits: TreeLimits,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            engine_on: false,
            user_color: Color::White,
            limits: TreeLimits::default(),
        }
    }
}

impl From<&BoardConfig> for GameSettings {
    fn from(config: &BoardConfig) -> Self {
        Self {
            engine_on: config.game.engine_on,
            user_color: config.game.user_color,
            limits: config.tree.limits(),
        }
    }
}

/// An edited starting position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    /// The grid as seen from `orientation`.
    pub board: Board,
    pub orientation: Orientation,
    pub side_to_move: Color,
    pub castling: CastlingRights,
}

impl Setup {
    /// Checks the king count and drops castling rights the board cannot
    /// support.
    pub fn into_root(self) -> Result<Position, GameError> {
        for color in [Color::White, Color::Black] {
            let kings = self.board.count(Piece::new(PieceKind::King, color));
            if kings != 1 {
                return Err(GameError::Setup(format!(
                    "expected one {} king, found {}",
                    color, kings
                )));
            }
        }
        let castling = self.castling.sanitize(&self.board, self.orientation);
        if castling != self.castling {
            debug!(requested = %self.castling, kept = %castling, "castling rights sanitized");
        }
        Ok(Position::root(
            self.board,
            self.side_to_move,
            self.orientation,
            castling,
        ))
    }
}

/// Where and in which frame the running search was requested.
#[derive(Debug, Clone, Copy)]
struct SearchOrigin {
    node: NodeId,
    orientation: Orientation,
}

pub struct Game<T: Transport> {
    client: OracleClient<T>,
    settings: GameSettings,
    orientation: Orientation,
    tree: VariationTree,
    current: NodeId,
    side_to_move: Color,
    legal_moves: Vec<LegalMove>,
    flags: StatusFlags,
    status: BoardStatus,
    repetitions: HashMap<String, u32>,
    draw_claimable: bool,
    search: Option<SearchOrigin>,
    faulted: bool,
}

impl<T: Transport> Game<T> {
    /// A new game from the standard starting position.
    pub fn new(client: OracleClient<T>, settings: GameSettings) -> Result<Self, GameError> {
        let root = Position::startpos(Orientation::of(settings.user_color));
        Self::start(client, settings, root)
    }

    /// A new game from an edited position.
    pub fn from_setup(
        client: OracleClient<T>,
        settings: GameSettings,
        setup: Setup,
    ) -> Result<Self, GameError> {
        let root = setup.into_root()?;
        Self::start(client, settings, root)
    }

    fn start(
        client: OracleClient<T>,
        settings: GameSettings,
        root: Position,
    ) -> Result<Self, GameError> {
        let side_to_move = root.side_to_move();
        let mut game = Game {
            client,
            settings,
            orientation: Orientation::of(settings.user_color),
            tree: VariationTree::new(root, settings.limits),
            current: NodeId::ROOT,
            side_to_move,
            legal_moves: Vec::new(),
            flags: StatusFlags::default(),
            status: BoardStatus::Ongoing,
            repetitions: HashMap::new(),
            draw_claimable: false,
            search: None,
            faulted: false,
        };
        game.begin()?;
        Ok(game)
    }

    fn begin(&mut self) -> Result<(), GameError> {
        self.repetitions.clear();
        self.draw_claimable = false;
        self.status = BoardStatus::Ongoing;
        self.move_to(NodeId::ROOT)?;
        info!(
            engine = ?self.engine_color(),
            user = %self.settings.user_color,
            "game started"
        );
        self.request_legal_moves()?;
        self.record_repetition()?;
        if self.engine_to_move() {
            self.request_engine_move()?;
        }
        Ok(())
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn tree(&self) -> &VariationTree {
        &self.tree
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn current_position(&self) -> Result<&Position, GameError> {
        Ok(self.tree.position(self.current)?)
    }

    /// The orientation the board is shown in.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Legal moves of the current position, in the live orientation.
    pub fn legal_moves(&self) -> &[LegalMove] {
        &self.legal_moves
    }

    pub fn flags(&self) -> StatusFlags {
        self.flags
    }

    pub fn status(&self) -> BoardStatus {
        self.status
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Whether the move that led to the current node repeated a position for
    /// the third time. Moving to another node withdraws the claim.
    pub fn draw_claimable(&self) -> bool {
        self.draw_claimable
    }

    pub fn is_searching(&self) -> bool {
        self.client.is_searching()
    }

    /// The side the oracle plays, if any.
    pub fn engine_color(&self) -> Option<Color> {
        self.settings
            .engine_on
            .then(|| self.settings.user_color.opposite())
    }

    pub fn engine_to_move(&self) -> bool {
        self.engine_color() == Some(self.side_to_move)
    }

    /// The current board as seen in the live orientation.
    pub fn board(&self) -> Result<Board, GameError> {
        Ok(self.current_position()?.board_in(self.orientation))
    }

    /// The nested lines around the current node.
    pub fn visible_slice(&mut self) -> Result<VisibleSlice, GameError> {
        self.ensure_live()?;
        Ok(self.tree.project(self.current)?)
    }

    /// Refreshes the legal moves and status of the current position.
    ///
    /// Check, mate and stalemate are written into the current node's
    /// notation; asking again for the same position changes nothing.
    pub fn request_legal_moves(&mut self) -> Result<BoardStatus, GameError> {
        self.ensure_live()?;
        let request = self.position_request()?;
        let result = self.client.legal_moves(request);
        let report = self.check(result)?;

        debug!(node = %self.current, moves = report.moves.len(), flags = ?report.flags, "legal moves");
        self.legal_moves = report.moves;
        self.flags = report.flags;
        self.status = BoardStatus::from_flags(&report.flags, self.settings.engine_on);
        if let Some(mark) = self.status.mark() {
            if self.current != NodeId::ROOT {
                self.tree.mark(self.current, mark)?;
            }
        }
        Ok(self.status)
    }

    /// Plays a user move given in the live orientation.
    ///
    /// # Errors
    ///
    /// - [`GameError::EngineTurn`] when the oracle's side is to move
    /// - [`GameError::InvalidMove`] when the move is not in the legal list
    /// - [`GameError::TreeFull`] when the variation doesn't fit; the board
    ///   stays on the current node
    pub fn play(&mut self, mv: Move, promotion: Option<PieceKind>) -> Result<MoveOutcome, GameError> {
        self.ensure_live()?;
        if self.engine_to_move() {
            return Err(GameError::EngineTurn);
        }
        if self.client.is_searching() {
            self.stop_engine()?;
        }
        self.play_move(mv, promotion)
    }

    fn play_move(&mut self, mv: Move, promotion: Option<PieceKind>) -> Result<MoveOutcome, GameError> {
        let played = LegalMove::new(mv, promotion);
        let mut candidates = self.legal_moves.iter().filter(|lm| lm.mv == mv).peekable();
        let listed = candidates.peek().is_some();
        let promotions_listed = self
            .legal_moves
            .iter()
            .any(|lm| lm.mv == mv && lm.promotion.is_some());
        let promotion_ok = promotion.is_none()
            || !promotions_listed
            || candidates.any(|lm| lm.promotion == promotion);
        if !listed || !promotion_ok {
            return Err(GameError::InvalidMove(played.to_coordinate(self.orientation)));
        }

        let position = {
            let current = self.tree.position(self.current)?;
            let board = current.board_in(self.orientation);
            let ctx = MoveContext {
                side_to_move: current.side_to_move(),
                orientation: self.orientation,
                castling: current.castling(),
                legal_moves: &self.legal_moves,
                promotion,
            };
            apply_move(&board, mv, &ctx)?
        };

        self.commit(position)
    }

    /// Inserts `position` under the current node and makes it current.
    ///
    /// A move that already exists under the current node is not added
    /// again; the game moves to the existing node instead. A position still
    /// waiting for its promotion piece is not inserted. A running search is
    /// stopped first.
    pub fn commit(&mut self, position: Position) -> Result<MoveOutcome, GameError> {
        self.ensure_live()?;
        if position.promotion_pending() {
            debug!(notation = %position.notation(), "promotion piece required");
            return Ok(MoveOutcome::PromotionRequired);
        }
        if self.client.is_searching() {
            self.stop_engine()?;
        }
        let notation = position.notation().to_string();
        let outcome = match self.tree.add_move(position, self.current) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(node = %self.current, error = %e, "move not added");
                return Err(e.into());
            }
        };
        let node = outcome.id();
        let redirected = matches!(outcome, AddOutcome::Redirected(_));
        info!(%node, %notation, redirected, "move committed");

        self.move_to(node)?;
        self.request_legal_moves()?;
        if self.status.is_game_over() {
            info!(status = ?self.status, "game over");
            return Ok(MoveOutcome::Played {
                node,
                redirected,
                draw_claimable: false,
            });
        }
        if self.engine_to_move() {
            self.request_engine_move()?;
        }
        let draw_claimable = self.record_repetition()?;
        Ok(MoveOutcome::Played {
            node,
            redirected,
            draw_claimable,
        })
    }

    /// Starts a search on the current position. Returns false when the
    /// game is over.
    pub fn request_engine_move(&mut self) -> Result<bool, GameError> {
        self.ensure_live()?;
        if self.status.is_game_over() {
            return Ok(false);
        }
        let request = self.position_request()?;
        let result = self.client.start_search(request);
        self.check(result)?;
        self.search = Some(SearchOrigin {
            node: self.current,
            orientation: self.orientation,
        });
        info!(node = %self.current, "search started");
        Ok(true)
    }

    /// Collects a finished search without blocking.
    pub fn poll_engine_move(&mut self) -> Result<Option<EngineReply>, GameError> {
        self.ensure_live()?;
        let result = self.client.poll_search();
        match self.check(result)? {
            Some(found) => self.handle_search_result(found),
            None => Ok(None),
        }
    }

    /// Blocks until the running search finishes.
    pub fn wait_engine_move(&mut self) -> Result<Option<EngineReply>, GameError> {
        self.ensure_live()?;
        let result = self.client.wait_search();
        match self.check(result)? {
            Some(found) => self.handle_search_result(found),
            None => Ok(None),
        }
    }

    /// Aborts the running search, if any.
    pub fn stop_engine(&mut self) -> Result<(), GameError> {
        self.ensure_live()?;
        self.search = None;
        if !self.client.is_searching() {
            return Ok(());
        }
        let result = self.client.stop();
        self.check(result)?;
        debug!("search stopped");
        Ok(())
    }

    fn handle_search_result(&mut self, found: SearchResult) -> Result<Option<EngineReply>, GameError> {
        let Some(origin) = self.search.take() else {
            debug!(?found, "no search was expected, dropping result");
            return Ok(None);
        };
        if origin.node != self.current {
            debug!(?found, "dropping result for a position no longer shown");
            return Ok(None);
        }
        let best = LegalMove::new(
            found.mv.convert(origin.orientation, self.orientation),
            found.promotion(),
        );

        if !self.engine_to_move() {
            info!(mv = %best.to_coordinate(self.orientation), "hint");
            return Ok(Some(EngineReply::Hint(best)));
        }

        if !self.legal_moves.iter().any(|lm| lm.mv == best.mv) {
            let err = OracleError::Desync(format!(
                "engine move {} is not legal",
                best.to_coordinate(self.orientation)
            ));
            error!(error = %err, "game faulted");
            self.fault();
            return Err(err.into());
        }
        info!(mv = %best.to_coordinate(self.orientation), "engine plays");
        let outcome = match self.play_move(best.mv, best.promotion)? {
            MoveOutcome::PromotionRequired => self.play_move(best.mv, Some(PieceKind::Queen))?,
            played => played,
        };
        Ok(Some(EngineReply::Played(outcome)))
    }

    /// Shows another node without changing the tree.
    pub fn set_to_node(&mut self, id: NodeId) -> Result<BoardStatus, GameError> {
        self.ensure_live()?;
        self.tree.get(id)?;
        if self.client.is_searching() {
            self.stop_engine()?;
        }
        self.move_to(id)?;
        debug!(node = %id, "navigated");
        self.request_legal_moves()
    }

    /// Steps to the parent or to the main continuation. Returns false when
    /// there is nowhere to go.
    pub fn step(&mut self, direction: Direction) -> Result<bool, GameError> {
        self.ensure_live()?;
        let target = match direction {
            Direction::Back => self.tree.parent(self.current)?,
            Direction::Forward => self.tree.children(self.current)?.first().copied(),
        };
        match target {
            Some(id) => {
                self.set_to_node(id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes the current node and everything after it, moving to its
    /// parent. Returns the removed ids.
    pub fn trim_from_current(&mut self) -> Result<Vec<NodeId>, GameError> {
        self.ensure_live()?;
        let old = self.current;
        let parent = self
            .tree
            .parent(old)?
            .ok_or(GameError::Tree(TreeError::RootNotTrimmable))?;
        self.set_to_node(parent)?;
        let removed = self.tree.trim(old)?;
        self.tree.project(self.current)?;
        info!(node = %old, removed = removed.len(), "subtree trimmed");
        Ok(removed)
    }

    /// Swaps the variation holding the current node with the one before it.
    pub fn promote_variation(&mut self) -> Result<Option<NodeId>, GameError> {
        self.ensure_live()?;
        let promoted = self.tree.promote_variation(self.current)?;
        self.tree.project(self.current)?;
        if let Some(branch) = promoted {
            info!(%branch, "variation promoted");
        }
        Ok(promoted)
    }

    /// Turns the board around. Stored positions are untouched.
    pub fn flip_board(&mut self) -> Result<Orientation, GameError> {
        self.ensure_live()?;
        self.orientation = self.orientation.flipped();
        for lm in &mut self.legal_moves {
            *lm = lm.flipped();
        }
        debug!(orientation = %self.orientation, "board flipped");
        Ok(self.orientation)
    }

    /// Takes a move back.
    ///
    /// Without the oracle playing this is a step back. Against the oracle
    /// the user's last move and the oracle's answer are deleted, and the
    /// oracle moves again if it is its turn afterwards.
    pub fn take_back(&mut self) -> Result<bool, GameError> {
        self.ensure_live()?;
        if self.current == NodeId::ROOT {
            return Ok(false);
        }
        if !self.settings.engine_on {
            return self.step(Direction::Back);
        }

        if self.client.is_searching() {
            self.stop_engine()?;
            self.trim_from_current()?;
            return Ok(true);
        }

        if self.tree.parent(self.current)? != Some(NodeId::ROOT) {
            self.step(Direction::Back)?;
        }
        self.trim_from_current()?;
        if self.engine_to_move() {
            self.request_engine_move()?;
        }
        Ok(true)
    }

    /// Ends the game as a draw if the current position has repeated
    /// often enough. Returns whether the claim was accepted.
    pub fn claim_draw(&mut self) -> Result<bool, GameError> {
        self.ensure_live()?;
        if !self.draw_claimable {
            return Ok(false);
        }
        if self.client.is_searching() {
            self.stop_engine()?;
        }
        self.draw_claimable = false;
        self.status = BoardStatus::DrawClaimed;
        self.legal_moves.clear();
        info!("draw claimed by repetition");
        Ok(true)
    }

    /// Starts over from the root position, keeping or dropping the tree.
    /// This is the only operation allowed after an oracle fault.
    pub fn restart(&mut self, keep_tree: bool) -> Result<(), GameError> {
        if self.faulted {
            warn!("restarting after an oracle fault");
            self.faulted = false;
            self.client.discard_pending();
        } else if self.client.is_searching() {
            self.stop_engine()?;
        }
        self.search = None;
        if !keep_tree {
            let root = self.tree.position(NodeId::ROOT)?.clone();
            self.tree = VariationTree::new(root, self.settings.limits);
        }
        self.begin()
    }

    /// Shuts the oracle down.
    pub fn shutdown(&mut self) -> Result<(), GameError> {
        self.search = None;
        self.client.terminate()?;
        info!("oracle terminated");
        Ok(())
    }

    fn move_to(&mut self, id: NodeId) -> Result<(), GameError> {
        let side_to_move = self.tree.position(id)?.side_to_move();
        self.current = id;
        self.side_to_move = side_to_move;
        self.draw_claimable = false;
        self.tree.project(id)?;
        Ok(())
    }

    fn position_request(&self) -> Result<PositionRequest, GameError> {
        let position = self.tree.position(self.current)?;
        Ok(PositionRequest {
            board: position.board_in(self.orientation),
            side_to_move: position.side_to_move(),
            orientation: self.orientation,
            last_move: position.move_in(self.orientation),
            castling: position.castling(),
        })
    }

    /// Counts the current position and reports whether a draw may be
    /// claimed. The key ignores the live orientation.
    fn record_repetition(&mut self) -> Result<bool, GameError> {
        let key = encode_board(&self.tree.position(self.current)?.board_in(Orientation::White));
        let count = self.repetitions.entry(key).or_insert(0);
        *count += 1;
        let count = *count;
        self.draw_claimable =
            count >= REPETITION_LIMIT && self.settings.engine_on && !self.engine_to_move();
        if self.draw_claimable {
            info!(count, "position repeated, draw can be claimed");
        }
        Ok(self.draw_claimable)
    }

    fn ensure_live(&self) -> Result<(), GameError> {
        if self.faulted {
            Err(GameError::Faulted)
        } else {
            Ok(())
        }
    }

    fn check<R>(&mut self, result: Result<R, OracleError>) -> Result<R, GameError> {
        result.map_err(|e| {
            if e.is_fatal() {
                error!(error = %e, "oracle failed, game faulted");
                self.fault();
            }
            GameError::Oracle(e)
        })
    }

    fn fault(&mut self) {
        self.faulted = true;
        self.legal_moves.clear();
        self.search = None;
    }
}
