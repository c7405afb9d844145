//! Analysis board - an interactive chess analysis session backed by an
//! external oracle process.
//!
//! The oracle decides move legality, game status and best moves; this crate
//! keeps the history of the session as a variation tree and drives the
//! oracle over a framed pipe.
//!
//! # Modules
//!
//! - [`config`] - `analysis-board.toml` loading
//! - [`transport`] - framed pipe to the oracle process
//! - [`oracle`] - request/acknowledge/result client
//! - [`game`] - the game orchestrator
//! - [`command`] - line commands read by the binary

pub mod command;
pub mod config;
pub mod game;
pub mod oracle;
pub mod transport;

pub use config::{BoardConfig, ConfigError};
pub use game::{
    BoardStatus, Direction, EngineReply, Game, GameError, GameSettings, MoveOutcome, Setup,
};
pub use oracle::{ClientSettings, OracleClient, OracleError};
pub use transport::{ProcessTransport, Transport};
