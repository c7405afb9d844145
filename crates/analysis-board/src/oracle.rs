//! Client side of the oracle protocol.
//!
//! Every exchange is synchronous: a request, an `ok` acknowledgement and,
//! for `get`, the result. A `find` leaves a search running in the oracle;
//! its result is collected later with [`OracleClient::poll_search`] or
//! [`OracleClient::wait_search`]. Only one request may be outstanding, so
//! `get` and `find` are refused while a search runs.

use crate::config::OracleConfig;
use crate::transport::{ProcessTransport, Transport};
use oracle_protocol::{
    LegalMovesReport, PositionRequest, ProtocolError, Request, Response, SearchResult, ACK,
};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors raised while talking to the oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The oracle process could not be started.
    #[error("failed to spawn oracle: {0}")]
    Spawn(#[source] std::io::Error),
    /// The oracle sent something the protocol doesn't allow here.
    #[error("oracle protocol desync: {0}")]
    Desync(String),
    /// The oracle stopped answering or went away.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    /// A search is still running.
    #[error("a search is already in progress")]
    SearchInProgress,
}

impl OracleError {
    /// Whether the session with the oracle can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OracleError::Desync(_) | OracleError::Unavailable(_))
    }
}

impl From<ProtocolError> for OracleError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Desync(msg) => OracleError::Desync(msg),
            ProtocolError::Io(e) => OracleError::Unavailable(e.to_string()),
        }
    }
}

/// Timing of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub search_timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
    pub exit_timeout: Duration,
}

impl From<&OracleConfig> for ClientSettings {
    fn from(config: &OracleConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            search_timeout: config.search_timeout(),
            retries: config.retries,
            backoff: config.backoff(),
            exit_timeout: config.exit_timeout(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&OracleConfig::default())
    }
}

pub struct OracleClient<T: Transport> {
    transport: T,
    settings: ClientSettings,
    searching: bool,
}

impl OracleClient<ProcessTransport> {
    /// Spawns the configured oracle process.
    pub fn spawn(config: &OracleConfig) -> Result<Self, OracleError> {
        let transport = ProcessTransport::spawn(&config.path, &config.args)?;
        Ok(Self::new(transport, ClientSettings::from(config)))
    }
}

impl<T: Transport> OracleClient<T> {
    pub fn new(transport: T, settings: ClientSettings) -> Self {
        Self {
            transport,
            settings,
            searching: false,
        }
    }

    pub fn settings(&self) -> ClientSettings {
        self.settings
    }

    /// True between an acknowledged `find` and its result or `stop`.
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Asks for the legal moves and status flags of `position`.
    ///
    /// # Errors
    ///
    /// [`OracleError::SearchInProgress`] while a search runs; `Desync` or
    /// `Unavailable` if the exchange fails.
    pub fn legal_moves(
        &mut self,
        position: PositionRequest,
    ) -> Result<LegalMovesReport, OracleError> {
        self.ensure_idle()?;
        self.exchange(&Request::Get(position))?;
        match self.receive("legal moves")? {
            Response::LegalMoves(report) => Ok(report),
            other => Err(OracleError::Desync(format!(
                "expected legal moves, got '{}'",
                other.encode()
            ))),
        }
    }

    /// Starts a best-move search for `position`.
    pub fn start_search(&mut self, position: PositionRequest) -> Result<(), OracleError> {
        self.ensure_idle()?;
        self.exchange(&Request::Find(position))?;
        self.searching = true;
        Ok(())
    }

    /// Returns the search result if it has arrived, without blocking.
    pub fn poll_search(&mut self) -> Result<Option<SearchResult>, OracleError> {
        if !self.searching {
            return Ok(None);
        }
        match self.transport.try_recv()? {
            Some(frame) => self.finish_search(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Blocks until the running search finishes. Returns `Ok(None)` when no
    /// search is running.
    pub fn wait_search(&mut self) -> Result<Option<SearchResult>, OracleError> {
        if !self.searching {
            return Ok(None);
        }
        match self.transport.recv_timeout(self.settings.search_timeout)? {
            Some(frame) => self.finish_search(&frame).map(Some),
            None => {
                error!(timeout = ?self.settings.search_timeout, "search timed out");
                Err(OracleError::Unavailable(format!(
                    "no search result within {:?}",
                    self.settings.search_timeout
                )))
            }
        }
    }

    /// Aborts the running search and waits for the acknowledgement. A
    /// result that crosses the `stop` on the wire is dropped.
    pub fn stop(&mut self) -> Result<(), OracleError> {
        self.send(&Request::Stop)?;
        self.searching = false;
        self.await_ack(true)
    }

    /// Sends `term`, waits for the acknowledgement and then for the process
    /// to exit, killing it after the exit timeout.
    pub fn terminate(&mut self) -> Result<(), OracleError> {
        if self.searching {
            if let Err(e) = self.stop() {
                warn!(error = %e, "failed to stop search before terminating");
            }
        }
        let acked = self
            .send(&Request::Term)
            .and_then(|()| self.await_ack(false));
        if let Err(e) = &acked {
            warn!(error = %e, "oracle did not acknowledge term");
        }
        self.transport.shutdown(self.settings.exit_timeout)?;
        acked
    }

    /// Forgets any outstanding search and drops messages already received.
    pub fn discard_pending(&mut self) {
        self.searching = false;
        while let Ok(Some(frame)) = self.transport.try_recv() {
            debug!(%frame, "discarding stale frame");
        }
    }

    fn ensure_idle(&self) -> Result<(), OracleError> {
        if self.searching {
            Err(OracleError::SearchInProgress)
        } else {
            Ok(())
        }
    }

    fn exchange(&mut self, request: &Request) -> Result<(), OracleError> {
        self.send(request)?;
        self.await_ack(false)
    }

    fn send(&mut self, request: &Request) -> Result<(), OracleError> {
        let payload = request.encode();
        debug!(request = request.tag(), bytes = payload.len(), "sending");
        self.transport.send(&payload)
    }

    fn finish_search(&mut self, frame: &str) -> Result<SearchResult, OracleError> {
        self.searching = false;
        match Response::parse(frame)? {
            Response::BestMove(result) => {
                debug!(?result, "search finished");
                Ok(result)
            }
            other => Err(OracleError::Desync(format!(
                "expected a search result, got '{}'",
                other.encode()
            ))),
        }
    }

    fn await_ack(&mut self, discard_search: bool) -> Result<(), OracleError> {
        loop {
            match self.receive("acknowledgement")? {
                Response::Ack => return Ok(()),
                Response::BestMove(result) if discard_search => {
                    debug!(?result, "dropping search result that raced with stop");
                }
                other => {
                    return Err(OracleError::Desync(format!(
                        "expected '{}', got '{}'",
                        ACK,
                        other.encode()
                    )))
                }
            }
        }
    }

    /// Receives one response, waiting again with exponential backoff when
    /// the request timeout elapses.
    fn receive(&mut self, what: &str) -> Result<Response, OracleError> {
        let mut backoff = self.settings.backoff;
        for attempt in 0..=self.settings.retries {
            if let Some(frame) = self.transport.recv_timeout(self.settings.request_timeout)? {
                debug!(%frame, "received");
                return Ok(Response::parse(&frame)?);
            }
            if attempt < self.settings.retries {
                warn!(what, attempt = attempt + 1, ?backoff, "oracle timed out, retrying");
                thread::sleep(backoff);
                backoff *= 2;
            }
        }
        error!(what, "oracle did not answer");
        Err(OracleError::Unavailable(format!(
            "no {} after {} attempts",
            what,
            self.settings.retries + 1
        )))
    }
}
