//! Message transport between the client and the oracle process.

use crate::oracle::OracleError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use oracle_protocol::{read_frame, write_frame, ProtocolError};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A duplex channel carrying whole protocol messages.
pub trait Transport {
    /// Sends one message.
    fn send(&mut self, payload: &str) -> Result<(), OracleError>;

    /// Waits up to `timeout` for the next message. `Ok(None)` means the
    /// timeout elapsed.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<String>, OracleError>;

    /// Returns the next message if one has already arrived.
    fn try_recv(&mut self) -> Result<Option<String>, OracleError>;

    /// Closes the channel and waits up to `timeout` for the peer to go away.
    fn shutdown(&mut self, timeout: Duration) -> Result<(), OracleError>;
}

type Frame = Result<String, ProtocolError>;

/// The oracle running as a child process, framed over its stdin and stdout.
///
/// A reader thread decodes frames from the child's stdout and forwards them
/// over a channel, so receiving can time out while the child is busy.
pub struct ProcessTransport {
    process: Child,
    stdin: Option<ChildStdin>,
    frames: Receiver<Frame>,
    reader: Option<JoinHandle<()>>,
}

impl ProcessTransport {
    /// Spawns the oracle at `path` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Spawn`] if the process or the reader thread
    /// cannot be started.
    pub fn spawn(path: impl AsRef<Path>, args: &[String]) -> Result<Self, OracleError> {
        let path = path.as_ref();
        let mut process = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(OracleError::Spawn)?;

        let stdin = process.stdin.take();
        let Some(stdout) = process.stdout.take() else {
            let _ = process.kill();
            return Err(OracleError::Unavailable("oracle stdout not captured".to_string()));
        };

        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = thread::Builder::new()
            .name("oracle-reader".to_string())
            .spawn(move || read_loop(BufReader::new(stdout), tx))
            .map_err(OracleError::Spawn)?;

        debug!(path = %path.display(), pid = process.id(), "oracle spawned");
        Ok(Self {
            process,
            stdin,
            frames: rx,
            reader: Some(reader),
        })
    }

    fn closed() -> OracleError {
        OracleError::Unavailable("oracle closed its output".to_string())
    }
}

fn read_loop<R: BufRead>(mut reader: R, frames: Sender<Frame>) {
    loop {
        match read_frame(&mut reader) {
            Ok(Some(frame)) => {
                if frames.send(Ok(frame)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = frames.send(Err(e));
                break;
            }
        }
    }
    debug!("oracle reader finished");
}

impl Transport for ProcessTransport {
    fn send(&mut self, payload: &str) -> Result<(), OracleError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| OracleError::Unavailable("transport is shut down".to_string()))?;
        write_frame(stdin, payload)?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<String>, OracleError> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame?)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Self::closed()),
        }
    }

    fn try_recv(&mut self) -> Result<Option<String>, OracleError> {
        match self.frames.try_recv() {
            Ok(frame) => Ok(Some(frame?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Self::closed()),
        }
    }

    fn shutdown(&mut self, timeout: Duration) -> Result<(), OracleError> {
        // Closing stdin is the end-of-input signal for the child.
        self.stdin.take();

        let deadline = Instant::now() + timeout;
        loop {
            let exited = self
                .process
                .try_wait()
                .map_err(|e| OracleError::Unavailable(e.to_string()))?;
            if let Some(status) = exited {
                debug!(%status, "oracle exited");
                break;
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "oracle did not exit in time, killing it");
                let _ = self.process.kill();
                let _ = self.process.wait();
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        Ok(())
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Ok(None) = self.process.try_wait() {
            let _ = self.process.kill();
            let _ = self.process.wait();
        }
    }
}
