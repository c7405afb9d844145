//! Length-prefixed framing.
//!
//! Every message is sent as its byte length in decimal on a line of its own,
//! followed by exactly that many bytes of payload.

use crate::ProtocolError;
use std::io::{BufRead, Write};

/// Largest payload accepted by [`read_frame`].
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Writes one frame and flushes.
pub fn write_frame<W: Write>(writer: &mut W, payload: &str) -> Result<(), ProtocolError> {
    writeln!(writer, "{}", payload.len())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Reads one frame. Returns `Ok(None)` at a clean end of stream.
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<String>, ProtocolError> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Ok(None);
    }
    let header = header.trim_end_matches(['\r', '\n']);
    let len: usize = header
        .parse()
        .map_err(|_| ProtocolError::Desync(format!("invalid frame header '{}'", header)))?;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::Desync(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len, MAX_FRAME_LEN
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload)
        .map(Some)
        .map_err(|_| ProtocolError::Desync("frame payload is not UTF-8".to_string()))
}
