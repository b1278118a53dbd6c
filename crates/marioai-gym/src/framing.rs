//! Line framing for the simulator's text protocol.
//!
//! Every message is one line terminated by `\n` (optionally preceded by
//! `\r`). The bit-packed snapshot is the exception: its payload characters
//! may themselves be `\n`, so a snapshot line that ends before the payload
//! and checksum are complete is joined with the following line(s).

use std::io::{BufRead, ErrorKind};

use crate::codec::{MIN_SNAPSHOT_CHARS, SNAPSHOT_TAG};
use crate::error::TransportError;

/// Read one frame from `reader`, without its line terminator.
///
/// Returns `Ok(None)` if the stream is at EOF before any byte is read.
///
/// # Errors
///
/// - [`TransportError::Timeout`] if the underlying read times out
/// - [`TransportError::Io`] for any other read failure
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError> {
    let mut buf = Vec::new();
    loop {
        let n = reader.read_until(b'\n', &mut buf).map_err(map_read_error)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            break;
        }
        if !needs_continuation(&buf) {
            break;
        }
    }
    strip_terminator(&mut buf);
    Ok(Some(buf))
}

/// Write `data` and flush.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if writing or flushing fails.
pub fn write_frame<W: std::io::Write>(writer: &mut W, data: &[u8]) -> Result<(), TransportError> {
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}

fn needs_continuation(buf: &[u8]) -> bool {
    if buf.last() != Some(&b'\n') {
        return false;
    }
    let body = without_terminator(buf);
    match std::str::from_utf8(body) {
        Ok(text) => text.starts_with(SNAPSHOT_TAG) && text.chars().count() < MIN_SNAPSHOT_CHARS,
        Err(_) => false,
    }
}

fn without_terminator(buf: &[u8]) -> &[u8] {
    let body = buf.strip_suffix(b"\n").unwrap_or(buf);
    body.strip_suffix(b"\r").unwrap_or(body)
}

fn strip_terminator(buf: &mut Vec<u8>) {
    let len = without_terminator(buf).len();
    buf.truncate(len);
}

fn map_read_error(err: std::io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Io(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
