//! Line protocol spoken between a probe and an echo responder.
//!
//! Newline-delimited ASCII. The probe sends [`PROBE_PAYLOAD`] and waits for
//! the identical line to come back. A sentinel line asks the responder to
//! close the connection without echoing.

use std::io::{BufRead, Read};

use crate::error::{MonitorError, Result};

/// Single-character probe line
pub const PROBE_PAYLOAD: &[u8] = b"X\n";

/// Termination line sent by a stopping probe
pub const STOP_SENTINEL: &[u8] = b"STOP\n";

/// Older termination line, still honoured by the responder
pub const QUIT_SENTINEL: &[u8] = b"QUIT\n";

/// Longest line either side accepts, delimiter included
pub const MAX_LINE_LEN: usize = 1024;

/// True if `line` is a termination sentinel, ignoring surrounding whitespace
pub fn is_sentinel(line: &[u8]) -> bool {
    let trimmed = line.trim_ascii();
    trimmed == STOP_SENTINEL.trim_ascii() || trimmed == QUIT_SENTINEL.trim_ascii()
}

/// Outcome of [`read_line`]
#[derive(Debug, PartialEq, Eq)]
pub enum LineRead {
    /// A full line including its `\n` is now in the buffer
    Complete,
    /// Clean EOF with nothing buffered
    Eof,
}

/// Append bytes from `reader` into `buf` until a newline.
///
/// `buf` may already hold a partial line from an earlier call that timed
/// out; those bytes are kept. Errors with [`MonitorError::Protocol`] if the
/// line grows past [`MAX_LINE_LEN`] and with
/// [`MonitorError::ConnectionClosed`] on EOF mid-line. IO errors, including
/// read timeouts, are returned unchanged so callers can retry.
pub fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<LineRead> {
    loop {
        if buf.len() >= MAX_LINE_LEN {
            return Err(MonitorError::Protocol(format!(
                "line exceeds {} bytes",
                MAX_LINE_LEN
            )));
        }
        let remaining = (MAX_LINE_LEN - buf.len()) as u64;
        let n = Read::take(&mut *reader, remaining).read_until(b'\n', buf)?;
        if buf.ends_with(b"\n") {
            return Ok(LineRead::Complete);
        }
        if n == 0 {
            return if buf.is_empty() {
                Ok(LineRead::Eof)
            } else {
                Err(MonitorError::ConnectionClosed)
            };
        }
    }
}
