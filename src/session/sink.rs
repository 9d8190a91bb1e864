//! The session side of the parser contract: pending output and diagnostics.

use crate::parser::{Direction, Sink};
use crate::slice::RSlice;
use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::io;
use tracing::{debug, error};

/// Longest diagnostic a parser can emit, in bytes. Longer text is cut.
pub const MAX_DIAGNOSTIC_LEN: usize = 80;

/// Fixed-size text buffer that drops whatever does not fit.
///
/// Writing to it never fails, so a long or misbehaving message can't turn
/// into an error.
pub struct DiagnosticBuf {
    buf: [u8; MAX_DIAGNOSTIC_LEN],
    len: usize,
    truncated: bool,
}

impl DiagnosticBuf {
    pub fn new() -> Self {
        Self {
            buf: [0; MAX_DIAGNOSTIC_LEN],
            len: 0,
            truncated: false,
        }
    }

    /// Renders `args`, truncating on a UTF-8 boundary.
    pub fn render(args: fmt::Arguments<'_>) -> Self {
        let mut out = Self::new();
        let _ = out.write_fmt(args);
        out
    }

    pub fn as_str(&self) -> &str {
        // Only whole chars are ever copied in.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for DiagnosticBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for DiagnosticBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }

        let room = MAX_DIAGNOSTIC_LEN - self.len;
        let mut take = s.len().min(room);
        while !s.is_char_boundary(take) {
            take -= 1;
        }

        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        if take < s.len() {
            self.truncated = true;
        }
        Ok(())
    }
}

/// Output queue and diagnostic channel shared by both parsers of a session.
///
/// Only one parser produces output at a time; the pump points the sink at
/// the active direction before calling `parse` and drains it right after.
#[derive(Debug)]
pub struct SessionSink {
    session_id: u64,
    direction: Direction,
    queue: VecDeque<RSlice>,
}

impl SessionSink {
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            direction: Direction::ClientToServer,
            queue: VecDeque::new(),
        }
    }

    /// Sets which direction diagnostics are attributed to.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of slices waiting to be written.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total bytes waiting to be written.
    pub fn pending_bytes(&self) -> usize {
        self.queue.iter().map(RSlice::size).sum()
    }

    /// Writes every queued slice to `dst`, front to back.
    ///
    /// Short writes are resumed from where they stopped. A write error, or a
    /// write that accepts zero bytes, stops the drain; the slices not yet
    /// written are discarded and the queue is left empty.
    pub fn drain_to<W: io::Write + ?Sized>(&mut self, dst: &mut W) -> io::Result<usize> {
        let mut written = 0;

        while let Some(mut slice) = self.queue.pop_front() {
            while !slice.is_empty() {
                match dst.write(&slice) {
                    Ok(0) => {
                        self.queue.clear();
                        return Err(io::Error::from(io::ErrorKind::WriteZero));
                    }
                    Ok(n) => {
                        slice.advance(n);
                        written += n;
                    }
                    Err(e) => {
                        self.queue.clear();
                        return Err(e);
                    }
                }
            }
        }

        Ok(written)
    }
}

impl Sink for SessionSink {
    fn on_error_msg(&mut self, msg: fmt::Arguments<'_>) {
        let text = DiagnosticBuf::render(msg);
        error!(
            session = self.session_id,
            direction = %self.direction,
            truncated = text.is_truncated(),
            "{}",
            text.as_str()
        );
    }

    fn on_debug_msg(&mut self, msg: fmt::Arguments<'_>) {
        let text = DiagnosticBuf::render(msg);
        debug!(
            session = self.session_id,
            direction = %self.direction,
            truncated = text.is_truncated(),
            "{}",
            text.as_str()
        );
    }

    fn queue_write(&mut self, output: RSlice) {
        self.queue.push_back(output);
    }
}
