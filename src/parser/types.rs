//! Parser Plugin Contract
//!
//! The session feeds raw bytes into a [`Parser`] and the parser hands output
//! back through a [`Sink`]. The session never looks inside the bytes; the
//! parser never touches a socket.
//!
//! ## One Parse Call
//!
//! ```text
//!   session                          parser
//!   ───────                          ──────
//!   write_slice()  ───────────────>  hands out WSlice (parser-sized)
//!   read(src, wslice)
//!   into_rslice(n)
//!   parse(ready, sink) ───────────>  inspects / transforms
//!                      <───────────  sink.queue_write(out) × 0..N
//!                      <───────────  sink.on_debug_msg(...)
//!                      <───────────  Ok(()) or Err(ParserError)
//!   drain queue to dst
//! ```
//!
//! A parser is bound to one direction of one session. The sink is passed to
//! every `parse` call rather than stored, so the session can own both the
//! parsers and the output queue.

use crate::slice::{RSlice, WSlice};
use std::fmt;
use thiserror::Error;

/// Which way bytes are flowing through a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Accepted client toward the upstream server
    ClientToServer,
    /// Upstream server back toward the client
    ServerToClient,
}

impl Direction {
    /// Short label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToServer => "c2s",
            Direction::ServerToClient => "s2c",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a parser refused to continue.
///
/// Any of these tears the session down; none is retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    /// The stream does not follow the protocol
    #[error("malformed input: {0}")]
    Malformed(String),

    /// A length field is negative (and not a null marker)
    #[error("invalid length: {0}")]
    InvalidLength(i64),

    /// A declared message is larger than the parser accepts
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Too many bytes buffered waiting for a frame to complete
    #[error("incomplete frame exceeds buffer limit: {size} bytes (max: {max})")]
    BufferFull { size: usize, max: usize },

    /// `write_slice` returned a buffer with no room to read into
    #[error("parser offered an empty read buffer")]
    EmptyReadBuffer,
}

/// Callback interface a parser uses to talk back to its session.
pub trait Sink {
    /// Emits an error-level diagnostic.
    ///
    /// Messages are bounded; overlong text is truncated, never an error.
    fn on_error_msg(&mut self, msg: fmt::Arguments<'_>);

    /// Emits a debug-level diagnostic, bounded like [`on_error_msg`](Self::on_error_msg).
    fn on_debug_msg(&mut self, msg: fmt::Arguments<'_>);

    /// Appends `output` to the session's pending writes for this direction.
    ///
    /// Slices are written in the order they are queued, after `parse` returns.
    fn queue_write(&mut self, output: RSlice);
}

/// A protocol plugin for one direction of one session.
pub trait Parser: Send {
    /// Returns the buffer the next read must land in.
    ///
    /// The size is up to the parser and may change between calls, but it
    /// must never be zero: the pump rejects an empty slice with
    /// [`ParserError::EmptyReadBuffer`].
    fn write_slice(&mut self) -> WSlice;

    /// Consumes exactly the bytes that were read into the last write slice.
    ///
    /// Returning an error signals the stream must be torn down. Anything
    /// already queued on `sink` is still written first.
    fn parse(&mut self, ready: RSlice, sink: &mut dyn Sink) -> Result<(), ParserError>;
}

/// Builds parser instances for new sessions.
///
/// A session asks for exactly two parsers at construction, one per
/// [`Direction`].
pub trait ParserFactory: Send + Sync {
    fn create(&self, direction: Direction) -> Box<dyn Parser>;
}

impl<F> ParserFactory for F
where
    F: Fn(Direction) -> Box<dyn Parser> + Send + Sync,
{
    fn create(&self, direction: Direction) -> Box<dyn Parser> {
        self(direction)
    }
}
