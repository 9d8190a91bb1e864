//! RESP Framing Inspector
//!
//! A parser plugin for Redis Serialization Protocol traffic. It never
//! rewrites the stream, but it forwards it in whole frames: bytes of a frame
//! that has not fully arrived yet are held back until the rest shows up.
//! Every complete frame is reported on the debug channel, and malformed
//! framing tears the session down.
//!
//! ## Limits
//!
//! One number, `max_pending`, bounds both a bulk string's declared length
//! and the bytes held back for an incomplete frame. The held-back bound gets
//! [`FRAME_OVERHEAD`] extra bytes for headers and trailers, so any frame
//! whose bulk strings pass the length check can also be buffered.
//!
//! ## Zero-Copy Fast Path
//!
//! When nothing is held back from a previous read, complete frames are
//! forwarded as a sub-slice of the read buffer itself. Only the incomplete
//! tail (if any) is copied into the pending buffer.
//!
//! ## Frame Format
//!
//! ```text
//! +OK\r\n                       simple string
//! -ERR oops\r\n                 error
//! :1000\r\n                     integer
//! $5\r\nhello\r\n               bulk string ($-1\r\n is null)
//! *2\r\n$3\r\nGET\r\n$1\r\nk\r\n  array ( *-1\r\n is null)
//! PING\r\n                      inline command
//! ```

use crate::parser::{Direction, Parser, ParserError, ParserFactory, Sink};
use crate::slice::{RSlice, WSlice};
use bytes::BytesMut;

/// The CRLF terminator used in RESP protocol
const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Input buffer size per read (16 KB)
pub const READ_SIZE: usize = 16 * 1024;

/// Default cap on a bulk string and on an incomplete frame (64 KB)
pub const DEFAULT_MAX_PENDING: usize = 64 * 1024;

/// Room for headers and CRLFs around the payload of a buffered frame
pub const FRAME_OVERHEAD: usize = 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Inspects RESP frames flowing in one direction.
#[derive(Debug)]
pub struct RespInspector {
    direction: Direction,
    pool: BytesMut,
    /// Bytes of an incomplete frame carried over from earlier reads
    pending: BytesMut,
    max_pending: usize,
    frames: u64,
}

impl RespInspector {
    pub fn new(direction: Direction) -> Self {
        Self::with_max_pending(direction, DEFAULT_MAX_PENDING)
    }

    /// Creates an inspector that accepts bulk strings of up to `max_pending`
    /// bytes and holds back at most `max_pending + FRAME_OVERHEAD` bytes.
    pub fn with_max_pending(direction: Direction, max_pending: usize) -> Self {
        Self {
            direction,
            pool: BytesMut::with_capacity(READ_SIZE),
            pending: BytesMut::new(),
            max_pending,
            frames: 0,
        }
    }

    /// Number of complete frames seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes currently held back waiting for a frame to complete.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Most bytes that may be held back before the stream is rejected.
    pub fn pending_limit(&self) -> usize {
        self.max_pending.saturating_add(FRAME_OVERHEAD)
    }

    fn fail(&self, err: ParserError, sink: &mut dyn Sink) -> Result<(), ParserError> {
        sink.on_error_msg(format_args!("{} resp: {}", self.direction, err));
        Err(err)
    }
}

impl Parser for RespInspector {
    fn write_slice(&mut self) -> WSlice {
        WSlice::carve(&mut self.pool, READ_SIZE)
    }

    fn parse(&mut self, ready: RSlice, sink: &mut dyn Sink) -> Result<(), ParserError> {
        let direction = self.direction;
        let max_pending = self.max_pending;
        let mut frames = self.frames;

        let failure = if self.pending.is_empty() {
            let (consumed, failure) = scan_frames(&ready, max_pending, |label| {
                frames += 1;
                sink.on_debug_msg(format_args!("{} frame #{}: {}", direction, frames, label));
            });
            if consumed > 0 {
                sink.queue_write(ready.take(consumed));
            }
            if failure.is_none() {
                self.pending.extend_from_slice(&ready[consumed..]);
            }
            failure
        } else {
            self.pending.extend_from_slice(&ready);
            let (consumed, failure) = scan_frames(&self.pending, max_pending, |label| {
                frames += 1;
                sink.on_debug_msg(format_args!("{} frame #{}: {}", direction, frames, label));
            });
            if consumed > 0 {
                let complete = self.pending.split_to(consumed).freeze();
                sink.queue_write(RSlice::from(complete));
            }
            failure
        };

        self.frames = frames;

        if let Some(err) = failure {
            return self.fail(err, sink);
        }

        let limit = self.pending_limit();
        if self.pending.len() > limit {
            let err = ParserError::BufferFull {
                size: self.pending.len(),
                max: limit,
            };
            return self.fail(err, sink);
        }

        Ok(())
    }
}

/// Factory handing out a [`RespInspector`] per direction.
#[derive(Debug, Clone, Copy)]
pub struct RespInspectorFactory {
    max_pending: usize,
}

impl RespInspectorFactory {
    pub fn new(max_pending: usize) -> Self {
        Self { max_pending }
    }
}

impl Default for RespInspectorFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl ParserFactory for RespInspectorFactory {
    fn create(&self, direction: Direction) -> Box<dyn Parser> {
        Box::new(RespInspector::with_max_pending(direction, self.max_pending))
    }
}

/// Walks consecutive complete frames at the start of `buf`.
///
/// Returns how many bytes they cover, plus the error that stopped the walk
/// if the next frame is malformed. `on_frame` receives a short label for
/// each complete frame.
fn scan_frames(
    buf: &[u8],
    max_bulk: usize,
    mut on_frame: impl FnMut(&str),
) -> (usize, Option<ParserError>) {
    let mut consumed = 0;

    while consumed < buf.len() {
        let rest = &buf[consumed..];
        match scan_value(rest, 0, max_bulk) {
            Ok(Some(len)) => {
                on_frame(frame_label(&rest[..len]));
                consumed += len;
            }
            Ok(None) => break,
            Err(e) => return (consumed, Some(e)),
        }
    }

    (consumed, None)
}

/// Returns the length of the complete value at the start of `buf`, or
/// `None` if more bytes are needed.
fn scan_value(buf: &[u8], depth: usize, max_bulk: usize) -> Result<Option<usize>, ParserError> {
    if buf.is_empty() {
        return Ok(None);
    }

    if depth > MAX_NESTING_DEPTH {
        return Err(ParserError::Malformed(format!(
            "maximum nesting depth exceeded: {}",
            MAX_NESTING_DEPTH
        )));
    }

    match buf[0] {
        prefix::SIMPLE_STRING | prefix::ERROR => Ok(find_crlf(&buf[1..]).map(|pos| 1 + pos + 2)),
        prefix::INTEGER => Ok(read_header(buf)?.map(|(_, header)| header)),
        prefix::BULK_STRING => scan_bulk_string(buf, max_bulk),
        prefix::ARRAY => scan_array(buf, depth, max_bulk),
        _ => scan_inline(buf),
    }
}

/// Scans a bulk string: `$<length>\r\n<data>\r\n`
fn scan_bulk_string(buf: &[u8], max_bulk: usize) -> Result<Option<usize>, ParserError> {
    let (length, header) = match read_header(buf)? {
        Some(h) => h,
        None => return Ok(None),
    };

    if length == -1 {
        return Ok(Some(header));
    }

    if length < 0 {
        return Err(ParserError::InvalidLength(length));
    }

    let length = length as usize;
    if length > max_bulk {
        return Err(ParserError::MessageTooLarge {
            size: length,
            max: max_bulk,
        });
    }

    let total = header + length + 2;
    if buf.len() < total {
        return Ok(None);
    }

    if &buf[header + length..total] != CRLF {
        return Err(ParserError::Malformed(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    Ok(Some(total))
}

/// Scans an array: `*<count>\r\n<elements...>`
fn scan_array(buf: &[u8], depth: usize, max_bulk: usize) -> Result<Option<usize>, ParserError> {
    let (count, header) = match read_header(buf)? {
        Some(h) => h,
        None => return Ok(None),
    };

    if count == -1 {
        return Ok(Some(header));
    }

    if count < 0 {
        return Err(ParserError::InvalidLength(count));
    }

    let mut consumed = header;
    for _ in 0..count {
        match scan_value(&buf[consumed..], depth + 1, max_bulk)? {
            Some(len) => consumed += len,
            None => return Ok(None),
        }
    }

    Ok(Some(consumed))
}

fn scan_inline(buf: &[u8]) -> Result<Option<usize>, ParserError> {
    let pos = match find_crlf(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let line = std::str::from_utf8(&buf[..pos])
        .map_err(|e| ParserError::Malformed(format!("invalid UTF-8: {}", e)))?;

    if line.split_whitespace().next().is_none() {
        return Err(ParserError::Malformed("empty inline command".to_string()));
    }

    Ok(Some(pos + 2))
}

/// Reads a `<prefix><integer>\r\n` header, returning the integer and the
/// header length.
fn read_header(buf: &[u8]) -> Result<Option<(i64, usize)>, ParserError> {
    let pos = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let digits = std::str::from_utf8(&buf[1..1 + pos])
        .map_err(|e| ParserError::Malformed(format!("invalid UTF-8: {}", e)))?;

    let n: i64 = digits
        .parse()
        .map_err(|_| ParserError::Malformed(format!("invalid integer: {:?}", digits)))?;

    Ok(Some((n, 1 + pos + 2)))
}

/// Short description of a complete frame for diagnostics.
///
/// Arrays are named after their first bulk element (the command name for
/// client traffic); inline commands after their first word.
fn frame_label(frame: &[u8]) -> &str {
    match frame[0] {
        prefix::SIMPLE_STRING => "simple string",
        prefix::ERROR => "error",
        prefix::INTEGER => "integer",
        prefix::BULK_STRING => "bulk string",
        prefix::ARRAY => first_bulk_element(frame).unwrap_or("array"),
        _ => std::str::from_utf8(frame)
            .ok()
            .and_then(|s| s.split_whitespace().next())
            .unwrap_or("inline"),
    }
}

fn first_bulk_element(frame: &[u8]) -> Option<&str> {
    let (_, header) = read_header(frame).ok()??;
    let rest = &frame[header..];
    if rest.first() != Some(&prefix::BULK_STRING) {
        return None;
    }
    let (length, bulk_header) = read_header(rest).ok()??;
    let length = usize::try_from(length).ok()?;
    let data = rest.get(bulk_header..bulk_header + length)?;
    std::str::from_utf8(data).ok()
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
