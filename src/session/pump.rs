//! Transfer Pump
//!
//! Moves one read's worth of bytes from one peer to the other through a
//! parser:
//!
//! ```text
//! 1. read(src) into parser.write_slice()
//! 2. n == 0   -> EndOfStream
//! 3. parser.parse(first n bytes)
//! 4. drain every queued slice to dst (resuming short writes)
//! 5. parser failure -> stop; otherwise keep going
//! ```
//!
//! The drain in step 4 runs whether or not `parse` succeeded, so output a
//! parser queued before rejecting its input still reaches the peer.

use crate::parser::{Direction, Parser, ParserError};
use crate::session::{Peer, SessionError, SessionSink};
use std::io::{Read, Write};
use tracing::trace;

/// Byte counts for one successful pump pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Bytes read from the source
    pub read: usize,
    /// Bytes written to the destination
    pub written: usize,
}

/// Runs one pump pass in `direction`.
///
/// `Ok` means the session should keep going. Every `Err` ends the session;
/// [`SessionError::EndOfStream`] is the orderly one.
pub fn transfer<R, W>(
    src: &mut R,
    dst: &mut W,
    parser: &mut dyn Parser,
    sink: &mut SessionSink,
    direction: Direction,
) -> Result<Transfer, SessionError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut input = parser.write_slice();
    if input.is_empty() {
        return Err(SessionError::Parser {
            direction,
            source: ParserError::EmptyReadBuffer,
            transfer: Transfer::default(),
        });
    }

    let read = src.read(input.as_mut_slice()).map_err(|source| SessionError::Read {
        peer: Peer::source_of(direction),
        source,
    })?;

    if read == 0 {
        return Err(SessionError::EndOfStream(Peer::source_of(direction)));
    }

    trace!(direction = %direction, bytes = read, "Read data");

    sink.set_direction(direction);
    let parsed = parser.parse(input.into_rslice(read), sink);

    let written = sink.drain_to(dst).map_err(|source| SessionError::Write {
        peer: Peer::destination_of(direction),
        source,
    })?;

    trace!(direction = %direction, bytes = written, "Wrote data");

    let transfer = Transfer { read, written };
    parsed.map_err(|source| SessionError::Parser {
        direction,
        source,
        transfer,
    })?;

    Ok(transfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{PassthroughParser, Sink};
    use crate::slice::{RSlice, WSlice};
    use std::io;

    /// Splits input into three queued slices: header, body, trailer.
    struct Framing;

    impl Parser for Framing {
        fn write_slice(&mut self) -> WSlice {
            WSlice::with_capacity(64)
        }

        fn parse(&mut self, ready: RSlice, sink: &mut dyn Sink) -> Result<(), ParserError> {
            sink.queue_write(RSlice::from_static(b"<"));
            sink.queue_write(ready);
            sink.queue_write(RSlice::from_static(b">"));
            Ok(())
        }
    }

    /// Queues what it was given, then rejects it.
    struct Rejecting;

    impl Parser for Rejecting {
        fn write_slice(&mut self) -> WSlice {
            WSlice::with_capacity(64)
        }

        fn parse(&mut self, ready: RSlice, sink: &mut dyn Sink) -> Result<(), ParserError> {
            sink.queue_write(ready);
            sink.on_error_msg(format_args!("rejecting"));
            Err(ParserError::Malformed("bad frame".to_string()))
        }
    }

    /// Hands out a buffer with no room in it.
    struct NoRoom;

    impl Parser for NoRoom {
        fn write_slice(&mut self) -> WSlice {
            WSlice::with_capacity(0)
        }

        fn parse(&mut self, _ready: RSlice, _sink: &mut dyn Sink) -> Result<(), ParserError> {
            panic!("parse called without data");
        }
    }

    /// Panics if parse is ever called.
    struct Untouched;

    impl Parser for Untouched {
        fn write_slice(&mut self) -> WSlice {
            WSlice::with_capacity(8)
        }

        fn parse(&mut self, _ready: RSlice, _sink: &mut dyn Sink) -> Result<(), ParserError> {
            panic!("parse called without data");
        }
    }

    struct ErrReader(io::ErrorKind);

    impl Read for ErrReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(self.0))
        }
    }

    struct TrickleWriter {
        out: Vec<u8>,
    }

    impl Write for TrickleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(2);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_passthrough_ping() {
        let mut src: &[u8] = b"PING\n";
        let mut dst = Vec::new();
        let mut parser = PassthroughParser::new();
        let mut sink = SessionSink::new(1);

        let t = transfer(&mut src, &mut dst, &mut parser, &mut sink, Direction::ClientToServer)
            .unwrap();

        assert_eq!(t, Transfer { read: 5, written: 5 });
        assert_eq!(dst, b"PING\n");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_queued_slices_arrive_in_order() {
        let mut src: &[u8] = b"body";
        let mut dst = TrickleWriter { out: Vec::new() };
        let mut sink = SessionSink::new(1);

        let t = transfer(&mut src, &mut dst, &mut Framing, &mut sink, Direction::ServerToClient)
            .unwrap();

        assert_eq!(dst.out, b"<body>");
        assert_eq!(t.written, 6);
    }

    #[test]
    fn test_read_bounded_by_parser_slice() {
        let mut src: &[u8] = &[7u8; 100];
        let mut dst = Vec::new();
        let mut parser = PassthroughParser::with_read_size(10);
        let mut sink = SessionSink::new(1);

        let t = transfer(&mut src, &mut dst, &mut parser, &mut sink, Direction::ClientToServer)
            .unwrap();

        assert_eq!(t.read, 10);
        assert_eq!(dst.len(), 10);
        assert_eq!(src.len(), 90);
    }

    #[test]
    fn test_zero_read_is_end_of_stream() {
        let mut src: &[u8] = b"";
        let mut dst = Vec::new();
        let mut sink = SessionSink::new(1);

        let err = transfer(&mut src, &mut dst, &mut Untouched, &mut sink, Direction::ServerToClient)
            .unwrap_err();

        assert!(err.is_stream_end());
        assert!(matches!(err, SessionError::EndOfStream(Peer::Upstream)));
        assert!(dst.is_empty());
    }

    #[test]
    fn test_read_error_is_fatal() {
        let mut src = ErrReader(io::ErrorKind::ConnectionReset);
        let mut dst = Vec::new();
        let mut sink = SessionSink::new(1);

        let err = transfer(&mut src, &mut dst, &mut Untouched, &mut sink, Direction::ClientToServer)
            .unwrap_err();

        assert!(!err.is_stream_end());
        match err {
            SessionError::Read { peer, source } => {
                assert_eq!(peer, Peer::Client);
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parser_failure_flushes_then_stops() {
        let mut src: &[u8] = b"garbage";
        let mut dst = Vec::new();
        let mut sink = SessionSink::new(1);

        let err = transfer(&mut src, &mut dst, &mut Rejecting, &mut sink, Direction::ClientToServer)
            .unwrap_err();

        assert_eq!(dst, b"garbage");
        assert!(matches!(
            err,
            SessionError::Parser {
                direction: Direction::ClientToServer,
                source: ParserError::Malformed(_),
                transfer: Transfer { read: 7, written: 7 },
            }
        ));
    }

    #[test]
    fn test_write_failure_discards_queue() {
        let mut src: &[u8] = b"data";
        let mut sink = SessionSink::new(1);

        let err = transfer(&mut src, &mut BrokenWriter, &mut Framing, &mut sink, Direction::ClientToServer)
            .unwrap_err();

        assert!(matches!(err, SessionError::Write { peer: Peer::Upstream, .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_write_slice_is_parser_failure() {
        let mut src: &[u8] = b"still open";
        let mut dst = Vec::new();
        let mut sink = SessionSink::new(1);

        let err = transfer(&mut src, &mut dst, &mut NoRoom, &mut sink, Direction::ClientToServer)
            .unwrap_err();

        assert!(!err.is_stream_end());
        assert!(matches!(
            err,
            SessionError::Parser {
                source: ParserError::EmptyReadBuffer,
                ..
            }
        ));
        assert_eq!(src.len(), 10);
    }
}
