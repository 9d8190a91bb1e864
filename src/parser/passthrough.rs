//! Pass-through parser: forwards every byte unchanged.

use crate::parser::{Direction, Parser, ParserError, ParserFactory, Sink};
use crate::slice::{RSlice, WSlice};
use bytes::BytesMut;

/// Default input buffer size per read (16 KB)
pub const DEFAULT_READ_SIZE: usize = 16 * 1024;

/// Queues each read slice as-is. Never fails.
#[derive(Debug)]
pub struct PassthroughParser {
    pool: BytesMut,
    read_size: usize,
}

impl PassthroughParser {
    pub fn new() -> Self {
        Self::with_read_size(DEFAULT_READ_SIZE)
    }

    /// Creates a parser that offers `read_size` bytes per read.
    pub fn with_read_size(read_size: usize) -> Self {
        Self {
            pool: BytesMut::with_capacity(read_size),
            read_size: read_size.max(1),
        }
    }
}

impl Default for PassthroughParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PassthroughParser {
    fn write_slice(&mut self) -> WSlice {
        WSlice::carve(&mut self.pool, self.read_size)
    }

    fn parse(&mut self, ready: RSlice, sink: &mut dyn Sink) -> Result<(), ParserError> {
        if !ready.is_empty() {
            sink.queue_write(ready);
        }
        Ok(())
    }
}

/// Factory handing out [`PassthroughParser`]s for both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFactory;

impl ParserFactory for PassthroughFactory {
    fn create(&self, _direction: Direction) -> Box<dyn Parser> {
        Box::new(PassthroughParser::new())
    }
}
