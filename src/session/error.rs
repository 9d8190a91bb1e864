//! Session error taxonomy.

use crate::config::EndpointConfig;
use crate::parser::{Direction, ParserError};
use crate::session::Transfer;
use std::fmt;
use std::io;
use std::os::unix::io::RawFd;
use thiserror::Error;

/// One end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// The accepted client connection
    Client,
    /// The outbound connection to the upstream server
    Upstream,
}

impl Peer {
    /// The peer bytes come from when flowing in `direction`.
    pub fn source_of(direction: Direction) -> Peer {
        match direction {
            Direction::ClientToServer => Peer::Client,
            Direction::ServerToClient => Peer::Upstream,
        }
    }

    /// The peer bytes go to when flowing in `direction`.
    pub fn destination_of(direction: Direction) -> Peer {
        match direction {
            Direction::ClientToServer => Peer::Upstream,
            Direction::ServerToClient => Peer::Client,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peer::Client => f.write_str("client"),
            Peer::Upstream => f.write_str("upstream"),
        }
    }
}

/// Everything that ends a session.
///
/// All variants are terminal; nothing is retried inside the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Could not allocate the outbound socket
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    /// The upstream refused or the dial failed
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: EndpointConfig,
        source: io::Error,
    },

    /// Creating, registering with or waiting on the readiness facility failed
    #[error("readiness notification error: {0}")]
    Poll(#[source] io::Error),

    /// A readiness event that is not a readable indication, or that names
    /// neither of the session's handles
    #[error("socket error reported on descriptor {fd} (events {events:#x})")]
    Multiplex { fd: RawFd, events: u32 },

    #[error("read from {peer} failed: {source}")]
    Read { peer: Peer, source: io::Error },

    #[error("write to {peer} failed: {source}")]
    Write { peer: Peer, source: io::Error },

    /// Orderly closure: the peer's read returned zero bytes
    #[error("{0} closed the connection")]
    EndOfStream(Peer),

    /// A parser rejected its input. `transfer` counts what the failing pass
    /// still read and flushed.
    #[error("{direction} parser failed: {source}")]
    Parser {
        direction: Direction,
        source: ParserError,
        transfer: Transfer,
    },
}

impl SessionError {
    /// Returns true for orderly peer closure, which is not a failure.
    pub fn is_stream_end(&self) -> bool {
        matches!(self, SessionError::EndOfStream(_))
    }

    /// The underlying OS error, for the variants that carry one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            SessionError::Socket(e) | SessionError::Poll(e) => Some(e),
            SessionError::Connect { source, .. }
            | SessionError::Read { source, .. }
            | SessionError::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}
