//! Proxy Session
//!
//! One `ProxySession` mediates one accepted client and one upstream
//! connection. It runs entirely on the calling thread.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Accepted client handle handed in (accept loop)
//!        │
//!        ▼
//! 2. Connecting ── connect() fails ──────────────┐
//!        │                                       │
//!        ▼                                       │
//! 3. Running                                     │
//!    ┌──────────────────────────────────────┐    │
//!    │  wait for one readable handle        │    │
//!    │              │                       │    │
//!    │   client ────┴──── upstream          │    │
//!    │     │                  │             │    │
//!    │  c2s pump          s2c pump          │    │
//!    │     └──────┬───────────┘             │    │
//!    │       [Loop back]                    │    │
//!    └──────────────┬───────────────────────┘    │
//!                   │ EOF / error / parser fail  │
//!                   ▼                            ▼
//! 4. Terminated: handles closed on drop
//! ```

use crate::config::EndpointConfig;
use crate::fd::{FileDesc, Poller, Readiness};
use crate::parser::{Direction, Parser, ParserFactory};
use crate::session::connect::connect;
use crate::session::pump::{transfer, Transfer};
use crate::session::{RelayStats, SessionError, SessionSink};
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Number of handles each session watches
const WATCHED_HANDLES: usize = 2;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet dialled upstream
    Connecting,
    /// Both handles registered; relaying
    Running,
    /// Finished; no further I/O
    Terminated,
}

/// Relays bytes between one client and the upstream server.
pub struct ProxySession {
    id: u64,
    config: EndpointConfig,
    client_fd: FileDesc,
    upstream_fd: FileDesc,
    poller: Option<Poller>,
    c2s: Box<dyn Parser>,
    s2c: Box<dyn Parser>,
    sink: SessionSink,
    state: SessionState,
    stats: Arc<RelayStats>,
}

impl ProxySession {
    /// Creates a session for an accepted client connection.
    ///
    /// Builds both parsers up front; nothing is dialled until
    /// [`open`](Self::open) or [`run`](Self::run).
    pub fn new(
        config: EndpointConfig,
        client_fd: FileDesc,
        factory: &dyn ParserFactory,
        stats: Arc<RelayStats>,
    ) -> Self {
        let id = stats.session_opened();

        Self {
            id,
            config,
            client_fd,
            upstream_fd: FileDesc::invalid(),
            poller: None,
            c2s: factory.create(Direction::ClientToServer),
            s2c: factory.create(Direction::ServerToClient),
            sink: SessionSink::new(id),
            state: SessionState::Connecting,
            stats,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session until either side closes or something fails.
    ///
    /// A session only ends through an error, so this returns the reason it
    /// ended; [`SessionError::EndOfStream`] is the normal way out.
    pub fn run(mut self) -> SessionError {
        info!(session = self.id, upstream = %self.config, "Session started");

        let e = match self.main_loop() {
            Ok(never) => match never {},
            Err(e) => e,
        };
        self.state = SessionState::Terminated;

        match &e {
            SessionError::EndOfStream(peer) => {
                debug!(session = self.id, peer = %peer, "Peer closed the connection")
            }
            SessionError::Socket(_) | SessionError::Connect { .. } => {
                warn!(session = self.id, error = %e, "Error connecting")
            }
            SessionError::Parser { .. } => {
                warn!(session = self.id, error = %e, "Parser rejected stream")
            }
            _ => error!(session = self.id, error = %e, "Session error"),
        }

        e
    }

    fn main_loop(&mut self) -> Result<Infallible, SessionError> {
        self.open()?;
        loop {
            self.run_one()?;
        }
    }

    /// Dials upstream and registers both handles for readability.
    ///
    /// Moves the session from `Connecting` to `Running`, or to `Terminated`
    /// on failure.
    pub fn open(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::Poll(io::Error::new(
                io::ErrorKind::Other,
                "session already opened",
            )));
        }

        let result = self.try_open();
        self.state = match result {
            Ok(()) => SessionState::Running,
            Err(_) => SessionState::Terminated,
        };
        result
    }

    fn try_open(&mut self) -> Result<(), SessionError> {
        self.upstream_fd = connect(&self.config)?;

        // now we have open handles for both peers; wait for data from either
        let poller = Poller::new(WATCHED_HANDLES).map_err(SessionError::Poll)?;
        poller
            .register_readable(&self.upstream_fd)
            .map_err(SessionError::Poll)?;
        poller
            .register_readable(&self.client_fd)
            .map_err(SessionError::Poll)?;

        self.poller = Some(poller);
        Ok(())
    }

    /// Waits for one readiness event and pumps the matching direction.
    pub fn run_one(&mut self) -> Result<Transfer, SessionError> {
        let result = self.wait_and_pump();
        if result.is_err() {
            self.state = SessionState::Terminated;
        }
        result
    }

    fn wait_and_pump(&mut self) -> Result<Transfer, SessionError> {
        let poller = match (&self.poller, self.state) {
            (Some(poller), SessionState::Running) => poller,
            _ => {
                return Err(SessionError::Poll(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "session is not running",
                )))
            }
        };

        let ready = poller.wait_one().map_err(SessionError::Poll)?;
        let direction = self.route(ready)?;
        self.pump(direction)
    }

    /// Maps a readiness event to the direction it should pump.
    ///
    /// Events without a readable indication, and events for a handle that is
    /// neither peer, are fatal.
    fn route(&self, ready: Readiness) -> Result<Direction, SessionError> {
        let unroutable = SessionError::Multiplex {
            fd: ready.fd,
            events: ready.events,
        };

        if !ready.is_readable() {
            return Err(unroutable);
        }

        if self.client_fd == ready.fd {
            Ok(Direction::ClientToServer)
        } else if self.upstream_fd == ready.fd {
            Ok(Direction::ServerToClient)
        } else {
            Err(unroutable)
        }
    }

    fn pump(&mut self, direction: Direction) -> Result<Transfer, SessionError> {
        let (mut src, mut dst, parser) = match direction {
            Direction::ClientToServer => (&self.client_fd, &self.upstream_fd, &mut self.c2s),
            Direction::ServerToClient => (&self.upstream_fd, &self.client_fd, &mut self.s2c),
        };

        let result = transfer(&mut src, &mut dst, parser.as_mut(), &mut self.sink, direction);

        match &result {
            Ok(t) => self.stats.transferred(direction, t.read, t.written),
            Err(SessionError::Parser { transfer: t, .. }) => {
                self.stats.transferred(direction, t.read, t.written);
                self.stats.parser_failed();
            }
            Err(_) => {}
        }

        result
    }
}

impl Drop for ProxySession {
    fn drop(&mut self) {
        self.stats.session_closed();
    }
}

/// Runs a session for an accepted client to completion.
///
/// This is the entry point the accept loop uses: it returns nothing, and
/// the outcome is only reported through logging.
pub fn handle_session(
    config: EndpointConfig,
    client_fd: FileDesc,
    factory: &dyn ParserFactory,
    stats: Arc<RelayStats>,
) {
    let session = ProxySession::new(config, client_fd, factory, stats);
    session.run();
}
