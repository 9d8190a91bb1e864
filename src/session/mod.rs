//! Session Module
//!
//! The per-connection engine. Each accepted client gets one
//! [`ProxySession`], which dials the upstream server, watches both sockets
//! for readability, and pumps bytes through the direction's parser.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ProxySession                           │
//! │                                                             │
//! │   client_fd ──> c2s Parser ──> SessionSink ──> upstream_fd  │
//! │                                                             │
//! │   client_fd <── SessionSink <── s2c Parser <── upstream_fd  │
//! │                                                             │
//! │            Poller (epoll, 2 handles, readable)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - `handler`: [`ProxySession`] state machine and event loop
//! - `pump`: [`transfer`], one read → parse → drain pass
//! - `sink`: [`SessionSink`], the output queue and bounded diagnostics
//! - `connect`: [`connect`], the blocking outbound dial
//! - `error`: [`SessionError`] and [`Peer`]
//! - `stats`: [`RelayStats`]
//!
//! ## Example
//!
//! ```ignore
//! use proxyrelay::config::EndpointConfig;
//! use proxyrelay::fd::FileDesc;
//! use proxyrelay::parser::PassthroughFactory;
//! use proxyrelay::session::{handle_session, RelayStats};
//! use std::sync::Arc;
//!
//! let upstream: EndpointConfig = "127.0.0.1:6379".parse()?;
//! let stats = Arc::new(RelayStats::new());
//!
//! // For each accepted connection...
//! let (stream, _) = listener.accept()?;
//! handle_session(upstream, FileDesc::from(stream), &PassthroughFactory, stats);
//! ```

pub mod connect;
pub mod error;
pub mod handler;
pub mod pump;
pub mod sink;
pub mod stats;

// Re-export commonly used types
pub use connect::connect;
pub use error::{Peer, SessionError};
pub use handler::{handle_session, ProxySession, SessionState};
pub use pump::{transfer, Transfer};
pub use sink::{DiagnosticBuf, SessionSink, MAX_DIAGNOSTIC_LEN};
pub use stats::RelayStats;
