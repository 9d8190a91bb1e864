//! # proxyrelay - A Transparent TCP Relay with Pluggable Parsers
//!
//! proxyrelay forwards bytes between a client and an upstream server, routing
//! each direction through a protocol parser that may inspect, transform or
//! re-frame the stream before it is written to the other side.
//!
//! ## Features
//!
//! - **One Session Per Client**: a single thread drives both directions of a
//!   connection pair with level-triggered `epoll`
//! - **Zero-Copy Slices**: socket bytes land directly in the parser's buffer
//!   and queued output is written straight from wherever the parser keeps it
//! - **Pluggable Parsers**: protocol logic lives behind the [`Parser`] trait;
//!   the transport code never changes
//! - **Orderly Teardown**: peer closure, transport errors and parser failures
//!   all end the session and release both sockets
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              proxyrelay                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │ Accept Loop │───>│                ProxySession                  │   │
//! │  │ (listener)  │    │                                              │   │
//! │  └─────────────┘    │  client ──> c2s Parser ──> queue ──> server  │   │
//! │                     │  client <── queue <── s2c Parser <── server  │   │
//! │                     │                                              │   │
//! │                     │        Poller (epoll)   FileDesc × 2         │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use proxyrelay::config::EndpointConfig;
//! use proxyrelay::listener::serve;
//! use proxyrelay::parser::PassthroughFactory;
//! use proxyrelay::session::RelayStats;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let upstream: EndpointConfig = "127.0.0.1:6379".parse().unwrap();
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     serve(
//!         listener,
//!         upstream,
//!         Arc::new(PassthroughFactory),
//!         Arc::new(RelayStats::new()),
//!     )
//!     .await;
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`fd`]: owned descriptors and the readiness poller
//! - [`slice`]: read/write byte views
//! - [`parser`]: the plugin contract and bundled parsers
//! - [`session`]: the per-connection engine
//! - [`config`]: endpoint and command-line configuration
//! - [`listener`]: the accept loop

pub mod config;
pub mod fd;
pub mod listener;
pub mod parser;
pub mod session;
pub mod slice;

// Re-export commonly used types for convenience
pub use config::{EndpointConfig, ProxyConfig};
pub use fd::FileDesc;
pub use parser::{Direction, Parser, ParserError, ParserFactory, Sink};
pub use session::{handle_session, ProxySession, RelayStats, SessionError};
pub use slice::{RSlice, WSlice};

/// Version of proxyrelay
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
