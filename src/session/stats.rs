//! Relay-wide counters.

use crate::parser::Direction;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics shared by every session of a relay
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Total number of sessions created
    pub sessions_started: AtomicU64,
    /// Sessions not yet dropped
    pub active_sessions: AtomicU64,
    /// Bytes read from clients
    pub bytes_from_clients: AtomicU64,
    /// Bytes written to upstream servers
    pub bytes_to_upstream: AtomicU64,
    /// Bytes read from upstream servers
    pub bytes_from_upstream: AtomicU64,
    /// Bytes written to clients
    pub bytes_to_clients: AtomicU64,
    /// Sessions torn down by a parser rejecting its input
    pub parser_failures: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new session and returns its id.
    pub fn session_opened(&self) -> u64 {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        self.sessions_started.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    /// Records one pump pass: `read` bytes in, `written` bytes out.
    pub fn transferred(&self, direction: Direction, read: usize, written: usize) {
        let (inbound, outbound) = match direction {
            Direction::ClientToServer => (&self.bytes_from_clients, &self.bytes_to_upstream),
            Direction::ServerToClient => (&self.bytes_from_upstream, &self.bytes_to_clients),
        };
        inbound.fetch_add(read as u64, Ordering::Relaxed);
        outbound.fetch_add(written as u64, Ordering::Relaxed);
    }

    pub fn parser_failed(&self) {
        self.parser_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }
}
