//! Buffer Slice Module
//!
//! Two views that let socket bytes reach a parser, and parser output reach a
//! socket, without intermediate copies.
//!
//! ```text
//!   parser input buffer (BytesMut)
//!   ┌──────────────────────────────────────────┐
//!   │ WSlice: read(2) writes here              │
//!   └──────────────┬───────────────────────────┘
//!                  │ into_rslice(n)
//!                  ▼
//!   RSlice ── Parser::parse ── queue_write(RSlice) ── write(2) + advance(k)
//! ```
//!
//! - [`WSlice`]: mutable, fixed-size destination for one read
//! - [`RSlice`]: read-only view supporting `take` and `advance`

pub mod rslice;
pub mod wslice;

pub use rslice::RSlice;
pub use wslice::WSlice;
