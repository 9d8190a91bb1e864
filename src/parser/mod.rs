//! Parser Plugin Module
//!
//! The extension point of the relay. Each session runs two parser instances,
//! one per direction, and forwards whatever they queue.
//!
//! ## Modules
//!
//! - `types`: the [`Parser`], [`Sink`] and [`ParserFactory`] contract
//! - `passthrough`: forwards bytes untouched
//! - `resp`: forwards RESP traffic in whole frames and rejects malformed input
//!
//! ## Example
//!
//! ```
//! use proxyrelay::parser::{Direction, Parser, ParserFactory, PassthroughParser};
//!
//! // Any `Fn(Direction) -> Box<dyn Parser>` is a factory
//! let factory = |_direction: Direction| -> Box<dyn Parser> {
//!     Box::new(PassthroughParser::with_read_size(4096))
//! };
//! let mut parser = factory.create(Direction::ClientToServer);
//! assert_eq!(parser.write_slice().size(), 4096);
//! ```

pub mod passthrough;
pub mod resp;
pub mod types;

// Re-export commonly used types for convenience
pub use passthrough::{PassthroughFactory, PassthroughParser};
pub use resp::{RespInspector, RespInspectorFactory};
pub use types::{Direction, Parser, ParserError, ParserFactory, Sink};
