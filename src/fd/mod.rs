//! OS Handle Module
//!
//! Ownership and readiness primitives the session is built on.
//!
//! - `file_desc`: [`FileDesc`], a move-only owner of one raw descriptor that
//!   closes it exactly once
//! - `poller`: [`Poller`], level-triggered readable-interest over `epoll`
//!
//! ## Example
//!
//! ```ignore
//! use proxyrelay::fd::{FileDesc, Poller};
//!
//! let poller = Poller::new(2)?;
//! poller.register_readable(&client_fd)?;
//! poller.register_readable(&upstream_fd)?;
//!
//! let ready = poller.wait_one()?;
//! if ready.is_readable() && client_fd == ready.fd {
//!     // client has data
//! }
//! ```

pub mod file_desc;
pub mod poller;

pub use file_desc::FileDesc;
pub use poller::{Poller, Readiness};
