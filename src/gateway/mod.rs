//! Gateway dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path relative to mount point)
//!     → dispatcher.rs (prefix extraction, registry lookup, RBAC decision)
//!     → forward.rs (target URL, header hygiene, backend exchange)
//!     → backend response streamed back unchanged
//! ```

pub mod dispatcher;
pub mod forward;

pub use dispatcher::{split_prefix, Dispatcher, Resolved};
pub use forward::{target_uri, ForwardContext, Forwarder};
