//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plain: tokio TcpListener handed to axum::serve
//!     → tls.rs: rustls handshake via axum-server
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

pub use tls::load_tls_config;
