//! SSO Gateway Library
//!
//! Prefix-routed reverse proxy with JWT authentication and hierarchical
//! role-based access control.

pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rbac;
pub mod registry;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
