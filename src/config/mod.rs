//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → bootstrap section seeds the registry and RBAC stores
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the stores are the runtime source of truth
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AllowSeed, ApplicationSeed, AssignmentSeed, AuthConfig, BootstrapConfig, DispatchConfig,
    GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, RoleSeed, SecurityConfig,
    TimeoutConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
