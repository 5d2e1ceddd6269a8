//! Role-based access control subsystem.
//!
//! # Data Flow
//! ```text
//! (user_id, resource, action)
//!     → engine.rs (resolve held roles)
//!     → role.rs (allow-rules keyed by resource pattern)
//!     → matcher.rs (walk resource and its ancestors)
//!     → allow | deny
//! ```

pub mod engine;
pub mod matcher;
pub mod role;

pub use engine::RbacEngine;
pub use role::{AllowRule, AllowRuleInput, OneOrMany, Role, RoleDefinition, WILDCARD};
