//! Condition-based notification routing
//!
//! Decides which teams and channels hear about an execution event.

pub mod engine;
pub mod rules;
pub mod secrets;

pub use engine::{NormalizedEvent, NotificationRouter, RoutingDecision};
pub use rules::{RoutingConfig, RoutingSource};
pub use secrets::{EnvSecrets, SecretResolver};
