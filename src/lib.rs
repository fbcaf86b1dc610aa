// ============================================================================
// Order Engine - order aggregate, lifecycle gating and pricing
// ============================================================================

pub mod auth;
pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod persistence;

pub use auth::{AccessLevel, Action, AuthorizationOracle, Principal, StaticAccessPolicy};
pub use config::EngineConfig;
pub use domain::order::{ErrorKind, OrderService, ServiceError};
pub use domain::pricing::{compute_final_price, PricingError};
pub use metrics::Metrics;
