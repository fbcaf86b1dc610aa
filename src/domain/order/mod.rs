// ============================================================================
// Order Domain - the order aggregate engine
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (Order, OrderItem, the link records, OrderStatus)
// - Events (OrderCreated, ItemAdded, PaymentLinked, etc.)
// - Commands (AddItem, ApplyModifier, LinkPayment, etc.)
// - Errors (OrderError for rule violations, ServiceError at the boundary)
// - Lifecycle guard (which statuses freeze which mutations)
// - Aggregate (OrderAggregate with business logic)
// - Service (OrderService: authorization, load, mutate, persist)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod lifecycle;
pub mod aggregate;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use lifecycle::*;
pub use aggregate::*;
pub use service::*;
