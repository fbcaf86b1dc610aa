// ============================================================================
// Pricing Domain
// ============================================================================
//
// Price modifiers and the pure computation that folds them over a base
// price. Shared by order line items and catalog items.
//
// ============================================================================

pub mod value_objects;
pub mod engine;

pub use value_objects::*;
pub use engine::{compute_final_price, PricingError};
