// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// - pricing: price modifiers and the final-price computation
// - catalog: read-only records owned by the catalog and payment modules
// - order: the order aggregate, its lifecycle and the service around it
//
// ============================================================================

pub mod catalog;
pub mod order;
pub mod pricing;
