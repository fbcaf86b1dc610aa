// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic aggregate and event abstractions.
// Domain-specific code is in src/domain/, storage in src/persistence/.
//
// ============================================================================

mod core;

pub use self::core::*;
