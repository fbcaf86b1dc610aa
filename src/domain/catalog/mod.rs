// ============================================================================
// Catalog Domain - read models owned by the catalog and payment modules
// ============================================================================
//
// The order engine never mutates these; it reads them through the
// CatalogRepository and PaymentRepository traits to validate links.
//
// ============================================================================

pub mod value_objects;

pub use value_objects::*;
