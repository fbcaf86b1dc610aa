use rust_decimal::Decimal;
use uuid::Uuid;

use super::value_objects::OrderStatus;
use crate::domain::pricing::PricingError;
use crate::persistence::RepositoryError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order is in final status {0} and its items can no longer change")]
    FinalState(OrderStatus),

    #[error("Item {item_id} does not belong to the same business as the order")]
    BusinessMismatch { item_id: Uuid },

    #[error("Price modifier {modifier_id} does not belong to the same business as the order")]
    ModifierBusinessMismatch { modifier_id: Uuid },

    #[error("Option {option_id} does not belong to item {item_id}")]
    OptionItemMismatch { option_id: Uuid, item_id: Uuid },

    #[error("Order item not found: {0}")]
    OrderItemNotFound(Uuid),

    #[error("Option link not found: {0}")]
    OptionLinkNotFound(Uuid),

    #[error("Payment {0} is already linked to this order")]
    DuplicatePayment(Uuid),

    #[error("Invalid count: {0}")]
    InvalidCount(i32),

    #[error("{field} cannot be negative: {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    #[error("Aggregate not initialized")]
    NotInitialized,
}

// ============================================================================
// Service Boundary Errors
// ============================================================================
//
// Transport layers switch on `ErrorKind`, never on the message.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceError::NotFound(m)
            | ServiceError::Forbidden(m)
            | ServiceError::Conflict(m)
            | ServiceError::Validation(m)
            | ServiceError::Internal(m) => m,
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::FinalState(_)
            | OrderError::BusinessMismatch { .. }
            | OrderError::ModifierBusinessMismatch { .. }
            | OrderError::OptionItemMismatch { .. }
            | OrderError::DuplicatePayment(_) => ServiceError::Conflict(message),
            OrderError::OrderItemNotFound(_) | OrderError::OptionLinkNotFound(_) => ServiceError::NotFound(message),
            OrderError::InvalidCount(_) | OrderError::NegativeAmount { .. } | OrderError::InvalidStatus(_) => {
                ServiceError::Validation(message)
            }
            OrderError::NotInitialized => ServiceError::Internal(message),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { .. } => {
                ServiceError::Conflict(format!("order was modified concurrently ({})", err))
            }
            RepositoryError::AlreadyExists(_) => ServiceError::Conflict(err.to_string()),
            RepositoryError::Backend(e) => ServiceError::Internal(format!("{:#}", e)),
        }
    }
}

/// A price that cannot be represented is a problem with the caller's data.
impl From<PricingError> for ServiceError {
    fn from(err: PricingError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
