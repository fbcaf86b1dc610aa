use super::commands::OrderCommand;
use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Order Lifecycle Guard
// ============================================================================
//
// Pending -> Confirmed -> Completed, with Refunded and Cancelled as side
// branches. Confirmed, Completed and Refunded are final: line items, option
// links and modifier links freeze. Order-level fields and payment links stay
// writable in every status, and UpdateOrder may move to any known status,
// including out of a final one.
//
// ============================================================================

pub struct OrderLifecycleGuard;

impl OrderLifecycleGuard {
    pub fn is_final(status: OrderStatus) -> bool {
        matches!(
            status,
            OrderStatus::Confirmed | OrderStatus::Completed | OrderStatus::Refunded
        )
    }

    /// Fails with `FinalState` when line-level mutations are frozen.
    pub fn ensure_lines_mutable(status: OrderStatus) -> Result<(), OrderError> {
        if Self::is_final(status) {
            return Err(OrderError::FinalState(status));
        }
        Ok(())
    }

    pub fn check(status: OrderStatus, command: &OrderCommand) -> Result<(), OrderError> {
        if command.mutates_lines() {
            Self::ensure_lines_mutable(status)?;
        }
        Ok(())
    }

    /// Any known status is an allowed target.
    pub fn transition(_from: OrderStatus, to: &str) -> Result<OrderStatus, OrderError> {
        to.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Payment;
    use crate::domain::order::OrderPatch;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[test]
    fn test_final_states() {
        assert!(!OrderLifecycleGuard::is_final(OrderStatus::Pending));
        assert!(OrderLifecycleGuard::is_final(OrderStatus::Confirmed));
        assert!(OrderLifecycleGuard::is_final(OrderStatus::Completed));
        assert!(OrderLifecycleGuard::is_final(OrderStatus::Refunded));
        assert!(!OrderLifecycleGuard::is_final(OrderStatus::Cancelled));
    }

    #[test]
    fn test_line_mutation_rejected_in_final_state() {
        let command = OrderCommand::RemoveItem { order_item_id: Uuid::new_v4() };

        for status in [OrderStatus::Confirmed, OrderStatus::Completed, OrderStatus::Refunded] {
            let err = OrderLifecycleGuard::check(status, &command).unwrap_err();
            assert!(matches!(err, OrderError::FinalState(s) if s == status));
        }
        assert!(OrderLifecycleGuard::check(OrderStatus::Pending, &command).is_ok());
        assert!(OrderLifecycleGuard::check(OrderStatus::Cancelled, &command).is_ok());
    }

    #[test]
    fn test_order_update_and_payment_not_gated() {
        let update = OrderCommand::UpdateOrder { patch: OrderPatch::status("Pending") };
        let payment = OrderCommand::LinkPayment {
            link_id: Uuid::new_v4(),
            payment: Payment::new(Uuid::new_v4(), Decimal::new(10, 0)),
        };

        for status in OrderStatus::ALL {
            assert!(OrderLifecycleGuard::check(status, &update).is_ok());
            assert!(OrderLifecycleGuard::check(status, &payment).is_ok());
        }
    }

    #[test]
    fn test_transition_out_of_final_state_is_permitted() {
        let next = OrderLifecycleGuard::transition(OrderStatus::Completed, "Pending").unwrap();
        assert_eq!(next, OrderStatus::Pending);
    }

    #[test]
    fn test_transition_to_unknown_status_fails() {
        let err = OrderLifecycleGuard::transition(OrderStatus::Pending, "Archived").unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatus(_)));
    }
}
