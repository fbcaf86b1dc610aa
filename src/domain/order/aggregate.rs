use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::event_sourcing::Aggregate;
use super::value_objects::{
    ItemOptionLink, NewOrder, Order, OrderItem, OrderPaymentLink, OrderStatus,
    PriceModifierOrderLink,
};
use super::events::*;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::lifecycle::OrderLifecycleGuard;

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// The order together with its line items and every link hanging off them.
// Child collections keep insertion order; modifier links are priced in the
// order they were applied.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAggregate {
    pub version: i64,
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub option_links: Vec<ItemOptionLink>,
    pub modifier_links: Vec<PriceModifierOrderLink>,
    pub payment_links: Vec<OrderPaymentLink>,
}

impl OrderAggregate {
    /// Open a new Pending order placed at `now`.
    pub fn open(order_id: Uuid, new_order: NewOrder, now: DateTime<Utc>) -> Result<(Self, OrderEvent), OrderError> {
        validate_amount("tip_amount", new_order.tip_amount)?;
        validate_amount("service_charge", new_order.service_charge)?;

        let event = OrderEvent::Created(OrderCreated {
            order: Order {
                id: order_id,
                business_id: new_order.business_id,
                servicing_account_id: new_order.servicing_account_id,
                date_placed: now,
                status: OrderStatus::Pending,
                tip_amount: new_order.tip_amount,
                service_charge: new_order.service_charge,
                customer: new_order.customer,
                valid_from: Some(now),
                valid_to: None,
            },
        });

        let aggregate = Self::apply_first_event(&event)?;
        Ok((aggregate, event))
    }

    pub fn id(&self) -> Uuid {
        self.order.id
    }

    pub fn business_id(&self) -> Uuid {
        self.order.business_id
    }

    pub fn status(&self) -> OrderStatus {
        self.order.status
    }

    pub fn item(&self, order_item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == order_item_id)
    }

    pub fn option_links_for(&self, order_item_id: Uuid) -> impl Iterator<Item = &ItemOptionLink> {
        self.option_links
            .iter()
            .filter(move |link| link.order_item_id == order_item_id)
    }

    pub fn modifier_links_for(&self, order_item_id: Uuid) -> impl Iterator<Item = &PriceModifierOrderLink> {
        self.modifier_links
            .iter()
            .filter(move |link| link.order_item_id == order_item_id)
    }

    pub fn has_payment(&self, payment_id: Uuid) -> bool {
        self.payment_links.iter().any(|link| link.payment_id == payment_id)
    }

    fn require_item(&self, order_item_id: Uuid) -> Result<&OrderItem, OrderError> {
        self.item(order_item_id)
            .ok_or(OrderError::OrderItemNotFound(order_item_id))
    }
}

fn validate_count(count: i32) -> Result<(), OrderError> {
    if count <= 0 {
        return Err(OrderError::InvalidCount(count));
    }
    Ok(())
}

fn validate_amount(field: &'static str, value: Decimal) -> Result<(), OrderError> {
    if value < Decimal::ZERO {
        return Err(OrderError::NegativeAmount { field, value });
    }
    Ok(())
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Created(e) => Ok(Self {
                version: 1,
                order: e.order.clone(),
                items: Vec::new(),
                option_links: Vec::new(),
                modifier_links: Vec::new(),
                payment_links: Vec::new(),
            }),
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Created(_) => {
                // First event already applied
            }
            OrderEvent::Updated(e) => {
                if let Some(status) = e.status {
                    self.order.status = status;
                }
                if let Some(tip) = e.tip_amount {
                    self.order.tip_amount = tip;
                }
                if let Some(charge) = e.service_charge {
                    self.order.service_charge = charge;
                }
                if let Some(ref customer) = e.customer {
                    self.order.customer = customer.clone();
                }
            }
            OrderEvent::ItemAdded(e) => {
                self.items.push(e.item.clone());
            }
            OrderEvent::ItemCountChanged(e) => {
                let item = self
                    .items
                    .iter_mut()
                    .find(|item| item.id == e.order_item_id)
                    .ok_or(OrderError::OrderItemNotFound(e.order_item_id))?;
                item.count = e.count;
            }
            OrderEvent::ItemRemoved(e) => {
                self.items.retain(|item| item.id != e.order_item_id);
                self.option_links.retain(|link| link.order_item_id != e.order_item_id);
                self.modifier_links.retain(|link| link.order_item_id != e.order_item_id);
            }
            OrderEvent::ModifierApplied(e) => {
                self.modifier_links.push(e.link.clone());
            }
            OrderEvent::OptionAdded(e) => {
                self.option_links.push(e.link.clone());
            }
            OrderEvent::OptionRemoved(e) => {
                self.option_links.retain(|link| link.id != e.option_link_id);
            }
            OrderEvent::PaymentLinked(e) => {
                self.payment_links.push(e.link.clone());
            }
        }

        self.version += 1;
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        OrderLifecycleGuard::check(self.order.status, command)?;

        match command {
            OrderCommand::UpdateOrder { patch } => {
                let status = patch
                    .status
                    .as_deref()
                    .map(|to| OrderLifecycleGuard::transition(self.order.status, to))
                    .transpose()?;
                if let Some(tip) = patch.tip_amount {
                    validate_amount("tip_amount", tip)?;
                }
                if let Some(charge) = patch.service_charge {
                    validate_amount("service_charge", charge)?;
                }

                if status.is_none()
                    && patch.tip_amount.is_none()
                    && patch.service_charge.is_none()
                    && patch.customer.is_none()
                {
                    return Ok(vec![]); // Nothing to change
                }

                Ok(vec![OrderEvent::Updated(OrderUpdated {
                    status,
                    tip_amount: patch.tip_amount,
                    service_charge: patch.service_charge,
                    customer: patch.customer.clone(),
                })])
            }

            OrderCommand::AddItem { order_item_id, item, count } => {
                validate_count(*count)?;
                if item.business_id != self.order.business_id {
                    return Err(OrderError::BusinessMismatch { item_id: item.id });
                }

                Ok(vec![OrderEvent::ItemAdded(OrderItemAdded {
                    item: OrderItem {
                        id: *order_item_id,
                        order_id: self.order.id,
                        item_id: item.id,
                        count: *count,
                    },
                })])
            }

            OrderCommand::UpdateItem { order_item_id, count } => {
                self.require_item(*order_item_id)?;

                match count {
                    None => Ok(vec![]),
                    Some(count) => {
                        validate_count(*count)?;
                        Ok(vec![OrderEvent::ItemCountChanged(OrderItemCountChanged {
                            order_item_id: *order_item_id,
                            count: *count,
                        })])
                    }
                }
            }

            OrderCommand::RemoveItem { order_item_id } => {
                self.require_item(*order_item_id)?;

                Ok(vec![OrderEvent::ItemRemoved(OrderItemRemoved {
                    order_item_id: *order_item_id,
                    removed_option_links: self.option_links_for(*order_item_id).map(|l| l.id).collect(),
                    removed_modifier_links: self.modifier_links_for(*order_item_id).map(|l| l.id).collect(),
                })])
            }

            OrderCommand::ApplyModifier { link_id, order_item_id, modifier } => {
                self.require_item(*order_item_id)?;
                if modifier.business_id != self.order.business_id {
                    return Err(OrderError::ModifierBusinessMismatch { modifier_id: modifier.id });
                }

                // Duplicate (item, modifier) pairs are allowed
                Ok(vec![OrderEvent::ModifierApplied(PriceModifierApplied {
                    link: PriceModifierOrderLink {
                        id: *link_id,
                        order_item_id: *order_item_id,
                        price_modifier_id: modifier.id,
                    },
                })])
            }

            OrderCommand::AddOption { link_id, order_item_id, option, count } => {
                let item = self.require_item(*order_item_id)?;
                validate_count(*count)?;
                if option.item_id != item.item_id {
                    return Err(OrderError::OptionItemMismatch {
                        option_id: option.id,
                        item_id: item.item_id,
                    });
                }

                Ok(vec![OrderEvent::OptionAdded(ItemOptionAdded {
                    link: ItemOptionLink {
                        id: *link_id,
                        order_item_id: *order_item_id,
                        option_id: option.id,
                        count: *count,
                    },
                })])
            }

            OrderCommand::RemoveOption { order_item_id, option_link_id } => {
                self.require_item(*order_item_id)?;
                if !self.option_links_for(*order_item_id).any(|link| link.id == *option_link_id) {
                    return Err(OrderError::OptionLinkNotFound(*option_link_id));
                }

                Ok(vec![OrderEvent::OptionRemoved(ItemOptionRemoved {
                    order_item_id: *order_item_id,
                    option_link_id: *option_link_id,
                })])
            }

            OrderCommand::LinkPayment { link_id, payment } => {
                if self.has_payment(payment.id) {
                    return Err(OrderError::DuplicatePayment(payment.id));
                }

                Ok(vec![OrderEvent::PaymentLinked(PaymentLinked {
                    link: OrderPaymentLink {
                        id: *link_id,
                        order_id: self.order.id,
                        payment_id: payment.id,
                    },
                })])
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.order.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogItem, ItemOption, Payment};
    use crate::domain::order::{CustomerInfo, OrderPatch};
    use crate::domain::pricing::{ModifierKind, PriceModifier};
    use crate::event_sourcing::EventEnvelope;

    fn open_order(business_id: Uuid) -> OrderAggregate {
        let (aggregate, _) = OrderAggregate::open(
            Uuid::new_v4(),
            NewOrder::for_business(business_id),
            Utc::now(),
        )
        .unwrap();
        aggregate
    }

    fn add_item(aggregate: &mut OrderAggregate, item: &CatalogItem, count: i32) -> Uuid {
        let order_item_id = Uuid::new_v4();
        aggregate
            .execute(&OrderCommand::AddItem { order_item_id, item: item.clone(), count })
            .unwrap();
        order_item_id
    }

    fn set_status(aggregate: &mut OrderAggregate, status: &str) {
        aggregate
            .execute(&OrderCommand::UpdateOrder { patch: OrderPatch::status(status) })
            .unwrap();
    }

    #[test]
    fn test_open_order_starts_pending() {
        let business_id = Uuid::new_v4();
        let now = Utc::now();
        let (aggregate, event) = OrderAggregate::open(Uuid::new_v4(), NewOrder::for_business(business_id), now).unwrap();

        assert_eq!(aggregate.status(), OrderStatus::Pending);
        assert_eq!(aggregate.business_id(), business_id);
        assert_eq!(aggregate.order.date_placed, now);
        assert_eq!(aggregate.order.valid_from, Some(now));
        assert_eq!(aggregate.order.servicing_account_id, None);
        assert_eq!(aggregate.version(), 1);
        assert!(matches!(event, OrderEvent::Created(_)));
    }

    #[test]
    fn test_open_order_rejects_negative_tip() {
        let mut new_order = NewOrder::for_business(Uuid::new_v4());
        new_order.tip_amount = Decimal::new(-1, 0);

        let err = OrderAggregate::open(Uuid::new_v4(), new_order, Utc::now()).unwrap_err();
        assert!(matches!(err, OrderError::NegativeAmount { field: "tip_amount", .. }));
    }

    #[test]
    fn test_add_item_from_same_business() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Latte", Decimal::new(50, 0));

        let order_item_id = add_item(&mut aggregate, &item, 2);

        let added = aggregate.item(order_item_id).unwrap();
        assert_eq!(added.count, 2);
        assert_eq!(added.item_id, item.id);
        assert_eq!(added.order_id, aggregate.id());
        assert_eq!(aggregate.version(), 2);
    }

    #[test]
    fn test_add_item_from_other_business_conflicts() {
        let mut aggregate = open_order(Uuid::new_v4());
        let foreign = CatalogItem::new(Uuid::new_v4(), "Espresso", Decimal::new(3, 0));

        let err = aggregate
            .execute(&OrderCommand::AddItem { order_item_id: Uuid::new_v4(), item: foreign.clone(), count: 1 })
            .unwrap_err();

        assert!(matches!(err, OrderError::BusinessMismatch { item_id } if item_id == foreign.id));
        assert!(aggregate.items.is_empty());
        assert_eq!(aggregate.version(), 1);
    }

    #[test]
    fn test_add_item_rejects_non_positive_count() {
        let business_id = Uuid::new_v4();
        let aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Latte", Decimal::new(5, 0));

        for count in [0, -3] {
            let err = aggregate
                .handle_command(&OrderCommand::AddItem { order_item_id: Uuid::new_v4(), item: item.clone(), count })
                .unwrap_err();
            assert!(matches!(err, OrderError::InvalidCount(c) if c == count));
        }
    }

    #[test]
    fn test_update_item_count() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Bagel", Decimal::new(4, 0));
        let order_item_id = add_item(&mut aggregate, &item, 1);

        aggregate
            .execute(&OrderCommand::UpdateItem { order_item_id, count: Some(5) })
            .unwrap();
        assert_eq!(aggregate.item(order_item_id).unwrap().count, 5);

        let events = aggregate
            .execute(&OrderCommand::UpdateItem { order_item_id, count: None })
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_update_missing_item_not_found() {
        let aggregate = open_order(Uuid::new_v4());
        let missing = Uuid::new_v4();

        let err = aggregate
            .handle_command(&OrderCommand::UpdateItem { order_item_id: missing, count: Some(2) })
            .unwrap_err();
        assert!(matches!(err, OrderError::OrderItemNotFound(id) if id == missing));
    }

    #[test]
    fn test_remove_item_cascades_links() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Pizza", Decimal::new(12, 0));
        let option = ItemOption::new(item.id, "Extra cheese", Decimal::new(2, 0));
        let modifier = PriceModifier::percentage(business_id, ModifierKind::Discount, "Lunch", Decimal::new(10, 0));

        let removed = add_item(&mut aggregate, &item, 1);
        let kept = add_item(&mut aggregate, &item, 1);

        for order_item_id in [removed, kept] {
            aggregate
                .execute(&OrderCommand::AddOption { link_id: Uuid::new_v4(), order_item_id, option: option.clone(), count: 1 })
                .unwrap();
            aggregate
                .execute(&OrderCommand::ApplyModifier { link_id: Uuid::new_v4(), order_item_id, modifier: modifier.clone() })
                .unwrap();
        }

        let events = aggregate.execute(&OrderCommand::RemoveItem { order_item_id: removed }).unwrap();

        match &events[0] {
            OrderEvent::ItemRemoved(e) => {
                assert_eq!(e.removed_option_links.len(), 1);
                assert_eq!(e.removed_modifier_links.len(), 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(aggregate.item(removed).is_none());
        assert_eq!(aggregate.option_links_for(removed).count(), 0);
        assert_eq!(aggregate.modifier_links_for(removed).count(), 0);
        assert_eq!(aggregate.option_links_for(kept).count(), 1);
        assert_eq!(aggregate.modifier_links_for(kept).count(), 1);
    }

    #[test]
    fn test_duplicate_modifier_links_are_kept() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Soup", Decimal::new(8, 0));
        let modifier = PriceModifier::flat(business_id, ModifierKind::Surcharge, "Takeaway", Decimal::new(1, 0));
        let order_item_id = add_item(&mut aggregate, &item, 1);

        for _ in 0..2 {
            aggregate
                .execute(&OrderCommand::ApplyModifier { link_id: Uuid::new_v4(), order_item_id, modifier: modifier.clone() })
                .unwrap();
        }

        let links: Vec<_> = aggregate.modifier_links_for(order_item_id).collect();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.price_modifier_id == modifier.id));
        assert_ne!(links[0].id, links[1].id);
    }

    #[test]
    fn test_modifier_from_other_business_conflicts() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Soup", Decimal::new(8, 0));
        let order_item_id = add_item(&mut aggregate, &item, 1);
        let foreign = PriceModifier::flat(Uuid::new_v4(), ModifierKind::Discount, "Other", Decimal::new(1, 0));

        let err = aggregate
            .handle_command(&OrderCommand::ApplyModifier { link_id: Uuid::new_v4(), order_item_id, modifier: foreign })
            .unwrap_err();
        assert!(matches!(err, OrderError::ModifierBusinessMismatch { .. }));
    }

    #[test]
    fn test_option_must_belong_to_order_item_catalog_item() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let burger = CatalogItem::new(business_id, "Burger", Decimal::new(9, 0));
        let salad = CatalogItem::new(business_id, "Salad", Decimal::new(7, 0));
        let dressing = ItemOption::new(salad.id, "Dressing", Decimal::new(1, 0));
        let order_item_id = add_item(&mut aggregate, &burger, 1);

        let err = aggregate
            .handle_command(&OrderCommand::AddOption { link_id: Uuid::new_v4(), order_item_id, option: dressing, count: 1 })
            .unwrap_err();
        assert!(matches!(err, OrderError::OptionItemMismatch { item_id, .. } if item_id == burger.id));
    }

    #[test]
    fn test_remove_option_link() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Burger", Decimal::new(9, 0));
        let bacon = ItemOption::new(item.id, "Bacon", Decimal::new(2, 0));
        let order_item_id = add_item(&mut aggregate, &item, 1);
        let link_id = Uuid::new_v4();

        aggregate
            .execute(&OrderCommand::AddOption { link_id, order_item_id, option: bacon, count: 2 })
            .unwrap();
        aggregate
            .execute(&OrderCommand::RemoveOption { order_item_id, option_link_id: link_id })
            .unwrap();
        assert_eq!(aggregate.option_links_for(order_item_id).count(), 0);

        let err = aggregate
            .handle_command(&OrderCommand::RemoveOption { order_item_id, option_link_id: link_id })
            .unwrap_err();
        assert!(matches!(err, OrderError::OptionLinkNotFound(id) if id == link_id));
    }

    #[test]
    fn test_remove_option_link_of_other_item_not_found() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Burger", Decimal::new(9, 0));
        let bacon = ItemOption::new(item.id, "Bacon", Decimal::new(2, 0));
        let first = add_item(&mut aggregate, &item, 1);
        let second = add_item(&mut aggregate, &item, 1);
        let link_id = Uuid::new_v4();

        aggregate
            .execute(&OrderCommand::AddOption { link_id, order_item_id: first, option: bacon, count: 1 })
            .unwrap();

        let err = aggregate
            .handle_command(&OrderCommand::RemoveOption { order_item_id: second, option_link_id: link_id })
            .unwrap_err();
        assert!(matches!(err, OrderError::OptionLinkNotFound(_)));
    }

    #[test]
    fn test_final_state_freezes_lines() {
        let business_id = Uuid::new_v4();
        let item = CatalogItem::new(business_id, "Tea", Decimal::new(3, 0));

        for status in ["Confirmed", "Completed", "Refunded"] {
            let mut aggregate = open_order(business_id);
            let order_item_id = add_item(&mut aggregate, &item, 1);
            set_status(&mut aggregate, status);
            let before = aggregate.clone();

            let commands = [
                OrderCommand::AddItem { order_item_id: Uuid::new_v4(), item: item.clone(), count: 1 },
                OrderCommand::UpdateItem { order_item_id, count: Some(3) },
                OrderCommand::RemoveItem { order_item_id },
                OrderCommand::AddOption {
                    link_id: Uuid::new_v4(),
                    order_item_id,
                    option: ItemOption::new(item.id, "Lemon", Decimal::ZERO),
                    count: 1,
                },
                OrderCommand::RemoveOption { order_item_id, option_link_id: Uuid::new_v4() },
                OrderCommand::ApplyModifier {
                    link_id: Uuid::new_v4(),
                    order_item_id,
                    modifier: PriceModifier::flat(business_id, ModifierKind::Tax, "VAT", Decimal::ONE),
                },
            ];

            for command in &commands {
                let err = aggregate.execute(command).unwrap_err();
                assert!(matches!(err, OrderError::FinalState(_)), "{} in {}", command.name(), status);
            }
            assert_eq!(aggregate, before);
        }
    }

    #[test]
    fn test_cancelled_order_lines_stay_mutable() {
        let business_id = Uuid::new_v4();
        let mut aggregate = open_order(business_id);
        let item = CatalogItem::new(business_id, "Tea", Decimal::new(3, 0));
        set_status(&mut aggregate, "Cancelled");

        add_item(&mut aggregate, &item, 1);
        assert_eq!(aggregate.items.len(), 1);
    }

    #[test]
    fn test_update_order_fields() {
        let mut aggregate = open_order(Uuid::new_v4());
        let customer = CustomerInfo::new("Ada", "ada@example.com", "555-0100");

        aggregate
            .execute(&OrderCommand::UpdateOrder {
                patch: OrderPatch {
                    status: Some("Confirmed".to_string()),
                    tip_amount: Some(Decimal::new(250, 2)),
                    service_charge: Some(Decimal::new(1, 0)),
                    customer: Some(customer.clone()),
                },
            })
            .unwrap();

        assert_eq!(aggregate.status(), OrderStatus::Confirmed);
        assert_eq!(aggregate.order.tip_amount, Decimal::new(250, 2));
        assert_eq!(aggregate.order.service_charge, Decimal::ONE);
        assert_eq!(aggregate.order.customer, customer);
    }

    #[test]
    fn test_update_order_leaves_final_state() {
        let mut aggregate = open_order(Uuid::new_v4());
        set_status(&mut aggregate, "Completed");
        set_status(&mut aggregate, "Pending");
        assert_eq!(aggregate.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_update_order_rejects_unknown_status_and_negative_amounts() {
        let aggregate = open_order(Uuid::new_v4());

        let err = aggregate
            .handle_command(&OrderCommand::UpdateOrder { patch: OrderPatch::status("Lost") })
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidStatus(_)));

        let err = aggregate
            .handle_command(&OrderCommand::UpdateOrder {
                patch: OrderPatch { service_charge: Some(Decimal::new(-5, 1)), ..OrderPatch::default() },
            })
            .unwrap_err();
        assert!(matches!(err, OrderError::NegativeAmount { field: "service_charge", .. }));
    }

    #[test]
    fn test_empty_patch_emits_nothing() {
        let aggregate = open_order(Uuid::new_v4());
        let events = aggregate
            .handle_command(&OrderCommand::UpdateOrder { patch: OrderPatch::default() })
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_payment_linked_once_even_in_final_state() {
        let mut aggregate = open_order(Uuid::new_v4());
        set_status(&mut aggregate, "Completed");
        let payment = Payment::new(aggregate.business_id(), Decimal::new(20, 0));

        aggregate
            .execute(&OrderCommand::LinkPayment { link_id: Uuid::new_v4(), payment: payment.clone() })
            .unwrap();
        assert!(aggregate.has_payment(payment.id));

        let err = aggregate
            .execute(&OrderCommand::LinkPayment { link_id: Uuid::new_v4(), payment: payment.clone() })
            .unwrap_err();
        assert!(matches!(err, OrderError::DuplicatePayment(id) if id == payment.id));
        assert_eq!(aggregate.payment_links.len(), 1);
    }

    #[test]
    fn test_replaying_journal_rebuilds_aggregate() {
        let business_id = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let (mut aggregate, created) = OrderAggregate::open(order_id, NewOrder::for_business(business_id), Utc::now()).unwrap();
        let item = CatalogItem::new(business_id, "Cake", Decimal::new(6, 0));

        let mut journal = vec![created];
        journal.extend(
            aggregate
                .execute(&OrderCommand::AddItem { order_item_id: Uuid::new_v4(), item, count: 2 })
                .unwrap(),
        );
        journal.extend(
            aggregate
                .execute(&OrderCommand::UpdateOrder { patch: OrderPatch::status("Confirmed") })
                .unwrap(),
        );

        let envelopes = journal
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                EventEnvelope::new(order_id, i as i64 + 1, event, Uuid::new_v4())
            })
            .collect();

        let rebuilt = OrderAggregate::load_from_events(envelopes).unwrap();
        assert_eq!(rebuilt, aggregate);
    }
}
