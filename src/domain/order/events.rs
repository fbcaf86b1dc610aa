use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::event_sourcing::DomainEvent;
use super::value_objects::{
    CustomerInfo, ItemOptionLink, Order, OrderItem, OrderPaymentLink, OrderStatus,
    PriceModifierOrderLink,
};

// ============================================================================
// Order Events - what changed in the aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    Updated(OrderUpdated),
    ItemAdded(OrderItemAdded),
    ItemCountChanged(OrderItemCountChanged),
    ItemRemoved(OrderItemRemoved),
    ModifierApplied(PriceModifierApplied),
    OptionAdded(ItemOptionAdded),
    OptionRemoved(ItemOptionRemoved),
    PaymentLinked(PaymentLinked),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::Updated(_) => "OrderUpdated",
            OrderEvent::ItemAdded(_) => "OrderItemAdded",
            OrderEvent::ItemCountChanged(_) => "OrderItemCountChanged",
            OrderEvent::ItemRemoved(_) => "OrderItemRemoved",
            OrderEvent::ModifierApplied(_) => "PriceModifierApplied",
            OrderEvent::OptionAdded(_) => "ItemOptionAdded",
            OrderEvent::OptionRemoved(_) => "ItemOptionRemoved",
            OrderEvent::PaymentLinked(_) => "PaymentLinked",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order: Order,
}

/// Order-level fields after the update; `None` means unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdated {
    pub status: Option<OrderStatus>,
    pub tip_amount: Option<Decimal>,
    pub service_charge: Option<Decimal>,
    pub customer: Option<CustomerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemAdded {
    pub item: OrderItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemCountChanged {
    pub order_item_id: Uuid,
    pub count: i32,
}

/// Carries the dependent links removed with the item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRemoved {
    pub order_item_id: Uuid,
    pub removed_option_links: Vec<Uuid>,
    pub removed_modifier_links: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModifierApplied {
    pub link: PriceModifierOrderLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOptionAdded {
    pub link: ItemOptionLink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOptionRemoved {
    pub order_item_id: Uuid,
    pub option_link_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLinked {
    pub link: OrderPaymentLink,
}
