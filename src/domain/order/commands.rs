use uuid::Uuid;

use crate::domain::catalog::{CatalogItem, ItemOption, Payment};
use crate::domain::pricing::PriceModifier;
use super::value_objects::OrderPatch;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================
//
// Commands carry the catalog entities they reference, already loaded by the
// service, so the aggregate can check cross-entity rules without I/O.
// Ids for new child records are minted by the caller.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    UpdateOrder {
        patch: OrderPatch,
    },
    AddItem {
        order_item_id: Uuid,
        item: CatalogItem,
        count: i32,
    },
    UpdateItem {
        order_item_id: Uuid,
        count: Option<i32>,
    },
    RemoveItem {
        order_item_id: Uuid,
    },
    ApplyModifier {
        link_id: Uuid,
        order_item_id: Uuid,
        modifier: PriceModifier,
    },
    AddOption {
        link_id: Uuid,
        order_item_id: Uuid,
        option: ItemOption,
        count: i32,
    },
    RemoveOption {
        order_item_id: Uuid,
        option_link_id: Uuid,
    },
    LinkPayment {
        link_id: Uuid,
        payment: Payment,
    },
}

impl OrderCommand {
    /// True for commands that touch line items or their links.
    pub fn mutates_lines(&self) -> bool {
        !matches!(
            self,
            OrderCommand::UpdateOrder { .. } | OrderCommand::LinkPayment { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::UpdateOrder { .. } => "update_order",
            OrderCommand::AddItem { .. } => "add_item",
            OrderCommand::UpdateItem { .. } => "update_item",
            OrderCommand::RemoveItem { .. } => "remove_item",
            OrderCommand::ApplyModifier { .. } => "apply_modifier",
            OrderCommand::AddOption { .. } => "add_option",
            OrderCommand::RemoveOption { .. } => "remove_option",
            OrderCommand::LinkPayment { .. } => "link_payment",
        }
    }
}
