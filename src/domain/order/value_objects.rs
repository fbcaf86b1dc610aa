use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Completed,
        OrderStatus::Refunded,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Completed => "Completed",
            OrderStatus::Refunded => "Refunded",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

/// Free-text customer contact details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerInfo {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub business_id: Uuid,
    pub servicing_account_id: Option<Uuid>,
    pub date_placed: DateTime<Utc>,
    pub status: OrderStatus,
    pub tip_amount: Decimal,
    pub service_charge: Decimal,
    pub customer: CustomerInfo,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

/// A quantity of a catalog item attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOptionLink {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub option_id: Uuid,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModifierOrderLink {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub price_modifier_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaymentLink {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_id: Uuid,
}

/// Input for opening a new order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub business_id: Uuid,
    pub servicing_account_id: Option<Uuid>,
    pub customer: CustomerInfo,
    pub tip_amount: Decimal,
    pub service_charge: Decimal,
}

impl NewOrder {
    pub fn for_business(business_id: Uuid) -> Self {
        Self {
            business_id,
            servicing_account_id: None,
            customer: CustomerInfo::default(),
            tip_amount: Decimal::ZERO,
            service_charge: Decimal::ZERO,
        }
    }
}

/// Partial update of order-level fields. `status` arrives unparsed so an
/// unknown value surfaces as a validation failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<String>,
    pub tip_amount: Option<Decimal>,
    pub service_charge: Option<Decimal>,
    pub customer: Option<CustomerInfo>,
}

impl OrderPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }
}

/// Price breakdown for one order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemQuote {
    pub order_item_id: Uuid,
    /// Catalog price plus option prices, before modifiers
    pub base_unit_price: Decimal,
    pub final_unit_price: Decimal,
    pub count: i32,
    pub line_total: Decimal,
}
