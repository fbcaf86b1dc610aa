use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Catalog Value Objects
// ============================================================================

/// A sellable item in a business's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl CatalogItem {
    pub fn new(business_id: Uuid, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            business_id,
            name: name.into(),
            price,
        }
    }
}

/// A variant or add-on that belongs to exactly one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOption {
    pub id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl ItemOption {
    pub fn new(item_id: Uuid, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            item_id,
            name: name.into(),
            price,
        }
    }
}

/// A recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(business_id: Uuid, amount: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            business_id,
            amount,
            created_at: Utc::now(),
        }
    }
}
