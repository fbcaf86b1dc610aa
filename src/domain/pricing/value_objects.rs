use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Price Modifier Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    Discount,
    Surcharge,
    Tax,
    Tip,
}

impl ModifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifierKind::Discount => "Discount",
            ModifierKind::Surcharge => "Surcharge",
            ModifierKind::Tax => "Tax",
            ModifierKind::Tip => "Tip",
        }
    }
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named discount, surcharge, tax or tip rule owned by a business.
///
/// `value` is a percentage when `is_percentage` is set (10 means 10%),
/// otherwise a flat amount in the order's currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModifier {
    pub id: Uuid,
    pub business_id: Uuid,
    pub kind: ModifierKind,
    pub name: String,
    pub value: Decimal,
    pub is_percentage: bool,
    /// Logical retirement; `None` means the modifier never expires.
    pub end_date: Option<DateTime<Utc>>,
}

impl PriceModifier {
    pub fn new(
        business_id: Uuid,
        kind: ModifierKind,
        name: impl Into<String>,
        value: Decimal,
        is_percentage: bool,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            business_id,
            kind,
            name: name.into(),
            value,
            is_percentage,
            end_date: None,
        }
    }

    pub fn percentage(business_id: Uuid, kind: ModifierKind, name: impl Into<String>, value: Decimal) -> Self {
        Self::new(business_id, kind, name, value, true)
    }

    pub fn flat(business_id: Uuid, kind: ModifierKind, name: impl Into<String>, value: Decimal) -> Self {
        Self::new(business_id, kind, name, value, false)
    }

    pub fn retired_at(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.end_date.map_or(true, |end| at <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_modifier_without_end_date_is_always_active() {
        let modifier = PriceModifier::flat(Uuid::new_v4(), ModifierKind::Tax, "city tax", Decimal::new(5, 0));
        assert!(modifier.is_active_at(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn test_retired_modifier_is_inactive_after_end_date() {
        let end = Utc::now();
        let modifier = PriceModifier::percentage(Uuid::new_v4(), ModifierKind::Discount, "spring sale", Decimal::new(10, 0))
            .retired_at(end);

        assert!(modifier.is_active_at(end));
        assert!(modifier.is_active_at(end - Duration::hours(1)));
        assert!(!modifier.is_active_at(end + Duration::seconds(1)));
    }
}
