use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::value_objects::{ModifierKind, PriceModifier};

// ============================================================================
// Pricing Engine
// ============================================================================
//
// Two passes over the supplied modifiers:
//   1. discounts and surcharges, in the order given
//   2. taxes, always on the post-discount amount
// Tips never touch an item price; they live on the order.
// The result is clamped at zero.
//
// ============================================================================

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Price overflow applying {kind} modifier {modifier_id}")]
    ModifierOverflow { kind: ModifierKind, modifier_id: Uuid },

    #[error("Price overflow computing {0}")]
    Overflow(&'static str),
}

/// Fold `modifiers` over `base_price` and return the final price.
///
/// Arithmetic is checked; a step that leaves the decimal range is an error
/// rather than a wrapped or saturated price.
pub fn compute_final_price(
    base_price: Decimal,
    modifiers: &[PriceModifier],
) -> Result<Decimal, PricingError> {
    let mut price = base_price;

    for modifier in modifiers {
        price = match modifier.kind {
            ModifierKind::Discount | ModifierKind::Surcharge => adjust(price, modifier)?,
            ModifierKind::Tax | ModifierKind::Tip => price,
        };
    }

    for modifier in modifiers.iter().filter(|m| m.kind == ModifierKind::Tax) {
        price = adjust(price, modifier)?;
    }

    Ok(price.max(Decimal::ZERO))
}

/// Apply one modifier. Discounts subtract, surcharges and taxes add.
fn adjust(price: Decimal, modifier: &PriceModifier) -> Result<Decimal, PricingError> {
    let lowers = modifier.kind == ModifierKind::Discount;

    let adjusted = if modifier.is_percentage {
        modifier
            .value
            .checked_div(HUNDRED)
            .and_then(|rate| {
                if lowers {
                    Decimal::ONE.checked_sub(rate)
                } else {
                    Decimal::ONE.checked_add(rate)
                }
            })
            .and_then(|factor| price.checked_mul(factor))
    } else if lowers {
        price.checked_sub(modifier.value)
    } else {
        price.checked_add(modifier.value)
    };

    adjusted.ok_or(PricingError::ModifierOverflow {
        kind: modifier.kind,
        modifier_id: modifier.id,
    })
}
