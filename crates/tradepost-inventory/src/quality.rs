//! Quantity-weighted quality averaging.

use tradepost_types::{InventorySlot, QualityTier};

/// Quantity-weighted average tier of `slots`, rounded half up.
///
/// Empty input, or input whose quantities sum to zero, yields
/// [`QualityTier::Common`].
pub fn weighted_quality_average(slots: &[InventorySlot]) -> QualityTier {
    let (weighted, total) = slots.iter().fold((0_u128, 0_u128), |(weighted, total), slot| {
        let units = u128::from(slot.quantity);
        (
            weighted.saturating_add(u128::from(slot.quality.ordinal()).saturating_mul(units)),
            total.saturating_add(units),
        )
    });

    let Some(rounded) = weighted.saturating_add(total / 2).checked_div(total) else {
        return QualityTier::Common;
    };
    QualityTier::from_ordinal(u64::try_from(rounded).unwrap_or(QualityTier::MAX_ORDINAL))
}

#[cfg(test)]
mod tests {
    use tradepost_types::ItemId;

    use super::*;

    fn slot(quantity: u64, quality: QualityTier) -> InventorySlot {
        InventorySlot::new(ItemId(1), quantity, quality)
    }

    #[test]
    fn half_rounds_up() {
        let slots = [slot(5, QualityTier::Common), slot(3, QualityTier::Legendary)];
        assert_eq!(weighted_quality_average(&slots), QualityTier::Rare);
    }

    #[test]
    fn below_half_rounds_down() {
        let slots = [slot(10, QualityTier::Common), slot(1, QualityTier::Legendary)];
        assert_eq!(weighted_quality_average(&slots), QualityTier::Common);
    }

    #[test]
    fn empty_and_zero_quantity_default_to_common() {
        assert_eq!(weighted_quality_average(&[]), QualityTier::Common);
        assert_eq!(
            weighted_quality_average(&[slot(0, QualityTier::Legendary)]),
            QualityTier::Common
        );
    }

    #[test]
    fn uniform_input_keeps_tier() {
        let slots = [slot(4, QualityTier::Cursed), slot(9, QualityTier::Cursed)];
        assert_eq!(weighted_quality_average(&slots), QualityTier::Cursed);
    }
}
