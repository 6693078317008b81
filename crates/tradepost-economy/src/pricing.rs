//! Pure pricing arithmetic.
//!
//! Prices and balances are whole currency units (`u64`). Ratios, modifiers
//! and percentages are [`Decimal`] so no binary float rounding leaks into
//! money. Every conversion back to units rounds down and never goes below 0.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tradepost_types::{DEFAULT_ITEM_CATEGORY, Item, WeeklySale};

/// Price the shop pays per unit: `floor(base_value * ratio)`.
pub fn sell_price(base_value: u64, ratio: Decimal) -> u64 {
    Decimal::from(base_value)
        .checked_mul(ratio)
        .map_or(u64::MAX, to_units)
}

/// Apply an optional modifier result to a base sell price.
///
/// `None` (no modifier configured, or the lookup failed) keeps the base
/// price.
pub fn modified_price(base_price: u64, modified: Option<Decimal>) -> u64 {
    modified.map_or(base_price, to_units)
}

/// How many of `desired` units a `balance` covers at `unit_price`, and what
/// they cost.
///
/// Free items are granted in full. A balance below one unit yields `(0, 0)`.
pub fn affordable_quantity(desired: u64, unit_price: u64, balance: u64) -> (u64, u64) {
    if unit_price == 0 {
        return (desired, 0);
    }
    if balance < unit_price {
        return (0, 0);
    }
    let max_affordable = balance.checked_div(unit_price).unwrap_or(0);
    let quantity = desired.min(max_affordable);
    // quantity * unit_price <= balance, so this never saturates.
    (quantity, quantity.saturating_mul(unit_price))
}

/// Experience earned for a transaction: `ceil(value / divisor)`.
///
/// A divisor of 0 disables the award.
pub const fn experience_for_value(value: u64, divisor: u64) -> u64 {
    if divisor == 0 {
        return 0;
    }
    value.div_ceil(divisor)
}

/// Apply the active weekly sale to a buy price.
///
/// The sale applies when it has no target category, or when its target
/// matches `category` case-insensitively. The discount is
/// `floor(base_price * percent / 100)`, clamped to the price itself.
pub fn weekly_discount(base_price: u64, category: &str, sale: Option<&WeeklySale>) -> u64 {
    let Some(sale) = sale else {
        return base_price;
    };
    if let Some(target) = &sale.target_category {
        if !eq_case_insensitive(target, category) {
            return base_price;
        }
    }

    let Some(discount) = Decimal::from(base_price)
        .checked_mul(sale.discount_percent)
        .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
    else {
        return base_price;
    };
    base_price.saturating_sub(to_units(discount).min(base_price))
}

/// Category used for sales and quest tracking: the item's first type tag.
pub fn item_category(item: &Item) -> &str {
    item.types
        .first()
        .map_or(DEFAULT_ITEM_CATEGORY, String::as_str)
}

/// Floor a decimal amount to whole units. Values past `u64::MAX` saturate;
/// negative values become 0.
fn to_units(value: Decimal) -> u64 {
    if value.is_sign_negative() {
        return 0;
    }
    value.floor().to_u64().unwrap_or(u64::MAX)
}

fn eq_case_insensitive(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
