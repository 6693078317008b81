//! Core entity structs for the Tradepost economy.
//!
//! Covers inventories and their slots, catalog items, accounts, the weekly
//! sale schedule and the result types handed back by collaborators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::QualityTier;
use crate::ids::{ItemId, UserId};

/// Reserved internal name of the item that acts as currency.
pub const MONEY_ITEM_NAME: &str = "money";

/// Category reported for items that carry no type tags.
pub const DEFAULT_ITEM_CATEGORY: &str = "Item";

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One stack of a single item at a single quality tier.
///
/// A persisted slot never has a quantity of zero; drained slots are removed
/// from their inventory instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventorySlot {
    /// Item held in this slot.
    pub item_id: ItemId,
    /// Number of units stacked here.
    pub quantity: u64,
    /// Quality tier shared by every unit in the stack.
    pub quality: QualityTier,
}

impl InventorySlot {
    /// Create a slot at an explicit quality tier.
    pub const fn new(item_id: ItemId, quantity: u64, quality: QualityTier) -> Self {
        Self {
            item_id,
            quantity,
            quality,
        }
    }

    /// Create a slot at [`QualityTier::Common`].
    pub const fn common(item_id: ItemId, quantity: u64) -> Self {
        Self::new(item_id, quantity, QualityTier::Common)
    }
}

/// Everything a single account owns, as an ordered list of slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Owner of the inventory.
    pub user_id: UserId,
    /// Slots in storage order.
    pub slots: Vec<InventorySlot>,
}

impl Inventory {
    /// Create an empty inventory for `user_id`.
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            slots: Vec::new(),
        }
    }

    /// Create an inventory pre-filled with `slots`.
    pub const fn with_slots(user_id: UserId, slots: Vec<InventorySlot>) -> Self {
        Self { user_id, slots }
    }

    /// Whether the inventory holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog entry for a tradeable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog identifier.
    pub id: ItemId,
    /// Canonical name used by storage and the unlock gate.
    pub internal_name: String,
    /// Player-facing display name.
    pub public_name: String,
    /// Short flavour text.
    #[serde(default)]
    pub description: String,
    /// Reference value in currency units; sell and buy prices derive from it.
    pub base_value: u64,
    /// Whether the shop sells this item at all.
    pub buyable: bool,
    /// Category tags. The first tag is the item's category.
    #[serde(default)]
    pub types: Vec<String>,
}

/// A catalog item paired with the price the shop currently pays for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    /// The catalog entry.
    pub item: Item,
    /// Sell price per unit after modifiers.
    pub sell_price: u64,
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// An account that can own an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier.
    pub id: UserId,
    /// Display name at the time of lookup.
    pub username: String,
}

// ---------------------------------------------------------------------------
// Weekly sales
// ---------------------------------------------------------------------------

/// One entry of the rotating weekly sale schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySale {
    /// Position in the rotation this entry occupies.
    pub week_offset: u32,
    /// Category the discount applies to. `None` discounts every item.
    #[serde(default)]
    pub target_category: Option<String>,
    /// Discount as a percentage of the base price (e.g. `25` for 25%).
    pub discount_percent: Decimal,
    /// Announcement text.
    #[serde(default)]
    pub description: String,
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

/// Outcome of an experience award.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAwardResult {
    /// Whether the award crossed a level boundary.
    pub leveled_up: bool,
    /// Level after the award.
    pub new_level: u32,
}
