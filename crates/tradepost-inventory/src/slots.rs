//! Slot lookup, stacking and consumption.
//!
//! An inventory is a flat list of `(item, quantity, tier)` slots. Two slots
//! with the same item and tier never coexist, and a slot never sits at zero.
//! Every mutation here preserves both rules, and every fallible mutation
//! leaves the inventory untouched when it fails.

use std::collections::HashMap;

use tradepost_types::{Inventory, InventorySlot, ItemId, QualityTier};

use crate::error::InventoryError;

/// Batch size at which [`add_many`] switches from per-entry linear scans to a
/// one-time `(item, tier)` index.
pub const INDEXED_BATCH_THRESHOLD: usize = 10;

/// Position of every `(item, tier)` stack inside one inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    positions: HashMap<(ItemId, QualityTier), usize>,
}

impl SlotIndex {
    /// Index every slot currently in `inventory`.
    pub fn build(inventory: &Inventory) -> Self {
        let mut positions = HashMap::with_capacity(inventory.slots.len());
        for (position, slot) in inventory.slots.iter().enumerate() {
            positions.entry((slot.item_id, slot.quality)).or_insert(position);
        }
        Self { positions }
    }

    /// Slot position of the stack for `item_id` at `quality`, if indexed.
    pub fn get(&self, item_id: ItemId, quality: QualityTier) -> Option<usize> {
        self.positions.get(&(item_id, quality)).copied()
    }

    /// Number of indexed stacks.
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// First slot holding `item_id`, at any tier.
pub fn find_slot(inventory: &Inventory, item_id: ItemId) -> Option<(usize, u64)> {
    inventory
        .slots
        .iter()
        .enumerate()
        .find(|(_, slot)| slot.item_id == item_id)
        .map(|(position, slot)| (position, slot.quantity))
}

/// The slot holding `item_id` at exactly `quality`.
pub fn find_slot_with_quality(
    inventory: &Inventory,
    item_id: ItemId,
    quality: QualityTier,
) -> Option<(usize, u64)> {
    inventory
        .slots
        .iter()
        .enumerate()
        .find(|(_, slot)| slot.item_id == item_id && slot.quality == quality)
        .map(|(position, slot)| (position, slot.quantity))
}

/// Pick one of the slots holding `item_id` uniformly at random.
///
/// `rng` must return values in `[0, 1)`. It is only called when more than
/// one tier of the item is present.
pub fn find_random_slot(
    inventory: &Inventory,
    item_id: ItemId,
    rng: &dyn Fn() -> f64,
) -> Option<(usize, u64)> {
    let matches = matching_positions(inventory, item_id);
    let chosen = match matches.as_slice() {
        [] => return None,
        [only] => *only,
        many => *many.get(roll_index(rng(), many.len()))?,
    };
    inventory
        .slots
        .get(chosen)
        .map(|slot| (chosen, slot.quantity))
}

/// Total units of `item_id` across every tier.
pub fn total_quantity(inventory: &Inventory, item_id: ItemId) -> u64 {
    inventory
        .slots
        .iter()
        .filter(|slot| slot.item_id == item_id)
        .fold(0_u64, |total, slot| total.saturating_add(slot.quantity))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Remove `quantity` units of `item_id`, spread over however many tiers it
/// takes.
///
/// The matching slots are shuffled with a Fisher-Yates pass driven by `rng`
/// and then drained greedily, so which tier is depleted first is random.
/// Drained slots are removed; a partially drained slot keeps its tier.
///
/// Returns one entry per slot touched, carrying the amount taken from it.
///
/// # Errors
///
/// Returns [`InventoryError::InsufficientQuantity`] if fewer than `quantity`
/// units are held. The inventory is unchanged in that case.
pub fn consume(
    inventory: &mut Inventory,
    item_id: ItemId,
    quantity: u64,
    rng: &dyn Fn() -> f64,
) -> Result<Vec<InventorySlot>, InventoryError> {
    let available = total_quantity(inventory, item_id);
    if available < quantity {
        return Err(InventoryError::InsufficientQuantity {
            item_id,
            requested: quantity,
            available,
        });
    }
    if quantity == 0 {
        return Ok(Vec::new());
    }

    let mut order = matching_positions(inventory, item_id);
    for i in (1..order.len()).rev() {
        let j = roll_index(rng(), i.saturating_add(1));
        order.swap(i, j);
    }

    let mut remaining = quantity;
    let mut consumed = Vec::with_capacity(order.len());
    let mut emptied = Vec::new();
    for position in order {
        if remaining == 0 {
            break;
        }
        let Some(slot) = inventory.slots.get_mut(position) else {
            continue;
        };
        let take = slot.quantity.min(remaining);
        slot.quantity = slot.quantity.saturating_sub(take);
        remaining = remaining.saturating_sub(take);
        consumed.push(InventorySlot::new(item_id, take, slot.quality));
        if slot.quantity == 0 {
            emptied.push(position);
        }
    }

    // Highest position first so earlier removals don't shift later ones.
    emptied.sort_unstable_by(|a, b| b.cmp(a));
    for position in emptied {
        inventory.slots.remove(position);
    }

    tracing::trace!(
        item_id = %item_id,
        quantity,
        slots_touched = consumed.len(),
        "consumed items"
    );
    Ok(consumed)
}

/// Take `quantity` units out of the slot at `position`, removing the slot if
/// it reaches zero. Returns what is left in the slot.
///
/// # Errors
///
/// Returns [`InventoryError::SlotOutOfRange`] for a bad position and
/// [`InventoryError::InsufficientQuantity`] if the slot holds too little.
pub fn withdraw_at(
    inventory: &mut Inventory,
    position: usize,
    quantity: u64,
) -> Result<u64, InventoryError> {
    let len = inventory.slots.len();
    let slot = inventory
        .slots
        .get_mut(position)
        .ok_or(InventoryError::SlotOutOfRange {
            index: position,
            len,
        })?;
    let remaining =
        slot.quantity
            .checked_sub(quantity)
            .ok_or(InventoryError::InsufficientQuantity {
                item_id: slot.item_id,
                requested: quantity,
                available: slot.quantity,
            })?;
    if remaining == 0 {
        inventory.slots.remove(position);
    } else {
        slot.quantity = remaining;
    }
    Ok(remaining)
}

/// Stack `quantity` units of `item_id` onto the slot at exactly `quality`,
/// creating that slot if it does not exist. Zero quantities are ignored.
///
/// # Errors
///
/// Returns [`InventoryError::QuantityOverflow`] if the stack would overflow.
pub fn deposit(
    inventory: &mut Inventory,
    item_id: ItemId,
    quantity: u64,
    quality: QualityTier,
) -> Result<(), InventoryError> {
    if quantity == 0 {
        return Ok(());
    }
    match find_slot_with_quality(inventory, item_id, quality) {
        Some((position, _)) => stack_at(inventory, position, quantity),
        None => {
            inventory
                .slots
                .push(InventorySlot::new(item_id, quantity, quality));
            Ok(())
        }
    }
}

/// Insert or stack a batch of entries.
///
/// Entries stack only onto a slot with the same item and tier; anything else
/// opens a new slot. Zero-quantity entries are skipped. Batches smaller than
/// [`INDEXED_BATCH_THRESHOLD`] scan the slot list per entry; larger batches
/// build a [`SlotIndex`] once. A caller-supplied `index` is always used, must
/// describe `inventory`, and is kept current.
///
/// # Errors
///
/// Returns [`InventoryError::QuantityOverflow`] if any stack would overflow.
/// The inventory (and `index`) are restored to their prior state.
pub fn add_many(
    inventory: &mut Inventory,
    items: &[InventorySlot],
    mut index: Option<&mut SlotIndex>,
) -> Result<(), InventoryError> {
    let snapshot = inventory.slots.clone();

    let outcome = match &mut index {
        Some(index) => add_indexed(inventory, items, index),
        None if items.len() >= INDEXED_BATCH_THRESHOLD => {
            let mut index = SlotIndex::build(inventory);
            tracing::trace!(
                batch = items.len(),
                indexed_stacks = index.len(),
                "Slot index built for batch insert"
            );
            add_indexed(inventory, items, &mut index)
        }
        None => add_linear(inventory, items),
    };

    if outcome.is_err() {
        inventory.slots = snapshot;
        if let Some(index) = index {
            *index = SlotIndex::build(inventory);
        }
    }
    outcome
}

fn add_linear(inventory: &mut Inventory, items: &[InventorySlot]) -> Result<(), InventoryError> {
    for entry in items {
        deposit(inventory, entry.item_id, entry.quantity, entry.quality)?;
    }
    Ok(())
}

fn add_indexed(
    inventory: &mut Inventory,
    items: &[InventorySlot],
    index: &mut SlotIndex,
) -> Result<(), InventoryError> {
    for entry in items.iter().filter(|entry| entry.quantity > 0) {
        let key = (entry.item_id, entry.quality);
        if let Some(&position) = index.positions.get(&key) {
            stack_at(inventory, position, entry.quantity)?;
        } else {
            index.positions.insert(key, inventory.slots.len());
            inventory.slots.push(*entry);
        }
    }
    Ok(())
}

fn stack_at(inventory: &mut Inventory, position: usize, quantity: u64) -> Result<(), InventoryError> {
    let len = inventory.slots.len();
    let slot = inventory
        .slots
        .get_mut(position)
        .ok_or(InventoryError::SlotOutOfRange {
            index: position,
            len,
        })?;
    slot.quantity = slot
        .quantity
        .checked_add(quantity)
        .ok_or(InventoryError::QuantityOverflow {
            item_id: slot.item_id,
        })?;
    Ok(())
}

fn matching_positions(inventory: &Inventory, item_id: ItemId) -> Vec<usize> {
    inventory
        .slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.item_id == item_id)
        .map(|(position, _)| position)
        .collect()
}

/// Scale a roll in `[0, 1)` to a position in `0..len`.
///
/// Out-of-range or non-finite rolls are clamped so a misbehaving generator
/// can never produce an invalid position.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn roll_index(roll: f64, len: usize) -> usize {
    let roll = if roll.is_finite() {
        roll.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = (roll * len as f64).floor() as usize;
    scaled.min(len.saturating_sub(1))
}
