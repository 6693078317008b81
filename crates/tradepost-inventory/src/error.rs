//! Error types for the tradepost-inventory crate.
//!
//! Every mutation either succeeds completely or leaves the inventory
//! untouched and reports one of these.

use tradepost_types::ItemId;

/// Errors that can occur while mutating an inventory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// Attempted to take more units of an item than the inventory holds.
    #[error("insufficient quantity: wanted {requested} of item {item_id} but only have {available}")]
    InsufficientQuantity {
        /// The item being removed.
        item_id: ItemId,
        /// The quantity the caller attempted to remove.
        requested: u64,
        /// The quantity held across all matching slots.
        available: u64,
    },

    /// A slot position did not exist in the inventory.
    #[error("slot index {index} out of range (inventory has {len} slots)")]
    SlotOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of slots in the inventory.
        len: usize,
    },

    /// Stacking would overflow a slot quantity.
    #[error("quantity overflow while stacking item {item_id}")]
    QuantityOverflow {
        /// The item whose stack would overflow.
        item_id: ItemId,
    },
}
