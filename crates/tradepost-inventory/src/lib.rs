//! Inventory slot store for the Tradepost economy engine.
//!
//! Pure functions over [`tradepost_types::Inventory`]: no I/O, no hidden
//! state, checked arithmetic throughout. Randomized operations take the
//! random source as an argument so callers (and tests) control it.
//!
//! # Modules
//!
//! - [`slots`] -- Lookup, stacking and consumption
//! - [`quality`] -- Quantity-weighted quality averaging
//! - [`error`] -- Error types

pub mod error;
pub mod quality;
pub mod slots;

pub use error::InventoryError;
pub use quality::weighted_quality_average;
pub use slots::{
    INDEXED_BATCH_THRESHOLD, SlotIndex, add_many, consume, deposit, find_random_slot, find_slot,
    find_slot_with_quality, total_quantity, withdraw_at,
};
