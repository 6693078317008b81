//! Shared type definitions for the Tradepost economy engine.
//!
//! This crate is the single source of truth for the data model used across
//! the Tradepost workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers for accounts and catalog items
//! - [`enums`] -- Enumeration types (quality tiers)
//! - [`structs`] -- Inventories, catalog items, accounts and weekly sales

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::QualityTier;
pub use ids::{ItemId, UserId};
pub use structs::{
    DEFAULT_ITEM_CATEGORY, Inventory, InventorySlot, Item, MONEY_ITEM_NAME, PricedItem, User,
    WeeklySale, XpAwardResult,
};
