//! Error types for the tradepost-economy crate.
//!
//! Validation and eligibility failures happen before any write and mean
//! nothing changed. The transactional kinds (`TransactionBeginFailed`,
//! `InventoryReadFailed`, `InventoryWriteFailed`, `CommitFailed`) mean the
//! transaction was rolled back and storage may be unhealthy.

use tradepost_inventory::InventoryError;

use crate::ports::{CollaboratorError, StoreError};

/// Errors returned by the economy service.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Requested quantity is zero, negative, or above the configured cap.
    #[error("invalid quantity {quantity}: must be between 1 and {max}")]
    InvalidQuantity {
        /// The quantity as requested.
        quantity: i64,
        /// The configured maximum.
        max: u64,
    },

    /// No account is linked to the platform identity.
    #[error("user not found: {platform}/{platform_id}")]
    UserNotFound {
        /// Platform name.
        platform: String,
        /// Identity on that platform.
        platform_id: String,
    },

    /// The item name matched neither a public alias nor an internal name.
    #[error("item not found: {name}")]
    ItemNotFound {
        /// The name as supplied.
        name: String,
    },

    /// The catalog does not sell this item.
    #[error("item {item} is not buyable")]
    NotBuyable {
        /// Internal item name.
        item: String,
    },

    /// The item exists but is not unlocked yet.
    #[error("item {item} is locked")]
    ItemLocked {
        /// Internal item name.
        item: String,
    },

    /// The balance cannot cover even one unit.
    #[error("insufficient funds: one {item} costs {unit_price}, balance is {balance}")]
    InsufficientFunds {
        /// Internal item name.
        item: String,
        /// Price of a single unit after discounts.
        unit_price: u64,
        /// Money held.
        balance: u64,
    },

    /// The seller holds none of the item.
    #[error("item {item} not in inventory")]
    NotInInventory {
        /// Internal item name.
        item: String,
    },

    /// The persistence backend could not open a transaction.
    #[error("failed to begin transaction: {source}")]
    TransactionBeginFailed {
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// The inventory could not be read inside the transaction.
    #[error("failed to read inventory: {source}")]
    InventoryReadFailed {
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// The mutated inventory could not be written.
    #[error("failed to write inventory: {source}")]
    InventoryWriteFailed {
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// The transaction could not be committed.
    #[error("failed to commit transaction: {source}")]
    CommitFailed {
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// Background tasks were still running when the shutdown deadline hit.
    #[error("shutdown timed out with {outstanding} background tasks still running")]
    ShutdownTimedOut {
        /// Tasks still in flight at the deadline.
        outstanding: usize,
    },

    /// The unlock gate itself failed (as opposed to reporting "locked").
    #[error("failed to check unlock status: {source}")]
    UnlockCheckFailed {
        /// The collaborator failure.
        #[source]
        source: CollaboratorError,
    },

    /// A catalog or account lookup failed.
    #[error("lookup failed: {source}")]
    Lookup {
        /// The underlying store error.
        #[source]
        source: StoreError,
    },

    /// An in-memory inventory mutation failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
