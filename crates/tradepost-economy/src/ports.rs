//! Collaborator contracts the economy service is built against.
//!
//! Persistence and the catalog are required. Everything else is optional and
//! held as `Option<Arc<dyn ...>>` by the service, so "not configured" stays
//! distinguishable from "configured but failing".

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tradepost_types::{Inventory, Item, User, UserId, XpAwardResult};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by the persistence and catalog backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TxClosed,

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure reported by an optional collaborator service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{service} failed: {message}")]
pub struct CollaboratorError {
    /// Which collaborator failed (e.g. `"progression"`).
    pub service: String,
    /// What went wrong.
    pub message: String,
}

impl CollaboratorError {
    /// Build an error for `service`.
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Entry point to the persistence backend.
#[async_trait]
pub trait EconomyStore: Send + Sync {
    /// Look up the account linked to a platform identity.
    async fn get_user_by_platform_id(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Open a transactional unit of work.
    async fn begin_tx(&self) -> Result<Box<dyn EconomyTx>, StoreError>;
}

/// One open transaction.
///
/// After [`commit`](Self::commit) or [`rollback`](Self::rollback) every
/// further call returns [`StoreError::TxClosed`].
#[async_trait]
pub trait EconomyTx: Send {
    /// Read a user's inventory inside the transaction.
    async fn get_inventory(&mut self, user_id: UserId) -> Result<Inventory, StoreError>;

    /// Stage a replacement inventory for the user.
    async fn update_inventory(
        &mut self,
        user_id: UserId,
        inventory: &Inventory,
    ) -> Result<(), StoreError>;

    /// Make every staged write durable and close the transaction.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discard every staged write and close the transaction.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Read-only item reference data.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Find an item by internal name.
    async fn get_item_by_name(&self, name: &str) -> Result<Option<Item>, StoreError>;

    /// Whether the shop currently sells the item.
    async fn is_item_buyable(&self, internal_name: &str) -> Result<bool, StoreError>;

    /// Every item the shop will buy back.
    async fn get_sellable_items(&self) -> Result<Vec<Item>, StoreError>;

    /// Every item the shop sells.
    async fn get_buyable_items(&self) -> Result<Vec<Item>, StoreError>;
}

// ---------------------------------------------------------------------------
// Optional collaborators
// ---------------------------------------------------------------------------

/// Maps player-facing item names to internal names.
pub trait NameResolver: Send + Sync {
    /// Resolve a public alias. Matching is case-insensitive.
    fn resolve_public_name(&self, name: &str) -> Option<String>;
}

/// Progression service: item and feature unlocks plus value modifiers.
#[async_trait]
pub trait UnlockGate: Send + Sync {
    /// Whether a single item is unlocked.
    async fn is_item_unlocked(&self, internal_name: &str) -> Result<bool, CollaboratorError>;

    /// Unlock status for a batch of items, keyed by internal name.
    async fn are_items_unlocked(
        &self,
        internal_names: &[String],
    ) -> Result<HashMap<String, bool>, CollaboratorError>;

    /// Whether a feature flag is unlocked.
    async fn is_feature_unlocked(&self, feature_key: &str) -> Result<bool, CollaboratorError>;

    /// Apply the modifier registered under `feature_key` to `base_value`.
    async fn get_modified_value(
        &self,
        feature_key: &str,
        base_value: Decimal,
    ) -> Result<Decimal, CollaboratorError>;
}

/// Job/experience service.
#[async_trait]
pub trait ExperienceAwarder: Send + Sync {
    /// Award `amount` experience for job `source_key`.
    async fn award_experience(
        &self,
        user_id: UserId,
        source_key: &str,
        amount: u64,
        reason: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<XpAwardResult, CollaboratorError>;
}

/// Quest progress tracking.
#[async_trait]
pub trait QuestTracker: Send + Sync {
    /// Record a completed sale.
    async fn on_item_sold(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
        value: u64,
    ) -> Result<(), CollaboratorError>;

    /// Record a completed purchase.
    async fn on_item_bought(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
    ) -> Result<(), CollaboratorError>;
}
