//! In-memory reference backend.
//!
//! [`InMemoryStore`] implements both [`EconomyStore`] and [`Catalog`].
//! Transactions are serializable: an open transaction owns the inventory
//! table lock until it commits, rolls back, or is dropped. Writes are staged
//! and only land in the table on commit.
//!
//! Individual steps can be made to fail with [`FailPoint`]s, and
//! [`InMemoryStore::begin_count`] reports how many transactions were opened,
//! so callers can assert that a request never reached storage.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tradepost_types::{Inventory, Item, MONEY_ITEM_NAME, User, UserId};

use crate::ports::{Catalog, EconomyStore, EconomyTx, NameResolver, StoreError};

type InventoryTable = HashMap<UserId, Inventory>;

/// A storage step that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Looking up a user by platform identity.
    UserLookup,
    /// Any catalog read.
    Catalog,
    /// Opening a transaction.
    BeginTx,
    /// Reading an inventory inside a transaction.
    GetInventory,
    /// Staging an inventory write.
    UpdateInventory,
    /// Committing.
    Commit,
    /// Rolling back.
    Rollback,
}

/// Process-local store for accounts, the item catalog and inventories.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<(String, String), User>>,
    items: RwLock<Vec<Item>>,
    inventories: Arc<Mutex<InventoryTable>>,
    fail_points: RwLock<HashSet<FailPoint>>,
    begin_count: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `user` to a platform identity.
    pub async fn insert_user(&self, platform: &str, platform_id: &str, user: User) {
        self.users
            .write()
            .await
            .insert((platform.to_owned(), platform_id.to_owned()), user);
    }

    /// Add or replace a catalog entry, keyed by internal name.
    pub async fn insert_item(&self, item: Item) {
        let mut items = self.items.write().await;
        if let Some(existing) = items
            .iter_mut()
            .find(|existing| existing.internal_name == item.internal_name)
        {
            *existing = item;
        } else {
            items.push(item);
        }
    }

    /// Overwrite a committed inventory.
    pub async fn put_inventory(&self, inventory: Inventory) {
        self.inventories
            .lock()
            .await
            .insert(inventory.user_id, inventory);
    }

    /// The committed inventory of `user_id` (empty if never written).
    pub async fn inventory(&self, user_id: UserId) -> Inventory {
        self.inventories
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Inventory::new(user_id))
    }

    /// Make `point` fail until [`heal`](Self::heal) is called.
    ///
    /// Transactions pick up fail points when they begin.
    pub async fn fail(&self, point: FailPoint) {
        self.fail_points.write().await.insert(point);
    }

    /// Stop failing `point`.
    pub async fn heal(&self, point: FailPoint) {
        self.fail_points.write().await.remove(&point);
    }

    /// Number of transactions opened so far, including failed attempts.
    pub fn begin_count(&self) -> usize {
        self.begin_count.load(Ordering::Acquire)
    }

    async fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_points.read().await.contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }
}

fn injected(point: FailPoint) -> StoreError {
    StoreError::Backend(format!("injected failure at {point:?}"))
}

#[async_trait]
impl EconomyStore for InMemoryStore {
    async fn get_user_by_platform_id(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<Option<User>, StoreError> {
        self.check(FailPoint::UserLookup).await?;
        Ok(self
            .users
            .read()
            .await
            .get(&(platform.to_owned(), platform_id.to_owned()))
            .cloned())
    }

    async fn begin_tx(&self) -> Result<Box<dyn EconomyTx>, StoreError> {
        self.begin_count.fetch_add(1, Ordering::AcqRel);
        self.check(FailPoint::BeginTx).await?;
        let fail_points = self.fail_points.read().await.clone();
        let table = Arc::clone(&self.inventories).lock_owned().await;
        Ok(Box::new(MemoryTx {
            table: Some(table),
            staged: HashMap::new(),
            fail_points,
        }))
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn get_item_by_name(&self, name: &str) -> Result<Option<Item>, StoreError> {
        self.check(FailPoint::Catalog).await?;
        Ok(self
            .items
            .read()
            .await
            .iter()
            .find(|item| item.internal_name == name)
            .cloned())
    }

    async fn is_item_buyable(&self, internal_name: &str) -> Result<bool, StoreError> {
        self.check(FailPoint::Catalog).await?;
        Ok(self
            .items
            .read()
            .await
            .iter()
            .any(|item| item.internal_name == internal_name && item.buyable))
    }

    async fn get_sellable_items(&self) -> Result<Vec<Item>, StoreError> {
        self.check(FailPoint::Catalog).await?;
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.internal_name != MONEY_ITEM_NAME)
            .cloned()
            .collect())
    }

    async fn get_buyable_items(&self) -> Result<Vec<Item>, StoreError> {
        self.check(FailPoint::Catalog).await?;
        Ok(self
            .items
            .read()
            .await
            .iter()
            .filter(|item| item.buyable)
            .cloned()
            .collect())
    }
}

/// A transaction over [`InMemoryStore`].
struct MemoryTx {
    /// `None` once committed or rolled back.
    table: Option<OwnedMutexGuard<InventoryTable>>,
    staged: InventoryTable,
    fail_points: HashSet<FailPoint>,
}

impl MemoryTx {
    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        if self.fail_points.contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }
}

#[async_trait]
impl EconomyTx for MemoryTx {
    async fn get_inventory(&mut self, user_id: UserId) -> Result<Inventory, StoreError> {
        let table = self.table.as_ref().ok_or(StoreError::TxClosed)?;
        self.check(FailPoint::GetInventory)?;
        Ok(self
            .staged
            .get(&user_id)
            .or_else(|| table.get(&user_id))
            .cloned()
            .unwrap_or_else(|| Inventory::new(user_id)))
    }

    async fn update_inventory(
        &mut self,
        user_id: UserId,
        inventory: &Inventory,
    ) -> Result<(), StoreError> {
        if self.table.is_none() {
            return Err(StoreError::TxClosed);
        }
        self.check(FailPoint::UpdateInventory)?;
        self.staged.insert(user_id, inventory.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.table.is_none() {
            return Err(StoreError::TxClosed);
        }
        self.check(FailPoint::Commit)?;
        let mut table = self.table.take().ok_or(StoreError::TxClosed)?;
        table.extend(self.staged.drain());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let table = self.table.take().ok_or(StoreError::TxClosed)?;
        self.staged.clear();
        drop(table);
        self.check(FailPoint::Rollback)
    }
}

/// Case-insensitive public-name lookup built from catalog entries.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    aliases: HashMap<String, String>,
}

impl AliasResolver {
    /// Map every item's public name to its internal name.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let aliases = items
            .into_iter()
            .map(|item| (item.public_name.to_lowercase(), item.internal_name.clone()))
            .collect();
        Self { aliases }
    }
}

impl NameResolver for AliasResolver {
    fn resolve_public_name(&self, name: &str) -> Option<String> {
        self.aliases.get(&name.to_lowercase()).cloned()
    }
}
