//! Buy/sell orchestration.
//!
//! Each trade runs the same linear pipeline: validate, resolve, open a
//! transaction, mutate the inventory in memory, persist, commit. Nothing
//! after commit can fail the trade; experience and quest updates are handed
//! to the [`TaskLedger`] and only ever report through logs.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tradepost_inventory::{InventoryError, deposit, find_random_slot, withdraw_at};
use tradepost_types::{
    Inventory, Item, MONEY_ITEM_NAME, PricedItem, QualityTier, User, UserId, WeeklySale,
};

use crate::config::EconomyConfig;
use crate::error::EconomyError;
use crate::ports::{
    Catalog, EconomyStore, EconomyTx, ExperienceAwarder, NameResolver, QuestTracker, StoreError,
    UnlockGate,
};
use crate::pricing;
use crate::sales::SaleSchedule;
use crate::tasks::TaskLedger;

/// Random source returning values in `[0, 1)`.
pub type RandomSource = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Wall clock used to pick the active weekly sale.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Experience metadata key for the trade direction.
pub const METADATA_ACTION: &str = "action";
/// Experience metadata key for the traded item.
pub const METADATA_ITEM_NAME: &str = "item_name";
/// Experience metadata key for the transaction value.
pub const METADATA_VALUE: &str = "value";

/// Experience reason for purchases.
pub const ACTION_BUY: &str = "buy";
/// Experience reason for sales.
pub const ACTION_SELL: &str = "sell";

/// A buy or sell request as it arrives from a command surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Platform the request came from (e.g. `"discord"`).
    pub platform: String,
    /// The caller's identity on that platform.
    pub platform_id: String,
    /// Display name, for logs.
    pub username: String,
    /// Item name as typed: a public alias or an internal name.
    pub item_name: String,
    /// Requested quantity. Signed so out-of-range input can be rejected.
    pub quantity: i64,
}

impl TradeRequest {
    /// Build a request.
    pub fn new(
        platform: impl Into<String>,
        platform_id: impl Into<String>,
        username: impl Into<String>,
        item_name: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            platform: platform.into(),
            platform_id: platform_id.into(),
            username: username.into(),
            item_name: item_name.into(),
            quantity,
        }
    }
}

/// Result of a completed sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    /// Currency credited to the seller.
    pub money_gained: u64,
    /// Units actually sold. Less than requested when the seller held fewer.
    pub quantity_sold: u64,
}

#[derive(Debug, Clone, Copy)]
struct Purchase {
    quantity: u64,
    cost: u64,
}

/// The economy transaction engine.
pub struct EconomyService {
    config: EconomyConfig,
    store: Arc<dyn EconomyStore>,
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) names: Option<Arc<dyn NameResolver>>,
    pub(crate) unlocks: Option<Arc<dyn UnlockGate>>,
    experience: Option<Arc<dyn ExperienceAwarder>>,
    quests: Option<Arc<dyn QuestTracker>>,
    rng: RandomSource,
    clock: Clock,
    sales: SaleSchedule,
    tasks: Arc<TaskLedger>,
}

impl core::fmt::Debug for EconomyService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EconomyService")
            .field("config", &self.config)
            .field("names", &self.names.is_some())
            .field("unlocks", &self.unlocks.is_some())
            .field("experience", &self.experience.is_some())
            .field("quests", &self.quests.is_some())
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl EconomyService {
    /// Create a service over the required collaborators.
    ///
    /// The weekly sale rotation starts as `config.weekly_sales`.
    pub fn new(
        config: EconomyConfig,
        store: Arc<dyn EconomyStore>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        let sales = SaleSchedule::new(config.weekly_sales.clone());
        Self {
            config,
            store,
            catalog,
            names: None,
            unlocks: None,
            experience: None,
            quests: None,
            rng: Arc::new(rand::random::<f64>),
            clock: Arc::new(Utc::now),
            sales,
            tasks: Arc::new(TaskLedger::new()),
        }
    }

    /// Resolve public item aliases through `resolver`.
    #[must_use]
    pub fn with_name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.names = Some(resolver);
        self
    }

    /// Gate purchases, listings and modifiers on the progression service.
    #[must_use]
    pub fn with_unlock_gate(mut self, gate: Arc<dyn UnlockGate>) -> Self {
        self.unlocks = Some(gate);
        self
    }

    /// Award merchant experience for trades.
    #[must_use]
    pub fn with_experience_awarder(mut self, awarder: Arc<dyn ExperienceAwarder>) -> Self {
        self.experience = Some(awarder);
        self
    }

    /// Report trades to the quest tracker.
    #[must_use]
    pub fn with_quest_tracker(mut self, tracker: Arc<dyn QuestTracker>) -> Self {
        self.quests = Some(tracker);
        self
    }

    /// Replace the random source used to pick among duplicate stacks.
    #[must_use]
    pub fn with_random_source(mut self, rng: RandomSource) -> Self {
        self.rng = rng;
        self
    }

    /// Replace the clock used for the weekly sale rotation.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The configuration the service was built with.
    pub const fn config(&self) -> &EconomyConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Buy
    // -----------------------------------------------------------------------

    /// Buy up to `request.quantity` units of an item.
    ///
    /// Returns the number of units bought, which is less than requested when
    /// the balance only covers part of the order.
    ///
    /// # Errors
    ///
    /// Validation, resolution and eligibility failures leave storage
    /// untouched. Transactional failures roll back. See [`EconomyError`].
    pub async fn buy(&self, request: &TradeRequest) -> Result<u64, EconomyError> {
        info!(
            platform = %request.platform,
            platform_id = %request.platform_id,
            username = %request.username,
            item = %request.item_name,
            quantity = request.quantity,
            "Buy requested"
        );

        let quantity = self.validate_quantity(request.quantity)?;
        let user = self.load_user(request).await?;
        let item = self.load_item(&request.item_name).await?;

        let mut tx = self
            .store
            .begin_tx()
            .await
            .map_err(|source| EconomyError::TransactionBeginFailed { source })?;
        let outcome = self.buy_in_tx(tx.as_mut(), &user, &item, quantity).await;
        safe_rollback(tx.as_mut()).await;
        let purchase = outcome?;

        self.spawn_purchase_effects(&user, &item, purchase);

        info!(
            username = %request.username,
            item = %item.internal_name,
            quantity = purchase.quantity,
            cost = purchase.cost,
            "Item purchased"
        );
        Ok(purchase.quantity)
    }

    async fn buy_in_tx(
        &self,
        tx: &mut dyn EconomyTx,
        user: &User,
        item: &Item,
        requested: u64,
    ) -> Result<Purchase, EconomyError> {
        self.check_buy_eligibility(item).await?;

        let money = self.money_item().await?;
        let mut inventory = read_inventory(tx, user.id).await?;

        let Some((money_slot, balance)) =
            find_random_slot(&inventory, money.id, &*self.rng).filter(|&(_, balance)| balance > 0)
        else {
            return Err(EconomyError::InsufficientFunds {
                item: item.internal_name.clone(),
                unit_price: item.base_value,
                balance: 0,
            });
        };

        let unit_price = self.discounted_price(item).await;
        let (quantity, cost) = pricing::affordable_quantity(requested, unit_price, balance);
        if quantity == 0 {
            return Err(EconomyError::InsufficientFunds {
                item: item.internal_name.clone(),
                unit_price,
                balance,
            });
        }
        if quantity < requested {
            info!(requested, actual = quantity, "Adjusted purchase quantity due to funds");
        }

        withdraw_at(&mut inventory, money_slot, cost)?;
        deposit(&mut inventory, item.id, quantity, QualityTier::Common)?;

        persist_and_commit(tx, user.id, &inventory).await?;
        Ok(Purchase { quantity, cost })
    }

    // -----------------------------------------------------------------------
    // Sell
    // -----------------------------------------------------------------------

    /// Sell up to `request.quantity` units of an item.
    ///
    /// Selling more than is held sells everything held of the chosen stack.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::NotInInventory`] if none is held, plus the
    /// validation and transactional errors shared with [`buy`](Self::buy).
    pub async fn sell(&self, request: &TradeRequest) -> Result<SaleOutcome, EconomyError> {
        info!(
            platform = %request.platform,
            platform_id = %request.platform_id,
            username = %request.username,
            item = %request.item_name,
            quantity = request.quantity,
            "Sell requested"
        );

        let quantity = self.validate_quantity(request.quantity)?;
        let user = self.load_user(request).await?;
        let item = self.load_item(&request.item_name).await?;
        let money = self.money_item().await?;

        let mut tx = self
            .store
            .begin_tx()
            .await
            .map_err(|source| EconomyError::TransactionBeginFailed { source })?;
        let outcome = self
            .sell_in_tx(tx.as_mut(), &user, &item, &money, quantity)
            .await;
        safe_rollback(tx.as_mut()).await;
        let sale = outcome?;

        self.spawn_sale_effects(&user, &item, sale);

        info!(
            username = %request.username,
            item = %item.internal_name,
            quantity = sale.quantity_sold,
            money_gained = sale.money_gained,
            "Item sold"
        );
        Ok(sale)
    }

    async fn sell_in_tx(
        &self,
        tx: &mut dyn EconomyTx,
        user: &User,
        item: &Item,
        money: &Item,
        requested: u64,
    ) -> Result<SaleOutcome, EconomyError> {
        let mut inventory = read_inventory(tx, user.id).await?;

        let Some((slot, held)) = find_random_slot(&inventory, item.id, &*self.rng) else {
            return Err(EconomyError::NotInInventory {
                item: item.internal_name.clone(),
            });
        };
        let quantity_sold = requested.min(held);

        let unit_price = self.unit_sell_price(item.base_value).await;
        let money_gained =
            quantity_sold
                .checked_mul(unit_price)
                .ok_or(InventoryError::QuantityOverflow {
                    item_id: money.id,
                })?;

        withdraw_at(&mut inventory, slot, quantity_sold)?;
        deposit(&mut inventory, money.id, money_gained, QualityTier::Common)?;

        persist_and_commit(tx, user.id, &inventory).await?;
        Ok(SaleOutcome {
            money_gained,
            quantity_sold,
        })
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Every item the shop buys back, with its current sell price.
    ///
    /// With an unlock gate configured, locked items are left out.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Lookup`] if the catalog fails and
    /// [`EconomyError::UnlockCheckFailed`] if the batch unlock check fails.
    pub async fn sellable_prices(&self) -> Result<Vec<PricedItem>, EconomyError> {
        info!("Sellable prices requested");
        let items = self
            .catalog
            .get_sellable_items()
            .await
            .map_err(|source| EconomyError::Lookup { source })?;
        let items = self.filter_unlocked(items).await?;

        let mut priced = Vec::with_capacity(items.len());
        for item in items {
            let sell_price = self.unit_sell_price(item.base_value).await;
            priced.push(PricedItem { item, sell_price });
        }
        Ok(priced)
    }

    /// Every item the shop sells, filtered by unlock status when a gate is
    /// configured.
    ///
    /// # Errors
    ///
    /// Same as [`sellable_prices`](Self::sellable_prices).
    pub async fn buyable_items(&self) -> Result<Vec<Item>, EconomyError> {
        info!("Buyable items requested");
        let items = self
            .catalog
            .get_buyable_items()
            .await
            .map_err(|source| EconomyError::Lookup { source })?;
        self.filter_unlocked(items).await
    }

    async fn filter_unlocked(&self, items: Vec<Item>) -> Result<Vec<Item>, EconomyError> {
        let Some(gate) = &self.unlocks else {
            return Ok(items);
        };
        let names: Vec<String> = items.iter().map(|item| item.internal_name.clone()).collect();
        let status = gate
            .are_items_unlocked(&names)
            .await
            .map_err(|source| EconomyError::UnlockCheckFailed { source })?;

        let total = items.len();
        let unlocked: Vec<Item> = items
            .into_iter()
            .filter(|item| status.get(&item.internal_name).copied().unwrap_or(false))
            .collect();
        info!(total, unlocked = unlocked.len(), "Listing filtered by unlock status");
        Ok(unlocked)
    }

    // -----------------------------------------------------------------------
    // Weekly sales
    // -----------------------------------------------------------------------

    /// Replace the weekly sale rotation.
    pub async fn replace_weekly_sales(&self, sales: Vec<WeeklySale>) {
        self.sales.replace(sales).await;
    }

    /// The sale active right now, if any.
    pub async fn active_sale(&self) -> Option<WeeklySale> {
        self.sales
            .active_sale((self.clock)(), self.config.sale_rotation_weeks)
            .await
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Background tasks still running.
    pub fn outstanding_tasks(&self) -> usize {
        self.tasks.outstanding()
    }

    /// Wait up to `deadline` for background tasks to finish.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::ShutdownTimedOut`] if tasks are still running
    /// at the deadline. They are not cancelled.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), EconomyError> {
        info!("Economy service shutting down, waiting for background tasks");
        self.tasks.shutdown(deadline).await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn validate_quantity(&self, quantity: i64) -> Result<u64, EconomyError> {
        let max = self.config.max_transaction_quantity;
        u64::try_from(quantity)
            .ok()
            .filter(|q| (1..=max).contains(q))
            .ok_or(EconomyError::InvalidQuantity { quantity, max })
    }

    async fn load_user(&self, request: &TradeRequest) -> Result<User, EconomyError> {
        self.store
            .get_user_by_platform_id(&request.platform, &request.platform_id)
            .await
            .map_err(|source| EconomyError::Lookup { source })?
            .ok_or_else(|| EconomyError::UserNotFound {
                platform: request.platform.clone(),
                platform_id: request.platform_id.clone(),
            })
    }

    async fn money_item(&self) -> Result<Item, EconomyError> {
        self.catalog
            .get_item_by_name(MONEY_ITEM_NAME)
            .await
            .map_err(|source| EconomyError::Lookup { source })?
            .ok_or_else(|| EconomyError::ItemNotFound {
                name: MONEY_ITEM_NAME.to_owned(),
            })
    }

    /// Buy price after the weekly sale, when the discount feature allows it.
    async fn discounted_price(&self, item: &Item) -> u64 {
        let base = item.base_value;
        if let Some(gate) = &self.unlocks {
            match gate
                .is_feature_unlocked(&self.config.weekly_discount_feature)
                .await
            {
                Ok(true) => {}
                Ok(false) => return base,
                Err(e) => {
                    warn!(error = %e, "Failed to check if weekly discount is unlocked");
                    return base;
                }
            }
        }

        let category = pricing::item_category(item);
        let sale = self.active_sale().await;
        let price = pricing::weekly_discount(base, category, sale.as_ref());
        if price < base {
            info!(
                item = %item.internal_name,
                category,
                original_price = base,
                discounted_price = price,
                "Weekly sale discount applied"
            );
        }
        price
    }

    /// Sell price after the economy bonus modifier. A failing modifier
    /// lookup falls back to the base price.
    async fn unit_sell_price(&self, base_value: u64) -> u64 {
        let base = pricing::sell_price(base_value, self.config.sell_price_ratio);
        let Some(gate) = &self.unlocks else {
            return base;
        };
        match gate
            .get_modified_value(&self.config.economy_bonus_feature, Decimal::from(base))
            .await
        {
            Ok(modified) => pricing::modified_price(base, Some(modified)),
            Err(e) => {
                warn!(error = %e, "Failed to apply economy bonus modifier, using base price");
                pricing::modified_price(base, None)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Side effects
    // -----------------------------------------------------------------------

    fn spawn_purchase_effects(&self, user: &User, item: &Item, purchase: Purchase) {
        self.spawn_merchant_xp(user.id, ACTION_BUY, &item.internal_name, purchase.cost);

        if let Some(quests) = &self.quests {
            let quests = Arc::clone(quests);
            let user_id = user.id;
            let category = pricing::item_category(item).to_owned();
            let item_name = item.internal_name.clone();
            let quantity = purchase.quantity;
            self.tasks.spawn("quest_item_bought", async move {
                if let Err(e) = quests.on_item_bought(user_id, &category, quantity).await {
                    warn!(error = %e, item = %item_name, "Failed to track quest progress for item purchase");
                }
            });
        }
    }

    fn spawn_sale_effects(&self, user: &User, item: &Item, sale: SaleOutcome) {
        self.spawn_merchant_xp(user.id, ACTION_SELL, &item.internal_name, sale.money_gained);

        if let Some(quests) = &self.quests {
            let quests = Arc::clone(quests);
            let user_id = user.id;
            let category = pricing::item_category(item).to_owned();
            let item_name = item.internal_name.clone();
            self.tasks.spawn("quest_item_sold", async move {
                if let Err(e) = quests
                    .on_item_sold(user_id, &category, sale.quantity_sold, sale.money_gained)
                    .await
                {
                    warn!(error = %e, item = %item_name, "Failed to track quest progress for item sale");
                }
            });
        }
    }

    fn spawn_merchant_xp(&self, user_id: UserId, action: &'static str, item_name: &str, value: u64) {
        let Some(awarder) = &self.experience else {
            return;
        };
        let xp = pricing::experience_for_value(value, self.config.merchant_xp_divisor);
        if xp == 0 {
            return;
        }

        let awarder = Arc::clone(awarder);
        let job_key = self.config.merchant_job_key.clone();
        let metadata = BTreeMap::from([
            (METADATA_ACTION.to_owned(), serde_json::Value::from(action)),
            (METADATA_ITEM_NAME.to_owned(), serde_json::Value::from(item_name)),
            (METADATA_VALUE.to_owned(), serde_json::Value::from(value)),
        ]);
        self.tasks.spawn("merchant_xp", async move {
            match awarder
                .award_experience(user_id, &job_key, xp, action, metadata)
                .await
            {
                Ok(result) if result.leveled_up => {
                    info!(user_id = %user_id, new_level = result.new_level, "Merchant leveled up");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to award merchant experience");
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

async fn read_inventory(tx: &mut dyn EconomyTx, user_id: UserId) -> Result<Inventory, EconomyError> {
    tx.get_inventory(user_id)
        .await
        .map_err(|source| EconomyError::InventoryReadFailed { source })
}

async fn persist_and_commit(
    tx: &mut dyn EconomyTx,
    user_id: UserId,
    inventory: &Inventory,
) -> Result<(), EconomyError> {
    tx.update_inventory(user_id, inventory)
        .await
        .map_err(|source| EconomyError::InventoryWriteFailed { source })?;
    tx.commit()
        .await
        .map_err(|source| EconomyError::CommitFailed { source })
}

/// Roll back unconditionally. A transaction the commit already closed is
/// expected; any other failure is logged and otherwise ignored.
async fn safe_rollback(tx: &mut dyn EconomyTx) {
    match tx.rollback().await {
        Ok(()) | Err(StoreError::TxClosed) => {}
        Err(e) => tracing::error!(error = %e, "Failed to roll back transaction"),
    }
}
