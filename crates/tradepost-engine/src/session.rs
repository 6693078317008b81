//! Scripted trading session.
//!
//! Seeds the in-memory store with a catalog and one trader, then replays a
//! list of buy/sell steps through the economy service. Failed trades are
//! player-facing outcomes, so they are logged and counted rather than
//! aborting the session.

use serde::Deserialize;
use tracing::{info, warn};
use tradepost_economy::{EconomyService, InMemoryStore, TradeRequest};
use tradepost_types::{Inventory, InventorySlot, Item, ItemId, MONEY_ITEM_NAME, User, UserId};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// The `session` section of `tradepost-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Platform the scripted trader is linked on.
    #[serde(default = "default_platform")]
    pub platform: String,

    /// The trader's identity on that platform.
    #[serde(default = "default_platform_id")]
    pub platform_id: String,

    /// Display name.
    #[serde(default = "default_username")]
    pub username: String,

    /// Currency the trader starts with.
    #[serde(default = "default_starting_money")]
    pub starting_money: u64,

    /// Catalog to seed. Must contain the currency item.
    #[serde(default = "default_catalog")]
    pub catalog: Vec<Item>,

    /// Trades to replay, in order.
    #[serde(default = "default_script")]
    pub script: Vec<ScriptStep>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            platform_id: default_platform_id(),
            username: default_username(),
            starting_money: default_starting_money(),
            catalog: default_catalog(),
            script: default_script(),
        }
    }
}

/// Direction of a scripted trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Buy from the shop.
    Buy,
    /// Sell to the shop.
    Sell,
}

/// One scripted trade.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptStep {
    /// Buy or sell.
    pub action: TradeAction,
    /// Item name as a player would type it.
    pub item: String,
    /// Requested quantity.
    pub quantity: i64,
}

fn default_platform() -> String {
    String::from("local")
}

fn default_platform_id() -> String {
    String::from("trader-1")
}

fn default_username() -> String {
    String::from("trader")
}

const fn default_starting_money() -> u64 {
    500
}

fn catalog_item(
    id: u32,
    internal: &str,
    public: &str,
    base_value: u64,
    buyable: bool,
    category: Option<&str>,
) -> Item {
    Item {
        id: ItemId(id),
        internal_name: internal.to_owned(),
        public_name: public.to_owned(),
        description: String::new(),
        base_value,
        buyable,
        types: category.map(str::to_owned).into_iter().collect(),
    }
}

fn default_catalog() -> Vec<Item> {
    vec![
        catalog_item(1, MONEY_ITEM_NAME, "Coins", 1, false, None),
        catalog_item(2, "lootbox_tier0", "Junkbox", 20, true, Some("Lootbox")),
        catalog_item(3, "iron_sword", "Iron Sword", 120, true, Some("Weapon")),
        catalog_item(4, "health_potion", "Health Potion", 15, true, Some("Consumable")),
        catalog_item(5, "ancient_relic", "Ancient Relic", 800, false, Some("Artifact")),
    ]
}

fn default_script() -> Vec<ScriptStep> {
    let step = |action, item: &str, quantity| ScriptStep {
        action,
        item: item.to_owned(),
        quantity,
    };
    vec![
        step(TradeAction::Buy, "Iron Sword", 2),
        step(TradeAction::Buy, "health potion", 10),
        step(TradeAction::Sell, "iron_sword", 1),
        step(TradeAction::Buy, "Ancient Relic", 1),
        step(TradeAction::Sell, "Health Potion", 25),
        step(TradeAction::Buy, "Junkbox", 0),
    ]
}

// -----------------------------------------------------------------------
// Seeding
// -----------------------------------------------------------------------

/// Load the catalog and the trader into `store`, with the starting money in
/// a single slot. Returns the trader.
pub async fn seed(store: &InMemoryStore, config: &SessionConfig) -> Result<User, EngineError> {
    let money = config
        .catalog
        .iter()
        .find(|item| item.internal_name == MONEY_ITEM_NAME)
        .ok_or(EngineError::MissingCurrency {
            name: MONEY_ITEM_NAME,
        })?;
    let money_id = money.id;

    for item in &config.catalog {
        store.insert_item(item.clone()).await;
    }

    let user = User {
        id: UserId::new(),
        username: config.username.clone(),
    };
    store
        .insert_user(&config.platform, &config.platform_id, user.clone())
        .await;

    let slots = if config.starting_money == 0 {
        Vec::new()
    } else {
        vec![InventorySlot::common(money_id, config.starting_money)]
    };
    store.put_inventory(Inventory::with_slots(user.id, slots)).await;

    info!(
        user_id = %user.id,
        username = %user.username,
        catalog_size = config.catalog.len(),
        starting_money = config.starting_money,
        "Session seeded"
    );
    Ok(user)
}

// -----------------------------------------------------------------------
// Replay
// -----------------------------------------------------------------------

/// Tally of a replayed script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Trades that completed.
    pub succeeded: usize,
    /// Trades the service rejected.
    pub failed: usize,
}

/// Replay every scripted step in order.
pub async fn run(service: &EconomyService, config: &SessionConfig) -> SessionReport {
    let mut report = SessionReport::default();

    for (step_no, step) in config.script.iter().enumerate() {
        let request = TradeRequest::new(
            config.platform.clone(),
            config.platform_id.clone(),
            config.username.clone(),
            step.item.clone(),
            step.quantity,
        );
        let outcome = match step.action {
            TradeAction::Buy => service.buy(&request).await.map(|quantity| {
                info!(step = step_no, item = %step.item, quantity, "Scripted buy completed");
            }),
            TradeAction::Sell => service.sell(&request).await.map(|sale| {
                info!(
                    step = step_no,
                    item = %step.item,
                    quantity = sale.quantity_sold,
                    money_gained = sale.money_gained,
                    "Scripted sell completed"
                );
            }),
        };
        match outcome {
            Ok(()) => report.succeeded = report.succeeded.saturating_add(1),
            Err(e) => {
                warn!(step = step_no, action = ?step.action, item = %step.item, error = %e, "Scripted trade rejected");
                report.failed = report.failed.saturating_add(1);
            }
        }
    }

    match service.sellable_prices().await {
        Ok(prices) => {
            for priced in prices {
                info!(
                    item = %priced.item.public_name,
                    sell_price = priced.sell_price,
                    "Shop buyback price"
                );
            }
        }
        Err(e) => warn!(error = %e, "Failed to list sell prices"),
    }

    report
}
