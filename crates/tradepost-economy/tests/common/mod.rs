//! Shared fixture and recording collaborators for the economy integration
//! tests.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tradepost_economy::{
    AliasResolver, CollaboratorError, EconomyConfig, EconomyService, ExperienceAwarder,
    InMemoryStore, QuestTracker, TradeRequest, UnlockGate,
};
use tradepost_inventory::total_quantity;
use tradepost_types::{Inventory, InventorySlot, Item, ItemId, User, UserId, XpAwardResult};

pub const PLATFORM: &str = "discord";
pub const PLATFORM_ID: &str = "1001";

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// One call to [`ExperienceAwarder::award_experience`].
#[derive(Debug, Clone)]
pub struct AwardCall {
    pub user_id: UserId,
    pub source_key: String,
    pub amount: u64,
    pub reason: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Records awards. Can be made to wait on a semaphore before finishing.
#[derive(Debug, Default)]
pub struct RecordingAwarder {
    pub calls: Mutex<Vec<AwardCall>>,
    pub fail: AtomicBool,
    latch: Option<Arc<Semaphore>>,
}

impl RecordingAwarder {
    /// An awarder whose calls block until `latch` hands out a permit.
    pub fn gated(latch: Arc<Semaphore>) -> Self {
        Self {
            latch: Some(latch),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<AwardCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExperienceAwarder for RecordingAwarder {
    async fn award_experience(
        &self,
        user_id: UserId,
        source_key: &str,
        amount: u64,
        reason: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<XpAwardResult, CollaboratorError> {
        if let Some(latch) = &self.latch {
            latch.acquire().await.unwrap().forget();
        }
        if self.fail.load(Ordering::Acquire) {
            return Err(CollaboratorError::new("jobs", "award rejected"));
        }
        self.calls.lock().unwrap().push(AwardCall {
            user_id,
            source_key: source_key.to_owned(),
            amount,
            reason: reason.to_owned(),
            metadata,
        });
        Ok(XpAwardResult {
            leveled_up: amount >= 100,
            new_level: 2,
        })
    }
}

/// Records quest progress.
#[derive(Debug, Default)]
pub struct RecordingQuests {
    pub sold: Mutex<Vec<(UserId, String, u64, u64)>>,
    pub bought: Mutex<Vec<(UserId, String, u64)>>,
}

#[async_trait]
impl QuestTracker for RecordingQuests {
    async fn on_item_sold(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
        value: u64,
    ) -> Result<(), CollaboratorError> {
        self.sold
            .lock()
            .unwrap()
            .push((user_id, category.to_owned(), quantity, value));
        Ok(())
    }

    async fn on_item_bought(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
    ) -> Result<(), CollaboratorError> {
        self.bought
            .lock()
            .unwrap()
            .push((user_id, category.to_owned(), quantity));
        Ok(())
    }
}

/// Unlock gate driven by the test. Everything is unlocked unless listed.
#[derive(Debug, Default)]
pub struct ScriptedGate {
    pub locked_items: Mutex<HashSet<String>>,
    pub locked_features: Mutex<HashSet<String>>,
    /// Multiplier applied by `get_modified_value`; `None` returns the input.
    pub bonus: Mutex<Option<Decimal>>,
    pub fail_items: AtomicBool,
    pub fail_features: AtomicBool,
    pub fail_modifier: AtomicBool,
}

impl ScriptedGate {
    pub fn lock_item(&self, name: &str) {
        self.locked_items.lock().unwrap().insert(name.to_owned());
    }

    pub fn lock_feature(&self, key: &str) {
        self.locked_features.lock().unwrap().insert(key.to_owned());
    }

    pub fn set_bonus(&self, multiplier: Decimal) {
        *self.bonus.lock().unwrap() = Some(multiplier);
    }
}

fn gate_error(what: &str) -> CollaboratorError {
    CollaboratorError::new("progression", format!("{what} unavailable"))
}

#[async_trait]
impl UnlockGate for ScriptedGate {
    async fn is_item_unlocked(&self, internal_name: &str) -> Result<bool, CollaboratorError> {
        if self.fail_items.load(Ordering::Acquire) {
            return Err(gate_error("item unlocks"));
        }
        Ok(!self.locked_items.lock().unwrap().contains(internal_name))
    }

    async fn are_items_unlocked(
        &self,
        internal_names: &[String],
    ) -> Result<HashMap<String, bool>, CollaboratorError> {
        if self.fail_items.load(Ordering::Acquire) {
            return Err(gate_error("item unlocks"));
        }
        let locked = self.locked_items.lock().unwrap();
        Ok(internal_names
            .iter()
            .map(|name| (name.clone(), !locked.contains(name)))
            .collect())
    }

    async fn is_feature_unlocked(&self, feature_key: &str) -> Result<bool, CollaboratorError> {
        if self.fail_features.load(Ordering::Acquire) {
            return Err(gate_error("feature unlocks"));
        }
        Ok(!self.locked_features.lock().unwrap().contains(feature_key))
    }

    async fn get_modified_value(
        &self,
        _feature_key: &str,
        base_value: Decimal,
    ) -> Result<Decimal, CollaboratorError> {
        if self.fail_modifier.load(Ordering::Acquire) {
            return Err(gate_error("modifiers"));
        }
        Ok(self
            .bonus
            .lock()
            .unwrap()
            .map_or(base_value, |multiplier| base_value * multiplier))
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn item(id: u32, internal: &str, public: &str, base_value: u64, buyable: bool, types: &[&str]) -> Item {
    Item {
        id: ItemId(id),
        internal_name: internal.to_owned(),
        public_name: public.to_owned(),
        description: String::new(),
        base_value,
        buyable,
        types: types.iter().map(|t| (*t).to_owned()).collect(),
    }
}

/// A seeded store plus recording collaborators.
pub struct Fixture {
    pub config: EconomyConfig,
    pub store: Arc<InMemoryStore>,
    pub user: User,
    pub money: Item,
    pub sword: Item,
    pub potion: Item,
    pub relic: Item,
    pub pamphlet: Item,
    pub experience: Arc<RecordingAwarder>,
    pub quests: Arc<RecordingQuests>,
    pub gate: Arc<ScriptedGate>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_awarder(RecordingAwarder::default()).await
    }

    pub async fn with_awarder(awarder: RecordingAwarder) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let user = User {
            id: UserId::new(),
            username: "alice".to_owned(),
        };
        store.insert_user(PLATFORM, PLATFORM_ID, user.clone()).await;

        let money = item(1, "money", "Coins", 1, false, &[]);
        let sword = item(2, "iron_sword", "Iron Sword", 100, true, &["Weapon"]);
        let potion = item(3, "health_potion", "Health Potion", 10, true, &["Consumable"]);
        let relic = item(4, "ancient_relic", "Ancient Relic", 500, false, &["Artifact"]);
        let pamphlet = item(5, "pamphlet", "Pamphlet", 0, true, &[]);
        for entry in [&money, &sword, &potion, &relic, &pamphlet] {
            store.insert_item(entry.clone()).await;
        }

        Self {
            config: EconomyConfig::default(),
            store,
            user,
            money,
            sword,
            potion,
            relic,
            pamphlet,
            experience: Arc::new(awarder),
            quests: Arc::new(RecordingQuests::default()),
            gate: Arc::new(ScriptedGate::default()),
        }
    }

    /// A fully wired service over this fixture.
    pub fn service(&self) -> EconomyService {
        let aliases = AliasResolver::from_items([
            &self.money,
            &self.sword,
            &self.potion,
            &self.relic,
            &self.pamphlet,
        ]);
        EconomyService::new(self.config.clone(), self.store.clone(), self.store.clone())
            .with_name_resolver(Arc::new(aliases))
            .with_unlock_gate(self.gate.clone())
            .with_experience_awarder(self.experience.clone())
            .with_quest_tracker(self.quests.clone())
    }

    pub fn request(&self, item_name: &str, quantity: i64) -> TradeRequest {
        TradeRequest::new(PLATFORM, PLATFORM_ID, "alice", item_name, quantity)
    }

    /// Overwrite the user's committed inventory.
    pub async fn stock(&self, holdings: &[(&Item, u64)]) {
        let slots = holdings
            .iter()
            .map(|(entry, quantity)| InventorySlot::common(entry.id, *quantity))
            .collect();
        self.store
            .put_inventory(Inventory::with_slots(self.user.id, slots))
            .await;
    }

    pub async fn inventory(&self) -> Inventory {
        self.store.inventory(self.user.id).await
    }

    pub async fn held(&self, entry: &Item) -> u64 {
        total_quantity(&self.inventory().await, entry.id)
    }
}
