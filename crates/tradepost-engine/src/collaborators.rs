//! Local stand-ins for the job and quest services.
//!
//! The engine runs without the external progression stack, so merchant
//! experience and quest progress are kept in process and reported through
//! logs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tradepost_economy::{CollaboratorError, ExperienceAwarder, QuestTracker};
use tradepost_types::{UserId, XpAwardResult};

/// Experience needed per job level.
const XP_PER_LEVEL: u64 = 100;

/// In-process job ledger: total experience per user and job.
#[derive(Debug, Default)]
pub struct MerchantJobs {
    totals: Mutex<HashMap<(UserId, String), u64>>,
}

impl MerchantJobs {
    /// Total experience `user_id` has earned in `job`.
    pub async fn experience(&self, user_id: UserId, job: &str) -> u64 {
        self.totals
            .lock()
            .await
            .get(&(user_id, job.to_owned()))
            .copied()
            .unwrap_or(0)
    }
}

const fn level_for(experience: u64) -> u64 {
    match experience.checked_div(XP_PER_LEVEL) {
        Some(level) => level.saturating_add(1),
        None => 1,
    }
}

#[async_trait]
impl ExperienceAwarder for MerchantJobs {
    async fn award_experience(
        &self,
        user_id: UserId,
        source_key: &str,
        amount: u64,
        reason: &str,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<XpAwardResult, CollaboratorError> {
        let mut totals = self.totals.lock().await;
        let total = totals.entry((user_id, source_key.to_owned())).or_insert(0);
        let before = level_for(*total);
        *total = total.saturating_add(amount);
        let after = level_for(*total);

        debug!(
            user_id = %user_id,
            job = source_key,
            amount,
            reason,
            metadata = ?metadata,
            total = *total,
            "Experience awarded"
        );
        Ok(XpAwardResult {
            leveled_up: after > before,
            new_level: u32::try_from(after).unwrap_or(u32::MAX),
        })
    }
}

/// Quest tracker that only logs progress.
#[derive(Debug, Default)]
pub struct QuestLog;

#[async_trait]
impl QuestTracker for QuestLog {
    async fn on_item_sold(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
        value: u64,
    ) -> Result<(), CollaboratorError> {
        info!(user_id = %user_id, category, quantity, value, "Quest progress: item sold");
        Ok(())
    }

    async fn on_item_bought(
        &self,
        user_id: UserId,
        category: &str,
        quantity: u64,
    ) -> Result<(), CollaboratorError> {
        info!(user_id = %user_id, category, quantity, "Quest progress: item bought");
        Ok(())
    }
}
