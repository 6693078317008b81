//! Weekly sale rotation cache.
//!
//! The schedule is parsed elsewhere and handed over whole. Reads happen on
//! every purchase; replacements are rare. A reader/writer lock keeps readers
//! from ever seeing a half-replaced schedule.

use chrono::{DateTime, Datelike, Utc};
use tokio::sync::RwLock;
use tradepost_types::WeeklySale;

/// The current weekly sale rotation.
#[derive(Debug, Default)]
pub struct SaleSchedule {
    sales: RwLock<Vec<WeeklySale>>,
}

impl SaleSchedule {
    /// Create a schedule holding `sales`.
    pub fn new(sales: Vec<WeeklySale>) -> Self {
        Self {
            sales: RwLock::new(sales),
        }
    }

    /// Swap in a new rotation. Returns how many entries the old one had.
    pub async fn replace(&self, sales: Vec<WeeklySale>) -> usize {
        let count = sales.len();
        let previous = std::mem::replace(&mut *self.sales.write().await, sales).len();
        tracing::info!(previous, sales = count, "Weekly sale schedule replaced");
        previous
    }

    /// The sale active at `now` in a rotation of `rotation_weeks` weeks.
    ///
    /// The active entry is the one whose `week_offset` equals
    /// `(iso_week - 1) % rotation_weeks`. A zero-length rotation has no sale.
    pub async fn active_sale(&self, now: DateTime<Utc>, rotation_weeks: u32) -> Option<WeeklySale> {
        let offset = rotation_offset(now, rotation_weeks)?;
        self.sales
            .read()
            .await
            .iter()
            .find(|sale| sale.week_offset == offset)
            .cloned()
    }
}

/// Position of `now` within the rotation.
fn rotation_offset(now: DateTime<Utc>, rotation_weeks: u32) -> Option<u32> {
    now.iso_week()
        .week()
        .saturating_sub(1)
        .checked_rem(rotation_weeks)
}
