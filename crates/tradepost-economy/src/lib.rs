//! Economy transaction engine for Tradepost.
//!
//! Players buy items from the shop with the `money` item and sell items
//! back for it. Each trade is one serializable storage transaction; the
//! inventory is mutated in memory and written back whole before commit.
//! Experience and quest updates for a committed trade run in the
//! background and are tracked so shutdown can wait for them.
//!
//! # Modules
//!
//! - [`service`] -- [`EconomyService`]: buy, sell, listings, lifecycle
//! - [`resolve`] -- Item name resolution and purchase eligibility
//! - [`pricing`] -- Sell ratio, affordability, weekly discounts, merchant XP
//! - [`sales`] -- Weekly sale rotation cache
//! - [`tasks`] -- Background task ledger
//! - [`ports`] -- Storage, catalog and collaborator traits
//! - [`memory`] -- In-memory reference backend
//! - [`config`] -- YAML configuration with environment overrides
//! - [`error`] -- Error types

pub mod config;
pub mod error;
pub mod memory;
pub mod ports;
pub mod pricing;
pub mod resolve;
pub mod sales;
pub mod service;
pub mod tasks;

pub use config::{ConfigError, EconomyConfig};
pub use error::EconomyError;
pub use memory::{AliasResolver, FailPoint, InMemoryStore};
pub use ports::{
    Catalog, CollaboratorError, EconomyStore, EconomyTx, ExperienceAwarder, NameResolver,
    QuestTracker, StoreError, UnlockGate,
};
pub use sales::SaleSchedule;
pub use service::{Clock, EconomyService, RandomSource, SaleOutcome, TradeRequest};
pub use tasks::TaskLedger;
