//! Shop listings, sell price quotes and the weekly sale rotation.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::Fixture;
use rust_decimal_macros::dec;
use tradepost_economy::EconomyError;
use tradepost_types::WeeklySale;

const DRAIN: Duration = Duration::from_secs(5);

fn weapon_week() -> WeeklySale {
    WeeklySale {
        week_offset: 2,
        target_category: Some("weapon".to_owned()),
        discount_percent: dec!(25),
        description: "Blacksmith clearance".to_owned(),
    }
}

/// 2026-01-15 falls in ISO week 3, offset 2 of a four-week rotation.
fn third_week() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
}

fn fixed_clock(at: DateTime<Utc>) -> tradepost_economy::Clock {
    Arc::new(move || at)
}

#[tokio::test]
async fn sellable_prices_exclude_money_and_locked_items() {
    let fx = Fixture::new().await;
    fx.gate.lock_item("ancient_relic");
    let service = fx.service();

    let prices = service.sellable_prices().await.unwrap();
    let mut quoted: Vec<(String, u64)> = prices
        .into_iter()
        .map(|priced| (priced.item.internal_name, priced.sell_price))
        .collect();
    quoted.sort();
    assert_eq!(
        quoted,
        vec![
            ("health_potion".to_owned(), 4),
            ("iron_sword".to_owned(), 40),
            ("pamphlet".to_owned(), 0),
        ]
    );
}

#[tokio::test]
async fn sellable_prices_apply_the_economy_bonus() {
    let fx = Fixture::new().await;
    fx.gate.set_bonus(dec!(1.25));
    let service = fx.service();

    let prices = service.sellable_prices().await.unwrap();
    let sword = prices
        .iter()
        .find(|priced| priced.item.internal_name == "iron_sword")
        .unwrap();
    assert_eq!(sword.sell_price, 50);
}

#[tokio::test]
async fn buyable_items_respect_unlocks() {
    let fx = Fixture::new().await;
    fx.gate.lock_item("health_potion");
    let service = fx.service();

    let mut names: Vec<String> = service
        .buyable_items()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.internal_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["iron_sword".to_owned(), "pamphlet".to_owned()]);
}

#[tokio::test]
async fn listing_fails_when_batch_unlock_check_fails() {
    let fx = Fixture::new().await;
    fx.gate.fail_items.store(true, Ordering::Release);
    let service = fx.service();

    let err = service.buyable_items().await.unwrap_err();
    assert!(matches!(err, EconomyError::UnlockCheckFailed { .. }));
    let err = service.sellable_prices().await.unwrap_err();
    assert!(matches!(err, EconomyError::UnlockCheckFailed { .. }));
}

#[tokio::test]
async fn weekly_sale_discounts_matching_category() {
    let mut fx = Fixture::new().await;
    fx.config.weekly_sales = vec![weapon_week()];
    fx.stock(&[(&fx.money, 100)]).await;
    let service = fx.service().with_clock(fixed_clock(third_week()));

    assert_eq!(
        service.active_sale().await.unwrap().description,
        "Blacksmith clearance"
    );
    let bought = service.buy(&fx.request("iron_sword", 2)).await.unwrap();
    // 25% off 100 is 75 each; 100 coins only covers one.
    assert_eq!(bought, 1);
    assert_eq!(fx.held(&fx.money).await, 25);

    // Other categories pay full price.
    service.buy(&fx.request("health_potion", 1)).await.unwrap();
    assert_eq!(fx.held(&fx.money).await, 15);
    service.shutdown(DRAIN).await.unwrap();
}

#[tokio::test]
async fn weekly_sale_only_applies_in_its_week() {
    let mut fx = Fixture::new().await;
    fx.config.weekly_sales = vec![weapon_week()];
    fx.stock(&[(&fx.money, 100)]).await;
    let next_week = Utc.with_ymd_and_hms(2026, 1, 22, 9, 0, 0).unwrap();
    let service = fx.service().with_clock(fixed_clock(next_week));

    assert!(service.active_sale().await.is_none());
    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    assert_eq!(fx.held(&fx.money).await, 0);
    service.shutdown(DRAIN).await.unwrap();
}

#[tokio::test]
async fn weekly_sale_requires_the_discount_feature() {
    let mut fx = Fixture::new().await;
    fx.config.weekly_sales = vec![weapon_week()];
    fx.stock(&[(&fx.money, 100)]).await;
    fx.gate.lock_feature("feature_weekly_discount");
    let service = fx.service().with_clock(fixed_clock(third_week()));

    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    assert_eq!(fx.held(&fx.money).await, 0);
    service.shutdown(DRAIN).await.unwrap();
}

#[tokio::test]
async fn replacing_the_rotation_takes_effect_immediately() {
    let fx = Fixture::new().await;
    fx.stock(&[(&fx.money, 100)]).await;
    let service = fx.service().with_clock(fixed_clock(third_week()));
    assert!(service.active_sale().await.is_none());

    service
        .replace_weekly_sales(vec![WeeklySale {
            week_offset: 2,
            target_category: None,
            discount_percent: dec!(50),
            description: "Everything half off".to_owned(),
        }])
        .await;

    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    assert_eq!(fx.held(&fx.money).await, 50);
    service.shutdown(DRAIN).await.unwrap();
}
