//! Concurrency and shutdown behaviour.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, RecordingAwarder};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tradepost_economy::EconomyError;

#[tokio::test]
async fn concurrent_trades_serialize() {
    let fx = Fixture::new().await;
    fx.stock(&[(&fx.money, 1_000)]).await;
    let service = fx.service();

    let requests: Vec<_> = (0..20).map(|_| fx.request("health_potion", 1)).collect();
    let results = join_all(requests.iter().map(|request| service.buy(request))).await;
    assert!(results.iter().all(|r| matches!(r, Ok(1))));
    assert_eq!(fx.held(&fx.money).await, 800);
    assert_eq!(fx.held(&fx.potion).await, 20);

    let results = join_all(requests.iter().take(10).map(|request| service.sell(request))).await;
    assert!(results.iter().all(|r| r.as_ref().unwrap().quantity_sold == 1));
    assert_eq!(fx.held(&fx.money).await, 840);
    assert_eq!(fx.held(&fx.potion).await, 10);

    service.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(service.outstanding_tasks(), 0);
    assert_eq!(fx.experience.calls().len(), 30);
    assert_eq!(fx.quests.bought.lock().unwrap().len(), 20);
    assert_eq!(fx.quests.sold.lock().unwrap().len(), 10);
    assert_eq!(fx.store.begin_count(), 30);
}

#[tokio::test]
async fn competing_buys_never_overspend() {
    let fx = Fixture::new().await;
    fx.stock(&[(&fx.money, 250)]).await;
    let service = fx.service();

    let requests: Vec<_> = (0..5).map(|_| fx.request("iron_sword", 1)).collect();
    let results = join_all(requests.iter().map(|request| service.buy(request))).await;
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 2);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, EconomyError::InsufficientFunds { .. }))
    );
    assert_eq!(fx.held(&fx.money).await, 50);
    assert_eq!(fx.held(&fx.sword).await, 2);
    service.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn shutdown_waits_for_slow_side_effects() {
    let latch = Arc::new(Semaphore::new(0));
    let fx = Fixture::with_awarder(RecordingAwarder::gated(Arc::clone(&latch))).await;
    fx.stock(&[(&fx.money, 100)]).await;
    let service = fx.service();

    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    assert!(service.outstanding_tasks() >= 1);

    let release = Arc::clone(&latch);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.add_permits(1);
    });

    service.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(service.outstanding_tasks(), 0);
    assert_eq!(fx.experience.calls().len(), 1);
}

#[tokio::test]
async fn shutdown_times_out_without_cancelling() {
    let latch = Arc::new(Semaphore::new(0));
    let fx = Fixture::with_awarder(RecordingAwarder::gated(Arc::clone(&latch))).await;
    fx.stock(&[(&fx.money, 100)]).await;
    let service = fx.service();

    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    let err = service
        .shutdown(Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::ShutdownTimedOut { outstanding: 1 }));

    // The award was still pending, not dropped.
    latch.add_permits(1);
    service.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(fx.experience.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_trades_drain_to_zero() {
    let fx = Fixture::new().await;
    fx.stock(&[(&fx.money, 10_000), (&fx.potion, 500)]).await;
    let service = Arc::new(fx.service());

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let service = Arc::clone(&service);
            let request = fx.request("health_potion", 1);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    service.buy(&request).await.map(|_| ())
                } else {
                    service.sell(&request).await.map(|_| ())
                }
            })
        })
        .collect();
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    service.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(service.outstanding_tasks(), 0);
    assert_eq!(fx.experience.calls().len(), 64);
    assert_eq!(fx.quests.bought.lock().unwrap().len(), 32);
    assert_eq!(fx.quests.sold.lock().unwrap().len(), 32);
    assert_eq!(fx.held(&fx.potion).await, 500);
    // 32 buys at 10, 32 sells at 4.
    assert_eq!(fx.held(&fx.money).await, 10_000 - 320 + 128);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_shutdown_callers_share_one_drain() {
    let latch = Arc::new(Semaphore::new(0));
    let fx = Fixture::with_awarder(RecordingAwarder::gated(Arc::clone(&latch))).await;
    fx.stock(&[(&fx.money, 100)]).await;
    let service = fx.service();

    service.buy(&fx.request("iron_sword", 1)).await.unwrap();
    assert!(service.outstanding_tasks() >= 1);

    let release = Arc::clone(&latch);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        release.add_permits(1);
    });

    let (impatient, patient, also_patient) = tokio::join!(
        service.shutdown(Duration::from_millis(10)),
        service.shutdown(Duration::from_secs(5)),
        service.shutdown(Duration::from_secs(5)),
    );
    assert!(matches!(
        impatient,
        Err(EconomyError::ShutdownTimedOut { outstanding }) if outstanding >= 1
    ));
    patient.unwrap();
    also_patient.unwrap();

    assert_eq!(service.outstanding_tasks(), 0);
    assert_eq!(fx.experience.calls().len(), 1);
    service.shutdown(Duration::from_millis(1)).await.unwrap();
}
