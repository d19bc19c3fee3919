//! Contract Test: Per-Record Serialization
//!
//! Constraints verified:
//! - Two reconciliations of the same record never overlap at the provider
//! - The queued caller sees the first caller's result and skips
//! - Different records are not serialized against each other

mod common;

use cflink_core::{ReconcileOutcome, RecordType};
use common::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn concurrent_reconciles_of_one_record_queue() {
    let h = Arc::new(Harness::new("5.6.7.8"));
    let record = h
        .seed("home.example.com", RecordType::A, "1.2.3.4", true, Some("1.2.3.4"))
        .await;
    h.provider.set_delay(Duration::from_millis(50));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile(&h.ctx, record.id).await })
    };
    let second = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile(&h.ctx, record.id).await })
    };

    let mut outcomes = vec![
        first.await.unwrap().unwrap(),
        second.await.unwrap().unwrap(),
    ];
    outcomes.sort_by_key(|o| matches!(o, ReconcileOutcome::Skipped { .. }));

    assert!(matches!(outcomes[0], ReconcileOutcome::Updated { .. }));
    assert!(matches!(outcomes[1], ReconcileOutcome::Skipped { .. }));
    assert_eq!(h.provider.content_update_calls(), 1);
    assert_eq!(h.provider.max_in_flight(), 1);
}

#[tokio::test]
async fn manual_reconcile_racing_a_batch_updates_once() {
    let h = Arc::new(Harness::new("5.6.7.8"));
    let record = h
        .seed("home.example.com", RecordType::A, "1.2.3.4", true, Some("1.2.3.4"))
        .await;
    h.provider.set_delay(Duration::from_millis(50));

    let batch = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile_all(&h.ctx).await })
    };
    let single = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile(&h.ctx, record.id).await })
    };

    batch.await.unwrap().unwrap();
    single.await.unwrap().unwrap();

    assert_eq!(h.provider.content_update_calls(), 1);
    assert_eq!(h.provider.max_in_flight(), 1);
}

#[tokio::test]
async fn different_records_run_independently() {
    let h = Arc::new(Harness::new("5.6.7.8"));
    let a = h
        .seed("a.example.com", RecordType::A, "1.2.3.4", true, None)
        .await;
    let b = h
        .seed("b.example.com", RecordType::A, "1.2.3.4", true, None)
        .await;
    h.provider.set_delay(Duration::from_millis(100));

    let ha = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile(&h.ctx, a.id).await })
    };
    let hb = {
        let h = h.clone();
        tokio::spawn(async move { h.reconciler.reconcile(&h.ctx, b.id).await })
    };

    ha.await.unwrap().unwrap();
    hb.await.unwrap().unwrap();

    assert_eq!(h.provider.content_update_calls(), 2);
    assert_eq!(h.provider.max_in_flight(), 2);
}
