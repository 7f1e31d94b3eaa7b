//! Operation semantics of the key ledger

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use keygate_ledger::{
    ConfigUpdate, EligibilityMode, KeyLedger, LedgerError, ManualClock, StoreLayout,
};
use std::sync::Arc;
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    "2025-11-01T22:22:00Z".parse().unwrap()
}

async fn open(dir: &TempDir) -> (KeyLedger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let ledger = KeyLedger::open(StoreLayout::in_dir(dir.path()), clock.clone())
        .await
        .unwrap();
    (ledger, clock)
}

#[tokio::test]
async fn claim_revoke_reclaim_scenario() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.add_keys(["K1", "K2"]).await.unwrap();

    assert_eq!(ledger.claim("alice").await.unwrap().as_deref(), Some("K1"));
    assert_eq!(ledger.list_pool(), vec!["K2"]);

    assert_eq!(ledger.claim("alice").await.unwrap(), None);
    assert_eq!(ledger.list_pool(), vec!["K2"]);

    assert_eq!(
        ledger.revoke_claim("alice", true).await.unwrap().as_deref(),
        Some("K1")
    );
    assert_eq!(ledger.list_pool(), vec!["K1", "K2"]);
    assert!(!ledger.has_claimed("alice"));

    assert_eq!(ledger.claim("bob").await.unwrap().as_deref(), Some("K1"));
    assert_eq!(ledger.list_pool(), vec!["K2"]);
}

#[tokio::test]
async fn claims_are_fifo_and_stamped() {
    let dir = TempDir::new().unwrap();
    let (ledger, clock) = open(&dir).await;
    ledger.add_keys(["K1", "K2", "K3"]).await.unwrap();

    ledger.claim("a").await.unwrap();
    clock.advance(Duration::seconds(90));
    ledger.claim("b").await.unwrap();

    let a = ledger.get_claim("a").unwrap();
    let b = ledger.get_claim("b").unwrap();
    assert_eq!((a.key.as_str(), a.claimed_at), ("K1", t0()));
    assert_eq!((b.key.as_str(), b.claimed_at), ("K2", t0() + Duration::seconds(90)));
    assert_eq!(ledger.available_count(), 1);

    let order: Vec<String> = ledger
        .list_claims()
        .iter()
        .map(|(id, _)| id.to_string())
        .collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[tokio::test]
async fn claim_on_empty_pool_is_empty() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;

    assert_eq!(ledger.claim("alice").await.unwrap(), None);
    assert!(!ledger.has_claimed("alice"));
}

#[tokio::test]
async fn add_keys_is_idempotent_and_never_repools_claimed_keys() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;

    assert_eq!(ledger.add_keys(["K1", "K2"]).await.unwrap(), 2);
    assert_eq!(ledger.add_keys(["K1", "K2"]).await.unwrap(), 0);
    assert_eq!(ledger.list_pool(), vec!["K1", "K2"]);

    ledger.claim("alice").await.unwrap();
    assert_eq!(ledger.add_keys(["K1", "K3"]).await.unwrap(), 1);
    assert_eq!(ledger.list_pool(), vec!["K2", "K3"]);
}

#[tokio::test]
async fn revoke_without_return_discards_the_key() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.add_keys(["K1", "K2"]).await.unwrap();
    ledger.claim("alice").await.unwrap();

    assert_eq!(
        ledger.revoke_claim("alice", false).await.unwrap().as_deref(),
        Some("K1")
    );
    assert_eq!(ledger.list_pool(), vec!["K2"]);
    assert_eq!(ledger.revoke_claim("alice", true).await.unwrap(), None);
}

#[tokio::test]
async fn revoked_manual_assignment_goes_to_pool_head() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.assign_key_to_user("carol", "K9").await.unwrap();
    ledger.add_keys(["K1"]).await.unwrap();

    ledger.revoke_claim("carol", true).await.unwrap();
    ledger.revoke_claim("carol", true).await.unwrap();

    assert_eq!(ledger.list_pool(), vec!["K9", "K1"]);
}

#[tokio::test]
async fn assign_key_outside_pool_then_reject_second_holder() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.add_keys(["K1"]).await.unwrap();

    assert!(ledger.assign_key_to_user("carol", "K9").await.unwrap());
    assert_eq!(ledger.get_claim("carol").unwrap().key, "K9");
    assert_eq!(ledger.list_pool(), vec!["K1"]);

    assert!(!ledger.assign_key_to_user("dave", "K9").await.unwrap());
    assert!(!ledger.has_claimed("dave"));
    assert_eq!(ledger.holder_of("K9").as_deref(), Some("carol"));
}

#[tokio::test]
async fn assign_pooled_key_moves_it_out_of_the_pool() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.add_keys(["K1", "K2", "K3"]).await.unwrap();

    assert!(ledger.assign_key_to_user("erin", "K2").await.unwrap());

    assert_eq!(ledger.list_pool(), vec!["K1", "K3"]);
    assert!(!ledger.assign_key_to_user("erin", "K3").await.unwrap());
    assert_eq!(ledger.list_pool(), vec!["K1", "K3"]);
}

#[tokio::test]
async fn remove_key_strips_pool_and_claims() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;
    ledger.add_keys(["K1", "K2"]).await.unwrap();
    ledger.claim("alice").await.unwrap();

    assert!(ledger.remove_key("K1").await.unwrap());
    assert!(!ledger.has_claimed("alice"));
    assert_eq!(ledger.list_pool(), vec!["K2"]);

    assert!(ledger.remove_key("K2").await.unwrap());
    assert!(ledger.list_pool().is_empty());

    assert!(!ledger.remove_key("K2").await.unwrap());
}

#[tokio::test]
async fn set_config_is_partial_and_atomic() {
    let dir = TempDir::new().unwrap();
    let (ledger, _) = open(&dir).await;

    ledger
        .set_config(ConfigUpdate::new().min_days(14))
        .await
        .unwrap();
    assert_eq!(ledger.get_config().min_days, 14);
    assert_eq!(ledger.get_config().mode, EligibilityMode::Account);

    ledger.set_config(ConfigUpdate::new().mode("guild")).await.unwrap();
    assert_eq!(ledger.get_config().min_days, 14);
    assert_eq!(ledger.get_config().mode, EligibilityMode::Guild);

    let err = ledger
        .set_config(ConfigUpdate::new().min_days(30).mode("invalid"))
        .await
        .unwrap_err();
    assert_matches!(err, LedgerError::InvalidArgument { field: "mode", .. });
    assert_eq!(ledger.get_config().min_days, 14);
    assert_eq!(ledger.get_config().mode, EligibilityMode::Guild);
}

#[tokio::test]
async fn record_request_overwrites_regardless_of_outcome() {
    let dir = TempDir::new().unwrap();
    let (ledger, clock) = open(&dir).await;

    assert_eq!(ledger.last_request("alice"), None);
    ledger.record_request("alice").await.unwrap();
    assert_eq!(ledger.last_request("alice"), Some(t0()));

    clock.advance(Duration::hours(1));
    ledger.record_request("alice").await.unwrap();
    assert_eq!(ledger.last_request("alice"), Some(t0() + Duration::hours(1)));
    assert!(!ledger.has_claimed("alice"));
}
