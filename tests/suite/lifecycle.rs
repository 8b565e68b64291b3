//! Register, publish, reconcile, commit and aggregate against a mock Kupo.

use std::time::Duration;

use milestone_chain::KupoClient;
use milestone_core::{
    CoreError, Ledger, RefreshPolicy, StateCache, StateResolver, StatusAggregator,
    calculate_distribution, validate_schedule,
};
use milestone_types::{MilestoneQuorum, QuorumStatus, SignatureSubmission};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{
    ALICE, BOB, CONTRACT, kupo_match, mount_matches, oracles, schedule, signature, start_kupo_mock,
};

fn submissions(oracles: &[String]) -> Vec<SignatureSubmission> {
    oracles
        .iter()
        .map(|oracle| serde_json::from_value(signature(oracle)).expect("submission"))
        .collect()
}

#[tokio::test]
async fn quorum_unlocks_vested_allocations_only() {
    let schedule = schedule();
    assert!(validate_schedule(&schedule).is_empty());

    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule, "tx-publish")])).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let ledger = Ledger::open(dir.path().join("milestones")).expect("ledger");
    let cache = StateCache::open(dir.path().join("cache")).expect("cache");
    let kupo = KupoClient::new(&server.uri(), Duration::from_secs(5)).expect("kupo");

    let resolved = StateResolver::new(&kupo, &cache)
        .resolve(CONTRACT, RefreshPolicy::default())
        .await
        .expect("contract state");
    assert!(!resolved.used_cache);
    assert_eq!(resolved.state.total_token_amount, 2_000);
    assert_eq!(resolved.state.quorum_threshold, 2);

    let before = StatusAggregator::new(&ledger)
        .aggregate(&resolved.state, None)
        .expect("status");
    assert_eq!(before.milestones["m-1"].quorum_status, MilestoneQuorum::Unknown);
    assert!(!before.milestones["m-1"].claimable);

    let oracles = oracles(3);
    let record = ledger
        .commit("m-1", &submissions(&oracles[..1]), Some(2), Some(3))
        .expect("first commit");
    assert_eq!(record.quorum_status(), QuorumStatus::Pending);
    let record = ledger
        .commit("m-1", &submissions(&oracles[1..2]), None, None)
        .expect("second commit");
    assert_eq!(record.quorum_status(), QuorumStatus::Met);

    let after = StatusAggregator::new(&ledger)
        .aggregate(&resolved.state, None)
        .expect("status");
    let m1 = &after.milestones["m-1"];
    assert!(m1.claimable);
    assert_eq!(m1.signature_count, 2);
    assert_eq!(m1.total_amount, 1_000);
    let m2 = &after.milestones["m-2"];
    assert!(!m2.vesting_passed);
    assert!(!m2.claimable);

    let alice = calculate_distribution(&resolved.state, &ledger, ALICE, None).expect("alice");
    assert_eq!(alice.total_amount, 1_600);
    assert_eq!(alice.claimable_amount, 600);
    assert_eq!(alice.locked_amount, 1_000);

    let bob = calculate_distribution(&resolved.state, &ledger, BOB, Some("m-1")).expect("bob");
    assert_eq!(bob.claimable_amount, 400);
}

#[tokio::test]
async fn cached_state_survives_indexer_outage() {
    let schedule = schedule();
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = StateCache::open(dir.path().join("cache")).expect("cache");

    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule, "tx-publish")])).await;
    let kupo = KupoClient::new(&server.uri(), Duration::from_secs(5)).expect("kupo");
    StateResolver::new(&kupo, &cache)
        .resolve(CONTRACT, RefreshPolicy::default())
        .await
        .expect("initial fetch");

    let down = KupoClient::new(&server.uri(), Duration::from_secs(5))
        .expect("kupo")
        .with_retry(milestone_chain::retry::RetryConfig::no_retries());
    server.reset().await;

    let expired = RefreshPolicy {
        force: false,
        max_age: Duration::ZERO,
    };
    let resolved = StateResolver::new(&down, &cache)
        .resolve(CONTRACT, expired)
        .await
        .expect("falls back to cache");
    assert!(resolved.used_cache);
    assert_eq!(resolved.state.utxo_tx_hash, "tx-publish");

    let forced = RefreshPolicy {
        force: true,
        ..expired
    };
    assert!(
        StateResolver::new(&down, &cache)
            .resolve(CONTRACT, forced)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn unknown_milestone_is_reported_as_not_found() {
    let schedule = schedule();
    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule, "tx")])).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let ledger = Ledger::open(dir.path().join("milestones")).expect("ledger");
    let cache = StateCache::open(dir.path().join("cache")).expect("cache");
    let kupo = KupoClient::new(&server.uri(), Duration::from_secs(5)).expect("kupo");

    let resolved = StateResolver::new(&kupo, &cache)
        .resolve(CONTRACT, RefreshPolicy::default())
        .await
        .expect("state");
    let err = StatusAggregator::new(&ledger)
        .aggregate(&resolved.state, Some("m-404"))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { ref milestone_id } if milestone_id == "m-404"));
}
