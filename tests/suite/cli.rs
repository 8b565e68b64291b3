//! End-to-end runs of the `milestone` binary.

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{
    ALICE, CONTRACT, VESTED, allocation, kupo_match, milestone, mount_matches, oracles, schedule,
    signature, start_kupo_mock, stdout_json, write_json,
};

#[test]
fn register_prints_datum_and_total() {
    let dir = tempfile::tempdir().unwrap();
    let allocations = dir.path().join("allocations.json");
    write_json(
        &allocations,
        &serde_json::to_value(vec![
            allocation(ALICE, 600, "m-1", VESTED),
            allocation(ALICE, 400, "m-2", VESTED),
        ])
        .unwrap(),
    );

    let output = milestone(
        dir.path(),
        &[
            "register-milestone",
            "--token-policy-id",
            "abc123",
            "--beneficiary-allocations",
            allocations.to_str().unwrap(),
            "--oracle-addresses",
            "addr_test1qoracle1, addr_test1qoracle2",
            "--quorum-threshold",
            "2",
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let body = stdout_json(&output);
    assert_eq!(body["total_token_amount"], 1_000);
    assert_eq!(body["datum"]["total_oracles"], 2);
    assert_eq!(body["datum"]["beneficiary_allocations"][1]["claimed"], false);
    assert_eq!(body["contract_address"], serde_json::Value::Null);
}

#[test]
fn register_reports_every_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let allocations = dir.path().join("allocations.json");
    write_json(
        &allocations,
        &json!([{
            "beneficiary_address": "bogus",
            "token_amount": 0,
            "milestone_identifier": "m-1",
            "vesting_timestamp": VESTED,
        }]),
    );

    let output = milestone(
        dir.path(),
        &[
            "register-milestone",
            "--token-policy-id",
            "abc123",
            "--beneficiary-allocations",
            allocations.to_str().unwrap(),
            "--oracle-addresses",
            "addr_test1qoracle1",
            "--quorum-threshold",
            "3",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let body = stdout_json(&output);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["errors"],
        json!([
            "Quorum threshold (3) exceeds oracle count (1)",
            "Invalid beneficiary address format at index 0: bogus",
            "Token amount must be positive at index 0: 0",
        ])
    );
}

#[test]
fn commit_accumulates_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let oracles = oracles(3);
    let first = dir.path().join("first.json");
    write_json(&first, &signature(&oracles[0]));
    let second = dir.path().join("second.json");
    write_json(&second, &json!([signature(&oracles[0]), signature(&oracles[1])]));

    let missing_params = milestone(
        dir.path(),
        &["commit-milestone", "--milestone-identifier", "m-1", "--oracle-signatures", first.to_str().unwrap()],
    );
    assert_eq!(missing_params.status.code(), Some(1));
    assert!(
        stdout_json(&missing_params)["error"]
            .as_str()
            .unwrap()
            .contains("quorum_threshold and total_oracles are required")
    );

    let output = milestone(
        dir.path(),
        &[
            "commit-milestone",
            "--milestone-identifier",
            "m-1",
            "--oracle-signatures",
            first.to_str().unwrap(),
            "--quorum-threshold",
            "2",
            "--total-oracles",
            "3",
        ],
    );
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["quorum_status"], "pending");
    assert_eq!(body["signature_count"], 1);

    let output = milestone(
        dir.path(),
        &["commit-milestone", "--milestone-identifier", "m-1", "--oracle-signatures", second.to_str().unwrap()],
    );
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["signature_count"], 2);
    assert_eq!(body["total_signatures"], 2);
    assert_eq!(body["quorum_status"], "met");
    assert_eq!(body["quorum_met"], true);
    assert!(body["verification_timestamp"].is_i64());

    assert!(dir.path().join("milestones").join("m-1.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn check_status_uses_cache_on_second_run() {
    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule(), "tx-publish")])).await;
    let dir = tempfile::tempdir().unwrap();
    let uri = server.uri();

    let args = [
        "check-status",
        "--contract-address",
        CONTRACT,
        "--kupo-url",
        uri.as_str(),
    ];

    let first = milestone(dir.path(), &args);
    assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
    let body = stdout_json(&first);
    assert_eq!(body["contract_address"], CONTRACT);
    assert_eq!(body["cache_info"]["used_cache"], false);
    assert_eq!(body["milestones"]["m-1"]["quorum_status"], "unknown");
    assert_eq!(body["milestones"]["m-1"]["claimable"], false);
    assert_eq!(body["milestones"]["m-2"]["vesting_passed"], false);

    let second = milestone(dir.path(), &args);
    assert!(second.status.success());
    assert_eq!(stdout_json(&second)["cache_info"]["used_cache"], true);

    let unknown = milestone(
        dir.path(),
        &[
            "check-status",
            "--contract-address",
            CONTRACT,
            "--kupo-url",
            uri.as_str(),
            "--milestone-identifier",
            "m-404",
        ],
    );
    assert_eq!(unknown.status.code(), Some(1));
}

#[tokio::test(flavor = "multi_thread")]
async fn calculate_distribution_reflects_committed_quorum() {
    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule(), "tx-publish")])).await;
    let dir = tempfile::tempdir().unwrap();
    let uri = server.uri();

    let oracles = oracles(3);
    let signatures = dir.path().join("signatures.json");
    write_json(&signatures, &json!([signature(&oracles[0]), signature(&oracles[2])]));
    let committed = milestone(
        dir.path(),
        &[
            "commit-milestone",
            "--milestone-identifier",
            "m-1",
            "--oracle-signatures",
            signatures.to_str().unwrap(),
            "--quorum-threshold",
            "2",
            "--total-oracles",
            "3",
        ],
    );
    assert!(committed.status.success());

    let output = milestone(
        dir.path(),
        &[
            "calculate-distribution",
            "--contract-address",
            CONTRACT,
            "--beneficiary-address",
            ALICE,
            "--kupo-url",
            uri.as_str(),
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let body = stdout_json(&output);
    assert_eq!(body["beneficiary_address"], ALICE);
    assert_eq!(body["total_amount"], 1_600);
    assert_eq!(body["claimed_amount"], 0);
    assert_eq!(body["claimable_amount"], 600);
    assert_eq!(body["locked_amount"], 1_000);
    assert_eq!(body["allocations"][0]["quorum_met"], true);
    assert_eq!(body["allocations"][1]["quorum_met"], false);
}

#[test]
fn init_reports_unreachable_services_and_protocol_magic() {
    let dir = tempfile::tempdir().unwrap();
    let output = milestone(
        dir.path(),
        &[
            "init",
            "--network",
            "preprod",
            "--kupo-url",
            "http://127.0.0.1:9",
            "--ogmios-url",
            "ws://127.0.0.1:9",
        ],
    );

    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["status"], "partial");
    assert_eq!(body["network"], "preprod");
    assert_eq!(body["services"]["kupo"]["connected"], false);
    assert_eq!(body["services"]["ogmios"]["connected"], false);
    assert_eq!(body["services"]["cardano_node"]["connected"], false);
    assert_eq!(body["services"]["cardano_node"]["protocol_magic"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn distribution_error_names_the_beneficiary() {
    let server = start_kupo_mock().await;
    mount_matches(&server, CONTRACT, json!([kupo_match(&schedule(), "tx-publish")])).await;
    let dir = tempfile::tempdir().unwrap();
    let uri = server.uri();

    let output = milestone(
        dir.path(),
        &[
            "calculate-distribution",
            "--contract-address",
            CONTRACT,
            "--beneficiary-address",
            "addr_test1qnobody",
            "--kupo-url",
            uri.as_str(),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout_json(&output)["error"],
        "No allocations for beneficiary addr_test1qnobody"
    );
}
