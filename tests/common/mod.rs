//! Shared test utilities and fixtures
//!
//! A mock Kupo, schedule and signature builders, and a handle on the built
//! `milestone` binary.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use milestone_core::encode_datum;
use milestone_types::{BeneficiaryAllocation, MilestoneSchedule, OracleSignature};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CONTRACT: &str = "addr_test1wzcontract";
pub const ALICE: &str = "addr_test1qalice";
pub const BOB: &str = "addr_test1qbob";

/// Long past, so allocations are vested.
pub const VESTED: i64 = 1_700_000_000;
/// Far future, so allocations stay locked.
pub const UNVESTED: i64 = 4_000_000_000;

pub fn oracles(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("addr_test1qoracle{i}")).collect()
}

pub fn allocation(beneficiary: &str, amount: i64, milestone: &str, vesting: i64) -> BeneficiaryAllocation {
    BeneficiaryAllocation {
        beneficiary_address: beneficiary.to_string(),
        token_amount: amount,
        milestone_identifier: milestone.to_string(),
        vesting_timestamp: vesting,
    }
}

/// Two milestones: `m-1` vested for Alice and Bob, `m-2` unvested for Alice.
pub fn schedule() -> MilestoneSchedule {
    MilestoneSchedule {
        token_policy_id: "abc123".to_string(),
        beneficiary_allocations: vec![
            allocation(ALICE, 600, "m-1", VESTED),
            allocation(BOB, 400, "m-1", VESTED),
            allocation(ALICE, 1_000, "m-2", UNVESTED),
        ],
        oracle_addresses: oracles(3),
        quorum_threshold: 2,
        contract_metadata: None,
    }
}

pub fn signature(oracle: &str) -> Value {
    serde_json::to_value(OracleSignature {
        oracle_address: oracle.to_string(),
        signature: format!("sig-{oracle}"),
        signed_data: "6d696c6573746f6e65".to_string(),
        signature_timestamp: VESTED,
    })
    .expect("signature serializes")
}

/// One Kupo match carrying the encoded datum of `schedule`.
pub fn kupo_match(schedule: &MilestoneSchedule, tx: &str) -> Value {
    json!({
        "transaction_id": tx,
        "output_index": 0,
        "address": CONTRACT,
        "value": { "coins": 2_000_000 },
        "datum": encode_datum(schedule),
        "datum_type": "inline",
        "created_at": { "slot_no": 1, "header_hash": "00" },
        "spent_at": null,
    })
}

pub async fn start_kupo_mock() -> MockServer {
    MockServer::start().await
}

/// Serve `matches` for the unspent query at `address`.
pub async fn mount_matches(server: &MockServer, address: &str, matches: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/matches/{address}")))
        .and(query_param("unspent", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(matches))
        .mount(server)
        .await;
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).expect("json")).expect("write fixture");
}

/// Run the `milestone` binary with an isolated config and data directory.
pub fn milestone(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_milestone"))
        .arg("--config")
        .arg(data_dir.join("absent-config.toml"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("CARDANO_NETWORK")
        .env_remove("OGMIOS_URL")
        .env_remove("KUPO_URL")
        .env_remove("CARDANO_NODE_SOCKET")
        .env_remove("PROTOCOL_MAGIC")
        .env_remove("DATA_DIRECTORY")
        .env("RUST_LOG", "off")
        .output()
        .expect("run milestone binary")
}

pub fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    })
}
