//! Conversion between schedules, datums, and contract state.
//!
//! Encoding is total. Decoding is best-effort: indexers may omit fields during
//! partial syncs, so absent numbers decode as zero and absent strings as empty.
//! A datum that is not a distribution datum at all decodes to `None`.

use milestone_types::{
    BeneficiaryAllocationState, DistributionContractState, DistributionDatum, MilestoneSchedule,
    ParsedDatum, Utxo,
};
use serde_json::{Map, Value};

/// Build the on-chain datum for a validated schedule. Every allocation starts unclaimed.
#[must_use]
pub fn encode_datum(schedule: &MilestoneSchedule) -> DistributionDatum {
    let beneficiary_allocations = schedule
        .beneficiary_allocations
        .iter()
        .map(|alloc| BeneficiaryAllocationState {
            beneficiary_address: alloc.beneficiary_address.clone(),
            token_amount: u64::try_from(alloc.token_amount).unwrap_or_default(),
            milestone_identifier: alloc.milestone_identifier.clone(),
            vesting_timestamp: alloc.vesting_timestamp,
            claimed: false,
        })
        .collect();

    DistributionDatum {
        token_policy_id: schedule.token_policy_id.clone(),
        beneficiary_allocations,
        oracle_addresses: schedule.oracle_addresses.clone(),
        quorum_threshold: u64::try_from(schedule.quorum_threshold).unwrap_or_default(),
        total_oracles: schedule.oracle_addresses.len() as u64,
        metadata: schedule.contract_metadata.clone(),
    }
}

/// Classify a fetched datum and extract the distribution fields if present.
#[must_use]
pub fn parse_datum(datum: Option<&Value>) -> ParsedDatum {
    let obj = match datum {
        None | Some(Value::Null) => return ParsedDatum::Absent,
        Some(Value::String(cbor)) => return ParsedDatum::Cbor(cbor.clone()),
        Some(Value::Object(obj)) => obj,
        Some(_) => return ParsedDatum::Unrecognized,
    };

    let Some(Value::Array(raw_allocations)) = obj.get("beneficiary_allocations") else {
        return match obj.get("cbor") {
            Some(Value::String(cbor)) => ParsedDatum::Cbor(cbor.clone()),
            _ => ParsedDatum::Unrecognized,
        };
    };

    let beneficiary_allocations = raw_allocations
        .iter()
        .filter_map(Value::as_object)
        .map(|alloc| BeneficiaryAllocationState {
            beneficiary_address: str_field(alloc, "beneficiary_address"),
            token_amount: u64_field(alloc, "token_amount"),
            milestone_identifier: str_field(alloc, "milestone_identifier"),
            vesting_timestamp: alloc
                .get("vesting_timestamp")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            claimed: alloc
                .get("claimed")
                .and_then(Value::as_bool)
                .unwrap_or_default(),
        })
        .collect();

    let oracle_addresses = obj
        .get("oracle_addresses")
        .and_then(Value::as_array)
        .map(|addrs| {
            addrs
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    ParsedDatum::Distribution(DistributionDatum {
        token_policy_id: str_field(obj, "token_policy_id"),
        beneficiary_allocations,
        oracle_addresses,
        quorum_threshold: u64_field(obj, "quorum_threshold"),
        total_oracles: u64_field(obj, "total_oracles"),
        metadata: obj.get("metadata").and_then(Value::as_object).cloned(),
    })
}

/// Decode a fetched UTXO into contract state.
///
/// Returns `None` when the output carries no distribution datum; callers treat
/// that as "not our contract", not as an error.
#[must_use]
pub fn decode_utxo(utxo: &Utxo) -> Option<DistributionContractState> {
    let datum = parse_datum(utxo.datum.as_ref()).into_distribution()?;
    let total_token_amount = datum.total_token_amount();
    let remaining_token_amount = datum.remaining_token_amount();

    Some(DistributionContractState {
        contract_address: utxo.address.clone(),
        utxo_tx_hash: utxo.transaction_id.clone(),
        utxo_index: utxo.output_index,
        datum: utxo.datum.clone().unwrap_or(Value::Null),
        total_token_amount,
        token_policy_id: datum.token_policy_id,
        beneficiary_allocations: datum.beneficiary_allocations,
        oracle_addresses: datum.oracle_addresses,
        quorum_threshold: datum.quorum_threshold,
        total_oracles: datum.total_oracles,
        remaining_token_amount,
    })
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_field(obj: &Map<String, Value>, key: &str) -> u64 {
    obj.get(key).and_then(Value::as_u64).unwrap_or_default()
}
