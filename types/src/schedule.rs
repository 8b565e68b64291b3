//! Milestone schedules as proposed before publication.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on allocations per schedule; larger datums exceed the on-chain size budget.
pub const MAX_ALLOCATIONS: usize = 50;

/// A single beneficiary's share, released once its milestone is verified and vested.
///
/// Amounts are signed so a malformed input can be represented and reported by the
/// schedule validator instead of failing at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryAllocation {
    pub beneficiary_address: String,
    pub token_amount: i64,
    pub milestone_identifier: String,
    /// POSIX seconds.
    pub vesting_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSchedule {
    /// Policy id of the distributed token (hex).
    pub token_policy_id: String,
    pub beneficiary_allocations: Vec<BeneficiaryAllocation>,
    pub oracle_addresses: Vec<String>,
    pub quorum_threshold: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_metadata: Option<Map<String, Value>>,
}

impl MilestoneSchedule {
    /// Sum of all allocation amounts, saturating at `i64::MAX`.
    #[must_use]
    pub fn total_token_amount(&self) -> i64 {
        self.beneficiary_allocations
            .iter()
            .map(|alloc| alloc.token_amount)
            .fold(0, i64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::{BeneficiaryAllocation, MilestoneSchedule};

    #[test]
    fn total_token_amount_sums_allocations() {
        let alloc = |amount| BeneficiaryAllocation {
            beneficiary_address: "addr_test1qben".to_string(),
            token_amount: amount,
            milestone_identifier: "m-1".to_string(),
            vesting_timestamp: 1_735_689_600,
        };
        let schedule = MilestoneSchedule {
            token_policy_id: "abc123".to_string(),
            beneficiary_allocations: vec![alloc(1_000), alloc(2_500)],
            oracle_addresses: vec!["addr_test1qoracle".to_string()],
            quorum_threshold: 1,
            contract_metadata: None,
        };
        assert_eq!(schedule.total_token_amount(), 3_500);

        let huge = MilestoneSchedule {
            beneficiary_allocations: vec![alloc(i64::MAX), alloc(1)],
            ..schedule
        };
        assert_eq!(huge.total_token_amount(), i64::MAX);
    }

    #[test]
    fn metadata_is_optional_on_input() {
        let json = r#"{
            "token_policy_id": "abc",
            "beneficiary_allocations": [],
            "oracle_addresses": [],
            "quorum_threshold": 0
        }"#;
        let schedule: MilestoneSchedule = serde_json::from_str(json).unwrap();
        assert!(schedule.contract_metadata.is_none());
    }
}
