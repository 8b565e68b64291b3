//! Aggregated claimability reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::QuorumStatus;

/// Quorum status as surfaced in reports; `unknown` when no ledger record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneQuorum {
    Pending,
    Met,
    Exceeded,
    Unknown,
}

impl From<QuorumStatus> for MilestoneQuorum {
    fn from(status: QuorumStatus) -> Self {
        match status {
            QuorumStatus::Pending => Self::Pending,
            QuorumStatus::Met => Self::Met,
            QuorumStatus::Exceeded => Self::Exceeded,
        }
    }
}

impl MilestoneQuorum {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Met => "met",
            Self::Exceeded => "exceeded",
            Self::Unknown => "unknown",
        }
    }
}

/// Claimability verdict for one milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneStatus {
    pub allocation_count: usize,
    pub total_amount: u64,
    pub claimed_amount: u64,
    pub unclaimed_amount: u64,
    /// True iff every allocation of the milestone has vested.
    pub vesting_passed: bool,
    pub earliest_vesting: i64,
    pub quorum_status: MilestoneQuorum,
    pub quorum_met: bool,
    pub signature_count: u64,
    pub quorum_threshold: u64,
    pub verification_timestamp: Option<i64>,
    pub claimable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub contract_address: String,
    pub milestones: BTreeMap<String, MilestoneStatus>,
}

/// One of a beneficiary's allocations with its release verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDistribution {
    /// Position in the contract's allocation list.
    pub index: usize,
    pub milestone_identifier: String,
    pub token_amount: u64,
    pub vesting_timestamp: i64,
    pub claimed: bool,
    pub quorum_met: bool,
    pub claimable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub contract_address: String,
    pub beneficiary_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_identifier: Option<String>,
    pub allocations: Vec<AllocationDistribution>,
    pub total_amount: u64,
    pub claimed_amount: u64,
    pub claimable_amount: u64,
    /// Neither claimed nor currently claimable.
    pub locked_amount: u64,
}
