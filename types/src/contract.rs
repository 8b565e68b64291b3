//! On-chain distribution contract state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unspent output as reported by the chain indexer.
///
/// Every field defaults, since indexers omit fields during partial syncs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Utxo {
    pub transaction_id: String,
    pub output_index: u64,
    pub address: String,
    pub datum: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeneficiaryAllocationState {
    pub beneficiary_address: String,
    pub token_amount: u64,
    pub milestone_identifier: String,
    pub vesting_timestamp: i64,
    pub claimed: bool,
}

/// Snapshot of the contract as published on chain.
///
/// Snapshots are replaced wholesale on refresh; nothing merges into an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionContractState {
    pub contract_address: String,
    pub utxo_tx_hash: String,
    pub utxo_index: u64,
    /// The raw datum as fetched.
    pub datum: Value,
    #[serde(default)]
    pub total_token_amount: u64,
    #[serde(default)]
    pub token_policy_id: String,
    #[serde(default)]
    pub beneficiary_allocations: Vec<BeneficiaryAllocationState>,
    #[serde(default)]
    pub oracle_addresses: Vec<String>,
    #[serde(default)]
    pub quorum_threshold: u64,
    #[serde(default)]
    pub total_oracles: u64,
    /// Tokens not yet claimed.
    #[serde(default)]
    pub remaining_token_amount: u64,
}

impl DistributionContractState {
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.beneficiary_allocations
            .iter()
            .filter(|alloc| alloc.claimed)
            .count()
    }

    #[must_use]
    pub fn unclaimed_count(&self) -> usize {
        self.beneficiary_allocations.len() - self.claimed_count()
    }

    #[must_use]
    pub fn allocation_at(&self, index: usize) -> Option<&BeneficiaryAllocationState> {
        self.beneficiary_allocations.get(index)
    }

    /// Allocations that are unclaimed and past vesting. Quorum is not considered.
    #[must_use]
    pub fn claimable_allocations(&self, now: i64) -> Vec<&BeneficiaryAllocationState> {
        self.beneficiary_allocations
            .iter()
            .filter(|alloc| !alloc.claimed && alloc.vesting_timestamp <= now)
            .collect()
    }

    /// Distinct milestone ids in first-appearance order.
    #[must_use]
    pub fn milestone_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for alloc in &self.beneficiary_allocations {
            if !ids.contains(&alloc.milestone_identifier.as_str()) {
                ids.push(&alloc.milestone_identifier);
            }
        }
        ids
    }

    pub fn allocations_for<'a>(
        &'a self,
        milestone_identifier: &'a str,
    ) -> impl Iterator<Item = &'a BeneficiaryAllocationState> + 'a {
        self.beneficiary_allocations
            .iter()
            .filter(move |alloc| alloc.milestone_identifier == milestone_identifier)
    }
}

/// A contract snapshot as stored in the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedContractState {
    #[serde(flatten)]
    pub state: DistributionContractState,
    /// POSIX seconds at which the snapshot was written.
    pub cached_at: i64,
}
