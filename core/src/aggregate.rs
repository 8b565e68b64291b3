//! Per-milestone claimability verdicts.
//!
//! Milestone ids are taken from the contract's allocations. Ledger records and
//! allocations correlate only by id, and the iteration is one-sided: a ledger
//! record whose id has no allocation is never visited, so every aggregated id
//! has at least one allocation to sum and take the minimum over.

use std::collections::{BTreeMap, HashMap};

use milestone_types::{
    DistributionContractState, MilestoneCompletionRecord, MilestoneQuorum, MilestoneStatus,
    StatusReport, total_amount,
};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::unix_now;

/// Where the aggregator looks up milestone completion records.
pub trait RecordLookup {
    fn record(&self, milestone_id: &str) -> Option<MilestoneCompletionRecord>;
}

impl RecordLookup for Ledger {
    fn record(&self, milestone_id: &str) -> Option<MilestoneCompletionRecord> {
        self.load(milestone_id)
    }
}

impl RecordLookup for HashMap<String, MilestoneCompletionRecord> {
    fn record(&self, milestone_id: &str) -> Option<MilestoneCompletionRecord> {
        self.get(milestone_id).cloned()
    }
}

pub struct StatusAggregator<'a, L: RecordLookup + ?Sized> {
    records: &'a L,
}

impl<'a, L: RecordLookup + ?Sized> StatusAggregator<'a, L> {
    pub fn new(records: &'a L) -> Self {
        Self { records }
    }

    /// Aggregate every milestone in `state`, or only `milestone_id` if given.
    ///
    /// A requested id absent from the allocations is `NotFound`; no partial
    /// report is produced.
    pub fn aggregate(
        &self,
        state: &DistributionContractState,
        milestone_id: Option<&str>,
    ) -> CoreResult<StatusReport> {
        self.aggregate_at(state, milestone_id, unix_now())
    }

    pub fn aggregate_at(
        &self,
        state: &DistributionContractState,
        milestone_id: Option<&str>,
        now: i64,
    ) -> CoreResult<StatusReport> {
        let known = state.milestone_ids();
        let candidates = match milestone_id {
            Some(requested) if known.contains(&requested) => vec![requested],
            Some(requested) => {
                return Err(CoreError::NotFound {
                    milestone_id: requested.to_string(),
                });
            }
            None => known,
        };

        let milestones: BTreeMap<String, MilestoneStatus> = candidates
            .into_iter()
            .map(|id| {
                let record = self.records.record(id);
                (id.to_string(), milestone_status(state, id, record.as_ref(), now))
            })
            .collect();

        debug!(
            contract_address = %state.contract_address,
            milestones = milestones.len(),
            "Aggregated milestone status"
        );

        Ok(StatusReport {
            contract_address: state.contract_address.clone(),
            milestones,
        })
    }
}

fn milestone_status(
    state: &DistributionContractState,
    milestone_id: &str,
    record: Option<&MilestoneCompletionRecord>,
    now: i64,
) -> MilestoneStatus {
    let allocations: Vec<_> = state.allocations_for(milestone_id).collect();

    let total = total_amount(allocations.iter().map(|alloc| alloc.token_amount));
    let claimed_amount = total_amount(
        allocations
            .iter()
            .filter(|alloc| alloc.claimed)
            .map(|alloc| alloc.token_amount),
    );
    let unclaimed_amount = total.saturating_sub(claimed_amount);
    let vesting_passed = allocations
        .iter()
        .all(|alloc| alloc.vesting_timestamp <= now);
    let earliest_vesting = allocations
        .iter()
        .map(|alloc| alloc.vesting_timestamp)
        .min()
        .unwrap_or_default();

    let base = MilestoneStatus {
        allocation_count: allocations.len(),
        total_amount: total,
        claimed_amount,
        unclaimed_amount,
        vesting_passed,
        earliest_vesting,
        quorum_status: MilestoneQuorum::Unknown,
        quorum_met: false,
        signature_count: 0,
        quorum_threshold: state.quorum_threshold,
        verification_timestamp: None,
        claimable: false,
    };

    match record {
        Some(record) => {
            let quorum_met = record.quorum_met();
            MilestoneStatus {
                quorum_status: record.quorum_status().into(),
                quorum_met,
                signature_count: record.signature_count(),
                quorum_threshold: record.quorum_threshold(),
                verification_timestamp: record.verification_timestamp(),
                claimable: quorum_met && vesting_passed && unclaimed_amount > 0,
                ..base
            }
        }
        None => base,
    }
}
