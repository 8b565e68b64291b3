//! Per-beneficiary distribution breakdown.

use std::collections::HashMap;

use milestone_types::{
    AllocationDistribution, DistributionContractState, DistributionReport, total_amount,
};

use crate::aggregate::RecordLookup;
use crate::error::{CoreError, CoreResult};
use crate::unix_now;

/// Break down what `beneficiary` is owed, optionally for one milestone only.
///
/// An allocation is claimable when it is unclaimed, vested, and its milestone
/// has reached quorum. Everything neither claimed nor claimable is locked.
pub fn calculate_distribution<L: RecordLookup + ?Sized>(
    state: &DistributionContractState,
    records: &L,
    beneficiary: &str,
    milestone_id: Option<&str>,
) -> CoreResult<DistributionReport> {
    calculate_distribution_at(state, records, beneficiary, milestone_id, unix_now())
}

pub fn calculate_distribution_at<L: RecordLookup + ?Sized>(
    state: &DistributionContractState,
    records: &L,
    beneficiary: &str,
    milestone_id: Option<&str>,
    now: i64,
) -> CoreResult<DistributionReport> {
    let mut quorum: HashMap<&str, bool> = HashMap::new();
    let mut allocations = Vec::new();

    for (index, alloc) in state.beneficiary_allocations.iter().enumerate() {
        if alloc.beneficiary_address != beneficiary
            || milestone_id.is_some_and(|id| id != alloc.milestone_identifier)
        {
            continue;
        }
        let quorum_met = *quorum
            .entry(alloc.milestone_identifier.as_str())
            .or_insert_with(|| {
                records
                    .record(&alloc.milestone_identifier)
                    .is_some_and(|record| record.quorum_met())
            });
        allocations.push(AllocationDistribution {
            index,
            milestone_identifier: alloc.milestone_identifier.clone(),
            token_amount: alloc.token_amount,
            vesting_timestamp: alloc.vesting_timestamp,
            claimed: alloc.claimed,
            quorum_met,
            claimable: !alloc.claimed && alloc.vesting_timestamp <= now && quorum_met,
        });
    }

    if allocations.is_empty() {
        return Err(match milestone_id {
            Some(id) if state.allocations_for(id).next().is_none() => CoreError::NotFound {
                milestone_id: id.to_string(),
            },
            _ => CoreError::BeneficiaryNotFound {
                beneficiary: beneficiary.to_string(),
                milestone_id: milestone_id.map(str::to_string),
            },
        });
    }

    let total = total_amount(allocations.iter().map(|a| a.token_amount));
    let claimed_amount = total_amount(allocations.iter().filter(|a| a.claimed).map(|a| a.token_amount));
    let claimable_amount =
        total_amount(allocations.iter().filter(|a| a.claimable).map(|a| a.token_amount));

    Ok(DistributionReport {
        contract_address: state.contract_address.clone(),
        beneficiary_address: beneficiary.to_string(),
        milestone_identifier: milestone_id.map(str::to_string),
        allocations,
        total_amount: total,
        claimed_amount,
        claimable_amount,
        locked_amount: total
            .saturating_sub(claimed_amount)
            .saturating_sub(claimable_amount),
    })
}
