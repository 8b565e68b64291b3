//! Pre-publication schedule validation.
//!
//! Advisory structural checks only; nothing here touches the ledger or the chain.

use milestone_types::{MAX_ALLOCATIONS, MilestoneSchedule, has_address_prefix};

/// Validate `schedule`, returning every problem found. Empty means valid.
///
/// Checks never short-circuit: a schedule with several problems reports all of them.
#[must_use]
pub fn validate_schedule(schedule: &MilestoneSchedule) -> Vec<String> {
    let mut errors = Vec::new();
    let oracle_count = schedule.oracle_addresses.len();

    if usize::try_from(schedule.quorum_threshold).is_ok_and(|threshold| threshold > oracle_count) {
        errors.push(format!(
            "Quorum threshold ({}) exceeds oracle count ({oracle_count})",
            schedule.quorum_threshold
        ));
    }

    if schedule.quorum_threshold <= 0 {
        errors.push("Quorum threshold must be greater than 0".to_string());
    }

    for (i, allocation) in schedule.beneficiary_allocations.iter().enumerate() {
        if !has_address_prefix(&allocation.beneficiary_address) {
            errors.push(format!(
                "Invalid beneficiary address format at index {i}: {}",
                allocation.beneficiary_address
            ));
        }
        if allocation.token_amount <= 0 {
            errors.push(format!(
                "Token amount must be positive at index {i}: {}",
                allocation.token_amount
            ));
        }
        if allocation.milestone_identifier.is_empty() {
            errors.push(format!("Milestone identifier cannot be empty at index {i}"));
        }
    }

    for (i, oracle) in schedule.oracle_addresses.iter().enumerate() {
        if !has_address_prefix(oracle) {
            errors.push(format!("Invalid oracle address format at index {i}: {oracle}"));
        }
    }

    let allocation_count = schedule.beneficiary_allocations.len();
    if allocation_count == 0 {
        errors.push("At least one beneficiary allocation is required".to_string());
    } else if allocation_count > MAX_ALLOCATIONS {
        errors.push(format!(
            "Too many beneficiary allocations ({allocation_count}, maximum {MAX_ALLOCATIONS})"
        ));
    }

    if oracle_count == 0 {
        errors.push("At least one oracle address is required".to_string());
    }

    let total = schedule
        .beneficiary_allocations
        .iter()
        .filter(|alloc| alloc.token_amount > 0)
        .try_fold(0i64, |acc, alloc| acc.checked_add(alloc.token_amount));
    if total.is_none() {
        errors.push(format!("Total token amount exceeds the maximum of {}", i64::MAX));
    }

    errors
}
