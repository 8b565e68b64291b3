//! Core domain types for milestone-based token release.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `schedule` | Pre-publication milestone schedule and its allocations |
//! | `signature` | Oracle attestations and their loosely-typed submission form |
//! | `record` | Durable per-milestone completion record and quorum status |
//! | `contract` | On-chain distribution contract state and fetched UTXOs |
//! | `datum` | Canonical datum layout shared by encoder and decoder |
//! | `status` | Aggregated per-milestone and per-beneficiary reports |

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod contract;
mod datum;
mod record;
mod schedule;
mod signature;
mod status;

pub use contract::{BeneficiaryAllocationState, CachedContractState, DistributionContractState, Utxo};
pub use datum::{DistributionDatum, ParsedDatum};
pub use record::{MilestoneCompletionRecord, QuorumStatus};
pub use schedule::{BeneficiaryAllocation, MAX_ALLOCATIONS, MilestoneSchedule};
pub use signature::{OracleSignature, SignatureSubmission};
pub use status::{
    AllocationDistribution, DistributionReport, MilestoneQuorum, MilestoneStatus, StatusReport,
};

// ============================================================================
// Chain Addresses
// ============================================================================

/// Bech32 human-readable prefixes accepted for beneficiary and oracle addresses.
///
/// This is a structural check only; checksums are not verified.
pub const ADDRESS_PREFIXES: &[&str] = &["addr", "addr_test", "addr1"];

/// Returns true if `value` starts with a recognized chain-address prefix.
#[must_use]
pub fn has_address_prefix(value: &str) -> bool {
    ADDRESS_PREFIXES
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

// ============================================================================
// Token Amounts
// ============================================================================

/// Total of `amounts`, saturating at `u64::MAX` instead of overflowing.
#[must_use]
pub fn total_amount(amounts: impl IntoIterator<Item = u64>) -> u64 {
    amounts.into_iter().fold(0, u64::saturating_add)
}
