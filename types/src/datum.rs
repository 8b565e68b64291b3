//! Canonical datum layout for the distribution validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BeneficiaryAllocationState, total_amount};

/// The datum the distribution validator expects, in its JSON form.
///
/// Field names must match the validator's datum schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDatum {
    pub token_policy_id: String,
    pub beneficiary_allocations: Vec<BeneficiaryAllocationState>,
    pub oracle_addresses: Vec<String>,
    pub quorum_threshold: u64,
    pub total_oracles: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl DistributionDatum {
    /// Sum of all allocation amounts, saturating at `u64::MAX`.
    #[must_use]
    pub fn total_token_amount(&self) -> u64 {
        total_amount(self.beneficiary_allocations.iter().map(|alloc| alloc.token_amount))
    }

    /// Sum of amounts whose allocation has not been claimed.
    #[must_use]
    pub fn remaining_token_amount(&self) -> u64 {
        total_amount(
            self.beneficiary_allocations
                .iter()
                .filter(|alloc| !alloc.claimed)
                .map(|alloc| alloc.token_amount),
        )
    }
}

/// A fetched datum after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDatum {
    /// A distribution datum, with absent fields defaulted.
    Distribution(DistributionDatum),
    /// An inline CBOR payload the indexer did not expand.
    Cbor(String),
    /// No datum attached to the output.
    Absent,
    /// A datum of some other contract.
    Unrecognized,
}

impl ParsedDatum {
    #[must_use]
    pub fn into_distribution(self) -> Option<DistributionDatum> {
        match self {
            Self::Distribution(datum) => Some(datum),
            Self::Cbor(_) | Self::Absent | Self::Unrecognized => None,
        }
    }
}
