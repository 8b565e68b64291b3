//! Milestone quorum accumulation and contract-state reconciliation.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `schedule` | Structural validation of a schedule before publication |
//! | `codec` | Schedule to datum encoding, fetched UTXO to contract state decoding |
//! | `ledger` | Durable per-milestone oracle signature records |
//! | `cache` | Disk cache of contract snapshots with age-based staleness |
//! | `reconcile` | Cache-or-chain resolution of contract state |
//! | `aggregate` | Per-milestone claimability verdicts |
//! | `distribution` | Per-beneficiary claimed/claimable/locked breakdown |
//!
//! Storage locations are always passed in explicitly; nothing here reads
//! configuration or the environment.

#![allow(clippy::missing_errors_doc)]

mod aggregate;
mod cache;
mod codec;
mod distribution;
mod error;
mod ledger;
mod reconcile;
mod schedule;
mod source;

pub use aggregate::{RecordLookup, StatusAggregator};
pub use cache::StateCache;
pub use codec::{decode_utxo, encode_datum, parse_datum};
pub use distribution::{calculate_distribution, calculate_distribution_at};
pub use error::{CoreError, CoreResult};
pub use ledger::{Ledger, calculate_quorum_status};
pub use reconcile::{DEFAULT_MAX_AGE, RefreshPolicy, ResolvedState, StateResolver};
pub use schedule::validate_schedule;
pub use source::{TransactionSubmitter, UtxoSource};

/// Current POSIX time in seconds.
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
