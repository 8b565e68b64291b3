//! Error taxonomy for the core.
//!
//! Stored-record corruption is deliberately absent: unparsable ledger or cache
//! files are logged and treated as missing, never surfaced as errors.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Input was structurally invalid. Carries every violation found.
    #[error("Validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    /// A brand-new milestone record needs both parameters.
    #[error(
        "quorum_threshold and total_oracles are required when creating new milestone data \
         (milestone {milestone_id})"
    )]
    MissingParameters { milestone_id: String },

    #[error("Milestone {milestone_id} not found in contract allocations")]
    NotFound { milestone_id: String },

    #[error(
        "No allocations for beneficiary {beneficiary}{}",
        milestone_id.as_deref().map(|id| format!(" in milestone {id}")).unwrap_or_default()
    )]
    BeneficiaryNotFound {
        beneficiary: String,
        milestone_id: Option<String>,
    },

    /// Neither the chain nor the cache produced a distribution UTXO at `address`.
    #[error("No distribution contract state found at {address}")]
    NoContractState { address: String },

    #[error("Failed to fetch UTXOs for {address}: {source}")]
    Fetch {
        address: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// The individual violations for `ValidationFailed`, empty otherwise.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        match self {
            Self::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
