//! Durable per-milestone completion record.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OracleSignature;

/// Quorum progress for a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuorumStatus {
    #[default]
    Pending,
    Met,
    Exceeded,
}

impl QuorumStatus {
    /// Classify a distinct-signature count against a threshold.
    ///
    /// `met` iff `count == threshold`, `exceeded` iff `count > threshold`,
    /// otherwise `pending`.
    #[must_use]
    pub const fn classify(signature_count: u64, quorum_threshold: u64) -> Self {
        if signature_count > quorum_threshold {
            Self::Exceeded
        } else if signature_count == quorum_threshold {
            Self::Met
        } else {
            Self::Pending
        }
    }

    #[must_use]
    pub const fn is_met(self) -> bool {
        matches!(self, Self::Met | Self::Exceeded)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Met => "met",
            Self::Exceeded => "exceeded",
        }
    }
}

impl fmt::Display for QuorumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated oracle attestations for one milestone.
///
/// Signatures are unique by oracle address and kept in insertion order. The
/// record only ever grows: signatures are appended, never replaced or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneCompletionRecord {
    milestone_identifier: String,
    #[serde(default)]
    oracle_signatures: Vec<OracleSignature>,
    #[serde(default)]
    verification_timestamp: Option<i64>,
    #[serde(default)]
    quorum_status: QuorumStatus,
    quorum_threshold: u64,
    total_oracles: u64,
}

impl MilestoneCompletionRecord {
    #[must_use]
    pub fn new(milestone_identifier: impl Into<String>, quorum_threshold: u64, total_oracles: u64) -> Self {
        Self {
            milestone_identifier: milestone_identifier.into(),
            oracle_signatures: Vec::new(),
            verification_timestamp: None,
            quorum_status: QuorumStatus::classify(0, quorum_threshold),
            quorum_threshold,
            total_oracles,
        }
    }

    #[must_use]
    pub fn milestone_identifier(&self) -> &str {
        &self.milestone_identifier
    }

    #[must_use]
    pub fn oracle_signatures(&self) -> &[OracleSignature] {
        &self.oracle_signatures
    }

    #[must_use]
    pub fn verification_timestamp(&self) -> Option<i64> {
        self.verification_timestamp
    }

    #[must_use]
    pub fn quorum_status(&self) -> QuorumStatus {
        self.quorum_status
    }

    #[must_use]
    pub fn quorum_threshold(&self) -> u64 {
        self.quorum_threshold
    }

    #[must_use]
    pub fn total_oracles(&self) -> u64 {
        self.total_oracles
    }

    /// Number of distinct oracle addresses that have signed.
    #[must_use]
    pub fn signature_count(&self) -> u64 {
        let distinct: HashSet<&str> = self
            .oracle_signatures
            .iter()
            .map(|sig| sig.oracle_address.as_str())
            .collect();
        distinct.len() as u64
    }

    #[must_use]
    pub fn quorum_met(&self) -> bool {
        self.signature_count() >= self.quorum_threshold
    }

    #[must_use]
    pub fn has_signed(&self, oracle_address: &str) -> bool {
        self.oracle_signatures
            .iter()
            .any(|sig| sig.oracle_address == oracle_address)
    }

    /// Append `signature` unless its oracle already signed. Returns whether it was added.
    ///
    /// Status is not recomputed here; call [`Self::refresh_status`] once the batch is in.
    pub fn add_signature(&mut self, signature: OracleSignature) -> bool {
        if self.has_signed(&signature.oracle_address) {
            return false;
        }
        self.oracle_signatures.push(signature);
        true
    }

    /// Recompute `quorum_status` and stamp the verification time on the first
    /// transition into met/exceeded. Returns true if this call set the timestamp.
    pub fn refresh_status(&mut self, now: i64) -> bool {
        self.quorum_status = QuorumStatus::classify(self.signature_count(), self.quorum_threshold);
        if self.quorum_status.is_met() && self.verification_timestamp.is_none() {
            self.verification_timestamp = Some(now);
            return true;
        }
        false
    }
}
