//! Durable per-milestone signature ledger.
//!
//! One JSON document per milestone under the ledger directory. Every commit
//! is a read-modify-write of that document; commits to the same milestone are
//! serialized within the process by a per-key mutex. Separate processes are
//! not coordinated and the last write wins.
//!
//! # Partial commits
//!
//! [`Ledger::commit`] persists every structurally valid signature *before*
//! reporting the invalid ones. A `ValidationFailed` result therefore does not
//! mean nothing was written. Resubmitting the whole batch is safe because
//! already-stored oracles are skipped as duplicates.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use milestone_types::{MilestoneCompletionRecord, QuorumStatus, SignatureSubmission};
use milestone_utils::{recover_bak_file, storage_key, write_json_atomic};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::unix_now;

/// Three-way quorum classification of a distinct-signature count.
#[must_use]
pub fn calculate_quorum_status(signature_count: u64, quorum_threshold: u64) -> QuorumStatus {
    QuorumStatus::classify(signature_count, quorum_threshold)
}

pub struct Ledger {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Ledger {
    /// Open the ledger rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CoreError::storage(&dir, e))?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn record_path(&self, milestone_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", storage_key(milestone_id)))
    }

    /// Load the record for `milestone_id`.
    ///
    /// Missing and unparsable files both yield `None`, as does a record whose
    /// stored id is not `milestone_id`.
    #[must_use]
    pub fn load(&self, milestone_id: &str) -> Option<MilestoneCompletionRecord> {
        let path = self.record_path(milestone_id);
        recover_bak_file(&path);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), "Failed to read milestone record: {e}");
                return None;
            }
        };

        match serde_json::from_str::<MilestoneCompletionRecord>(&content) {
            Ok(record) if record.milestone_identifier() == milestone_id => Some(record),
            Ok(record) => {
                warn!(
                    milestone_id,
                    stored = record.milestone_identifier(),
                    path = %path.display(),
                    "Milestone record belongs to another id, treated as absent"
                );
                None
            }
            Err(e) => {
                warn!(
                    milestone_id,
                    path = %path.display(),
                    "Corrupt milestone record treated as absent: {e}"
                );
                None
            }
        }
    }

    /// Overwrite the stored record.
    pub fn save(&self, record: &MilestoneCompletionRecord) -> CoreResult<PathBuf> {
        let path = self.record_path(record.milestone_identifier());
        write_json_atomic(&path, record).map_err(|e| CoreError::storage(&path, e))?;
        Ok(path)
    }

    /// Merge `signatures` into the record for `milestone_id`.
    ///
    /// `quorum_threshold` and `total_oracles` are required when no record exists
    /// yet and ignored otherwise; the stored parameters are authoritative.
    ///
    /// Invalid signatures do not abort the batch. Valid, non-duplicate ones are
    /// appended and persisted, and only then is `ValidationFailed` returned
    /// listing every invalid submission (see the module docs).
    pub fn commit(
        &self,
        milestone_id: &str,
        signatures: &[SignatureSubmission],
        quorum_threshold: Option<u64>,
        total_oracles: Option<u64>,
    ) -> CoreResult<MilestoneCompletionRecord> {
        self.commit_at(milestone_id, signatures, quorum_threshold, total_oracles, unix_now())
    }

    /// [`Self::commit`] with an explicit clock reading for the verification timestamp.
    pub fn commit_at(
        &self,
        milestone_id: &str,
        signatures: &[SignatureSubmission],
        quorum_threshold: Option<u64>,
        total_oracles: Option<u64>,
        now: i64,
    ) -> CoreResult<MilestoneCompletionRecord> {
        let lock = self.key_lock(milestone_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut record = match self.load(milestone_id) {
            Some(existing) => {
                if quorum_threshold.is_some_and(|q| q != existing.quorum_threshold())
                    || total_oracles.is_some_and(|t| t != existing.total_oracles())
                {
                    debug!(
                        milestone_id,
                        "Ignoring quorum parameters for existing record; stored values win"
                    );
                }
                existing
            }
            None => match (quorum_threshold, total_oracles) {
                (Some(threshold), Some(total)) => {
                    MilestoneCompletionRecord::new(milestone_id, threshold, total)
                }
                _ => {
                    return Err(CoreError::MissingParameters {
                        milestone_id: milestone_id.to_string(),
                    });
                }
            },
        };

        let mut errors = Vec::new();
        let mut added = 0usize;
        let mut duplicates = 0usize;

        for (index, submission) in signatures.iter().enumerate() {
            match submission.validate() {
                Ok(signature) => {
                    if record.add_signature(signature) {
                        added += 1;
                    } else {
                        duplicates += 1;
                    }
                }
                Err(violations) => errors.extend(
                    violations
                        .into_iter()
                        .map(|violation| format!("signature {index}: {violation}")),
                ),
            }
        }

        if record.refresh_status(now) {
            info!(milestone_id, verified_at = now, "Milestone quorum reached");
        }

        let path = self.save(&record)?;
        info!(
            milestone_id,
            path = %path.display(),
            added,
            duplicates,
            invalid = errors.len(),
            signature_count = record.signature_count(),
            quorum_status = %record.quorum_status(),
            "Committed milestone signatures"
        );

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(CoreError::ValidationFailed { errors })
        }
    }

    fn key_lock(&self, milestone_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(milestone_id.to_string()).or_default())
    }
}
