//! Disk cache of on-chain contract state.
//!
//! Path layout: `{cache_dir}/{storage_key(address)}.json`, one snapshot per
//! contract address. Snapshots are replaced whole on every save. Read
//! failures of any kind are treated as a cache miss.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use milestone_types::{CachedContractState, DistributionContractState};
use milestone_utils::{recover_bak_file, storage_key, write_json_atomic};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::unix_now;

pub struct StateCache {
    dir: PathBuf,
}

impl StateCache {
    /// Open the cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CoreError::storage(&dir, e))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn entry_path(&self, address: &str) -> PathBuf {
        self.dir.join(format!("{}.json", storage_key(address)))
    }

    /// Store `state` for `address`, stamped with the current time.
    pub fn save(&self, address: &str, state: DistributionContractState) -> CoreResult<CachedContractState> {
        self.save_at(address, state, unix_now())
    }

    pub fn save_at(
        &self,
        address: &str,
        state: DistributionContractState,
        now: i64,
    ) -> CoreResult<CachedContractState> {
        let entry = CachedContractState {
            state,
            cached_at: now,
        };
        let path = self.entry_path(address);
        write_json_atomic(&path, &entry).map_err(|e| CoreError::storage(&path, e))?;
        debug!(address, path = %path.display(), "Cached contract state");
        Ok(entry)
    }

    /// Load the snapshot for `address`; absent or unparsable entries are a miss.
    #[must_use]
    pub fn load(&self, address: &str) -> Option<CachedContractState> {
        let path = self.entry_path(address);
        recover_bak_file(&path);

        if !path.exists() {
            debug!(address, "Contract state cache miss");
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(address, path = %path.display(), "Cache read failed, treating as miss: {e}");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(address, path = %path.display(), "Corrupt cache entry, treating as miss: {e}");
                None
            }
        }
    }

    /// Whether the snapshot for `address` needs a refresh.
    ///
    /// A missing entry is stale, and `max_age` of zero disables caching.
    #[must_use]
    pub fn is_stale(&self, address: &str, max_age: Duration) -> bool {
        self.is_stale_at(address, max_age, unix_now())
    }

    #[must_use]
    pub fn is_stale_at(&self, address: &str, max_age: Duration, now: i64) -> bool {
        if max_age.is_zero() {
            return true;
        }
        match self.load(address) {
            Some(entry) => entry_is_stale(&entry, max_age, now),
            None => true,
        }
    }
}

pub(crate) fn entry_is_stale(entry: &CachedContractState, max_age: Duration, now: i64) -> bool {
    if max_age.is_zero() {
        return true;
    }
    let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    now.saturating_sub(entry.cached_at) > max_age
}
