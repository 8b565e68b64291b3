//! Reconcile the local cache with the chain.

use std::time::Duration;

use milestone_types::DistributionContractState;
use tracing::{debug, info, warn};

use crate::cache::{StateCache, entry_is_stale};
use crate::codec::decode_utxo;
use crate::error::{CoreError, CoreResult};
use crate::source::UtxoSource;
use crate::unix_now;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Skip the cache and require a successful fetch.
    pub force: bool,
    pub max_age: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            force: false,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedState {
    pub state: DistributionContractState,
    pub used_cache: bool,
    pub cached_at: i64,
}

pub struct StateResolver<'a, S> {
    source: &'a S,
    cache: &'a StateCache,
}

impl<'a, S: UtxoSource> StateResolver<'a, S> {
    pub fn new(source: &'a S, cache: &'a StateCache) -> Self {
        Self { source, cache }
    }

    /// Current contract state at `address`.
    ///
    /// A fresh cache entry is returned without touching the chain. Otherwise the
    /// first UTXO carrying a distribution datum replaces the cached snapshot. If
    /// the fetch itself fails, a cached snapshot of any age is served instead,
    /// unless `policy.force` is set.
    pub async fn resolve(&self, address: &str, policy: RefreshPolicy) -> CoreResult<ResolvedState> {
        self.resolve_at(address, policy, unix_now()).await
    }

    pub async fn resolve_at(
        &self,
        address: &str,
        policy: RefreshPolicy,
        now: i64,
    ) -> CoreResult<ResolvedState> {
        let cached = self.cache.load(address);

        if !policy.force
            && let Some(entry) = &cached
            && !entry_is_stale(entry, policy.max_age, now)
        {
            debug!(address, cached_at = entry.cached_at, "Using cached contract state");
            return Ok(ResolvedState {
                state: entry.state.clone(),
                used_cache: true,
                cached_at: entry.cached_at,
            });
        }

        let utxos = match self.source.fetch_utxos(address).await {
            Ok(utxos) => utxos,
            Err(e) => {
                return match cached {
                    Some(entry) if !policy.force => {
                        warn!(
                            address,
                            cached_at = entry.cached_at,
                            "UTXO fetch failed, serving stale cached state: {e}"
                        );
                        Ok(ResolvedState {
                            state: entry.state,
                            used_cache: true,
                            cached_at: entry.cached_at,
                        })
                    }
                    _ => Err(CoreError::Fetch {
                        address: address.to_string(),
                        source: Box::new(e),
                    }),
                };
            }
        };

        let utxo_count = utxos.len();
        let Some(mut state) = utxos.iter().find_map(decode_utxo) else {
            warn!(address, utxo_count, "No distribution UTXO at contract address");
            return Err(CoreError::NoContractState {
                address: address.to_string(),
            });
        };
        if state.contract_address.is_empty() {
            state.contract_address = address.to_string();
        }

        let entry = self.cache.save_at(address, state, now)?;
        info!(
            address,
            utxo_tx_hash = %entry.state.utxo_tx_hash,
            utxo_index = entry.state.utxo_index,
            "Refreshed contract state from chain"
        );
        Ok(ResolvedState {
            state: entry.state,
            used_cache: false,
            cached_at: entry.cached_at,
        })
    }
}
