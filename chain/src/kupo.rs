//! Kupo chain-indexer client.
//!
//! `GET /health` for liveness, `GET /matches/{address}?unspent` for the
//! outputs currently sitting at an address.

use std::time::Duration;

use milestone_core::UtxoSource;
use milestone_types::Utxo;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::retry::{RetryConfig, send_with_retry};
use crate::{ChainError, ChainResult, expect_success, http_client_with_timeout, parse_base_url};

/// Result of a Kupo health probe. Never an error: failures are reported inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KupoHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: Option<String>,
}

pub struct KupoClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl KupoClient {
    pub fn new(base_url: &str, timeout: Duration) -> ChainResult<Self> {
        let url = parse_base_url(base_url)?;
        Ok(Self {
            client: http_client_with_timeout(timeout)?,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> KupoHealth {
        let endpoint = format!("{}/health", self.base_url);
        let response = match self.client.get(&endpoint).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(endpoint, "Kupo health probe failed: {e}");
                return KupoHealth {
                    connected: false,
                    sync_status: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return KupoHealth {
                connected: false,
                sync_status: None,
                error: Some(format!("HTTP {}", status.as_u16())),
            };
        }

        let sync_status = response
            .json::<HealthBody>()
            .await
            .ok()
            .and_then(|body| body.status)
            .unwrap_or_else(|| "unknown".to_string());
        KupoHealth {
            connected: true,
            sync_status: Some(sync_status),
            error: None,
        }
    }

    /// Unspent outputs at `address`, with string datums wrapped as `{"cbor": ...}`.
    pub async fn matches(&self, address: &str) -> ChainResult<Vec<Utxo>> {
        let endpoint = format!("{}/matches/{address}?unspent=true", self.base_url);
        let outcome = send_with_retry(|| self.client.get(&endpoint), &self.retry).await;
        let response = expect_success(outcome, &endpoint).await?;

        let raw: Vec<Value> = response.json().await.map_err(|source| ChainError::Decode {
            endpoint: endpoint.clone(),
            source,
        })?;

        let utxos: Vec<Utxo> = raw
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Utxo>(entry) {
                Ok(utxo) => Some(normalize_datum(utxo)),
                Err(e) => {
                    warn!(endpoint, "Skipping malformed Kupo match: {e}");
                    None
                }
            })
            .collect();
        debug!(address, count = utxos.len(), "Fetched unspent outputs");
        Ok(utxos)
    }
}

fn normalize_datum(mut utxo: Utxo) -> Utxo {
    utxo.datum = match utxo.datum.take() {
        Some(Value::String(cbor)) => Some(json!({ "cbor": cbor })),
        other => other,
    };
    utxo
}

impl UtxoSource for KupoClient {
    type Error = ChainError;

    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, ChainError> {
        self.matches(address).await
    }
}
