//! Ogmios JSON-RPC client.
//!
//! Ogmios serves the same JSON-RPC 2.0 protocol over HTTP POST as over its
//! websocket, so `ws://` and `wss://` URLs are rewritten to `http://` and
//! `https://`. Each request carries a fresh, increasing id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use milestone_core::TransactionSubmitter;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::retry::{RetryConfig, send_with_retry};
use crate::{ChainError, ChainResult, expect_success, http_client_with_timeout, parse_base_url};

const PROTOCOL_PARAMETERS: &str = "queryLedgerState/protocolParameters";
const SUBMIT_TRANSACTION: &str = "submitTransaction";

#[derive(Debug, Serialize)]
struct Request {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl Request {
    fn new(id: u64, method: &'static str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OgmiosHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct OgmiosClient {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl OgmiosClient {
    pub fn new(url: &str, timeout: Duration) -> ChainResult<Self> {
        let mut parsed = parse_base_url(url)?;
        let http_scheme = match parsed.scheme() {
            "ws" => Some("http"),
            "wss" => Some("https"),
            _ => None,
        };
        if let Some(scheme) = http_scheme {
            // ws/wss and http/https are all special schemes, so this cannot fail.
            let _ = parsed.set_scheme(scheme);
        }
        Ok(Self {
            client: http_client_with_timeout(timeout)?,
            endpoint: parsed.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(
        &self,
        method: &'static str,
        params: Option<Value>,
        retry: &RetryConfig,
    ) -> ChainResult<Value> {
        let request = Request::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);
        debug!(method, id = request.id, "Ogmios request");

        let outcome =
            send_with_retry(|| self.client.post(&self.endpoint).json(&request), retry).await;
        let response = expect_success(outcome, &self.endpoint).await?;
        let body: Response = response.json().await.map_err(|source| ChainError::Decode {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    /// Probe connectivity with a protocol-parameters query.
    pub async fn health(&self) -> OgmiosHealth {
        match self
            .call(PROTOCOL_PARAMETERS, None, &RetryConfig::no_retries())
            .await
        {
            Ok(result) => OgmiosHealth {
                connected: true,
                version: Some(
                    result
                        .get("version")
                        .cloned()
                        .unwrap_or_else(|| json!("unknown")),
                ),
                error: None,
            },
            Err(e) => OgmiosHealth {
                connected: false,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Submit a signed transaction, returning the transaction id Ogmios reports.
    ///
    /// Not retried: a timeout does not tell us whether the node accepted it.
    pub async fn submit(&self, cbor_hex: &str) -> ChainResult<String> {
        let params = json!({ "transaction": { "cbor": cbor_hex } });
        let result = self
            .call(SUBMIT_TRANSACTION, Some(params), &RetryConfig::no_retries())
            .await?;
        let tx_id = result
            .pointer("/transaction/id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(tx_id, "Transaction submitted");
        Ok(tx_id)
    }
}

impl TransactionSubmitter for OgmiosClient {
    type Error = ChainError;

    async fn submit_transaction(&self, cbor_hex: &str) -> Result<String, ChainError> {
        self.submit(cbor_hex).await
    }
}
