//! Chain collaborators for milestone releases.
//!
//! - [`kupo`] - Kupo indexer client (health, unspent outputs at an address)
//! - [`ogmios`] - Ogmios JSON-RPC client (health, transaction submission)
//! - [`validator`] - Compiled validator metadata from `plutus.json`
//! - [`retry`] - Backoff policy shared by the HTTP clients
//!
//! [`KupoClient`] implements [`milestone_core::UtxoSource`] and
//! [`OgmiosClient`] implements [`milestone_core::TransactionSubmitter`], so the
//! core reconciles against either these clients or an in-memory fake.

pub mod kupo;
pub mod ogmios;
pub mod retry;
pub mod validator;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use kupo::{KupoClient, KupoHealth};
pub use ogmios::{OgmiosClient, OgmiosHealth};
pub use validator::{ValidatorInfo, ValidatorLoader, contract_address};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid endpoint URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {endpoint} failed after {attempts} attempt(s): {source}")]
    Connection {
        endpoint: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Validator file not found: {}", path.display())]
    ValidatorMissing { path: PathBuf },

    #[error("Failed to read validator file {}: {source}", path.display())]
    ValidatorRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse validator file {}: {source}", path.display())]
    ValidatorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Validator '{name}' not found in plutus.json")]
    ValidatorNotFound { name: String },

    #[error("No '{field}' found in validator")]
    ValidatorField { field: &'static str },
}

pub type ChainResult<T> = Result<T, ChainError>;

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

/// HTTP client with a whole-request timeout.
pub fn http_client_with_timeout(timeout: Duration) -> ChainResult<reqwest::Client> {
    base_client_builder()
        .timeout(timeout)
        .build()
        .map_err(ChainError::Client)
}

/// Parse a service base URL, dropping any trailing slash from the path.
pub(crate) fn parse_base_url(raw: &str) -> ChainResult<url::Url> {
    let trimmed = raw.trim_end_matches('/');
    url::Url::parse(trimmed).map_err(|source| ChainError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Read an error body, truncated so a misbehaving server can't flood logs.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    let Ok(bytes) = response.bytes().await else {
        return String::new();
    };
    if bytes.len() > MAX_ERROR_BODY_BYTES {
        let text = String::from_utf8_lossy(&bytes[..MAX_ERROR_BODY_BYTES]);
        return format!("{text}...(truncated)");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Collapse a retry outcome into the response or a [`ChainError`].
pub(crate) async fn expect_success(
    outcome: retry::RetryOutcome,
    endpoint: &str,
) -> ChainResult<reqwest::Response> {
    match outcome {
        retry::RetryOutcome::Success(response) => Ok(response),
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            Err(ChainError::Status {
                endpoint: endpoint.to_string(),
                status,
                body,
            })
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => Err(ChainError::Connection {
            endpoint: endpoint.to_string(),
            attempts,
            source,
        }),
        retry::RetryOutcome::NonRetryable(source) => Err(ChainError::Connection {
            endpoint: endpoint.to_string(),
            attempts: 1,
            source,
        }),
    }
}
