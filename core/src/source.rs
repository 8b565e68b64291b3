//! Seams to the chain.

use std::error::Error as StdError;
use std::future::Future;

use milestone_types::Utxo;

/// Lists the unspent outputs sitting at an address.
pub trait UtxoSource {
    type Error: StdError + Send + Sync + 'static;

    fn fetch_utxos(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Vec<Utxo>, Self::Error>> + Send;
}

/// Submits a signed transaction and returns its id.
pub trait TransactionSubmitter {
    type Error: StdError + Send + Sync + 'static;

    fn submit_transaction(
        &self,
        cbor_hex: &str,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
