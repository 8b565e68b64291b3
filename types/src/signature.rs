//! Oracle attestations.
//!
//! Oracles submit signatures as loosely-typed JSON. [`SignatureSubmission`] is the
//! boundary form with every field optional; [`SignatureSubmission::validate`] checks
//! structure once and produces a well-typed [`OracleSignature`]. Cryptographic
//! authenticity is not checked anywhere in this workspace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::has_address_prefix;

/// A structurally valid oracle signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSignature {
    pub oracle_address: String,
    /// Ed25519 signature (hex).
    pub signature: String,
    /// The bytes that were signed (hex).
    pub signed_data: String,
    /// POSIX seconds, always positive.
    pub signature_timestamp: i64,
}

/// An oracle signature exactly as submitted, before structural validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_address: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_timestamp: Option<Value>,
}

impl SignatureSubmission {
    const REQUIRED_FIELDS: [&'static str; 4] = [
        "oracle_address",
        "signature",
        "signed_data",
        "signature_timestamp",
    ];

    fn field(&self, name: &str) -> Option<&Value> {
        match name {
            "oracle_address" => self.oracle_address.as_ref(),
            "signature" => self.signature.as_ref(),
            "signed_data" => self.signed_data.as_ref(),
            "signature_timestamp" => self.signature_timestamp.as_ref(),
            _ => None,
        }
    }

    /// Check field presence and shape, reporting every problem found.
    pub fn validate(&self) -> Result<OracleSignature, Vec<String>> {
        let mut errors = Vec::new();

        for field in Self::REQUIRED_FIELDS {
            if self.field(field).is_none() {
                errors.push(format!("Missing required field: {field}"));
            }
        }

        let oracle_address = match &self.oracle_address {
            Some(Value::String(addr)) if has_address_prefix(addr) => Some(addr.clone()),
            Some(Value::String(addr)) => {
                errors.push(format!("Invalid oracle_address format: {addr}"));
                None
            }
            Some(other) => {
                errors.push(format!("Invalid oracle_address format: {other}"));
                None
            }
            None => None,
        };

        let signature = match &self.signature {
            Some(Value::String(sig)) if !sig.is_empty() => Some(sig.clone()),
            Some(_) => {
                errors.push("Signature must be a non-empty string".to_string());
                None
            }
            None => None,
        };

        let signed_data = match &self.signed_data {
            Some(Value::String(data)) => Some(data.clone()),
            Some(_) => {
                errors.push("signed_data must be a string".to_string());
                None
            }
            None => None,
        };

        let signature_timestamp = match &self.signature_timestamp {
            Some(Value::Number(n)) if n.as_i64().is_some_and(|ts| ts > 0) => n.as_i64(),
            Some(_) => {
                errors.push("signature_timestamp must be a positive integer".to_string());
                None
            }
            None => None,
        };

        match (oracle_address, signature, signed_data, signature_timestamp) {
            (Some(oracle_address), Some(signature), Some(signed_data), Some(signature_timestamp))
                if errors.is_empty() =>
            {
                Ok(OracleSignature {
                    oracle_address,
                    signature,
                    signed_data,
                    signature_timestamp,
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<OracleSignature> for SignatureSubmission {
    fn from(sig: OracleSignature) -> Self {
        Self {
            oracle_address: Some(Value::String(sig.oracle_address)),
            signature: Some(Value::String(sig.signature)),
            signed_data: Some(Value::String(sig.signed_data)),
            signature_timestamp: Some(Value::from(sig.signature_timestamp)),
        }
    }
}
