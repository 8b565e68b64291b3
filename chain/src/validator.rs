//! Compiled validator metadata from a `plutus.json` blueprint.
//!
//! `validators` may be an array of `{title, hash, compiledCode, ...}` entries
//! (blueprint layout) or an object keyed by validator name.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{ChainError, ChainResult};

/// Length of a script hash in hex characters.
const SCRIPT_HASH_HEX_LEN: usize = 56;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorInfo {
    pub name: Option<String>,
    pub hash: String,
    pub compiled_code: String,
    pub datum_schema: Option<Value>,
    pub redeemer_schema: Option<Value>,
}

impl ValidatorInfo {
    fn from_entry(name: Option<String>, entry: &Map<String, Value>) -> ChainResult<Self> {
        let field = |key: &'static str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(ChainError::ValidatorField { field: key })
        };
        Ok(Self {
            name,
            hash: field("hash")?,
            compiled_code: field("compiledCode")?,
            datum_schema: entry
                .get("datumSchema")
                .or_else(|| entry.get("datum"))
                .cloned(),
            redeemer_schema: entry
                .get("redeemerSchema")
                .or_else(|| entry.get("redeemer"))
                .cloned(),
        })
    }
}

pub struct ValidatorLoader {
    path: PathBuf,
}

impl ValidatorLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load `name`, or the first validator when `name` is `None`.
    pub fn load(&self, name: Option<&str>) -> ChainResult<ValidatorInfo> {
        let blueprint = self.read_blueprint()?;
        let Some(validators) = blueprint.get("validators") else {
            return match name {
                Some(name) => Err(ChainError::ValidatorNotFound {
                    name: name.to_string(),
                }),
                None => blueprint
                    .as_object()
                    .ok_or(ChainError::ValidatorField { field: "validators" })
                    .and_then(|obj| ValidatorInfo::from_entry(None, obj)),
            };
        };

        let entry = match validators {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_object)
                .find(|item| {
                    name.is_none_or(|wanted| {
                        item.get("title").and_then(Value::as_str) == Some(wanted)
                    })
                })
                .map(|item| {
                    let title = item.get("title").and_then(Value::as_str).map(str::to_string);
                    (title, item)
                }),
            Value::Object(by_name) => match name {
                Some(wanted) => by_name
                    .get(wanted)
                    .and_then(Value::as_object)
                    .map(|item| (Some(wanted.to_string()), item)),
                None => by_name
                    .iter()
                    .find_map(|(key, item)| item.as_object().map(|obj| (Some(key.clone()), obj))),
            },
            _ => None,
        };

        let (title, item) = entry.ok_or_else(|| ChainError::ValidatorNotFound {
            name: name.unwrap_or("<first>").to_string(),
        })?;
        let info = ValidatorInfo::from_entry(title, item)?;
        debug!(path = %self.path.display(), name = ?info.name, hash = %info.hash, "Loaded validator");
        Ok(info)
    }

    pub fn validator_hash(&self, name: Option<&str>) -> ChainResult<String> {
        self.load(name).map(|info| info.hash)
    }

    pub fn compiled_code(&self, name: Option<&str>) -> ChainResult<String> {
        self.load(name).map(|info| info.compiled_code)
    }

    fn read_blueprint(&self) -> ChainResult<Value> {
        if !self.path.exists() {
            return Err(ChainError::ValidatorMissing {
                path: self.path.clone(),
            });
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ChainError::ValidatorRead {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ChainError::ValidatorParse {
            path: self.path.clone(),
            source,
        })
    }
}

/// Script address placeholder for `hash`: network prefix plus the first 56 hex chars.
///
/// This is not a bech32 encoding; it identifies the contract in reports and
/// cache keys until real address derivation is wired in.
#[must_use]
pub fn contract_address(validator_hash: &str, mainnet: bool) -> String {
    let prefix = if mainnet { "addr1" } else { "addr_test1" };
    let hash: String = validator_hash.chars().take(SCRIPT_HASH_HEX_LEN).collect();
    format!("{prefix}{hash}")
}
