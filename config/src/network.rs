use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
    Preview,
    Preprod,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Testnet,
        Network::Mainnet,
        Network::Preview,
        Network::Preprod,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
            Network::Preview => "preview",
            Network::Preprod => "preprod",
        }
    }

    #[must_use]
    pub const fn is_mainnet(self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Well-known protocol magic for the network.
    #[must_use]
    pub const fn default_protocol_magic(self) -> u32 {
        match self {
            Network::Mainnet => 764_824_073,
            Network::Preprod => 1,
            Network::Preview => 2,
            Network::Testnet => 1_097_911_063,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network '{0}' (expected testnet, mainnet, preview or preprod)")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Network::ALL
            .into_iter()
            .find(|network| network.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}
