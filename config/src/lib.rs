//! Configuration for the milestone tooling.
//!
//! Values resolve in this order, later wins: built-in defaults, the TOML file
//! (`~/.milestone/config.toml` unless a path is given), then environment
//! variables. Command-line flags are applied by the binary on top of the
//! resolved result.
//!
//! ```toml
//! [network]
//! network = "preprod"
//! ogmios_url = "ws://localhost:1337"
//! kupo_url = "http://localhost:1442"
//! cardano_node_socket = "${HOME}/cardano/node.socket"
//! request_timeout_secs = 30
//!
//! [storage]
//! data_directory = "/var/lib/milestone"
//!
//! [cache]
//! max_age_secs = 300
//!
//! [validator]
//! plutus_path = "plutus.json"
//! name = "distribution.spend"
//! ```

mod network;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use network::{Network, UnknownNetwork};

pub const DEFAULT_OGMIOS_URL: &str = "ws://localhost:1337";
pub const DEFAULT_KUPO_URL: &str = "http://localhost:1442";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;

/// Environment variables consulted by [`MilestoneConfig::resolve`].
pub mod vars {
    pub const NETWORK: &str = "CARDANO_NETWORK";
    pub const OGMIOS_URL: &str = "OGMIOS_URL";
    pub const KUPO_URL: &str = "KUPO_URL";
    pub const NODE_SOCKET: &str = "CARDANO_NODE_SOCKET";
    pub const PROTOCOL_MAGIC: &str = "PROTOCOL_MAGIC";
    pub const DATA_DIRECTORY: &str = "DATA_DIRECTORY";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilestoneConfig {
    pub network: Option<NetworkConfig>,
    pub storage: Option<StorageConfig>,
    pub cache: Option<CacheConfig>,
    pub validator: Option<ValidatorConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub network: Option<Network>,
    pub ogmios_url: Option<String>,
    pub kupo_url: Option<String>,
    pub cardano_node_socket: Option<String>,
    pub protocol_magic: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Base directory; `milestones/` and `cache/` live beneath it.
    pub data_directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Zero disables the contract-state cache.
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    pub plutus_path: Option<String>,
    pub name: Option<String>,
}

/// Fully resolved settings. Every field is concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub network: Network,
    pub ogmios_url: String,
    pub kupo_url: String,
    pub cardano_node_socket: Option<PathBuf>,
    pub protocol_magic: u32,
    pub request_timeout: Duration,
    pub data_directory: PathBuf,
    pub cache_max_age: Duration,
    pub plutus_path: PathBuf,
    pub validator_name: Option<String>,
}

impl ResolvedConfig {
    #[must_use]
    pub fn milestones_dir(&self) -> PathBuf {
        self.data_directory.join("milestones")
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.data_directory.join("cache")
    }
}

impl MilestoneConfig {
    /// Load the config file at `path`, or the default location if `None`.
    ///
    /// A missing file is not an error and yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(config_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with(|var| env::var(var).ok().filter(|value| !value.is_empty()))
    }

    /// Resolve with `lookup` standing in for the environment.
    pub fn resolve_with(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ResolvedConfig, ConfigError> {
        let net = self.network.unwrap_or_default();
        let storage = self.storage.unwrap_or_default();
        let cache = self.cache.unwrap_or_default();
        let validator = self.validator.unwrap_or_default();

        let network = match lookup(vars::NETWORK) {
            Some(raw) => raw.parse::<Network>().map_err(|e| ConfigError::Env {
                var: vars::NETWORK,
                message: e.to_string(),
            })?,
            None => net.network.unwrap_or_default(),
        };

        let protocol_magic = match lookup(vars::PROTOCOL_MAGIC) {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| ConfigError::Env {
                var: vars::PROTOCOL_MAGIC,
                message: format!("'{raw}' is not an unsigned integer"),
            })?,
            None => net
                .protocol_magic
                .unwrap_or_else(|| network.default_protocol_magic()),
        };

        let ogmios_url = lookup(vars::OGMIOS_URL)
            .or(net.ogmios_url.map(|url| expand_env_vars(&url)))
            .unwrap_or_else(|| DEFAULT_OGMIOS_URL.to_string());
        let kupo_url = lookup(vars::KUPO_URL)
            .or(net.kupo_url.map(|url| expand_env_vars(&url)))
            .unwrap_or_else(|| DEFAULT_KUPO_URL.to_string());
        let cardano_node_socket = lookup(vars::NODE_SOCKET)
            .or(net.cardano_node_socket.map(|p| expand_env_vars(&p)))
            .map(PathBuf::from);
        let data_directory = lookup(vars::DATA_DIRECTORY)
            .or(storage.data_directory.map(|p| expand_env_vars(&p)))
            .map_or_else(default_data_directory, PathBuf::from);

        Ok(ResolvedConfig {
            network,
            ogmios_url,
            kupo_url,
            cardano_node_socket,
            protocol_magic,
            request_timeout: Duration::from_secs(
                net.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            data_directory,
            cache_max_age: Duration::from_secs(
                cache.max_age_secs.unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS),
            ),
            plutus_path: validator
                .plutus_path
                .map_or_else(|| PathBuf::from("plutus.json"), |p| PathBuf::from(expand_env_vars(&p))),
            validator_name: validator.name,
        })
    }
}

/// Replace `${VAR}` references with the variable's value (empty if unset).
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".milestone").join("config.toml"))
}

fn default_data_directory() -> PathBuf {
    dirs::home_dir().map_or_else(
        || PathBuf::from("milestone-data"),
        |home| home.join(".milestone").join("data"),
    )
}

/// Whether `path` exists and is a Unix domain socket.
#[must_use]
pub fn check_node_socket(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        fs::metadata(path).is_ok_and(|meta| meta.file_type().is_socket())
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        false
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::{
        ConfigError, DEFAULT_KUPO_URL, DEFAULT_OGMIOS_URL, MilestoneConfig, Network,
        check_node_socket, expand_env_vars,
    };

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = MilestoneConfig::default().resolve_with(no_env).unwrap();
        assert_eq!(resolved.network, Network::Testnet);
        assert_eq!(resolved.ogmios_url, DEFAULT_OGMIOS_URL);
        assert_eq!(resolved.kupo_url, DEFAULT_KUPO_URL);
        assert_eq!(resolved.cache_max_age, Duration::from_secs(300));
        assert_eq!(resolved.request_timeout, Duration::from_secs(30));
        assert_eq!(resolved.protocol_magic, 1_097_911_063);
        assert!(resolved.cardano_node_socket.is_none());
        assert_eq!(resolved.plutus_path, PathBuf::from("plutus.json"));
    }

    #[test]
    fn file_values_are_used() {
        let config: MilestoneConfig = toml::from_str(
            r#"
            [network]
            network = "preprod"
            kupo_url = "http://kupo:1442"
            request_timeout_secs = 5

            [storage]
            data_directory = "/srv/milestone"

            [cache]
            max_age_secs = 0

            [validator]
            name = "distribution.spend"
            "#,
        )
        .unwrap();

        let resolved = config.resolve_with(no_env).unwrap();
        assert_eq!(resolved.network, Network::Preprod);
        assert_eq!(resolved.protocol_magic, 1);
        assert_eq!(resolved.kupo_url, "http://kupo:1442");
        assert_eq!(resolved.request_timeout, Duration::from_secs(5));
        assert_eq!(resolved.cache_max_age, Duration::ZERO);
        assert_eq!(resolved.milestones_dir(), PathBuf::from("/srv/milestone/milestones"));
        assert_eq!(resolved.cache_dir(), PathBuf::from("/srv/milestone/cache"));
        assert_eq!(resolved.validator_name.as_deref(), Some("distribution.spend"));
    }

    #[test]
    fn environment_overrides_file() {
        let config: MilestoneConfig = toml::from_str(
            r#"
            [network]
            network = "preprod"
            protocol_magic = 7
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("CARDANO_NETWORK", "mainnet"),
            ("OGMIOS_URL", "ws://ogmios:1337"),
            ("PROTOCOL_MAGIC", "42"),
            ("DATA_DIRECTORY", "/tmp/ms"),
            ("CARDANO_NODE_SOCKET", "/ipc/node.socket"),
        ]);

        let resolved = config
            .resolve_with(|var| env.get(var).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(resolved.network, Network::Mainnet);
        assert_eq!(resolved.ogmios_url, "ws://ogmios:1337");
        assert_eq!(resolved.protocol_magic, 42);
        assert_eq!(resolved.data_directory, PathBuf::from("/tmp/ms"));
        assert_eq!(
            resolved.cardano_node_socket,
            Some(PathBuf::from("/ipc/node.socket"))
        );
    }

    #[test]
    fn bad_environment_values_are_errors() {
        let err = MilestoneConfig::default()
            .resolve_with(|var| (var == "CARDANO_NETWORK").then(|| "devnet".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "CARDANO_NETWORK", .. }));

        let err = MilestoneConfig::default()
            .resolve_with(|var| (var == "PROTOCOL_MAGIC").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "PROTOCOL_MAGIC", .. }));
    }

    #[test]
    fn unknown_network_in_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[network]\nnetwork = \"devnet\"\n").unwrap();

        let err = MilestoneConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_yields_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = MilestoneConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert!(config.network.is_none());
        assert!(config.storage.is_none());
    }

    #[test]
    fn expand_env_vars_handles_missing_and_unclosed() {
        unsafe {
            std::env::set_var("MILESTONE_TEST_EXPAND", "alpha");
            std::env::remove_var("MILESTONE_TEST_MISSING");
        }
        assert_eq!(expand_env_vars("${MILESTONE_TEST_EXPAND}/x"), "alpha/x");
        assert_eq!(expand_env_vars("a${MILESTONE_TEST_MISSING}b"), "ab");
        assert_eq!(expand_env_vars("keep ${UNCLOSED"), "keep ${UNCLOSED");
        assert_eq!(expand_env_vars("plain"), "plain");
        unsafe {
            std::env::remove_var("MILESTONE_TEST_EXPAND");
        }
    }

    #[test]
    fn regular_file_is_not_a_node_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.socket");
        fs::write(&path, "").unwrap();
        assert!(!check_node_socket(&path));
        assert!(!check_node_socket(&dir.path().join("missing.socket")));
    }

    #[cfg(unix)]
    #[test]
    fn unix_socket_is_a_node_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.socket");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();
        assert!(check_node_socket(&path));
    }
}
