//! Node Configuration
//!
//! Read from `enclave_config.json`. Every key is optional and falls back to
//! the default below.

use enclave_consensus::{leader::default_node_ids, RotationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up in each search directory
pub const CONFIG_FILE: &str = "enclave_config.json";

/// Overrides the configuration home (`$HOME/.config/enclave`)
pub const HOME_ENV: &str = "ENCLAVE_HOME";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Balance at start and after `reload`
    pub opening_balance: i64,
    /// Address the trade server listens on and the client connects to
    pub tcp_connect: String,
    /// Port combined with `enclave-client -i <ip>`
    pub tcp_port: u16,
    /// Consensus group size per round
    pub number_of_nodes: usize,
    /// Node identities leaders are drawn from
    pub node_ids: Vec<String>,
    /// Upper bound on transactions per block
    pub max_transactions: u64,
    /// Random reduction range for transactions per block
    pub rand_factor: u64,
    /// Delay between leader rounds in milliseconds
    pub round_delay_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            opening_balance: 1000,
            tcp_connect: "127.0.0.1:5000".to_string(),
            tcp_port: 5000,
            number_of_nodes: 15,
            node_ids: default_node_ids(),
            max_transactions: 5000,
            rand_factor: 1000,
            round_delay_ms: 3000,
        }
    }
}

impl NodeConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given, otherwise the first file found on the search
    /// path, otherwise defaults. Returns the file that was used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        match search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Leader rotation settings derived from this config
    pub fn rotation(&self) -> RotationConfig {
        RotationConfig {
            node_ids: self.node_ids.clone(),
            group_size: self.number_of_nodes,
            max_transactions: self.max_transactions,
            rand_factor: self.rand_factor,
            round_delay: Duration::from_millis(self.round_delay_ms),
        }
    }

    /// Address the client should dial, honoring an `-i <ip>` override
    pub fn client_addr(&self, ip: Option<&str>) -> String {
        match ip {
            Some(ip) if ip != "localhost" => format!("{}:{}", ip, self.tcp_port),
            _ => self.tcp_connect.clone(),
        }
    }
}

/// `$ENCLAVE_HOME`, or `$HOME/.config/enclave`
pub fn config_home() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV) {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("enclave"))
}

/// Candidate config files, in lookup order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(CONFIG_FILE),
        Path::new("testdata").join(CONFIG_FILE),
    ];
    if let Some(home) = config_home() {
        paths.push(home.join("config").join(CONFIG_FILE));
    }
    paths
}
