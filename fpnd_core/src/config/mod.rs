pub mod getters;
pub mod load;

use crate::connection::DEFAULT_ENDPOINT;
use crate::network::default_parent;
use crate::retry::RetryPolicy;

use owo_colors::OwoColorize;

// Config
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Error Handling
use fpnd_error::FpndError;
use log::info;

pub const MANAGED_DIR: &'static str = "/var/lib/fpnd";
pub const CONFIG_DIR: &'static str = "/etc/fpnd";
pub const BIN_DIR: &'static str = "/usr/lib/fpnd/bin";

/// File names inside the state directory.
pub const POOL_FILE: &'static str = "netobj_queue.json";
pub const TRACKER_FILE: &'static str = "net_trie.dat";

/*
* The main fpnd configuration struct.
* Every section is optional and falls back to its defaults.
*/
#[derive(Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FpndConfig {
    pub pool: PoolConfig,
    pub state: StateConfig,
    pub scripts: ScriptsConfig,
    pub notify: NotifyConfig,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Parent block partitioned into /30 subnets.
    pub parent: Ipv4Net,
}
impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            parent: default_parent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding the pool queue and the tracker store.
    pub dir: PathBuf,
}
impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(MANAGED_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory of the fpn0/fpn1 lifecycle scripts.
    pub bin_dir: PathBuf,
}
impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from(BIN_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub endpoint: String,
    /// Milliseconds.
    pub connect_timeout: u64,
    /// Milliseconds.
    pub response_timeout: u64,
}
impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            connect_timeout: 3000,
            response_timeout: 3000,
        }
    }
}

impl FpndConfig {
    /// Ensure fpnd working directories exists.
    /// The config directory is left to the package manager.
    pub fn ensure_directories(&self) -> Result<(), FpndError> {
        let directories = [self.state.dir.clone()];
        for directory in directories {
            let path = Path::new(&directory);
            if !path.exists() {
                fs::create_dir_all(&directory)?;
            }
        }
        info!("{} ensured fpnd filetree.", "[init]".yellow());
        Ok(())
    }
}
