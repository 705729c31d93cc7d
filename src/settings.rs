// CLASSIFICATION: COMMUNITY
// Filename: settings.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Runtime settings of the platform layer.
//!
//! Read from the TOML file named by `SOCKET_PAL_CONFIG`; any problem falls
//! back to [`PalConfig::default`]. The socket capacity is not here: it is
//! fixed at build time through `SOCKET_PAL_MAX_SOCKETS`.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "SOCKET_PAL_CONFIG";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PalConfig {
    /// Namespace the configuration blocks are stored under.
    pub store_namespace: String,
    /// Root directory for file-backed block storage.
    pub store_dir: PathBuf,
    pub network_interface_count: u32,
    pub wireless_interface_count: u32,
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            store_namespace: "nanoF".into(),
            store_dir: std::env::temp_dir().join("socket-pal"),
            network_interface_count: 1,
            wireless_interface_count: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl PalConfig {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.into(),
            source,
        })?;
        toml::from_str(&data).map_err(|source| SettingsError::Parse {
            path: path.into(),
            source,
        })
    }

    /// Settings named by `SOCKET_PAL_CONFIG`, or defaults.
    pub fn load_active() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("using default socket-pal settings: {e}");
                Self::default()
            }
        }
    }
}
